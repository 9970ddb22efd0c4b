//! Frame layout computation: turn a function's stack-usage
//! summary and discovered callee-save set into concrete byte offsets.

use crate::ir::mreg::MReg;
use crate::linear::function::StackUsage;
use crate::mach::function::FrameLayout;

fn align(x: i64, to: i64) -> i64 {
    (x + to - 1) / to * to
}

/// Compute the frame layout from `usage` and the
/// callee-saved registers this function's body actually mentions.
/// `incoming` from `usage` is not counted in the frame total: it lives in
/// the caller's frame.
pub fn compute(usage: StackUsage, callee_saves: Vec<MReg>) -> FrameLayout {
    let callee_save_size = 8 * i64::try_from(callee_saves.len()).unwrap();
    let local_size = align(usage.local, 8);
    let outgoing_size = align(usage.outgoing, 8);
    let frame_body = align(callee_save_size + local_size + outgoing_size, 16);
    let total_size = frame_body + 16;

    let callee_save_offset = 16;
    let local_offset = 16 + callee_save_size;
    let outgoing_offset = 16 + callee_save_size + local_size;

    FrameLayout {
        callee_save_size,
        local_size,
        outgoing_size,
        frame_body,
        total_size,
        callee_save_offset,
        local_offset,
        outgoing_offset,
        callee_saves,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_size_is_16_aligned() {
        for local in [0i64, 1, 7, 8, 15, 100, 12345] {
            let usage = StackUsage { local, incoming: 0, outgoing: 4 };
            let layout = compute(usage, vec![MReg::X(19), MReg::X(20)]);
            assert_eq!(layout.total_size % 16, 0, "local={local}");
        }
    }

    #[test]
    fn leaf_with_no_callee_saves_has_minimal_frame() {
        let usage = StackUsage { local: 0, incoming: 0, outgoing: 0 };
        let layout = compute(usage, vec![]);
        assert_eq!(layout.callee_save_size, 0);
        assert_eq!(layout.total_size, 16);
    }

    #[test]
    fn offsets_follow_the_documented_order() {
        let usage = StackUsage { local: 8, incoming: 0, outgoing: 8 };
        let layout = compute(usage, vec![MReg::X(19), MReg::X(20)]);
        assert_eq!(layout.callee_save_offset, 16);
        assert_eq!(layout.local_offset, 16 + layout.callee_save_size);
        assert_eq!(layout.outgoing_offset, layout.local_offset + layout.local_size);
    }
}
