//! Stack-usage collector: scans a `LinearFunction`
//! for the byte totals the stacking pass needs before it can compute a
//! concrete frame layout.

use crate::ir::amode::AddrMode;
use crate::linear::function::{LinInstr, LinearFunction, StackUsage};

/// Compute `{local, incoming, outgoing}` for `func`. `local` folds in both
/// the front-end-declared local size and the spill slots the allocator
/// reserved; `incoming` is the high-water
/// mark of any parameter's caller-stack arrival offset (9th-and-later
/// arguments only); `outgoing` is the high-water mark of any
/// outgoing-argument store this function's own call sites emit.
pub fn collect(func: &LinearFunction) -> StackUsage {
    // Each spill slot is sized to its own pseudo-register's type rather
    // than a flat 8 bytes; slots are laid out back-to-back in ascending `SpillSlot`
    // order, so the total is just the sum of each one's width.
    let spill_bytes: i64 = func.spill_types.iter().map(|ty| ty.bytes()).sum();
    let local = func.stack_size + spill_bytes;

    let incoming = func
        .params
        .iter()
        .filter_map(|p| p.incoming_offset)
        .map(|ofs| ofs + 8)
        .max()
        .unwrap_or(0);

    let mut outgoing = 0i64;
    for instr in &func.body {
        if let LinInstr::Lstore { chunk, addr: AddrMode::Aoutgoing { offset }, .. } = instr {
            outgoing = outgoing.max(offset + chunk.bytes());
        }
    }

    StackUsage { local, incoming, outgoing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::mreg::MReg;
    use crate::ir::types::{Chunk, Ty};
    use crate::located::function::LParam;
    use crate::located::loc::Loc;

    fn base_func() -> LinearFunction {
        LinearFunction {
            name: "f".to_string(),
            params: Vec::new(),
            ret_ty: None,
            body: Vec::new(),
            stack_size: 0,
            spill_slot_count: 0,
            spill_types: Vec::new(),
        }
    }

    #[test]
    fn local_size_sums_declared_locals_and_each_spill_slot_own_width() {
        let mut f = base_func();
        f.stack_size = 16;
        f.spill_types = vec![Ty::I32, Ty::F64];
        let usage = collect(&f);
        assert_eq!(usage.local, 16 + 4 + 8);
    }

    #[test]
    fn incoming_is_the_high_water_mark_of_stack_parameter_offsets() {
        let mut f = base_func();
        f.params = vec![
            LParam { loc: Loc::Reg(MReg::X(0)), ty: Ty::I32, incoming_offset: None },
            LParam { loc: Loc::Reg(MReg::X(1)), ty: Ty::I32, incoming_offset: Some(0) },
            LParam { loc: Loc::Reg(MReg::X(2)), ty: Ty::I32, incoming_offset: Some(16) },
        ];
        let usage = collect(&f);
        assert_eq!(usage.incoming, 24);
    }

    #[test]
    fn outgoing_is_the_high_water_mark_of_stores_to_the_outgoing_area() {
        let mut f = base_func();
        f.body = vec![
            LinInstr::Lstore {
                chunk: Chunk::I64,
                addr: crate::ir::amode::AddrMode::Aoutgoing { offset: 0 },
                src: Loc::Reg(MReg::X(0)),
            },
            LinInstr::Lstore {
                chunk: Chunk::I32,
                addr: crate::ir::amode::AddrMode::Aoutgoing { offset: 16 },
                src: Loc::Reg(MReg::X(1)),
            },
        ];
        let usage = collect(&f);
        assert_eq!(usage.outgoing, 20);
    }

    #[test]
    fn no_parameters_or_stores_yields_zero_incoming_and_outgoing() {
        let usage = collect(&base_func());
        assert_eq!(usage.incoming, 0);
        assert_eq!(usage.outgoing, 0);
    }
}
