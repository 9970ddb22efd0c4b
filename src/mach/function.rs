//! Mach-IR: the fourth IR layer. Same shape as
//! Linear-IR, but every operand is a concrete `MReg` and every stack
//! reference is an explicit FP-relative offset — the `Loc`/`SpillSlot`
//! abstraction Located-IR and Linear-IR share is gone, replaced by
//! `Mgetstack`/`Msetstack`/`Mgetparam`, which `stacking::lower` produces.

use crate::ir::amode::AddrMode;
use crate::ir::cond::ConditionCode;
use crate::ir::entities::Label;
use crate::ir::instr::CallTarget;
use crate::ir::mreg::MReg;
use crate::ir::op::Op;
use crate::ir::types::{Chunk, Ty};

/// One Mach-IR instruction. Mirrors `linear::LinInstr` one-for-one over
/// `MReg` instead of `Loc`, plus three additional stack-access forms:
/// `Mgetstack`, `Msetstack`, `Mgetparam`.
#[derive(Clone, PartialEq, Debug)]
pub enum MInstr {
    Mlabel(Label),
    Mnop,
    Mmove { ty: Ty, src: MReg, dst: MReg },
    Mop { op: Op, args: Vec<MReg>, dst: MReg },
    Mload { chunk: Chunk, addr: AddrMode<MReg>, dst: MReg },
    Mstore { chunk: Chunk, addr: AddrMode<MReg>, src: MReg },
    Mcall { target: CallTarget<MReg>, args: Vec<MReg>, dst: Option<MReg>, ty: Option<Ty> },
    Mbuiltin { name: String, args: Vec<MReg>, dst: Option<MReg>, ty: Option<Ty> },
    Mgoto(Label),
    Mcond { cond: ConditionCode, args: Vec<MReg>, ifso: Label },
    Mjumptable { index: MReg, targets: Vec<Label>, default: Label },
    Mtailcall { target: CallTarget<MReg>, args: Vec<MReg> },
    Mreturn { value: Option<MReg> },
    /// Load `ty` from `FP + offset` into `dst` (a spill reload, or a
    /// body-local the front-end addressed directly rather than through a
    /// pseudo-register).
    Mgetstack { offset: i64, ty: Ty, dst: MReg },
    /// Store `src` (`ty`) to `FP + offset`.
    Msetstack { offset: i64, ty: Ty, src: MReg },
    /// Load the `ty`-typed incoming parameter at `FP + offset` (9th-and-
    /// later arguments, which arrive on the caller's stack rather than in
    /// a register).
    Mgetparam { offset: i64, ty: Ty, dst: MReg },
}

impl MInstr {
    pub fn targets(&self) -> Vec<Label> {
        match self {
            MInstr::Mgoto(l) => vec![*l],
            MInstr::Mcond { ifso, .. } => vec![*ifso],
            MInstr::Mjumptable { targets, default, .. } => {
                let mut v = targets.clone();
                v.push(*default);
                v
            }
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumptable_reports_every_case_plus_the_default() {
        let (a, b, default) = (Label::new(0), Label::new(1), Label::new(2));
        let jt = MInstr::Mjumptable { index: MReg::X(0), targets: vec![a, b], default };
        assert_eq!(jt.targets(), vec![a, b, default]);
    }

    #[test]
    fn a_plain_op_has_no_branch_targets() {
        let instr = MInstr::Mop { op: Op::Add, args: vec![MReg::X(0), MReg::X(1)], dst: MReg::X(2) };
        assert!(instr.targets().is_empty());
    }
}

/// The concrete stack-frame geometry computed by `stacking::layout`
///, carried alongside a `MachFunction` so `isa::aarch64`
/// can emit the prologue/epilogue and every downstream slot reference is
/// already a plain integer offset.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FrameLayout {
    pub callee_save_size: i64,
    pub local_size: i64,
    pub outgoing_size: i64,
    pub frame_body: i64,
    pub total_size: i64,
    pub callee_save_offset: i64,
    pub local_offset: i64,
    pub outgoing_offset: i64,
    /// Callee-saved registers actually used by this function's body, in
    /// ascending numeric-id order, padded to even length.
    /// Paired `(r0, r1)` at `[FP + callee_save_offset + 8*i, +8*i+8]`.
    pub callee_saves: Vec<MReg>,
}

/// A Mach-IR function: flat instruction stream, ABI-aware prologue/epilogue
/// metadata, and no `Loc`/spill abstraction left for `isa::aarch64::asmgen`
/// to resolve — every instruction is either a plain machine op or one of
/// the three stack-access forms above.
#[derive(Clone, Debug)]
pub struct MachFunction {
    pub name: String,
    pub ret_ty: Option<Ty>,
    pub body: Vec<MInstr>,
    pub frame: FrameLayout,
}
