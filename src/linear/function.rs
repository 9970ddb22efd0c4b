//! Linear-IR: the third IR layer. Same
//! instruction shapes as Located-IR except flattened into an ordered
//! `Vec`, with explicit `Llabel`/`Lgoto` markers and a conditional branch
//! that carries only its `ifso` target (the false edge is the next
//! instruction in program order).

use crate::ir::amode::AddrMode;
use crate::ir::cond::ConditionCode;
use crate::ir::entities::Label;
use crate::ir::instr::CallTarget;
use crate::ir::op::Op;
use crate::ir::types::{Chunk, Ty};
use crate::located::function::LParam;
use crate::located::loc::Loc;

/// One Linear-IR instruction. Mirrors `located::LInstruction` one-for-one
/// except successor `Node`s are replaced by `Label`s, and the `next`
/// field present on every Located-IR variant is dropped (program order
/// supplies it).
#[derive(Clone, PartialEq, Debug)]
pub enum LinInstr {
    /// A label definition. Exactly one per referenced `Node`, emitted by
    /// the linearizer; some are later deleted by dead-label
    /// cleanup.
    Llabel(Label),
    /// An instruction whose only job was carrying a CFG successor edge; it
    /// contributes no code of its own.
    Lnop,
    Lmove { ty: Ty, src: Loc, dst: Loc },
    Lop { op: Op, args: Vec<Loc>, dst: Loc },
    Lload { chunk: Chunk, addr: AddrMode<Loc>, dst: Loc },
    Lstore { chunk: Chunk, addr: AddrMode<Loc>, src: Loc },
    Lcall { target: CallTarget<Loc>, args: Vec<Loc>, dst: Option<Loc>, ty: Option<Ty> },
    Lbuiltin { name: String, args: Vec<Loc>, dst: Option<Loc>, ty: Option<Ty> },
    /// Unconditional jump.
    Lgoto(Label),
    /// Conditional branch: jump to `ifso` if `cond` holds, else fall
    /// through to the next instruction.
    Lcond { cond: ConditionCode, args: Vec<Loc>, ifso: Label },
    Ljumptable { index: Loc, targets: Vec<Label>, default: Label },
    Ltailcall { target: CallTarget<Loc>, args: Vec<Loc> },
    Lreturn { value: Option<Loc> },
}

impl LinInstr {
    /// Every label this instruction can transfer control to, in a stable
    /// order. Used by tunnelling (rewrite targets) and dead-label cleanup
    /// (mark targets as referenced).
    pub fn targets(&self) -> Vec<Label> {
        match self {
            LinInstr::Lgoto(l) => vec![*l],
            LinInstr::Lcond { ifso, .. } => vec![*ifso],
            LinInstr::Ljumptable { targets, default, .. } => {
                let mut v = targets.clone();
                v.push(*default);
                v
            }
            _ => vec![],
        }
    }

    /// Apply `f` to every label target this instruction names, in place.
    pub fn map_targets(&mut self, mut f: impl FnMut(Label) -> Label) {
        match self {
            LinInstr::Lgoto(l) => *l = f(*l),
            LinInstr::Lcond { ifso, .. } => *ifso = f(*ifso),
            LinInstr::Ljumptable { targets, default, .. } => {
                for t in targets.iter_mut() {
                    *t = f(*t);
                }
                *default = f(*default);
            }
            _ => {}
        }
    }
}

/// A Linear-IR function: flat, ordered instruction stream plus the same
/// parameter/type/spill metadata Located-IR carries.
#[derive(Clone, Debug)]
pub struct LinearFunction {
    pub name: String,
    pub params: Vec<LParam>,
    pub ret_ty: Option<Ty>,
    pub body: Vec<LinInstr>,
    /// Front-end-declared local-variable size, distinct from spill slots
    /// (carried through from Located-IR as the frame layout's `LocalSize`).
    pub stack_size: i64,
    pub spill_slot_count: u32,
    /// Carried unchanged from `LFunction::spill_types` (see its doc
    /// comment); consulted by the stacking pass when it must reload or
    /// store a spilled operand through a scratch register.
    pub spill_types: Vec<Ty>,
}


/// Per-slot-kind byte totals computed by the stack-usage collector
///, input to the stacking pass's frame-layout
/// computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StackUsage {
    pub local: i64,
    pub incoming: i64,
    pub outgoing: i64,
}
