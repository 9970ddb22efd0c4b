//! `LFunction`: a CFG-shaped function whose operands are `Loc`s rather than
//! `PReg`s. Same node identities and successor edges as its CFG-IR source;
//! `regalloc::apply` builds one by walking the CFG-IR function and the
//! coloring/spill assignment together.

use cranelift_entity::PrimaryMap;

use crate::ir::amode::AddrMode;
use crate::ir::cond::ConditionCode;
use crate::ir::entities::Node;
use crate::ir::instr::CallTarget;
use crate::ir::op::Op;
use crate::ir::types::{Chunk, Ty};
use crate::located::loc::Loc;

/// One Located-IR instruction. Shape mirrors `ir::instr::Instruction`
/// exactly, with `Loc` standing in for `PReg`, plus `LMove`: a register
/// allocator-introduced copy that has no CFG-IR counterpart, inserted to
/// stage call arguments/results and to break parallel-move cycles.
#[derive(Clone, PartialEq, Debug)]
pub enum LInstruction {
    Lnop { next: Node },
    /// A plain copy, `dst <- src`, with no arithmetic meaning.
    Lmove { ty: Ty, src: Loc, dst: Loc, next: Node },
    Lop { op: Op, args: Vec<Loc>, dst: Loc, next: Node },
    Lload { chunk: Chunk, addr: AddrMode<Loc>, dst: Loc, next: Node },
    Lstore { chunk: Chunk, addr: AddrMode<Loc>, src: Loc, next: Node },
    Lcall {
        target: CallTarget<Loc>,
        args: Vec<Loc>,
        dst: Option<Loc>,
        ty: Option<Ty>,
        next: Node,
    },
    Ltailcall { target: CallTarget<Loc>, args: Vec<Loc> },
    Lbuiltin {
        name: String,
        args: Vec<Loc>,
        dst: Option<Loc>,
        ty: Option<Ty>,
        next: Node,
    },
    Lcond { cond: ConditionCode, args: Vec<Loc>, ifso: Node, ifnot: Node },
    Ljumptable { index: Loc, targets: Vec<Node>, default: Node },
    Lreturn { value: Option<Loc> },
}

impl LInstruction {
    pub fn successors(&self) -> Vec<Node> {
        match self {
            LInstruction::Lnop { next }
            | LInstruction::Lmove { next, .. }
            | LInstruction::Lop { next, .. }
            | LInstruction::Lload { next, .. }
            | LInstruction::Lstore { next, .. }
            | LInstruction::Lcall { next, .. }
            | LInstruction::Lbuiltin { next, .. } => vec![*next],
            LInstruction::Ltailcall { .. } | LInstruction::Lreturn { .. } => vec![],
            LInstruction::Lcond { ifso, ifnot, .. } => vec![*ifso, *ifnot],
            LInstruction::Ljumptable { targets, default, .. } => {
                let mut v = targets.clone();
                v.push(*default);
                v
            }
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(
            self,
            LInstruction::Lcall { .. } | LInstruction::Ltailcall { .. } | LInstruction::Lbuiltin { .. }
        )
    }
}

/// A formal parameter's final home location and type.
#[derive(Clone, PartialEq, Debug)]
pub struct LParam {
    pub loc: Loc,
    pub ty: Ty,
    /// `Some(offset)` when this parameter is the 9th-or-later argument of
    /// its register class and so arrives on the caller's incoming stack
    /// area at `FP + 16 + offset` rather than in an ABI register. The stacking pass's parameter home-copy
    /// step loads straight from this offset instead of
    /// resolving it as part of the register parallel-move problem.
    pub incoming_offset: Option<i64>,
}

/// A Located-IR function: same graph as its CFG-IR source, `Loc` operands,
/// plus the spill-slot count the stacking pass must reserve frame space for.
#[derive(Clone, Debug)]
pub struct LFunction {
    pub name: String,
    pub params: Vec<LParam>,
    pub ret_ty: Option<Ty>,
    pub nodes: PrimaryMap<Node, LInstruction>,
    pub entry: Node,
    pub stack_size: i64,
    /// Number of spill slots assigned by the allocator; the stacking pass
    /// multiplies by `SpillSlot`'s 8-byte granularity to size `LocalSize`'s
    /// spill region.
    pub spill_slot_count: u32,
    /// The declared `Ty` of the pseudo-register that was spilled into each
    /// slot (indexed by `SpillSlot`'s raw index). `Loc::Stack` itself
    /// carries no type, so later passes (stacking's spill reload/store
    /// staging, the stack-usage collector) consult this to size and
    /// sign/float-class a slot access correctly.
    pub spill_types: Vec<Ty>,
}
