//! CFG-IR: the first IR layer. A `Function` is a
//! `PrimaryMap<Node, Instruction>` plus an entry node; every `Instruction`
//! names its successor `Node`(s) explicitly rather than falling through to
//! the next map slot, so node numbering carries no meaning of its own.

use cranelift_entity::PrimaryMap;
use std::collections::BTreeMap;

use crate::ir::amode::AddrMode;
use crate::ir::cond::ConditionCode;
use crate::ir::entities::{Node, PReg};
use crate::ir::op::Op;
use crate::ir::types::{Chunk, Ty};

/// A call target: either a known symbol or an indirect register operand.
/// Generic over the operand representation so the same shape is reused
/// across IR layers (`PReg` in CFG-IR, `Loc` in Located-IR, `MReg` in
/// Mach-IR) — see `ir::amode::AddrMode` for the same pattern.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallTarget<R> {
    Direct(String),
    Indirect(R),
}

impl<R> CallTarget<R> {
    pub fn map<S>(self, mut f: impl FnMut(R) -> S) -> CallTarget<S> {
        match self {
            CallTarget::Direct(name) => CallTarget::Direct(name),
            CallTarget::Indirect(r) => CallTarget::Indirect(f(r)),
        }
    }
}

/// One CFG-IR instruction together with its successor edge(s): `Inop`,
/// `Iop`, `Iload`, `Istore`, `Icall`, `Itailcall`, `Ibuiltin`, `Icond`,
/// `Ijumptable`, `Ireturn`.
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
    /// No-op; falls through to `next`.
    Inop { next: Node },
    /// Apply `op` to `args`, writing `dst`, then fall through to `next`.
    Iop {
        op: Op,
        args: Vec<PReg>,
        dst: PReg,
        next: Node,
    },
    /// Load `chunk` from `addr` into `dst`.
    Iload {
        chunk: Chunk,
        addr: AddrMode<PReg>,
        dst: PReg,
        next: Node,
    },
    /// Store `src` to `addr` as `chunk`.
    Istore {
        chunk: Chunk,
        addr: AddrMode<PReg>,
        src: PReg,
        next: Node,
    },
    /// Call `target` with `args`, writing the (optional) result to `dst`,
    /// then fall through to `next`. A call is the only CFG-IR instruction
    /// that clobbers caller-saved registers, which the allocator's
    /// interference-graph builder must account for.
    Icall {
        target: CallTarget<PReg>,
        args: Vec<PReg>,
        dst: Option<PReg>,
        ty: Option<Ty>,
        next: Node,
    },
    /// Tail call: control does not return to this function.
    Itailcall { target: CallTarget<PReg>, args: Vec<PReg> },
    /// Call a compiler-known builtin (e.g. a runtime helper for integer
    /// division-by-zero checking) — same shape as `Icall` but never
    /// resolved to a user-visible symbol table entry.
    Ibuiltin {
        name: String,
        args: Vec<PReg>,
        dst: Option<PReg>,
        ty: Option<Ty>,
        next: Node,
    },
    /// Conditional branch: `ifso` when `cond` holds over `args`, `ifnot`
    /// otherwise.
    Icond {
        cond: ConditionCode,
        args: Vec<PReg>,
        ifso: Node,
        ifnot: Node,
    },
    /// Multi-way branch: dispatch on `index` to `targets[index]`, or
    /// `default` if `index` is out of range.
    Ijumptable {
        index: PReg,
        targets: Vec<Node>,
        default: Node,
    },
    /// Return, optionally producing a value.
    Ireturn { value: Option<PReg> },
}

impl Instruction {
    /// Pseudo-registers this instruction reads.
    pub fn use_regs(&self) -> Vec<PReg> {
        match self {
            Instruction::Inop { .. } => vec![],
            Instruction::Iop { args, .. } => args.clone(),
            Instruction::Iload { addr, .. } => addr.registers().into_iter().copied().collect(),
            Instruction::Istore { addr, src, .. } => {
                let mut v: Vec<PReg> = addr.registers().into_iter().copied().collect();
                v.push(*src);
                v
            }
            Instruction::Icall { target, args, .. } | Instruction::Itailcall { target, args } => {
                let mut v = args.clone();
                if let CallTarget::Indirect(r) = target {
                    v.push(*r);
                }
                v
            }
            Instruction::Ibuiltin { args, .. } => args.clone(),
            Instruction::Icond { args, .. } => args.clone(),
            Instruction::Ijumptable { index, .. } => vec![*index],
            Instruction::Ireturn { value } => value.iter().copied().collect(),
        }
    }

    /// The pseudo-register this instruction defines, if any.
    pub fn def_reg(&self) -> Option<PReg> {
        match self {
            Instruction::Iop { dst, .. } | Instruction::Iload { dst, .. } => Some(*dst),
            Instruction::Icall { dst, .. } | Instruction::Ibuiltin { dst, .. } => *dst,
            _ => None,
        }
    }

    /// Every `Node` control may flow to from this instruction, in a stable
    /// order. Empty for `Itailcall`/`Ireturn`, which end the function.
    pub fn successors(&self) -> Vec<Node> {
        match self {
            Instruction::Inop { next }
            | Instruction::Iop { next, .. }
            | Instruction::Iload { next, .. }
            | Instruction::Istore { next, .. }
            | Instruction::Icall { next, .. }
            | Instruction::Ibuiltin { next, .. } => vec![*next],
            Instruction::Itailcall { .. } | Instruction::Ireturn { .. } => vec![],
            Instruction::Icond { ifso, ifnot, .. } => vec![*ifso, *ifnot],
            Instruction::Ijumptable { targets, default, .. } => {
                let mut v = targets.clone();
                v.push(*default);
                v
            }
        }
    }

    /// Whether this instruction may clobber caller-saved registers (calls
    /// to code outside the current function).
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            Instruction::Icall { .. } | Instruction::Itailcall { .. } | Instruction::Ibuiltin { .. }
        )
    }
}

/// A formal parameter: its home pseudo-register and declared type.
#[derive(Clone, PartialEq, Debug)]
pub struct Param {
    pub reg: PReg,
    pub ty: Ty,
}

/// A CFG-IR function: a map of `Node`s, an entry point, and the parameter
/// list the caller is expected to supply.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret_ty: Option<Ty>,
    pub nodes: PrimaryMap<Node, Instruction>,
    pub entry: Node,
    /// Byte size of the front-end-declared stack-allocated locals (distinct
    /// from the spill/callee-save/outgoing space the stacking pass adds
    /// later as the frame layout's `LocalSize`).
    pub stack_size: i64,
    /// Human-readable names for debugging/printing, keyed by `PReg`. Not
    /// used by any lowering pass; purely a printer aid.
    pub reg_names: BTreeMap<PReg, String>,
    /// Declared type of every pseudo-register the function mentions. Every
    /// `PReg` a `FunctionBuilder` allocates gets an entry; the register
    /// allocator consults this to split pseudo-registers into the integer
    /// and float classes and to size spill slots.
    pub reg_types: PrimaryMap<PReg, Ty>,
}

impl Function {
    pub fn new(name: impl Into<String>, entry: Node, nodes: PrimaryMap<Node, Instruction>) -> Self {
        Function {
            name: name.into(),
            params: Vec::new(),
            ret_ty: None,
            nodes,
            entry,
            stack_size: 0,
            reg_names: BTreeMap::new(),
            reg_types: PrimaryMap::new(),
        }
    }

    /// All nodes in ascending `Node` order (a deterministic, if not
    /// control-flow-meaningful, enumeration used by passes that must visit
    /// "every node" without caring about order, e.g. arity validation).
    pub fn nodes_in_order(&self) -> impl Iterator<Item = (Node, &Instruction)> {
        self.nodes.iter()
    }

    pub fn reg_type(&self, r: PReg) -> Ty {
        self.reg_types[r]
    }
}
