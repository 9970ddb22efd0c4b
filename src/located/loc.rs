//! `Loc`: the outcome of register allocation for a single pseudo-register
//! — either a machine register color or a spill slot.

use core::fmt;
use cranelift_entity::entity_impl;

use crate::ir::mreg::MReg;

/// A stack slot reserved for a spilled pseudo-register. Distinct from a
/// front-end-declared local: `SpillSlot`s are allocated by the register
/// allocator and translated to frame offsets by the stacking pass.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpillSlot(u32);
entity_impl!(SpillSlot, "ss");

/// Where a pseudo-register ended up living.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Loc {
    Reg(MReg),
    Stack(SpillSlot),
}

impl Loc {
    pub fn is_reg(self) -> bool {
        matches!(self, Loc::Reg(_))
    }

    pub fn as_reg(self) -> Option<MReg> {
        match self {
            Loc::Reg(r) => Some(r),
            Loc::Stack(_) => None,
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loc::Reg(r) => write!(f, "{r}"),
            Loc::Stack(s) => write!(f, "{s}"),
        }
    }
}
