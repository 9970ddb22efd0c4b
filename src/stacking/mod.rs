//! Stacking: the fourth pipeline stage, turning Linear-IR's
//! abstract `Loc`/`SpillSlot` locations into a concrete AArch64 frame and
//! producing Mach-IR.

mod callee_saves;
mod layout;
mod lower;
pub(crate) mod parallel_move;

pub use lower::lower;
