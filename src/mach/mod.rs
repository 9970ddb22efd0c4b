//! Mach-IR: the fourth IR layer. Produced from Linear-IR
//! by `stacking::lower`, which commits the abstract `Loc`/`SpillSlot` world
//! to concrete FP-relative offsets and injects the prologue/epilogue and
//! parameter home-location copies.

pub mod function;
pub mod printer;

pub use function::{FrameLayout, MInstr, MachFunction};
