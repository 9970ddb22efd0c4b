//! Located-IR: the second IR layer.
//! Every original CFG-IR `Node` keeps its identity, and every `PReg`
//! operand has been replaced by a `Loc`: either a machine register color or
//! a spill slot. Call sites additionally grow a handful of fresh `Node`s
//! (not present in the CFG-IR source) to hold the argument/result staging
//! moves the calling convention requires — see `regalloc::apply`, which
//! produces this layer.

pub mod function;
pub mod loc;

pub use function::LFunction;
pub use loc::{Loc, SpillSlot};
