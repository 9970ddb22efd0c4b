//! Register allocation: the second pipeline stage, turning
//! a CFG-IR `Function` over unbounded pseudo-registers into a Located-IR
//! `LFunction` whose every operand is either a machine register or a spill
//! slot.
//!
//! `liveness` and `graph` build the dataflow facts; `irc` runs Iterated
//! Register Coalescing over them to pick colors; `apply` rewrites the
//! function's instructions with the result.

pub mod apply;
pub mod graph;
pub mod irc;
pub mod liveness;

pub use apply::apply;
pub use graph::RegGraph;
pub use irc::{allocate, ColoringResult};
pub use liveness::{analyze as analyze_liveness, live_across_calls, Liveness};
