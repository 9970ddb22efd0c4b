//! Addressing modes for `Iload`/`Istore`-family instructions.
//!
//! Generic over the operand representation `R`, which changes from layer to
//! layer: a pseudo-register (`PReg`) in CFG-IR, a `Loc` in Located-IR /
//! Linear-IR, and a machine register (`MReg`) in Mach-IR.

use core::fmt;
use core::fmt::Display;

/// A memory address computed from some combination of a base register, an
/// index register, an immediate offset, a global symbol, or the stack
/// frame.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum AddrMode<R> {
    /// `base + offset`.
    Aindexed { base: R, offset: i64 },
    /// `base + index`.
    Aindexed2 { base: R, index: R },
    /// `base + (index << shift)`.
    Aindexed2shift { base: R, index: R, shift: u8 },
    /// A reference to a global symbol plus a constant byte offset.
    Aglobal { symbol: String, offset: i64 },
    /// A direct reference into the current function's stack frame, used
    /// when a front-end lowers access to an on-stack local straight into a
    /// load/store rather than routing it through a pseudo-register. Rebased
    /// against `FrameLayout::local_offset` by the stacking pass.
    Ainstack { offset: i64 },
    /// A reference into this call site's outgoing-argument stack area (the
    /// 9th-and-later argument of some call this function makes). Kept
    /// distinct from `Ainstack` because it is rebased against
    /// `FrameLayout::outgoing_offset` rather than `local_offset` — the two
    /// live in different sub-regions of the frame and nothing else about the address distinguishes
    /// them once they are just "a stack offset".
    Aoutgoing { offset: i64 },
}

impl<R> AddrMode<R> {
    /// Apply `f` to every register operand this address mode holds,
    /// producing the corresponding address mode over a different operand
    /// representation. Used by every IR-lowering stage to carry addressing
    /// modes across the pipeline (e.g. `PReg` → `Loc`, `Loc` → `MReg`).
    pub fn map<S>(self, mut f: impl FnMut(R) -> S) -> AddrMode<S> {
        match self {
            AddrMode::Aindexed { base, offset } => AddrMode::Aindexed { base: f(base), offset },
            AddrMode::Aindexed2 { base, index } => AddrMode::Aindexed2 {
                base: f(base),
                index: f(index),
            },
            AddrMode::Aindexed2shift { base, index, shift } => AddrMode::Aindexed2shift {
                base: f(base),
                index: f(index),
                shift,
            },
            AddrMode::Aglobal { symbol, offset } => AddrMode::Aglobal { symbol, offset },
            AddrMode::Ainstack { offset } => AddrMode::Ainstack { offset },
            AddrMode::Aoutgoing { offset } => AddrMode::Aoutgoing { offset },
        }
    }

    /// Every register operand this address mode reads, in a stable order.
    pub fn registers(&self) -> Vec<&R> {
        match self {
            AddrMode::Aindexed { base, .. } => vec![base],
            AddrMode::Aindexed2 { base, index } => vec![base, index],
            AddrMode::Aindexed2shift { base, index, .. } => vec![base, index],
            AddrMode::Aglobal { .. } | AddrMode::Ainstack { .. } | AddrMode::Aoutgoing { .. } => vec![],
        }
    }
}

impl<R: Display> fmt::Display for AddrMode<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrMode::Aindexed { base, offset } => write!(f, "{base}+{offset}"),
            AddrMode::Aindexed2 { base, index } => write!(f, "{base}+{index}"),
            AddrMode::Aindexed2shift { base, index, shift } => {
                write!(f, "{base}+({index}<<{shift})")
            }
            AddrMode::Aglobal { symbol, offset } => write!(f, "{symbol}+{offset}"),
            AddrMode::Ainstack { offset } => write!(f, "stack+{offset}"),
            AddrMode::Aoutgoing { offset } => write!(f, "outgoing+{offset}"),
        }
    }
}
