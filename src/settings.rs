//! Compilation flags, threaded explicitly through the
//! pipeline rather than read from globals or environment variables — an
//! immutable `Flags` built from a mutable `FlagsBuilder`, covering the
//! handful of choices the lowering leaves open to the caller.

use core::fmt;

/// How `Mjumptable` lowers to AArch64.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum JumptableStrategy {
    /// A linear chain of `CMPi + Bcond{EQ}`, one per target — what the
    /// source does, noted there as "simplified".
    #[default]
    Linear,
    /// A real `ADR`/`LDR`/`BR` dispatch table. Not yet implemented by
    /// `isa::aarch64::asmgen`; selecting it is accepted but currently
    /// lowers identically to `Linear` (see DESIGN.md).
    Table,
}

impl fmt::Display for JumptableStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JumptableStrategy::Linear => f.write_str("linear"),
            JumptableStrategy::Table => f.write_str("table"),
        }
    }
}

/// Immutable set of compilation choices, constructed once via
/// [`FlagsBuilder`] and shared (by value — it is small and `Copy`-ish, but
/// kept `Clone` rather than `Copy` so adding a non-`Copy` field later isn't
/// a breaking change) across every function a [`crate::pipeline`] call
/// compiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flags {
    jumptable_strategy: JumptableStrategy,
    negate_for_fallthrough: bool,
    emit_frame_pointer: bool,
}

impl Flags {
    /// Start building a `Flags` value from the defaults documented on each
    /// `FlagsBuilder` setter.
    pub fn builder() -> FlagsBuilder {
        FlagsBuilder::default()
    }

    pub fn jumptable_strategy(&self) -> JumptableStrategy {
        self.jumptable_strategy
    }

    pub fn negate_for_fallthrough(&self) -> bool {
        self.negate_for_fallthrough
    }

    pub fn emit_frame_pointer(&self) -> bool {
        self.emit_frame_pointer
    }
}

impl Default for Flags {
    fn default() -> Self {
        FlagsBuilder::default().finish()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "jumptable_strategy={} negate_for_fallthrough={} emit_frame_pointer={}",
            self.jumptable_strategy, self.negate_for_fallthrough, self.emit_frame_pointer
        )
    }
}

/// Builder for [`Flags`]. Each setter documents the default `finish()`
/// uses if it is never called.
#[derive(Clone, Debug)]
pub struct FlagsBuilder {
    jumptable_strategy: JumptableStrategy,
    negate_for_fallthrough: bool,
    emit_frame_pointer: bool,
}

impl Default for FlagsBuilder {
    fn default() -> Self {
        FlagsBuilder {
            jumptable_strategy: JumptableStrategy::Linear,
            negate_for_fallthrough: false,
            emit_frame_pointer: true,
        }
    }
}

impl FlagsBuilder {
    /// Default: [`JumptableStrategy::Linear`].
    pub fn set_jumptable_strategy(mut self, strategy: JumptableStrategy) -> Self {
        self.jumptable_strategy = strategy;
        self
    }

    /// Default: `false`. Spec.md §4.2.3: "A future refinement may negate
    /// the condition to fall through the true side; implementations MAY
    /// do so but MUST preserve semantics."
    pub fn set_negate_for_fallthrough(mut self, value: bool) -> Self {
        self.negate_for_fallthrough = value;
        self
    }

    /// Default: `true`. Spec.md's scenario 1 allows (but does not
    /// require) omitting the FP/LR save for a leaf function with no
    /// callee-saves and no stack usage; setting this to `false` opts into
    /// that omission. `stacking::layout` always reserves the 16-byte
    /// FP/LR pair in `TotalSize` regardless of this flag — it governs
    /// only whether `isa::aarch64::asmgen`'s prologue/epilogue template
    /// is emitted for an otherwise-empty frame, not the frame's size
    /// accounting.
    pub fn set_emit_frame_pointer(mut self, value: bool) -> Self {
        self.emit_frame_pointer = value;
        self
    }

    pub fn finish(self) -> Flags {
        Flags {
            jumptable_strategy: self.jumptable_strategy,
            negate_for_fallthrough: self.negate_for_fallthrough,
            emit_frame_pointer: self.emit_frame_pointer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_md_open_question_resolutions() {
        let flags = Flags::default();
        assert_eq!(flags.jumptable_strategy(), JumptableStrategy::Linear);
        assert!(!flags.negate_for_fallthrough());
        assert!(flags.emit_frame_pointer());
    }

    #[test]
    fn builder_overrides_apply() {
        let flags = Flags::builder()
            .set_jumptable_strategy(JumptableStrategy::Table)
            .set_negate_for_fallthrough(true)
            .finish();
        assert_eq!(flags.jumptable_strategy(), JumptableStrategy::Table);
        assert!(flags.negate_for_fallthrough());
    }
}
