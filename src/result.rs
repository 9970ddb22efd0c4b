//! Structured errors, using `thiserror` rather
//! than a bespoke `enum` with hand-written `Display`.
//!
//! Out-of-range immediates are deliberately not a `CodegenError` variant:
//! `isa::aarch64::asmgen` always has a materialization fallback (load into
//! a scratch register) for any operand an instruction's immediate field
//! can't encode directly, so that case is never fatal.

use thiserror::Error;

/// Everything that can go wrong while lowering a function through this
/// backend's pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    /// The input CFG-IR violated an invariant this backend assumes holds
    /// (e.g. a node named as a successor that does not exist, or an
    /// operand count that doesn't match its opcode's arity). Front-ends are
    /// expected never to trigger this; it exists to turn a would-be panic
    /// deep in some pass into a diagnosable error at the boundary.
    #[error("malformed IR in `{function}` at {node}: {detail}")]
    MalformedIr {
        function: String,
        node: String,
        detail: String,
    },
    /// An operand this backend cannot represent at all arrived at a stage
    /// that has no fallback for it (distinct from "needs a wider
    /// encoding," which is always handled; see the module doc comment).
    #[error("unsupported operand in `{function}`: {detail}")]
    UnsupportedOperand { function: String, detail: String },
    /// Both reserved scratch registers were needed at once by a single lowering step. This
    /// should be unreachable by construction — each scratch register has
    /// exactly one role — but lowering code that discovers it needs a
    /// third simultaneous scratch reports it this way rather than
    /// silently clobbering a live value.
    #[error("scratch register exhaustion in `{function}`: {detail}")]
    ScratchExhaustion { function: String, detail: String },
}

pub type CodegenResult<T> = Result<T, CodegenError>;
