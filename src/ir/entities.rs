//! Opaque entity references shared by every IR layer.
//!
//! Every index into a function's data is a distinct newtype wrapping a
//! `u32`, so the type checker keeps a pseudo-register from being used where
//! a CFG node or a label is expected.

use cranelift_entity::entity_impl;

/// A node in the CFG-IR control-flow graph: a single instruction plus its
/// successor edges.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(u32);
entity_impl!(Node, "n");

/// A pseudo-register: an unbounded-supply virtual register prior to
/// allocation. Typed implicitly by its producing operation.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PReg(u32);
entity_impl!(PReg, "r");

/// A label in Linear-IR / Mach-IR, assigned by the linearizer.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);
entity_impl!(Label, "L");
