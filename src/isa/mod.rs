//! Target backends. Only one ISA is implemented.

pub mod aarch64;
