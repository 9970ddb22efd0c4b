//! AArch64 target: the fifth pipeline stage, turning
//! Mach-IR into a flat, printable AArch64 instruction stream.

pub mod asmgen;
pub mod inst;
pub mod printer;

pub use asmgen::{gen_function, gen_program, AsmFunction, AsmProgram};
pub use inst::Inst;
pub use printer::{print_function, print_program};
