//! Whole-program driver:
//! runs every function in a [`Program`] through the same five stages
//! [`crate::context::Context::compile_function`] runs for one function,
//! then collects the results into an [`AsmProgram`] alongside the
//! program's globals.
//!
//! Each function's pipeline state (CFG, liveness sets, interference
//! graph, worklists, frame layout) is fully owned by the call that
//! compiles it and never shared with any other function's call, so
//! functions may be compiled in any order, including concurrently. With
//! the `parallel` feature enabled, [`compile_program`] does exactly that
//! across a rayon thread pool; with it disabled (or on a target without
//! `std`), it falls back to a plain serial loop. Both paths produce
//! identical output: each function's pipeline state is fully owned by the
//! compiling thread, so fan-out order never leaks into the result.

use crate::ir::globals::Program;
use crate::ir::instr::Function;
use crate::isa::aarch64::asmgen::{self, AsmFunction, AsmProgram};
use crate::linear::{linearize, tunnel};
use crate::regalloc::apply;
use crate::result::CodegenResult;
use crate::settings::Flags;
use crate::stacking::lower;

/// Run one function through regalloc, linearization, tunnelling/dead-label
/// cleanup, stacking, and AsmGen, returning its finished instruction
/// stream. This is the free-function equivalent of
/// [`crate::context::Context::compile_function`], for callers that don't
/// need a reusable [`crate::context::Context`] (e.g. the parallel path
/// below, where each rayon worker compiles independently).
pub fn compile_function(func: &Function, flags: &Flags) -> CodegenResult<AsmFunction> {
    let located = apply::apply(func)?;
    let mut linear = linearize::linearize(&located, flags);
    tunnel::tunnel(&mut linear);
    tunnel::remove_dead_labels(&mut linear);
    let mach = lower::lower(&linear)?;
    asmgen::gen_function(&mach, flags)
}

/// Compile every function in `program`, in declaration order for the
/// output even when compiled out of order internally, and pair the
/// result with `program`'s globals.
///
/// The first function that fails aborts the whole call: there is no
/// partial/best-effort program result.
#[cfg(feature = "parallel")]
pub fn compile_program(program: &Program, flags: &Flags) -> CodegenResult<AsmProgram> {
    use rayon::prelude::*;

    let functions = program
        .functions
        .par_iter()
        .map(|f| compile_function(f, flags))
        .collect::<CodegenResult<Vec<AsmFunction>>>()?;

    Ok(AsmProgram { globals: program.globals.clone(), functions })
}

/// Serial fallback used when the `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
pub fn compile_program(program: &Program, flags: &Flags) -> CodegenResult<AsmProgram> {
    let mut functions = Vec::with_capacity(program.functions.len());
    for f in &program.functions {
        functions.push(compile_function(f, flags)?);
    }
    Ok(AsmProgram { globals: program.globals.clone(), functions })
}
