//! Compilation context and per-function pipeline driver.
//!
//! When compiling many functions back to back, it is wasteful to
//! reallocate every intermediate IR layer's backing storage for each one.
//! `Context` holds the configuration and the most recent result between
//! calls, reusing their backing storage across a sequence of
//! `compile_function` calls on one compilation thread.

use crate::ir::instr::Function;
use crate::isa::aarch64::asmgen::{self, AsmFunction};
use crate::linear::{linearize, tunnel};
use crate::regalloc::apply;
use crate::result::CodegenResult;
use crate::settings::Flags;
use crate::stacking::lower;

/// Persistent per-thread compilation state: the flags every stage reads
/// and the most recently compiled function's result, reused as scratch
/// space across `compile_function` calls on the same `Context`.
pub struct Context {
    flags: Flags,

    /// Result of the last successful `compile_function` call, if any.
    pub asm: Option<AsmFunction>,

    /// Whether to retain a textual disassembly of `asm` alongside it.
    pub want_disasm: bool,
    disasm: String,
}

impl Context {
    /// Allocate a new compilation context using the default `Flags`.
    ///
    /// The returned instance should be reused for compiling multiple
    /// functions in order to avoid needless allocator thrashing.
    pub fn new() -> Self {
        Self::with_flags(Flags::default())
    }

    /// Allocate a new compilation context with an explicit `Flags` value.
    pub fn with_flags(flags: Flags) -> Self {
        Context {
            flags,
            asm: None,
            want_disasm: false,
            disasm: String::new(),
        }
    }

    /// Clear the last compilation's result, keeping the allocation behind
    /// `disasm` around for the next call.
    pub fn clear(&mut self) {
        self.asm = None;
        self.disasm.clear();
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn set_want_disasm(&mut self, val: bool) {
        self.want_disasm = val;
    }

    /// The disassembly captured by the most recent `compile_function`
    /// call, if `want_disasm` was set at the time.
    pub fn disasm(&self) -> &str {
        &self.disasm
    }

    /// Run `func` through every stage of the backend, storing the result in `self.asm`
    /// and returning a reference to it.
    pub fn compile_function(&mut self, func: &Function) -> CodegenResult<&AsmFunction> {
        log::debug!("context: compiling `{}`", func.name);

        let located = apply::apply(func)?;
        let mut linear = linearize::linearize(&located, &self.flags);
        tunnel::tunnel(&mut linear);
        tunnel::remove_dead_labels(&mut linear);
        let mach = lower::lower(&linear)?;
        let asm = asmgen::gen_function(&mach, &self.flags)?;

        self.disasm.clear();
        if self.want_disasm {
            use core::fmt::Write as _;
            write!(self.disasm, "{}", crate::isa::aarch64::printer::print_function(&asm))
                .expect("writing to a String cannot fail");
        }

        self.asm = Some(asm);
        Ok(self.asm.as_ref().expect("just assigned"))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
