//! Textual AArch64 assembly emission: formats an
//! `AsmProgram` the way a GNU-as-compatible backend would, with labels
//! rendered `.L<integer>` and global/function symbols emitted as literal
//! names.

use core::fmt;
use core::fmt::Write as _;

use crate::ir::amode::AddrMode;
use crate::ir::mreg::MReg;

use super::asmgen::{AsmFunction, AsmProgram};
use super::inst::{AluOp, Cond, ExtendOp, FpuCvtOp, FpuOp1, FpuOp2, Inst};

fn greg(r: MReg, is64: bool) -> String {
    match r {
        MReg::Sp => "sp".to_string(),
        MReg::X(n) if is64 => format!("x{n}"),
        MReg::X(n) => format!("w{n}"),
        MReg::D(_) => unreachable!("integer mnemonic applied to a float register"),
    }
}

fn freg(r: MReg, is64: bool) -> String {
    match r {
        MReg::D(n) if is64 => format!("d{n}"),
        MReg::D(n) => format!("s{n}"),
        _ => unreachable!("float mnemonic applied to an integer register"),
    }
}

fn cond_suffix(c: Cond) -> &'static str {
    match c {
        Cond::Eq => "eq",
        Cond::Ne => "ne",
        Cond::Lt => "lt",
        Cond::Le => "le",
        Cond::Gt => "gt",
        Cond::Ge => "ge",
        Cond::Cc => "cc",
        Cond::Ls => "ls",
        Cond::Hi => "hi",
        Cond::Cs => "cs",
    }
}

fn alu_mnemonic(op: AluOp) -> (&'static str, bool) {
    use AluOp::*;
    match op {
        Add32 => ("add", false),
        Add64 => ("add", true),
        Sub32 => ("sub", false),
        Sub64 => ("sub", true),
        And32 => ("and", false),
        And64 => ("and", true),
        Orr32 => ("orr", false),
        Orr64 => ("orr", true),
        Eor32 => ("eor", false),
        Eor64 => ("eor", true),
        Lsl32 => ("lsl", false),
        Lsl64 => ("lsl", true),
        Lsr32 => ("lsr", false),
        Lsr64 => ("lsr", true),
        Asr32 => ("asr", false),
        Asr64 => ("asr", true),
        Mul32 => ("mul", false),
        Mul64 => ("mul", true),
        SDiv32 => ("sdiv", false),
        SDiv64 => ("sdiv", true),
        UDiv32 => ("udiv", false),
        UDiv64 => ("udiv", true),
        MSub32 => ("msub", false),
        MSub64 => ("msub", true),
    }
}

fn fpu1_mnemonic(op: FpuOp1) -> (&'static str, bool) {
    match op {
        FpuOp1::Neg32 => ("fneg", false),
        FpuOp1::Neg64 => ("fneg", true),
        FpuOp1::Abs32 => ("fabs", false),
        FpuOp1::Abs64 => ("fabs", true),
    }
}

fn fpu2_mnemonic(op: FpuOp2) -> (&'static str, bool) {
    match op {
        FpuOp2::Add32 => ("fadd", false),
        FpuOp2::Add64 => ("fadd", true),
        FpuOp2::Sub32 => ("fsub", false),
        FpuOp2::Sub64 => ("fsub", true),
        FpuOp2::Mul32 => ("fmul", false),
        FpuOp2::Mul64 => ("fmul", true),
        FpuOp2::Div32 => ("fdiv", false),
        FpuOp2::Div64 => ("fdiv", true),
    }
}

fn extend_mnemonic(op: ExtendOp) -> &'static str {
    match op {
        ExtendOp::Sxtb => "sxtb",
        ExtendOp::Uxtb => "uxtb",
        ExtendOp::Sxth => "sxth",
        ExtendOp::Uxth => "uxth",
        ExtendOp::Sxtw => "sxtw",
    }
}

fn cvt_mnemonic(op: FpuCvtOp) -> &'static str {
    use FpuCvtOp::*;
    match op {
        IntOfDouble | IntOfSingle => "fcvtzs",
        IntUOfDouble => "fcvtzu",
        LongOfDouble | LongOfSingle => "fcvtzs",
        DoubleOfInt | DoubleOfLong => "scvtf",
        DoubleOfIntU => "ucvtf",
        SingleOfLong | SingleOfInt => "scvtf",
        DoubleOfSingle | SingleOfDouble => "fcvt",
    }
}

fn fmt_addr(addr: &AddrMode<MReg>) -> String {
    match addr {
        AddrMode::Aindexed { base, offset } => format!("[{}, #{offset}]", greg(*base, true)),
        AddrMode::Aindexed2 { base, index } => format!("[{}, {}]", greg(*base, true), greg(*index, true)),
        AddrMode::Aindexed2shift { base, index, shift } => {
            format!("[{}, {}, lsl #{shift}]", greg(*base, true), greg(*index, true))
        }
        AddrMode::Aglobal { symbol, offset } if *offset == 0 => format!("{symbol}"),
        AddrMode::Aglobal { symbol, offset } => format!("{symbol}+{offset}"),
        AddrMode::Ainstack { offset } => format!("[{}, #{offset}]", greg(MReg::FP, true)),
        AddrMode::Aoutgoing { offset } => format!("[{}, #{offset}]", greg(MReg::Sp, true)),
    }
}

fn fmt_inst(i: &Inst, out: &mut String) {
    match i {
        Inst::LabelDef(l) => {
            writeln!(out, ".{l}:").unwrap();
            return;
        }
        Inst::MovRR { is64, dst, src } => writeln!(out, "  mov {}, {}", greg(*dst, *is64), greg(*src, *is64)).unwrap(),
        Inst::FmovRR { is64, dst, src } => writeln!(out, "  fmov {}, {}", freg(*dst, *is64), freg(*src, *is64)).unwrap(),
        Inst::Movz { is64, dst, imm, shift } => {
            writeln!(out, "  movz {}, #{imm}, lsl #{}", greg(*dst, *is64), shift * 16).unwrap()
        }
        Inst::Movk { is64, dst, imm, shift } => {
            writeln!(out, "  movk {}, #{imm}, lsl #{}", greg(*dst, *is64), shift * 16).unwrap()
        }
        Inst::Movn { is64, dst, imm, shift } => {
            writeln!(out, "  movn {}, #{imm}, lsl #{}", greg(*dst, *is64), shift * 16).unwrap()
        }
        Inst::AluRRR { op, dst, src1, src2 } => {
            let (mn, is64) = alu_mnemonic(*op);
            writeln!(out, "  {mn} {}, {}, {}", greg(*dst, is64), greg(*src1, is64), greg(*src2, is64)).unwrap();
        }
        Inst::AluRRImm { op, dst, src, imm } => {
            let (mn, is64) = alu_mnemonic(*op);
            writeln!(out, "  {mn} {}, {}, #{imm}", greg(*dst, is64), greg(*src, is64)).unwrap();
        }
        Inst::AluRRShiftImm { op, dst, src, imm } => {
            let (mn, is64) = alu_mnemonic(*op);
            writeln!(out, "  {mn} {}, {}, #{imm}", greg(*dst, is64), greg(*src, is64)).unwrap();
        }
        Inst::MSubRRR { op, dst, src1, src2, src3 } => {
            let (mn, is64) = alu_mnemonic(*op);
            writeln!(
                out,
                "  {mn} {}, {}, {}, {}",
                greg(*dst, is64),
                greg(*src1, is64),
                greg(*src2, is64),
                greg(*src3, is64)
            )
            .unwrap();
        }
        Inst::Neg { is64, dst, src } => writeln!(out, "  neg {}, {}", greg(*dst, *is64), greg(*src, *is64)).unwrap(),
        Inst::Mvn { is64, dst, src } => writeln!(out, "  mvn {}, {}", greg(*dst, *is64), greg(*src, *is64)).unwrap(),
        Inst::Extend { op, dst, src } => {
            writeln!(out, "  {} {}, {}", extend_mnemonic(*op), greg(*dst, true), greg(*src, false)).unwrap();
        }
        Inst::Cmp { is64, src1, src2 } => writeln!(out, "  cmp {}, {}", greg(*src1, *is64), greg(*src2, *is64)).unwrap(),
        Inst::CmpImm { is64, src, imm } => writeln!(out, "  cmp {}, #{imm}", greg(*src, *is64)).unwrap(),
        Inst::Fcmp { is64, src1, src2 } => writeln!(out, "  fcmp {}, {}", freg(*src1, *is64), freg(*src2, *is64)).unwrap(),
        Inst::Cset { dst, cond } => writeln!(out, "  cset {}, {}", greg(*dst, false), cond_suffix(*cond)).unwrap(),
        Inst::FpuRR { op, dst, src } => {
            let (mn, is64) = fpu1_mnemonic(*op);
            writeln!(out, "  {mn} {}, {}", freg(*dst, is64), freg(*src, is64)).unwrap();
        }
        Inst::FpuRRR { op, dst, src1, src2 } => {
            let (mn, is64) = fpu2_mnemonic(*op);
            writeln!(out, "  {mn} {}, {}, {}", freg(*dst, is64), freg(*src1, is64), freg(*src2, is64)).unwrap();
        }
        Inst::FpuCvt { op, dst, src } => {
            let mn = cvt_mnemonic(*op);
            let dst_is_int = matches!(
                op,
                FpuCvtOp::IntOfDouble
                    | FpuCvtOp::IntUOfDouble
                    | FpuCvtOp::IntOfSingle
                    | FpuCvtOp::LongOfDouble
                    | FpuCvtOp::LongOfSingle
            );
            let src_is_int = matches!(op, FpuCvtOp::DoubleOfInt | FpuCvtOp::DoubleOfIntU | FpuCvtOp::SingleOfLong | FpuCvtOp::SingleOfInt);
            let dst_wide = matches!(op, FpuCvtOp::LongOfDouble | FpuCvtOp::LongOfSingle | FpuCvtOp::DoubleOfInt | FpuCvtOp::DoubleOfLong | FpuCvtOp::DoubleOfIntU | FpuCvtOp::DoubleOfSingle);
            let src_wide = matches!(op, FpuCvtOp::IntOfDouble | FpuCvtOp::IntUOfDouble | FpuCvtOp::DoubleOfLong | FpuCvtOp::SingleOfLong | FpuCvtOp::DoubleOfSingle);
            let dst_s = if dst_is_int { greg(*dst, dst_wide) } else { freg(*dst, dst_wide) };
            let src_s = if src_is_int { greg(*src, src_wide) } else { freg(*src, src_wide) };
            writeln!(out, "  {mn} {dst_s}, {src_s}").unwrap();
        }
        Inst::Ldr { chunk, dst, addr } => {
            let mn = ldr_mnemonic(*chunk);
            let dst_s = if chunk.is_float() { freg(*dst, chunk.bytes() == 8) } else { greg(*dst, chunk.bytes() == 8) };
            writeln!(out, "  {mn} {dst_s}, {}", fmt_addr(addr)).unwrap();
        }
        Inst::Str { chunk, src, addr } => {
            let mn = str_mnemonic(*chunk);
            let src_s = if chunk.is_float() { freg(*src, chunk.bytes() == 8) } else { greg(*src, chunk.bytes() == 8) };
            writeln!(out, "  {mn} {src_s}, {}", fmt_addr(addr)).unwrap();
        }
        Inst::Bl(name) => writeln!(out, "  bl {name}").unwrap(),
        Inst::Blr(r) => writeln!(out, "  blr {}", greg(*r, true)).unwrap(),
        Inst::B(l) => writeln!(out, "  b .{l}").unwrap(),
        Inst::Bsym(name) => writeln!(out, "  b {name}").unwrap(),
        Inst::Br(r) => writeln!(out, "  br {}", greg(*r, true)).unwrap(),
        Inst::Bcond { cond, target } => writeln!(out, "  b.{} .{target}", cond_suffix(*cond)).unwrap(),
        Inst::Ret => writeln!(out, "  ret").unwrap(),
    }
}

fn ldr_mnemonic(chunk: crate::ir::types::Chunk) -> &'static str {
    use crate::ir::types::Chunk::*;
    match chunk {
        I8S => "ldrsb",
        I8U => "ldrb",
        I16S => "ldrsh",
        I16U => "ldrh",
        I32 | I64 => "ldr",
        F32 | F64 => "ldr",
    }
}

fn str_mnemonic(chunk: crate::ir::types::Chunk) -> &'static str {
    use crate::ir::types::Chunk::*;
    match chunk {
        I8S | I8U => "strb",
        I16S | I16U => "strh",
        I32 | I64 => "str",
        F32 | F64 => "str",
    }
}

pub fn print_function(func: &AsmFunction) -> String {
    let mut out = String::new();
    writeln!(out, "{}:", func.name).unwrap();
    for inst in &func.body {
        fmt_inst(inst, &mut out);
    }
    out
}

pub fn print_program(program: &AsmProgram) -> String {
    let mut out = String::new();
    for g in &program.globals {
        let section = if g.read_only { ".section .rodata" } else { ".data" };
        writeln!(out, "{section}").unwrap();
        writeln!(out, "  .align 3").unwrap();
        writeln!(out, "{}:", g.name).unwrap();
        match &g.init {
            Some(bytes) => {
                write!(out, "  .byte ").unwrap();
                let rendered = bytes.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(", ");
                writeln!(out, "{rendered}").unwrap();
            }
            None => writeln!(out, "  .zero {}", g.size).unwrap(),
        }
    }
    writeln!(out, ".text").unwrap();
    for f in &program.functions {
        out.push_str(&print_function(f));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::entities::Label;

    fn render(i: Inst) -> String {
        let mut out = String::new();
        fmt_inst(&i, &mut out);
        out
    }

    #[test]
    fn label_definition_uses_the_dotted_internal_form() {
        assert_eq!(render(Inst::LabelDef(Label::new(7))), ".L7:\n");
    }

    #[test]
    fn internal_branch_is_dotted_but_a_tail_call_symbol_is_not() {
        assert_eq!(render(Inst::B(Label::new(2))), "  b .L2\n");
        assert_eq!(render(Inst::Bsym("callee".to_string())), "  b callee\n");
        assert_ne!(render(Inst::B(Label::new(2))), render(Inst::Bsym("L2".to_string())));
    }

    #[test]
    fn call_and_tail_call_use_distinct_mnemonics() {
        assert_eq!(render(Inst::Bl("f".to_string())), "  bl f\n");
        assert_eq!(render(Inst::Bsym("f".to_string())), "  b f\n");
    }

    #[test]
    fn w_register_used_for_32_bit_alu_and_x_for_64_bit() {
        let add32 = render(Inst::AluRRR { op: AluOp::Add32, dst: MReg::X(0), src1: MReg::X(1), src2: MReg::X(2) });
        assert_eq!(add32, "  add w0, w1, w2\n");
        let add64 = render(Inst::AluRRR { op: AluOp::Add64, dst: MReg::X(0), src1: MReg::X(1), src2: MReg::X(2) });
        assert_eq!(add64, "  add x0, x1, x2\n");
    }

    #[test]
    fn movz_shift_is_rendered_in_bits_not_lane_index() {
        // shift=2 means the third 16-bit lane, i.e. a #32 shift amount.
        assert_eq!(
            render(Inst::Movz { is64: true, dst: MReg::X(3), imm: 5, shift: 2 }),
            "  movz x3, #5, lsl #32\n"
        );
    }

    #[test]
    fn print_function_emits_the_function_label_followed_by_its_body() {
        let f = AsmFunction { name: "f".to_string(), body: vec![Inst::Ret] };
        assert_eq!(print_function(&f), "f:\n  ret\n");
    }
}

impl fmt::Display for AsmFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_function(self))
    }
}

impl fmt::Display for AsmProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_program(self))
    }
}
