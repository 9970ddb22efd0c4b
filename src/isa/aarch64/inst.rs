//! AArch64 instruction records: the fifth and final IR layer. Each variant is one emittable instruction; no further lowering
//! happens past this point, only textual formatting (`isa::aarch64::printer`).

use crate::ir::amode::AddrMode;
use crate::ir::entities::Label;
use crate::ir::mreg::MReg;
use crate::ir::types::Chunk;

/// An ALU operation, width baked into the variant the way AArch64's own
/// mnemonics split 32- and 64-bit forms (`ADD`/`ADDW`-style distinction
/// lives in the register names, not the opcode, but we track it here to
/// keep the printer a pure lookup).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AluOp {
    Add32,
    Add64,
    Sub32,
    Sub64,
    And32,
    And64,
    Orr32,
    Orr64,
    Eor32,
    Eor64,
    Lsl32,
    Lsl64,
    Lsr32,
    Lsr64,
    Asr32,
    Asr64,
    Mul32,
    Mul64,
    SDiv32,
    SDiv64,
    UDiv32,
    UDiv64,
    /// Multiply-subtract: `dst = src1 - src2 * src3` — used to finish the
    /// modulo expansion.
    MSub32,
    MSub64,
}

/// A one-operand FPU operation.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FpuOp1 {
    Neg32,
    Neg64,
    Abs32,
    Abs64,
}

/// A two-operand FPU operation.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FpuOp2 {
    Add32,
    Add64,
    Sub32,
    Sub64,
    Mul32,
    Mul64,
    Div32,
    Div64,
}

/// Integer<->float conversions (`SCVTF`/`UCVTF`/`FCVTZS`/`FCVTZU`/`FCVT`).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FpuCvtOp {
    IntOfDouble,
    DoubleOfInt,
    IntUOfDouble,
    DoubleOfIntU,
    LongOfDouble,
    DoubleOfLong,
    LongOfSingle,
    SingleOfLong,
    DoubleOfSingle,
    SingleOfDouble,
    IntOfSingle,
    SingleOfInt,
}

/// Sign/zero-extension ops that aren't a plain register move.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ExtendOp {
    Sxtb,
    Uxtb,
    Sxth,
    Uxth,
    Sxtw,
}

/// A condition-code suffix, differentiating signed (`LT/LE/GT/GE`) from
/// unsigned (`CC/LS/HI/CS`).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Cc,
    Ls,
    Hi,
    Cs,
}

/// A call/tail-call target: a direct symbol (`BL`/`B`) or a register
/// (`BLR`/`BR`).
#[derive(Clone, PartialEq, Debug)]
pub enum Target {
    Symbol(String),
    Reg(MReg),
}

/// One AArch64 instruction. Flat and exhaustive: `isa::aarch64::asmgen`
/// produces a `Vec<Inst>` per function, and `isa::aarch64::printer` formats
/// each variant independently with no further analysis.
#[derive(Clone, PartialEq, Debug)]
pub enum Inst {
    LabelDef(Label),
    /// Plain integer register move (also used for the zero-cost unsigned
    /// 32->64 widen, which is just a 32-bit `MOV`).
    MovRR { is64: bool, dst: MReg, src: MReg },
    FmovRR { is64: bool, dst: MReg, src: MReg },
    /// `MOVZ dst, #imm, LSL #(16*shift)`.
    Movz { is64: bool, dst: MReg, imm: u16, shift: u8 },
    /// `MOVK dst, #imm, LSL #(16*shift)`.
    Movk { is64: bool, dst: MReg, imm: u16, shift: u8 },
    /// `MOVN dst, #imm, LSL #(16*shift)`.
    Movn { is64: bool, dst: MReg, imm: u16, shift: u8 },
    AluRRR { op: AluOp, dst: MReg, src1: MReg, src2: MReg },
    AluRRImm { op: AluOp, dst: MReg, src: MReg, imm: i64 },
    AluRRShiftImm { op: AluOp, dst: MReg, src: MReg, imm: u8 },
    /// Three-register multiply-subtract (`dst = src1 - src2 * src3`),
    /// folding the modulo expansion's final `MUL`+`SUB` into one
    /// instruction.
    MSubRRR { op: AluOp, dst: MReg, src1: MReg, src2: MReg, src3: MReg },
    Neg { is64: bool, dst: MReg, src: MReg },
    Mvn { is64: bool, dst: MReg, src: MReg },
    Extend { op: ExtendOp, dst: MReg, src: MReg },
    Cmp { is64: bool, src1: MReg, src2: MReg },
    CmpImm { is64: bool, src: MReg, imm: i64 },
    Fcmp { is64: bool, src1: MReg, src2: MReg },
    Cset { dst: MReg, cond: Cond },
    FpuRR { op: FpuOp1, dst: MReg, src: MReg },
    FpuRRR { op: FpuOp2, dst: MReg, src1: MReg, src2: MReg },
    FpuCvt { op: FpuCvtOp, dst: MReg, src: MReg },
    Ldr { chunk: Chunk, dst: MReg, addr: AddrMode<MReg> },
    Str { chunk: Chunk, src: MReg, addr: AddrMode<MReg> },
    Bl(String),
    Blr(MReg),
    B(Label),
    /// Unconditional branch to an external symbol with no link — the
    /// direct-tail-call form, distinct from `Bl` precisely because a tail call must
    /// not clobber `LR` with a return address into this function.
    Bsym(String),
    Br(MReg),
    Bcond { cond: Cond, target: Label },
    Ret,
}
