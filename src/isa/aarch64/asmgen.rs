//! Mach-IR -> Asm pattern match: the final lowering stage,
//! a pure dispatch from each `MInstr`/`Op` to a short sequence of
//! `Inst` records. No further analysis happens here — every decision this
//! stage makes is a local, context-free rewrite.

use crate::ir::cond::{Condition, ConditionCode};
use crate::ir::entities::Label;
use crate::ir::instr::CallTarget;
use crate::ir::mreg::MReg;
use crate::ir::op::Op;
use crate::ir::types::{Chunk, Ty};
use crate::mach::function::{FrameLayout, MInstr, MachFunction};
use crate::result::CodegenResult;
use crate::settings::{Flags, JumptableStrategy};

use super::inst::{AluOp, Cond, ExtendOp, FpuCvtOp, FpuOp1, FpuOp2, Inst, Target};

/// An assembled function: its name and an ordered, flat instruction
/// stream with the prologue/epilogue already spliced in.
#[derive(Clone, Debug)]
pub struct AsmFunction {
    pub name: String,
    pub body: Vec<Inst>,
}

/// An assembled program: globals plus every function's instruction
/// stream.
#[derive(Clone, Debug, Default)]
pub struct AsmProgram {
    pub globals: Vec<crate::ir::globals::GlobalDecl>,
    pub functions: Vec<AsmFunction>,
}

fn asm_cond(cc: ConditionCode) -> Cond {
    let unsigned = matches!(
        cc,
        ConditionCode::Ccompu(_)
            | ConditionCode::Ccompuimm(..)
            | ConditionCode::Ccomplu(_)
            | ConditionCode::Ccompluimm(..)
    );
    match (cc.condition(), unsigned) {
        (Condition::Eq, _) => Cond::Eq,
        (Condition::Ne, _) => Cond::Ne,
        (Condition::Lt, false) => Cond::Lt,
        (Condition::Lt, true) => Cond::Cc,
        (Condition::Le, false) => Cond::Le,
        (Condition::Le, true) => Cond::Ls,
        (Condition::Gt, false) => Cond::Gt,
        (Condition::Gt, true) => Cond::Hi,
        (Condition::Ge, false) => Cond::Ge,
        (Condition::Ge, true) => Cond::Cs,
    }
}

fn cc_is_64(cc: ConditionCode) -> bool {
    matches!(
        cc,
        ConditionCode::Ccompl(_)
            | ConditionCode::Ccomplu(_)
            | ConditionCode::Ccomplimm(..)
            | ConditionCode::Ccompluimm(..)
            | ConditionCode::Ccompf(_)
            | ConditionCode::Cnotcompf(_)
    )
}

/// Emit a `CMP`/`CMPi`/`FCMP` (flipping the negated-float forms ahead of
/// time so downstream only ever deals with a plain `Cond`) followed by the
/// args the comparison needs, returning the `Cond` a `CSET`/`Bcond` should
/// test.
fn emit_compare(out: &mut Vec<Inst>, cc: ConditionCode, args: &[MReg]) -> Cond {
    let is64 = cc_is_64(cc);
    let (cc, negate_result) = match cc {
        ConditionCode::Cnotcompf(c) => (ConditionCode::Ccompf(c), true),
        ConditionCode::Cnotcomps(c) => (ConditionCode::Ccomps(c), true),
        other => (other, false),
    };
    match cc {
        ConditionCode::Ccompf(_) | ConditionCode::Ccomps(_) => {
            out.push(Inst::Fcmp { is64, src1: args[0], src2: args[1] });
        }
        ConditionCode::Ccompimm(_, imm) => {
            out.push(Inst::CmpImm { is64, src: args[0], imm: i64::from(imm) });
        }
        ConditionCode::Ccompuimm(_, imm) => {
            out.push(Inst::CmpImm { is64, src: args[0], imm: i64::from(imm) });
        }
        ConditionCode::Ccomplimm(_, imm) => {
            out.push(Inst::CmpImm { is64, src: args[0], imm });
        }
        ConditionCode::Ccompluimm(_, imm) => {
            out.push(Inst::CmpImm { is64, src: args[0], imm: imm as i64 });
        }
        _ => {
            out.push(Inst::Cmp { is64, src1: args[0], src2: args[1] });
        }
    }
    let cond = asm_cond(cc);
    if negate_result {
        negate_cond(cond)
    } else {
        cond
    }
}

fn negate_cond(c: Cond) -> Cond {
    match c {
        Cond::Eq => Cond::Ne,
        Cond::Ne => Cond::Eq,
        Cond::Lt => Cond::Ge,
        Cond::Ge => Cond::Lt,
        Cond::Le => Cond::Gt,
        Cond::Gt => Cond::Le,
        Cond::Cc => Cond::Cs,
        Cond::Cs => Cond::Cc,
        Cond::Ls => Cond::Hi,
        Cond::Hi => Cond::Ls,
    }
}

/// Materialize an arbitrary 32- or 64-bit integer constant:
/// `MOVi`-equivalent (here just a single `MOVZ`) for `[0, 65535]`, `MOVN`
/// for `[-65536, -1]`, and a `MOVZ` + `MOVK*` sequence otherwise, skipping
/// `MOVK` for any all-zero 16-bit lane.
fn materialize_int(dst: MReg, value: i64, is64: bool) -> Vec<Inst> {
    if (0..=0xFFFF).contains(&value) {
        return vec![Inst::Movz { is64, dst, imm: value as u16, shift: 0 }];
    }
    if (-0x10000..0).contains(&value) {
        let imm = (!value) as u16;
        return vec![Inst::Movn { is64, dst, imm, shift: 0 }];
    }
    let bits = value as u64;
    let lanes = if is64 { 4 } else { 2 };
    let mut out = Vec::new();
    let mut first = true;
    for i in 0..lanes {
        let lane = ((bits >> (i * 16)) & 0xFFFF) as u16;
        if lane == 0 && !first {
            continue;
        }
        if first {
            out.push(Inst::Movz { is64, dst, imm: lane, shift: i as u8 });
            first = false;
        } else {
            out.push(Inst::Movk { is64, dst, imm: lane, shift: i as u8 });
        }
    }
    out
}

/// Lower one function's Mach-IR into a flat AArch64 instruction stream,
/// splicing in the fixed SP/FP/LR prologue and epilogue template around
/// the body the stacking pass already produced.
pub fn gen_function(func: &MachFunction, flags: &Flags) -> CodegenResult<AsmFunction> {
    log::debug!("asmgen: lowering `{}` ({} Mach-IR instructions)", func.name, func.body.len());
    let mut out = Vec::new();
    emit_prologue(&mut out, &func.frame, flags);
    for instr in &func.body {
        gen_instr(&mut out, instr, &func.frame, flags)?;
    }
    Ok(AsmFunction { name: func.name.clone(), body: out })
}

/// Whether this frame needs the FP/LR save pair and the `SP` adjustment at
/// all: a function with no callee-saves and no local/outgoing stack usage
/// has `frame_body == 0`, so nothing downstream reads the frame record
/// `Flags::emit_frame_pointer` governs whether such a function still gets
/// a conventional frame (the default, and the only legal choice once the
/// function is not actually a leaf) or omits it entirely.
fn needs_frame(frame: &FrameLayout, flags: &Flags) -> bool {
    flags.emit_frame_pointer() || frame.frame_body != 0
}

fn emit_prologue(out: &mut Vec<Inst>, frame: &FrameLayout, flags: &Flags) {
    if !needs_frame(frame, flags) {
        return;
    }
    out.push(Inst::AluRRImm { op: AluOp::Sub64, dst: MReg::Sp, src: MReg::Sp, imm: frame.total_size });
    out.push(Inst::Str {
        chunk: Chunk::I64,
        src: MReg::FP,
        addr: crate::ir::amode::AddrMode::Aindexed { base: MReg::Sp, offset: frame.frame_body },
    });
    out.push(Inst::Str {
        chunk: Chunk::I64,
        src: MReg::LR,
        addr: crate::ir::amode::AddrMode::Aindexed { base: MReg::Sp, offset: frame.frame_body + 8 },
    });
    out.push(Inst::AluRRImm { op: AluOp::Add64, dst: MReg::FP, src: MReg::Sp, imm: frame.frame_body });
}

fn emit_epilogue(out: &mut Vec<Inst>, frame: &FrameLayout, flags: &Flags) {
    if !needs_frame(frame, flags) {
        return;
    }
    out.push(Inst::Ldr {
        chunk: Chunk::I64,
        dst: MReg::LR,
        addr: crate::ir::amode::AddrMode::Aindexed { base: MReg::FP, offset: 8 },
    });
    out.push(Inst::Ldr {
        chunk: Chunk::I64,
        dst: MReg::FP,
        addr: crate::ir::amode::AddrMode::Aindexed { base: MReg::FP, offset: 0 },
    });
    out.push(Inst::AluRRImm { op: AluOp::Add64, dst: MReg::Sp, src: MReg::Sp, imm: frame.total_size });
}

fn gen_target(target: &CallTarget<MReg>) -> Target {
    match target {
        CallTarget::Direct(name) => Target::Symbol(name.clone()),
        CallTarget::Indirect(r) => Target::Reg(*r),
    }
}

fn gen_instr(out: &mut Vec<Inst>, instr: &MInstr, frame: &FrameLayout, flags: &Flags) -> CodegenResult<()> {
    match instr {
        MInstr::Mlabel(l) => out.push(Inst::LabelDef(*l)),
        MInstr::Mnop => {}
        MInstr::Mmove { ty, src, dst } => {
            if ty.is_float() {
                out.push(Inst::FmovRR { is64: ty.is_64(), dst: *dst, src: *src });
            } else {
                out.push(Inst::MovRR { is64: ty.is_64(), dst: *dst, src: *src });
            }
        }
        MInstr::Mop { op, args, dst } => gen_op(out, op, args, *dst)?,
        MInstr::Mload { chunk, addr, dst } => out.push(Inst::Ldr { chunk: *chunk, dst: *dst, addr: addr.clone() }),
        MInstr::Mstore { chunk, addr, src } => out.push(Inst::Str { chunk: *chunk, src: *src, addr: addr.clone() }),
        MInstr::Mcall { target, .. } => match gen_target(target) {
            Target::Symbol(name) => out.push(Inst::Bl(name)),
            Target::Reg(r) => out.push(Inst::Blr(r)),
        },
        MInstr::Mbuiltin { name, .. } => out.push(Inst::Bl(name.clone())),
        MInstr::Mgoto(l) => out.push(Inst::B(*l)),
        MInstr::Mcond { cond, args, ifso } => {
            let c = emit_compare(out, *cond, args);
            out.push(Inst::Bcond { cond: c, target: *ifso });
        }
        MInstr::Mjumptable { index, targets, default } => gen_jumptable(out, *index, targets, *default, flags),
        MInstr::Mtailcall { target, .. } => {
            emit_epilogue(out, frame, flags);
            // Unlike `Mcall`, a tail call must not set `LR`: control never
            // returns here, so `B`/`BR` (not `BL`/`BLR`) is the only
            // correct form.
            match gen_target(target) {
                Target::Symbol(name) => out.push(Inst::Bsym(name)),
                Target::Reg(r) => out.push(Inst::Br(r)),
            }
        }
        MInstr::Mreturn { .. } => {
            emit_epilogue(out, frame, flags);
            out.push(Inst::Ret);
        }
        MInstr::Mgetstack { offset, ty, dst } | MInstr::Mgetparam { offset, ty, dst } => {
            let chunk = chunk_for(*ty);
            out.push(Inst::Ldr { chunk, dst: *dst, addr: crate::ir::amode::AddrMode::Aindexed { base: MReg::FP, offset: *offset } });
        }
        MInstr::Msetstack { offset, ty, src } => {
            let chunk = chunk_for(*ty);
            out.push(Inst::Str { chunk, src: *src, addr: crate::ir::amode::AddrMode::Aindexed { base: MReg::FP, offset: *offset } });
        }
    }
    Ok(())
}

fn chunk_for(ty: Ty) -> Chunk {
    match ty {
        Ty::I32 | Ty::Any32 => Chunk::I32,
        Ty::I64 | Ty::Any64 => Chunk::I64,
        Ty::F32 => Chunk::F32,
        Ty::F64 => Chunk::F64,
    }
}

/// A jumptable is expanded as a chain of `CMPi + Bcond{EQ}`, one per
/// target, falling through to `default`. `Flags::jumptable_strategy`
/// selects the strategy; `JumptableStrategy::Table` is accepted but not
/// yet implemented by this emitter (see DESIGN.md) and currently lowers
/// identically to `Linear`, logged once per occurrence so a caller that
/// asked for it is not silently given something else.
fn gen_jumptable(out: &mut Vec<Inst>, index: MReg, targets: &[Label], default: Label, flags: &Flags) {
    if flags.jumptable_strategy() == JumptableStrategy::Table {
        log::debug!(
            "asmgen: JumptableStrategy::Table requested for a {}-entry table; \
             falling back to the linear CMPi/Bcond chain (see DESIGN.md)",
            targets.len()
        );
    }
    for (i, &target) in targets.iter().enumerate() {
        out.push(Inst::CmpImm { is64: false, src: index, imm: i as i64 });
        out.push(Inst::Bcond { cond: Cond::Eq, target });
    }
    out.push(Inst::B(default));
}

fn gen_op(out: &mut Vec<Inst>, op: &Op, args: &[MReg], dst: MReg) -> CodegenResult<()> {
    use Op::*;
    match op {
        Move => out.push(Inst::MovRR { is64: true, dst, src: args[0] }),

        IntConst(v) => out.extend(materialize_int(dst, i64::from(*v), false)),
        LongConst(v) => out.extend(materialize_int(dst, *v, true)),
        SingleConst(v) => {
            out.extend(materialize_int(MReg::SCRATCH_BODY[0], i64::from(v.to_bits()), false));
            out.push(Inst::FmovRR { is64: false, dst, src: MReg::SCRATCH_BODY[0] });
        }
        DoubleConst(v) => {
            out.extend(materialize_int(MReg::SCRATCH_BODY[0], v.to_bits() as i64, true));
            out.push(Inst::FmovRR { is64: true, dst, src: MReg::SCRATCH_BODY[0] });
        }

        Add => out.push(Inst::AluRRR { op: AluOp::Add32, dst, src1: args[0], src2: args[1] }),
        AddImm(i) => out.push(Inst::AluRRImm { op: AluOp::Add32, dst, src: args[0], imm: i64::from(*i) }),
        Sub => out.push(Inst::AluRRR { op: AluOp::Sub32, dst, src1: args[0], src2: args[1] }),
        RSubImm(i) => out.push(Inst::AluRRImm { op: AluOp::Sub32, dst, src: args[0], imm: i64::from(*i) }),
        Mul => out.push(Inst::AluRRR { op: AluOp::Mul32, dst, src1: args[0], src2: args[1] }),
        MulImm(i) => {
            materialize_into_scratch(out, i64::from(*i), false);
            out.push(Inst::AluRRR { op: AluOp::Mul32, dst, src1: args[0], src2: MReg::SCRATCH_BODY[0] });
        }
        Div => out.push(Inst::AluRRR { op: AluOp::SDiv32, dst, src1: args[0], src2: args[1] }),
        DivU => out.push(Inst::AluRRR { op: AluOp::UDiv32, dst, src1: args[0], src2: args[1] }),
        Mod => gen_mod(out, AluOp::SDiv32, AluOp::MSub32, args, dst),
        ModU => gen_mod(out, AluOp::UDiv32, AluOp::MSub32, args, dst),
        Neg => out.push(Inst::Neg { is64: false, dst, src: args[0] }),

        And => out.push(Inst::AluRRR { op: AluOp::And32, dst, src1: args[0], src2: args[1] }),
        AndImm(i) => out.push(Inst::AluRRImm { op: AluOp::And32, dst, src: args[0], imm: i64::from(*i) }),
        Or => out.push(Inst::AluRRR { op: AluOp::Orr32, dst, src1: args[0], src2: args[1] }),
        OrImm(i) => out.push(Inst::AluRRImm { op: AluOp::Orr32, dst, src: args[0], imm: i64::from(*i) }),
        Xor => out.push(Inst::AluRRR { op: AluOp::Eor32, dst, src1: args[0], src2: args[1] }),
        XorImm(i) => out.push(Inst::AluRRImm { op: AluOp::Eor32, dst, src: args[0], imm: i64::from(*i) }),
        Not => out.push(Inst::Mvn { is64: false, dst, src: args[0] }),

        Shl => out.push(Inst::AluRRR { op: AluOp::Lsl32, dst, src1: args[0], src2: args[1] }),
        ShlImm(s) => out.push(Inst::AluRRShiftImm { op: AluOp::Lsl32, dst, src: args[0], imm: *s }),
        Shr => out.push(Inst::AluRRR { op: AluOp::Asr32, dst, src1: args[0], src2: args[1] }),
        ShrImm(s) => out.push(Inst::AluRRShiftImm { op: AluOp::Asr32, dst, src: args[0], imm: *s }),
        ShrU => out.push(Inst::AluRRR { op: AluOp::Lsr32, dst, src1: args[0], src2: args[1] }),
        ShrUImm(s) => out.push(Inst::AluRRShiftImm { op: AluOp::Lsr32, dst, src: args[0], imm: *s }),

        AddL => out.push(Inst::AluRRR { op: AluOp::Add64, dst, src1: args[0], src2: args[1] }),
        AddLImm(i) => out.push(Inst::AluRRImm { op: AluOp::Add64, dst, src: args[0], imm: *i }),
        SubL => out.push(Inst::AluRRR { op: AluOp::Sub64, dst, src1: args[0], src2: args[1] }),
        RSubLImm(i) => out.push(Inst::AluRRImm { op: AluOp::Sub64, dst, src: args[0], imm: *i }),
        MulL => out.push(Inst::AluRRR { op: AluOp::Mul64, dst, src1: args[0], src2: args[1] }),
        MulLImm(i) => {
            materialize_into_scratch(out, *i, true);
            out.push(Inst::AluRRR { op: AluOp::Mul64, dst, src1: args[0], src2: MReg::SCRATCH_BODY[0] });
        }
        DivL => out.push(Inst::AluRRR { op: AluOp::SDiv64, dst, src1: args[0], src2: args[1] }),
        DivLU => out.push(Inst::AluRRR { op: AluOp::UDiv64, dst, src1: args[0], src2: args[1] }),
        ModL => gen_mod(out, AluOp::SDiv64, AluOp::MSub64, args, dst),
        ModLU => gen_mod(out, AluOp::UDiv64, AluOp::MSub64, args, dst),
        NegL => out.push(Inst::Neg { is64: true, dst, src: args[0] }),

        AndL => out.push(Inst::AluRRR { op: AluOp::And64, dst, src1: args[0], src2: args[1] }),
        AndLImm(i) => out.push(Inst::AluRRImm { op: AluOp::And64, dst, src: args[0], imm: *i }),
        OrL => out.push(Inst::AluRRR { op: AluOp::Orr64, dst, src1: args[0], src2: args[1] }),
        OrLImm(i) => out.push(Inst::AluRRImm { op: AluOp::Orr64, dst, src: args[0], imm: *i }),
        XorL => out.push(Inst::AluRRR { op: AluOp::Eor64, dst, src1: args[0], src2: args[1] }),
        XorLImm(i) => out.push(Inst::AluRRImm { op: AluOp::Eor64, dst, src: args[0], imm: *i }),
        NotL => out.push(Inst::Mvn { is64: true, dst, src: args[0] }),

        ShlL => out.push(Inst::AluRRR { op: AluOp::Lsl64, dst, src1: args[0], src2: args[1] }),
        ShlLImm(s) => out.push(Inst::AluRRShiftImm { op: AluOp::Lsl64, dst, src: args[0], imm: *s }),
        ShrL => out.push(Inst::AluRRR { op: AluOp::Asr64, dst, src1: args[0], src2: args[1] }),
        ShrLImm(s) => out.push(Inst::AluRRShiftImm { op: AluOp::Asr64, dst, src: args[0], imm: *s }),
        ShrLU => out.push(Inst::AluRRR { op: AluOp::Lsr64, dst, src1: args[0], src2: args[1] }),
        ShrLUImm(s) => out.push(Inst::AluRRShiftImm { op: AluOp::Lsr64, dst, src: args[0], imm: *s }),

        Cast8Signed => out.push(Inst::Extend { op: ExtendOp::Sxtb, dst, src: args[0] }),
        Cast8Unsigned => out.push(Inst::Extend { op: ExtendOp::Uxtb, dst, src: args[0] }),
        Cast16Signed => out.push(Inst::Extend { op: ExtendOp::Sxth, dst, src: args[0] }),
        Cast16Unsigned => out.push(Inst::Extend { op: ExtendOp::Uxth, dst, src: args[0] }),
        ZeroExtend32 => out.push(Inst::MovRR { is64: false, dst, src: args[0] }),
        SignExtend32 => out.push(Inst::Extend { op: ExtendOp::Sxtw, dst, src: args[0] }),

        AddD => out.push(Inst::FpuRRR { op: FpuOp2::Add64, dst, src1: args[0], src2: args[1] }),
        SubD => out.push(Inst::FpuRRR { op: FpuOp2::Sub64, dst, src1: args[0], src2: args[1] }),
        MulD => out.push(Inst::FpuRRR { op: FpuOp2::Mul64, dst, src1: args[0], src2: args[1] }),
        DivD => out.push(Inst::FpuRRR { op: FpuOp2::Div64, dst, src1: args[0], src2: args[1] }),
        NegD => out.push(Inst::FpuRR { op: FpuOp1::Neg64, dst, src: args[0] }),
        AbsD => out.push(Inst::FpuRR { op: FpuOp1::Abs64, dst, src: args[0] }),

        AddS => out.push(Inst::FpuRRR { op: FpuOp2::Add32, dst, src1: args[0], src2: args[1] }),
        SubS => out.push(Inst::FpuRRR { op: FpuOp2::Sub32, dst, src1: args[0], src2: args[1] }),
        MulS => out.push(Inst::FpuRRR { op: FpuOp2::Mul32, dst, src1: args[0], src2: args[1] }),
        DivS => out.push(Inst::FpuRRR { op: FpuOp2::Div32, dst, src1: args[0], src2: args[1] }),
        NegS => out.push(Inst::FpuRR { op: FpuOp1::Neg32, dst, src: args[0] }),
        AbsS => out.push(Inst::FpuRR { op: FpuOp1::Abs32, dst, src: args[0] }),

        IntOfDouble => out.push(Inst::FpuCvt { op: FpuCvtOp::IntOfDouble, dst, src: args[0] }),
        DoubleOfInt => out.push(Inst::FpuCvt { op: FpuCvtOp::DoubleOfInt, dst, src: args[0] }),
        IntUOfDouble => out.push(Inst::FpuCvt { op: FpuCvtOp::IntUOfDouble, dst, src: args[0] }),
        DoubleOfIntU => out.push(Inst::FpuCvt { op: FpuCvtOp::DoubleOfIntU, dst, src: args[0] }),
        LongOfDouble => out.push(Inst::FpuCvt { op: FpuCvtOp::LongOfDouble, dst, src: args[0] }),
        DoubleOfLong => out.push(Inst::FpuCvt { op: FpuCvtOp::DoubleOfLong, dst, src: args[0] }),
        LongOfSingle => out.push(Inst::FpuCvt { op: FpuCvtOp::LongOfSingle, dst, src: args[0] }),
        SingleOfLong => out.push(Inst::FpuCvt { op: FpuCvtOp::SingleOfLong, dst, src: args[0] }),
        DoubleOfSingle => out.push(Inst::FpuCvt { op: FpuCvtOp::DoubleOfSingle, dst, src: args[0] }),
        SingleOfDouble => out.push(Inst::FpuCvt { op: FpuCvtOp::SingleOfDouble, dst, src: args[0] }),
        IntOfSingle => out.push(Inst::FpuCvt { op: FpuCvtOp::IntOfSingle, dst, src: args[0] }),
        SingleOfInt => out.push(Inst::FpuCvt { op: FpuCvtOp::SingleOfInt, dst, src: args[0] }),

        Cmp(cc) => {
            let cond = emit_compare(out, *cc, args);
            out.push(Inst::Cset { dst, cond });
        }
    }
    Ok(())
}

fn materialize_into_scratch(out: &mut Vec<Inst>, value: i64, is64: bool) {
    out.extend(materialize_int(MReg::SCRATCH_BODY[0], value, is64));
}

/// Modulo expansion: `t = a / b; t = t * b` folded into one
/// `MSUB`-shaped instruction, `dst = a - t`, all through the reserved
/// in-body scratch register.
fn gen_mod(out: &mut Vec<Inst>, div_op: AluOp, msub_op: AluOp, args: &[MReg], dst: MReg) {
    let scratch = MReg::SCRATCH_BODY[0];
    out.push(Inst::AluRRR { op: div_op, dst: scratch, src1: args[0], src2: args[1] });
    out.push(Inst::MSubRRR { op: msub_op, dst, src1: args[0], src2: scratch, src3: args[1] });
}

pub fn gen_program(
    program: &crate::ir::globals::Program,
    functions: &[MachFunction],
    flags: &Flags,
) -> CodegenResult<AsmProgram> {
    let mut out = Vec::with_capacity(functions.len());
    for f in functions {
        out.push(gen_function(f, flags)?);
    }
    Ok(AsmProgram { globals: program.globals.clone(), functions: out })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_nonnegative_constant_is_a_single_movz() {
        let insts = materialize_int(MReg::X(9), 42, false);
        assert_eq!(insts.len(), 1);
        assert!(matches!(insts[0], Inst::Movz { imm: 42, shift: 0, .. }));
    }

    #[test]
    fn small_negative_constant_is_a_single_movn() {
        let insts = materialize_int(MReg::X(9), -1, false);
        assert_eq!(insts.len(), 1);
        assert!(matches!(insts[0], Inst::Movn { imm: 0, shift: 0, .. }));
    }

    #[test]
    fn large_constant_materializes_as_movz_then_movk_skipping_zero_lanes() {
        // 0x1_0002_0000: lane0 = 0, lane1 = 2, lane2 = 1, lane3 = 0.
        let value = 0x1_0002_0000i64;
        let insts = materialize_int(MReg::X(9), value, true);
        assert!(matches!(insts[0], Inst::Movz { shift: 0, imm: 0, .. }), "first lane is always emitted even if zero");
        assert!(insts.iter().any(|i| matches!(i, Inst::Movk { shift: 1, imm: 2, .. })));
        assert!(insts.iter().any(|i| matches!(i, Inst::Movk { shift: 2, imm: 1, .. })));
        assert!(!insts.iter().any(|i| matches!(i, Inst::Movk { shift: 3, .. })), "the high zero lane must be skipped");
    }

    #[test]
    fn gen_mod_expands_to_div_then_msub() {
        let mut out = Vec::new();
        gen_mod(&mut out, AluOp::SDiv32, AluOp::MSub32, &[MReg::X(0), MReg::X(1)], MReg::X(2));
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Inst::AluRRR { op: AluOp::SDiv32, dst: MReg::X(16), .. }));
        match &out[1] {
            Inst::MSubRRR { op: AluOp::MSub32, dst, src1, src2, src3 } => {
                assert_eq!(*dst, MReg::X(2));
                assert_eq!(*src1, MReg::X(0));
                assert_eq!(*src2, MReg::X(16));
                assert_eq!(*src3, MReg::X(1));
            }
            other => panic!("expected MSubRRR, got {other:?}"),
        }
    }

    #[test]
    fn signed_less_than_maps_to_lt() {
        let mut out = Vec::new();
        let cond = emit_compare(&mut out, ConditionCode::Ccomp(Condition::Lt), &[MReg::X(0), MReg::X(1)]);
        assert_eq!(cond, Cond::Lt);
        assert!(matches!(out[0], Inst::Cmp { is64: false, .. }));
    }

    #[test]
    fn unsigned_less_than_maps_to_cc() {
        let mut out = Vec::new();
        let cond = emit_compare(&mut out, ConditionCode::Ccompu(Condition::Lt), &[MReg::X(0), MReg::X(1)]);
        assert_eq!(cond, Cond::Cc);
    }

    #[test]
    fn negated_float_compare_flips_the_condition() {
        let mut out = Vec::new();
        let cond = emit_compare(&mut out, ConditionCode::Cnotcompf(Condition::Eq), &[MReg::D(0), MReg::D(1)]);
        assert_eq!(cond, Cond::Ne);
        assert!(matches!(out[0], Inst::Fcmp { is64: true, .. }));
    }

    #[test]
    fn immediate_compare_emits_cmpimm_with_the_literal_value() {
        let mut out = Vec::new();
        let cond = emit_compare(&mut out, ConditionCode::Ccompimm(Condition::Eq, 7), &[MReg::X(0)]);
        assert_eq!(cond, Cond::Eq);
        assert!(matches!(out[0], Inst::CmpImm { imm: 7, is64: false, .. }));
    }

    #[test]
    fn mtailcall_to_a_direct_symbol_emits_bsym_not_bl() {
        let frame = FrameLayout { total_size: 16, ..FrameLayout::default() };
        let flags = Flags::default();
        let mut out = Vec::new();
        let instr = MInstr::Mtailcall { target: CallTarget::Direct("callee".into()), args: Vec::new() };
        gen_instr(&mut out, &instr, &frame, &flags).unwrap();
        assert!(out.iter().any(|i| matches!(i, Inst::Bsym(name) if name == "callee")));
        assert!(!out.iter().any(|i| matches!(i, Inst::Bl(_))), "a tail call must never use BL");
    }

    #[test]
    fn mcall_to_a_direct_symbol_emits_bl_not_bsym() {
        let frame = FrameLayout { total_size: 16, ..FrameLayout::default() };
        let flags = Flags::default();
        let mut out = Vec::new();
        let instr = MInstr::Mcall { target: CallTarget::Direct("callee".into()), args: Vec::new(), dst: None, ty: None };
        gen_instr(&mut out, &instr, &frame, &flags).unwrap();
        assert!(out.iter().any(|i| matches!(i, Inst::Bl(name) if name == "callee")));
        assert!(!out.iter().any(|i| matches!(i, Inst::Bsym(_))), "a regular call must never use a tail-call branch");
    }
}
