//! Linear-IR -> Mach-IR lowering: commit the abstract stack
//! (`Loc`, `SpillSlot`) to concrete FP-relative offsets, inject the
//! prologue/epilogue, and resolve the parameter home-location parallel
//! move. This is the single entry point `isa::aarch64::asmgen` consumes.

use cranelift_entity::EntityRef;

use crate::ir::amode::AddrMode;
use crate::ir::instr::CallTarget;
use crate::ir::mreg::MReg;
use crate::ir::types::Ty;
use crate::linear::function::{LinInstr, LinearFunction};
use crate::located::loc::{Loc, SpillSlot};
use crate::mach::function::{MInstr, MachFunction};
use crate::result::CodegenResult;
use crate::stacking::{callee_saves, layout, parallel_move};

struct Lowering<'a> {
    func: &'a LinearFunction,
    local_offset: i64,
    outgoing_offset: i64,
    out: Vec<MInstr>,
}

impl<'a> Lowering<'a> {
    fn slot_offset(&self, slot: SpillSlot) -> i64 {
        let idx = slot.index();
        let preceding: i64 = self.func.spill_types[..idx].iter().map(|t| t.bytes()).sum();
        self.local_offset + self.func.stack_size + preceding
    }

    fn slot_ty(&self, slot: SpillSlot) -> Ty {
        self.func.spill_types[slot.index()]
    }

    /// Load a `Loc` operand into a register for use as a source operand,
    /// staging a spilled value through `scratch` via `Mgetstack` first if
    /// necessary.
    fn use_reg(&mut self, loc: Loc, scratch: MReg) -> MReg {
        match loc {
            Loc::Reg(r) => r,
            Loc::Stack(slot) => {
                let ty = self.slot_ty(slot);
                let offset = self.slot_offset(slot);
                self.out.push(MInstr::Mgetstack { offset, ty, dst: scratch });
                scratch
            }
        }
    }

    /// Translate an `AddrMode<Loc>` into `AddrMode<MReg>`, rebasing
    /// `Ainstack`/`Aoutgoing` against this function's frame layout and
    /// staging any spilled base/index register through the body scratch
    /// registers.
    fn use_addr(&mut self, addr: &AddrMode<Loc>) -> AddrMode<MReg> {
        match addr.clone() {
            AddrMode::Aindexed { base, offset } => {
                let base = self.use_reg(base, MReg::SCRATCH_BODY[0]);
                AddrMode::Aindexed { base, offset }
            }
            AddrMode::Aindexed2 { base, index } => {
                let base = self.use_reg(base, MReg::SCRATCH_BODY[0]);
                let index = self.use_reg(index, MReg::SCRATCH_BODY[1]);
                AddrMode::Aindexed2 { base, index }
            }
            AddrMode::Aindexed2shift { base, index, shift } => {
                let base = self.use_reg(base, MReg::SCRATCH_BODY[0]);
                let index = self.use_reg(index, MReg::SCRATCH_BODY[1]);
                AddrMode::Aindexed2shift { base, index, shift }
            }
            AddrMode::Aglobal { symbol, offset } => AddrMode::Aglobal { symbol, offset },
            AddrMode::Ainstack { offset } => AddrMode::Ainstack { offset: offset + self.local_offset },
            AddrMode::Aoutgoing { offset } => AddrMode::Ainstack { offset: offset + self.outgoing_offset },
        }
    }

    fn use_target(&mut self, target: &CallTarget<Loc>, scratch: MReg) -> CallTarget<MReg> {
        match target.clone() {
            CallTarget::Direct(name) => CallTarget::Direct(name),
            CallTarget::Indirect(r) => CallTarget::Indirect(self.use_reg(r, scratch)),
        }
    }

    /// Translate a list of use-only operands (op args, call args, cond
    /// args), assigning each a distinct scratch slot from `SCRATCH_BODY`/
    /// `SCRATCH_BODY_FLOAT` round-robin so two simultaneously-spilled
    /// operands of the same bank in one instruction don't clobber each
    /// other.
    fn use_regs(&mut self, locs: &[Loc]) -> Vec<MReg> {
        let mut int_i = 0usize;
        let mut float_i = 0usize;
        locs.iter()
            .map(|&l| {
                let is_float = matches!(l, Loc::Reg(MReg::D(_))) || self.spilled_is_float(l);
                let scratch = if is_float {
                    let r = MReg::SCRATCH_BODY_FLOAT[float_i % 2];
                    float_i += 1;
                    r
                } else {
                    let r = MReg::SCRATCH_BODY[int_i % 2];
                    int_i += 1;
                    r
                };
                self.use_reg(l, scratch)
            })
            .collect()
    }

    fn spilled_is_float(&self, loc: Loc) -> bool {
        matches!(loc, Loc::Stack(slot) if self.slot_ty(slot).is_float())
    }

    /// Emit whatever op produces a value into a register, choosing a real
    /// destination register directly when `dst` is already a machine
    /// register, or a scratch register followed by an `Msetstack` when
    /// `dst` is spilled. `emit` receives the register to target.
    fn with_dest(&mut self, dst: Loc, ty: Ty, emit: impl FnOnce(&mut Self, MReg)) {
        match dst {
            Loc::Reg(r) => emit(self, r),
            Loc::Stack(slot) => {
                let scratch = if ty.is_float() { MReg::SCRATCH_BODY_FLOAT[0] } else { MReg::SCRATCH_BODY[0] };
                emit(self, scratch);
                let offset = self.slot_offset(slot);
                self.out.push(MInstr::Msetstack { offset, ty, src: scratch });
            }
        }
    }

    fn emit_epilogue(&mut self, frame: &crate::mach::function::FrameLayout) {
        // Reload callee-saved registers in reverse pairing order.
        for (i, &r) in frame.callee_saves.iter().enumerate().rev() {
            let ty = if r.is_float() { Ty::F64 } else { Ty::I64 };
            let offset = frame.callee_save_offset + 8 * i as i64;
            self.out.push(MInstr::Mgetstack { offset, ty, dst: r });
        }
    }
}

/// Lower one `LinearFunction` to Mach-IR. This is where the
/// frame layout, callee-save discovery, prologue/epilogue, and parameter
/// home-location copy all come together.
pub fn lower(func: &LinearFunction) -> CodegenResult<MachFunction> {
    let usage = crate::linear::collect_stack_usage(func);
    let used_callee_saves = callee_saves::discover(func);
    let frame = layout::compute(usage, used_callee_saves);

    let mut lowering = Lowering {
        func,
        local_offset: frame.local_offset,
        outgoing_offset: frame.outgoing_offset,
        out: Vec::new(),
    };

    // --- Prologue ---------------------------------------
    // Steps 1-3 (SP decrement, FP/LR save, FP <- SP + frame_body) and the
    // callee-save stores in step 4 are implicit in the `MachFunction`'s
    // `frame` metadata and `isa::aarch64::asmgen`'s fixed prologue
    // template; this pass only needs to emit the callee-save *stores* as
    // explicit Mach instructions; hence why it's ordered via `frame`.
    for (i, &r) in frame.callee_saves.iter().enumerate() {
        let ty = if r.is_float() { Ty::F64 } else { Ty::I64 };
        let offset = frame.callee_save_offset + 8 * i as i64;
        lowering.out.push(MInstr::Msetstack { offset, ty, src: r });
    }

    // --- Parameter home-location copy --------------------
    let mut int_moves = Vec::new();
    let mut float_moves = Vec::new();
    let mut int_arg_idx = 0usize;
    let mut float_arg_idx = 0usize;
    for p in &func.params {
        let is_float = p.ty.is_float();
        let idx = if is_float {
            let i = float_arg_idx;
            float_arg_idx += 1;
            i
        } else {
            let i = int_arg_idx;
            int_arg_idx += 1;
            i
        };

        if let Some(offset) = p.incoming_offset {
            // 9th+ argument: arrives on the caller's incoming stack area,
            // loaded straight into its final home rather than resolved as
            // part of the register parallel-move problem.
            match p.loc {
                Loc::Reg(dst) => {
                    lowering.out.push(MInstr::Mgetparam { offset, ty: p.ty, dst });
                }
                Loc::Stack(slot) => {
                    let scratch = if is_float { MReg::SCRATCH_ENTRY_FLOAT } else { MReg::SCRATCH_ENTRY };
                    lowering.out.push(MInstr::Mgetparam { offset, ty: p.ty, dst: scratch });
                    let dst_offset = lowering.slot_offset(slot);
                    lowering.out.push(MInstr::Msetstack { offset: dst_offset, ty: p.ty, src: scratch });
                }
            }
            continue;
        }

        let Some(home) = (if is_float { MReg::arg_float(idx) } else { MReg::arg_int(idx) }) else {
            continue;
        };

        match p.loc {
            Loc::Reg(dst) => {
                if is_float {
                    float_moves.push((home, dst, p.ty));
                } else {
                    int_moves.push((home, dst, p.ty));
                }
            }
            Loc::Stack(slot) => {
                // Stack-destination parameters require a single
                // `Msetstack` each, emitted first since they never
                // conflict with another pending move.
                let offset = lowering.slot_offset(slot);
                lowering.out.push(MInstr::Msetstack { offset, ty: p.ty, src: home });
            }
        }
    }
    lowering.out.extend(parallel_move::resolve(int_moves, MReg::SCRATCH_ENTRY, &func.name)?);
    lowering.out.extend(parallel_move::resolve(float_moves, MReg::SCRATCH_ENTRY_FLOAT, &func.name)?);

    // --- Body --------------------------------------------------------------
    for instr in &func.body {
        lower_instr(&mut lowering, instr, &frame)?;
    }

    Ok(MachFunction { name: func.name.clone(), ret_ty: func.ret_ty, body: lowering.out, frame })
}

fn lower_instr(l: &mut Lowering, instr: &LinInstr, frame: &crate::mach::function::FrameLayout) -> CodegenResult<()> {
    match instr {
        LinInstr::Llabel(lab) => l.out.push(MInstr::Mlabel(*lab)),
        LinInstr::Lnop => l.out.push(MInstr::Mnop),
        LinInstr::Lmove { ty, src, dst } => lower_move(l, *ty, *src, *dst),
        LinInstr::Lop { op, args, dst } => {
            let args = l.use_regs(args);
            let op = op.clone();
            let ty = op_result_ty(&op, *dst, l);
            l.with_dest(*dst, ty, move |l, d| l.out.push(MInstr::Mop { op, args, dst: d }));
        }
        LinInstr::Lload { chunk, addr, dst } => {
            let addr = l.use_addr(addr);
            let chunk = *chunk;
            l.with_dest(*dst, chunk.result_ty(), move |l, d| {
                l.out.push(MInstr::Mload { chunk, addr, dst: d })
            });
        }
        LinInstr::Lstore { chunk, addr, src } => {
            let addr = l.use_addr(addr);
            let scratch = if chunk.is_float() { MReg::SCRATCH_BODY_FLOAT[0] } else { MReg::SCRATCH_BODY[0] };
            let src = l.use_reg(*src, scratch);
            l.out.push(MInstr::Mstore { chunk: *chunk, addr, src });
        }
        LinInstr::Lcall { target, args, dst, ty } => {
            let target = l.use_target(target, MReg::SCRATCH_BODY[0]);
            let args = l.use_regs(args);
            let call_ty = ty.unwrap_or(Ty::I64);
            match dst {
                Some(d) => {
                    l.with_dest(*d, call_ty, |l, dreg| {
                        l.out.push(MInstr::Mcall { target, args, dst: Some(dreg), ty: *ty });
                    });
                }
                None => l.out.push(MInstr::Mcall { target, args, dst: None, ty: *ty }),
            }
        }
        LinInstr::Lbuiltin { name, args, dst, ty } => {
            let args = l.use_regs(args);
            let call_ty = ty.unwrap_or(Ty::I64);
            match dst {
                Some(d) => {
                    let name = name.clone();
                    l.with_dest(*d, call_ty, move |l, dreg| {
                        l.out.push(MInstr::Mbuiltin { name, args, dst: Some(dreg), ty: *ty });
                    });
                }
                None => l.out.push(MInstr::Mbuiltin { name: name.clone(), args, dst: None, ty: *ty }),
            }
        }
        LinInstr::Lgoto(target) => l.out.push(MInstr::Mgoto(*target)),
        LinInstr::Lcond { cond, args, ifso } => {
            let args = l.use_regs(args);
            l.out.push(MInstr::Mcond { cond: *cond, args, ifso: *ifso });
        }
        LinInstr::Ljumptable { index, targets, default } => {
            let index = l.use_reg(*index, MReg::SCRATCH_BODY[0]);
            l.out.push(MInstr::Mjumptable { index, targets: targets.clone(), default: *default });
        }
        LinInstr::Ltailcall { target, args } => {
            l.emit_epilogue(frame);
            let target = l.use_target(target, MReg::SCRATCH_BODY[0]);
            let args = l.use_regs(args);
            l.out.push(MInstr::Mtailcall { target, args });
        }
        LinInstr::Lreturn { value } => {
            let value = match value {
                Some(v) => {
                    let ret_reg = if matches!(v, Loc::Reg(MReg::D(_))) || l.spilled_is_float(*v) {
                        MReg::RET_FLOAT
                    } else {
                        MReg::RET_INT
                    };
                    Some(l.use_reg(*v, ret_reg))
                }
                None => None,
            };
            l.emit_epilogue(frame);
            l.out.push(MInstr::Mreturn { value });
        }
    }
    Ok(())
}

fn lower_move(l: &mut Lowering, ty: Ty, src: Loc, dst: Loc) {
    match (src, dst) {
        (Loc::Reg(s), Loc::Reg(d)) => l.out.push(MInstr::Mmove { ty, src: s, dst: d }),
        (Loc::Stack(slot), Loc::Reg(d)) => {
            let offset = l.slot_offset(slot);
            l.out.push(MInstr::Mgetstack { offset, ty, dst: d });
        }
        (Loc::Reg(s), Loc::Stack(slot)) => {
            let offset = l.slot_offset(slot);
            l.out.push(MInstr::Msetstack { offset, ty, src: s });
        }
        (Loc::Stack(s), Loc::Stack(d)) => {
            let scratch = if ty.is_float() { MReg::SCRATCH_BODY_FLOAT[0] } else { MReg::SCRATCH_BODY[0] };
            let src_offset = l.slot_offset(s);
            l.out.push(MInstr::Mgetstack { offset: src_offset, ty, dst: scratch });
            let dst_offset = l.slot_offset(d);
            l.out.push(MInstr::Msetstack { offset: dst_offset, ty, src: scratch });
        }
    }
}

/// `Op` carries no explicit result type (see `ir::op::Op`'s doc comment);
/// infer it from the destination `Loc`'s register bank when it is already
/// a machine register, or from the spilled slot's own declared type
/// otherwise.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::located::function::LParam;
    use crate::located::loc::SpillSlot;

    fn empty_func(params: Vec<LParam>, body: Vec<LinInstr>) -> LinearFunction {
        LinearFunction {
            name: "f".to_string(),
            params,
            ret_ty: Some(Ty::I32),
            body,
            stack_size: 0,
            spill_slot_count: 0,
            spill_types: Vec::new(),
        }
    }

    #[test]
    fn a_param_colored_away_from_its_arrival_register_gets_a_move_into_its_final_home() {
        // Param arrives in X0 but is colored to X19; the resolver must
        // produce a move, not silently drop it.
        let params = vec![LParam { loc: Loc::Reg(MReg::X(19)), ty: Ty::I32, incoming_offset: None }];
        let func = empty_func(params, vec![LinInstr::Lreturn { value: Some(Loc::Reg(MReg::X(19))) }]);
        let mach = lower(&func).unwrap();
        assert!(mach.body.iter().any(|i| matches!(
            i,
            MInstr::Mmove { src: MReg::X(0), dst: MReg::X(19), .. }
        )));
    }

    #[test]
    fn ninth_stack_parameter_loads_directly_into_its_register_home() {
        let params: Vec<LParam> = (0..8)
            .map(|i| LParam { loc: Loc::Reg(MReg::X(19 + i)), ty: Ty::I32, incoming_offset: None })
            .chain(std::iter::once(LParam { loc: Loc::Reg(MReg::X(27)), ty: Ty::I32, incoming_offset: Some(0) }))
            .collect();
        let func = empty_func(params, vec![LinInstr::Lreturn { value: Some(Loc::Reg(MReg::X(27))) }]);
        let mach = lower(&func).unwrap();
        assert!(mach.body.iter().any(|i| matches!(
            i,
            MInstr::Mgetparam { offset: 0, dst: MReg::X(27), .. }
        )));
    }

    #[test]
    fn spilled_op_argument_is_staged_through_a_scratch_register() {
        let mut func = empty_func(Vec::new(), Vec::new());
        func.spill_slot_count = 1;
        func.spill_types = vec![Ty::I32];
        func.body = vec![
            LinInstr::Lop {
                op: crate::ir::op::Op::AddImm(1),
                args: vec![Loc::Stack(SpillSlot::new(0))],
                dst: Loc::Reg(MReg::X(9)),
            },
            LinInstr::Lreturn { value: Some(Loc::Reg(MReg::X(9))) },
        ];

        let mach = lower(&func).unwrap();
        let get_idx = mach.body.iter().position(|i| matches!(i, MInstr::Mgetstack { dst: MReg::X(16), .. }));
        let op_idx = mach.body.iter().position(|i| matches!(i, MInstr::Mop { .. }));
        assert!(get_idx.is_some(), "a spilled operand must be reloaded through a scratch register first");
        assert!(get_idx.unwrap() < op_idx.unwrap(), "the reload must precede the operation that consumes it");
    }
}

fn op_result_ty(op: &crate::ir::op::Op, dst: Loc, l: &Lowering) -> Ty {
    match dst {
        Loc::Reg(MReg::D(_)) => {
            if op.is_float_result() {
                // Width disambiguation (f32 vs f64) isn't recoverable from
                // the register bank alone; opcodes that produce a float
                // already imply their own width (e.g. `AddS` vs `AddD`).
                if matches!(op, crate::ir::op::Op::AddS | crate::ir::op::Op::SubS | crate::ir::op::Op::MulS | crate::ir::op::Op::DivS | crate::ir::op::Op::NegS | crate::ir::op::Op::AbsS | crate::ir::op::Op::SingleConst(_) | crate::ir::op::Op::SingleOfLong | crate::ir::op::Op::SingleOfInt | crate::ir::op::Op::SingleOfDouble) {
                    Ty::F32
                } else {
                    Ty::F64
                }
            } else {
                Ty::F64
            }
        }
        Loc::Reg(_) => Ty::I64,
        Loc::Stack(slot) => l.slot_ty(slot),
    }
}
