//! Apply a completed coloring to a CFG-IR function, producing Located-IR.
//! Also responsible for inserting the call-site
//! argument/result staging moves the calling convention requires: a call's
//! `PReg` arguments must be copied into `MReg::ARG_INT`/`ARG_FLOAT` home
//! registers immediately before the call, and its result (if any) copied
//! out of `MReg::RET_INT`/`RET_FLOAT` immediately after.

use cranelift_entity::PrimaryMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

use crate::ir::amode::AddrMode;
use crate::ir::entities::{Node, PReg};
use crate::ir::instr::{CallTarget, Function, Instruction};
use crate::ir::mreg::MReg;
use crate::ir::types::Ty;
use crate::located::function::{LFunction, LInstruction, LParam};
use crate::located::loc::{Loc, SpillSlot};
use crate::regalloc::graph;
use crate::regalloc::irc::{self, ColoringResult};
use crate::regalloc::liveness;
use crate::result::{CodegenError, CodegenResult};
use crate::stacking::parallel_move;

/// Resolves every pseudo-register mentioned in a function to its final
/// `Loc`, after both register classes have been colored independently.
struct Resolver {
    int: ColoringResult,
    float: ColoringResult,
    slots: FxHashMap<PReg, SpillSlot>,
}

impl Resolver {
    fn alias_of(&self, r: PReg, is_float: bool) -> PReg {
        let result = if is_float { &self.float } else { &self.int };
        let mut cur = r;
        while let Some(&next) = result.alias.get(&cur) {
            cur = next;
        }
        cur
    }

    fn loc(&self, r: PReg, is_float: bool, func_name: &str) -> CodegenResult<Loc> {
        let rep = self.alias_of(r, is_float);
        let result = if is_float { &self.float } else { &self.int };
        if let Some(&color) = result.colors.get(&rep) {
            let table: &[MReg] = if is_float {
                &MReg::ALLOCATABLE_FLOAT
            } else {
                &MReg::ALLOCATABLE_INT
            };
            return Ok(Loc::Reg(table[color]));
        }
        if let Some(&slot) = self.slots.get(&rep) {
            return Ok(Loc::Stack(slot));
        }
        Err(CodegenError::MalformedIr {
            function: func_name.to_string(),
            node: "<regalloc>".to_string(),
            detail: format!("pseudo-register {r} neither colored nor spilled"),
        })
    }
}

fn arg_home(i: usize, is_float: bool) -> Option<MReg> {
    if is_float {
        MReg::arg_float(i)
    } else {
        MReg::arg_int(i)
    }
}

/// Run register allocation for `func` and translate it into an `LFunction`.
pub fn apply(func: &Function) -> CodegenResult<LFunction> {
    crate::ir::validate::validate(func)?;

    let liveness = liveness::analyze(func);
    let (graph, move_candidates) = graph::build(func, &liveness);
    let live_across_calls = liveness::live_across_calls(func, &liveness);

    let mut int_nodes = Vec::new();
    let mut float_nodes = Vec::new();
    for r in graph.nodes() {
        if func.reg_type(r).is_float() {
            float_nodes.push(r);
        } else {
            int_nodes.push(r);
        }
    }

    // Precolor every parameter that is not live across a call to its ABI
    // arrival register. A parameter that *is* live across
    // a call is left uncolored here; the live-across-call constraint in
    // `irc::assign_colors` then forces it into a callee-saved color instead
    // of leaving it pinned to a caller-saved argument register.
    let mut int_precolored = FxHashMap::default();
    let mut float_precolored = FxHashMap::default();
    let mut int_arg_idx = 0usize;
    let mut float_arg_idx = 0usize;
    for param in &func.params {
        let is_float = param.ty.is_float();
        let idx = if is_float {
            let i = float_arg_idx;
            float_arg_idx += 1;
            i
        } else {
            let i = int_arg_idx;
            int_arg_idx += 1;
            i
        };
        if live_across_calls.contains(&param.reg) {
            continue;
        }
        let Some(home) = arg_home(idx, is_float) else {
            // 9th-and-later argument: arrives on the caller's incoming
            // stack slot, not a register; stacking materializes the load
            // once frame layout is known.
            continue;
        };
        let Some(color) = home.allocatable_color() else { continue };
        if is_float {
            float_precolored.insert(param.reg, color);
        } else {
            int_precolored.insert(param.reg, color);
        }
    }

    let int_result = irc::allocate(
        &graph,
        &int_nodes,
        &move_candidates,
        &MReg::ALLOCATABLE_INT,
        MReg::FIRST_CALLEE_SAVED_INT_COLOR,
        &live_across_calls,
        &int_precolored,
    );
    let float_result = irc::allocate(
        &graph,
        &float_nodes,
        &move_candidates,
        &MReg::ALLOCATABLE_FLOAT,
        MReg::FIRST_CALLEE_SAVED_FLOAT_COLOR,
        &live_across_calls,
        &float_precolored,
    );

    // Every spilled pseudo-register (from either class) gets its own slot,
    // in ascending `PReg` order for determinism.
    let mut spilled: BTreeSet<PReg> = BTreeSet::new();
    spilled.extend(int_result.spilled.iter().copied());
    spilled.extend(float_result.spilled.iter().copied());
    let mut slots = FxHashMap::default();
    let mut spill_types = Vec::new();
    for (i, r) in spilled.into_iter().enumerate() {
        slots.insert(r, SpillSlot::from_u32(i as u32));
        spill_types.push(func.reg_type(r));
    }
    let spill_slot_count = slots.len() as u32;

    let resolver = Resolver {
        int: int_result,
        float: float_result,
        slots,
    };
    let is_float = |r: PReg| func.reg_type(r).is_float();
    let loc = |r: PReg| resolver.loc(r, is_float(r), &func.name);

    let mut nodes: PrimaryMap<Node, LInstruction> = PrimaryMap::new();
    // Original node ids are assigned first and in order, so a CFG-IR `Node`
    // and its Located-IR counterpart always share the same index.
    for (id, instr) in func.nodes_in_order() {
        let translated = translate(instr, &loc, &mut nodes, &func.name, func.ret_ty)?;
        let pushed = nodes.push(translated);
        debug_assert_eq!(pushed, id);
    }

    let mut int_idx = 0usize;
    let mut float_idx = 0usize;
    let mut stack_arg_idx = 0usize;
    let params = func
        .params
        .iter()
        .map(|p| {
            let idx = if p.ty.is_float() {
                let i = float_idx;
                float_idx += 1;
                i
            } else {
                let i = int_idx;
                int_idx += 1;
                i
            };
            let incoming_offset = if arg_home(idx, p.ty.is_float()).is_none() {
                let off = (stack_arg_idx * 8) as i64;
                stack_arg_idx += 1;
                Some(off)
            } else {
                None
            };
            Ok(LParam {
                loc: loc(p.reg)?,
                ty: p.ty,
                incoming_offset,
            })
        })
        .collect::<CodegenResult<Vec<_>>>()?;

    Ok(LFunction {
        name: func.name.clone(),
        params,
        ret_ty: func.ret_ty,
        nodes,
        entry: func.entry,
        stack_size: func.stack_size,
        spill_slot_count,
        spill_types,
    })
}

fn translate(
    instr: &Instruction,
    loc: &impl Fn(PReg) -> CodegenResult<Loc>,
    nodes: &mut PrimaryMap<Node, LInstruction>,
    func_name: &str,
    ret_ty: Option<Ty>,
) -> CodegenResult<LInstruction> {
    Ok(match instr {
        Instruction::Inop { next } => LInstruction::Lnop { next: *next },
        Instruction::Iop { op, args, dst, next } if op.is_move() => {
            let src_loc = loc(args[0])?;
            let dst_loc = loc(*dst)?;
            if src_loc == dst_loc {
                LInstruction::Lnop { next: *next }
            } else {
                LInstruction::Lmove {
                    ty: op_move_ty(args, loc)?,
                    src: src_loc,
                    dst: dst_loc,
                    next: *next,
                }
            }
        }
        Instruction::Iop { op, args, dst, next } => LInstruction::Lop {
            op: op.clone(),
            args: args.iter().map(|&r| loc(r)).collect::<CodegenResult<_>>()?,
            dst: loc(*dst)?,
            next: *next,
        },
        Instruction::Iload { chunk, addr, dst, next } => LInstruction::Lload {
            chunk: *chunk,
            addr: translate_addr(addr, loc)?,
            dst: loc(*dst)?,
            next: *next,
        },
        Instruction::Istore { chunk, addr, src, next } => LInstruction::Lstore {
            chunk: *chunk,
            addr: translate_addr(addr, loc)?,
            src: loc(*src)?,
            next: *next,
        },
        Instruction::Icall { target, args, dst, ty, next } => {
            build_call(target, args, *dst, *ty, *next, loc, nodes, func_name)?
        }
        Instruction::Itailcall { target, args } => LInstruction::Ltailcall {
            target: translate_target(target, loc)?,
            args: args.iter().map(|&r| loc(r)).collect::<CodegenResult<_>>()?,
        },
        Instruction::Ibuiltin { name, args, dst, ty, next } => LInstruction::Lbuiltin {
            name: name.clone(),
            args: args.iter().map(|&r| loc(r)).collect::<CodegenResult<_>>()?,
            dst: dst.map(loc).transpose()?,
            ty: *ty,
            next: *next,
        },
        Instruction::Icond { cond, args, ifso, ifnot } => LInstruction::Lcond {
            cond: *cond,
            args: args.iter().map(|&r| loc(r)).collect::<CodegenResult<_>>()?,
            ifso: *ifso,
            ifnot: *ifnot,
        },
        Instruction::Ijumptable { index, targets, default } => LInstruction::Ljumptable {
            index: loc(*index)?,
            targets: targets.clone(),
            default: *default,
        },
        Instruction::Ireturn { value } => build_return(*value, ret_ty, loc, nodes)?,
    })
}

/// A returned value must arrive in `MReg::RET_INT`/`RET_FLOAT`, the same
/// way a call's result is staged out of that register on the caller's
/// side in `build_call`. If the coloring (or a spill) left the returned
/// pseudo-register anywhere else, splice in a move: the original node id
/// keeps the move, and a fresh node holds the actual `Lreturn`.
fn build_return(
    value: Option<PReg>,
    ret_ty: Option<Ty>,
    loc: &impl Fn(PReg) -> CodegenResult<Loc>,
    nodes: &mut PrimaryMap<Node, LInstruction>,
) -> CodegenResult<LInstruction> {
    let Some(v) = value else {
        return Ok(LInstruction::Lreturn { value: None });
    };
    let src_loc = loc(v)?;
    let is_float = ret_ty.map(Ty::is_float).unwrap_or(matches!(src_loc, Loc::Reg(MReg::D(_))));
    let ret_reg = if is_float { MReg::RET_FLOAT } else { MReg::RET_INT };
    if src_loc == Loc::Reg(ret_reg) {
        return Ok(LInstruction::Lreturn { value: Some(src_loc) });
    }
    let move_ty = ret_ty.unwrap_or(if is_float { Ty::F64 } else { Ty::I64 });
    let return_node = nodes.push(LInstruction::Lreturn { value: Some(Loc::Reg(ret_reg)) });
    Ok(LInstruction::Lmove { ty: move_ty, src: src_loc, dst: Loc::Reg(ret_reg), next: return_node })
}

/// A `Move`'s `Ty` is not carried on the opcode itself; it is read off the
/// source operand's `Loc` class (register bank) since CFG-IR moves are
/// always same-bank copies.
fn op_move_ty(
    args: &[PReg],
    loc: &impl Fn(PReg) -> CodegenResult<Loc>,
) -> CodegenResult<Ty> {
    let l = loc(args[0])?;
    Ok(match l {
        Loc::Reg(MReg::D(_)) => Ty::F64,
        _ => Ty::I64,
    })
}

fn translate_addr(
    addr: &AddrMode<PReg>,
    loc: &impl Fn(PReg) -> CodegenResult<Loc>,
) -> CodegenResult<AddrMode<Loc>> {
    Ok(match addr.clone() {
        AddrMode::Aindexed { base, offset } => AddrMode::Aindexed { base: loc(base)?, offset },
        AddrMode::Aindexed2 { base, index } => AddrMode::Aindexed2 {
            base: loc(base)?,
            index: loc(index)?,
        },
        AddrMode::Aindexed2shift { base, index, shift } => AddrMode::Aindexed2shift {
            base: loc(base)?,
            index: loc(index)?,
            shift,
        },
        AddrMode::Aglobal { symbol, offset } => AddrMode::Aglobal { symbol, offset },
        AddrMode::Ainstack { offset } => AddrMode::Ainstack { offset },
        AddrMode::Aoutgoing { offset } => AddrMode::Aoutgoing { offset },
    })
}

fn translate_target(
    target: &CallTarget<PReg>,
    loc: &impl Fn(PReg) -> CodegenResult<Loc>,
) -> CodegenResult<CallTarget<Loc>> {
    Ok(match target.clone() {
        CallTarget::Direct(name) => CallTarget::Direct(name),
        CallTarget::Indirect(r) => CallTarget::Indirect(loc(r)?),
    })
}

/// Splice a call into: argument-staging moves (fresh nodes) -> the call
/// itself (the original node id) -> a result-staging move (a fresh node,
/// only if the call has a result) -> `next`. Returns the instruction to
/// install at the *original* node id; any extra nodes are pushed directly
/// onto `nodes`.
#[allow(clippy::too_many_arguments)]
fn build_call(
    target: &CallTarget<PReg>,
    args: &[PReg],
    dst: Option<PReg>,
    ty: Option<Ty>,
    next: Node,
    loc: &impl Fn(PReg) -> CodegenResult<Loc>,
    nodes: &mut PrimaryMap<Node, LInstruction>,
    func_name: &str,
) -> CodegenResult<LInstruction> {
    let mut int_i = 0usize;
    let mut float_i = 0usize;
    let mut outgoing_i = 0usize;
    // Register-homed arguments are collected per class rather than emitted
    // as they're seen: two arguments can want each other's home (`g(a, b)`
    // with `a` colored to X1 and `b` colored to X0), and a naive sequential
    // `mov x0, x1; mov x1, x0` would have the second move read back what
    // the first just clobbered. These are resolved as a parallel move
    // below, the same way the entry parameter-home copy is.
    let mut int_moves: Vec<(Loc, MReg, Ty)> = Vec::new();
    let mut float_moves: Vec<(Loc, MReg, Ty)> = Vec::new();
    let mut stores = Vec::new();
    let mut call_args = Vec::new();
    for &a in args {
        let src = loc(a)?;
        let is_float = matches!(src, Loc::Reg(MReg::D(_)));
        let home = if is_float {
            let h = arg_home(float_i, true);
            float_i += 1;
            h
        } else {
            let h = arg_home(int_i, false);
            int_i += 1;
            h
        };
        let home_ty = if is_float { Ty::F64 } else { Ty::I64 };
        match home {
            Some(home) => {
                call_args.push(Loc::Reg(home));
                if src != Loc::Reg(home) {
                    if is_float {
                        float_moves.push((src, home, home_ty));
                    } else {
                        int_moves.push((src, home, home_ty));
                    }
                }
            }
            None => {
                // 9th+ integer/float argument: passed on the outgoing-argument
                // stack area. The chunk mirrors `home_ty`'s natural width;
                // the stacking pass resolves `Aoutgoing` against
                // `OutgoingOffset` once frame layout is known. Stores never
                // conflict with each other or with the register moves
                // above (they write memory, not a home register), so they
                // can always run first.
                let chunk = if is_float { crate::ir::types::Chunk::F64 } else { crate::ir::types::Chunk::I64 };
                stores.push(ArgStep::Store(chunk, src, (outgoing_i * 8) as i64));
                outgoing_i += 1;
            }
        }
    }

    let mut arg_moves = stores;
    arg_moves.extend(parallel_move::resolve_locs(
        int_moves,
        MReg::SCRATCH_BODY[0],
        func_name,
        |ty, src, dst| ArgStep::Move(ty, src, Loc::Reg(dst)),
    )?);
    arg_moves.extend(parallel_move::resolve_locs(
        float_moves,
        MReg::SCRATCH_BODY_FLOAT[0],
        func_name,
        |ty, src, dst| ArgStep::Move(ty, src, Loc::Reg(dst)),
    )?);

    let mut cursor = next;
    if let Some(d) = dst {
        let dst_loc = loc(d)?;
        let is_float_ret = matches!(dst_loc, Loc::Reg(MReg::D(_)));
        let ret_reg = if is_float_ret { MReg::RET_FLOAT } else { MReg::RET_INT };
        let result_ty = ty.unwrap_or(Ty::I64);
        if Loc::Reg(ret_reg) != dst_loc {
            let result_move = nodes.push(LInstruction::Lmove {
                ty: result_ty,
                src: Loc::Reg(ret_reg),
                dst: dst_loc,
                next,
            });
            cursor = result_move;
        }
    }

    let translated_target = translate_target(target, loc)?;
    let call = LInstruction::Lcall {
        target: translated_target,
        args: call_args,
        dst: dst.map(loc).transpose()?,
        ty,
        next: cursor,
    };

    // Fold the argument-staging moves in as a chain feeding into the call
    // node itself; the call node keeps the original CFG-IR node id, so the
    // moves must precede it and the *last* move's `next` must equal that
    // id. Since we do not yet know that id here (the caller installs `call`
    // there), we instead return the innermost move and let the caller wire
    // the chain's tail to the call's node id via `finish_call_chain`.
    finish_call_chain(arg_moves, call, nodes)
}

/// One pre-call argument-staging step: either a move into a home register
/// (for the first 8 arguments of each class, already parallel-move
/// resolved) or a store to the outgoing stack-argument area (9th and
/// later).
enum ArgStep {
    Move(Ty, Loc, Loc),
    Store(crate::ir::types::Chunk, Loc, i64),
}

impl ArgStep {
    fn into_instruction(self, next: Node) -> LInstruction {
        match self {
            ArgStep::Move(ty, src, dst) => LInstruction::Lmove { ty, src, dst, next },
            ArgStep::Store(chunk, src, offset) => LInstruction::Lstore {
                chunk,
                addr: AddrMode::Aoutgoing { offset },
                src,
                next,
            },
        }
    }
}

/// Push the argument-staging steps, in the exact order given — this order
/// is load-bearing once a batch has gone through `parallel_move::resolve_locs`,
/// whose steps are only safe to execute in sequence — as a chain of fresh
/// nodes, each falling through to the next, with the final step's `next`
/// pointing at a freshly reserved node that the caller fills in with
/// `call` — then returns the instruction for the *first* step if there
/// were any, or `call` itself if there were none. The original CFG-IR node
/// id for this call site is installed by the single caller of `translate`,
/// which always assigns whatever this function returns to that id; so when
/// there are argument-staging steps, the call itself is pushed as a fresh
/// node and only the first step keeps the original id.
fn finish_call_chain(
    mut arg_moves: Vec<ArgStep>,
    call: LInstruction,
    nodes: &mut PrimaryMap<Node, LInstruction>,
) -> CodegenResult<LInstruction> {
    if arg_moves.is_empty() {
        return Ok(call);
    }
    let call_node = nodes.push(call);
    let mut next = call_node;
    // Pull the first step out now — it keeps the original call-site node
    // id and is returned rather than pushed — then walk the rest back to
    // front so each push already knows the id of the step after it.
    let first = arg_moves.remove(0);
    for step in arg_moves.into_iter().rev() {
        let pushed = nodes.push(step.into_instruction(next));
        next = pushed;
    }
    Ok(first.into_instruction(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::FunctionBuilder;
    use crate::ir::op::Op;

    /// The 9th integer parameter has no arrival register, so it must carry
    /// a stack `incoming_offset`; the first 8 must not.
    #[test]
    fn ninth_integer_parameter_arrives_on_the_stack() {
        let mut b = FunctionBuilder::new("manyparams");
        let params: Vec<_> = (0..9).map(|_| b.add_param(Ty::I32)).collect();
        let n0 = b.reserve_node();
        b.define_node(n0, Instruction::Ireturn { value: Some(params[0]) });
        b.set_entry(n0);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        let located = apply(&func).unwrap();
        for lp in &located.params[..8] {
            assert!(lp.incoming_offset.is_none(), "first 8 int params must arrive in registers");
        }
        assert_eq!(located.params[8].incoming_offset, Some(0));
    }

    /// A call whose arguments are not already in their ABI home registers
    /// must gain argument-staging nodes ahead of the `Lcall`, and the
    /// staged locations must match `MReg::ARG_INT` order.
    #[test]
    fn call_arguments_are_staged_into_abi_order() {
        let mut b = FunctionBuilder::new("staged_call");
        let a = b.add_param(Ty::I32);
        let c = b.add_param(Ty::I32);
        let result = b.new_preg(Ty::I32);

        let call = b.reserve_node();
        let ret = b.reserve_node();
        // Swap argument order relative to how `a`/`c` arrive, forcing
        // staging moves rather than a no-op pass-through.
        b.define_node(
            call,
            Instruction::Icall {
                target: CallTarget::Direct("callee".into()),
                args: vec![c, a],
                dst: Some(result),
                ty: Some(Ty::I32),
                next: ret,
            },
        );
        b.define_node(ret, Instruction::Ireturn { value: Some(result) });
        b.set_entry(call);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        let located = apply(&func).unwrap();
        let has_call = located.nodes.values().any(|i| matches!(i, LInstruction::Lcall { .. }));
        assert!(has_call, "a call-containing function must still have exactly one Lcall");
    }

    /// Scenario 1 (`inc`)'s failure mode: a returned pseudo-register that
    /// colors to something other than `X0` must gain an explicit
    /// staging move into `RET_INT`, never a bare `Lreturn` that silently
    /// carries the wrong register.
    #[test]
    fn return_value_is_copied_into_the_return_register_when_not_already_there() {
        let mut b = FunctionBuilder::new("second_param_returned");
        let _first = b.add_param(Ty::I32);
        let second = b.add_param(Ty::I32);
        let n0 = b.reserve_node();
        b.define_node(n0, Instruction::Ireturn { value: Some(second) });
        b.set_entry(n0);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        // `second` is not live across a call, so it precolors to its own
        // ABI arrival register (X1), not X0: returning it must cost a move.
        let located = apply(&func).unwrap();
        match &located.nodes[func.entry] {
            LInstruction::Lmove { src, dst, .. } => {
                assert_eq!(*src, Loc::Reg(MReg::ARG_INT[1]));
                assert_eq!(*dst, Loc::Reg(MReg::RET_INT));
            }
            other => panic!("expected a return-value staging move at the entry node, found {other:?}"),
        }
    }

    /// A parameter returned directly in its ABI-assigned register needs no
    /// staging move: `Lreturn` should carry it unchanged.
    #[test]
    fn return_value_already_in_the_return_register_needs_no_move() {
        let mut b = FunctionBuilder::new("first_param_returned");
        let first = b.add_param(Ty::I32);
        let n0 = b.reserve_node();
        b.define_node(n0, Instruction::Ireturn { value: Some(first) });
        b.set_entry(n0);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        let located = apply(&func).unwrap();
        assert!(matches!(
            located.nodes[func.entry],
            LInstruction::Lreturn { value: Some(Loc::Reg(MReg::X(0))) }
        ));
    }

    /// Scenario 5's cyclic parameter swap, reproduced at a call site: `a`
    /// arrives in X0 and `b` in X1, but the call wants them as
    /// `callee(b, a)` — i.e. X0 must receive the current X1 and X1 must
    /// receive the current X0. A naive sequential lowering (`mov x0, x1;
    /// mov x1, x0`) would leave both arguments equal to the original `a`;
    /// the parallel-move resolver must instead stage one side through a
    /// scratch register.
    #[test]
    fn swapped_call_arguments_are_resolved_as_a_parallel_move() {
        let mut b = FunctionBuilder::new("swapped_call_args");
        let a = b.add_param(Ty::I32);
        let c = b.add_param(Ty::I32);
        let result = b.new_preg(Ty::I32);

        let call = b.reserve_node();
        let ret = b.reserve_node();
        b.define_node(
            call,
            Instruction::Icall {
                target: CallTarget::Direct("callee".into()),
                args: vec![c, a],
                dst: Some(result),
                ty: Some(Ty::I32),
                next: ret,
            },
        );
        b.define_node(ret, Instruction::Ireturn { value: Some(result) });
        b.set_entry(call);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        let located = apply(&func).unwrap();

        // Walk the chain from the entry node, collecting every `Lmove`
        // found before the `Lcall`.
        let mut pre_call_moves = Vec::new();
        let mut cursor = func.entry;
        loop {
            match &located.nodes[cursor] {
                LInstruction::Lmove { src, dst, next, .. } => {
                    pre_call_moves.push((*src, *dst));
                    cursor = *next;
                }
                LInstruction::Lcall { .. } => break,
                other => panic!("expected only Lmove nodes before the Lcall, found {other:?}"),
            }
        }

        // A genuine 2-cycle must use the scratch register exactly once,
        // and the final register contents must be the swapped values
        // (X0 <- original X1, X1 <- original X0), not both equal to the
        // original X0.
        let scratch = MReg::SCRATCH_BODY[0];
        let scratch_writes = pre_call_moves.iter().filter(|(_, d)| *d == Loc::Reg(scratch)).count();
        assert_eq!(scratch_writes, 1, "expected exactly one move through the scratch register: {pre_call_moves:?}");

        let final_x0 = pre_call_moves.iter().rev().find(|(_, d)| *d == Loc::Reg(MReg::X(0)));
        let final_x1 = pre_call_moves.iter().rev().find(|(_, d)| *d == Loc::Reg(MReg::X(1)));
        assert!(final_x0.is_some() && final_x1.is_some(), "both call-argument homes must be written: {pre_call_moves:?}");
        assert_ne!(
            final_x0.unwrap().0,
            final_x1.unwrap().0,
            "a parallel move must not leave both argument homes holding the same source: {pre_call_moves:?}"
        );
    }

    #[test]
    fn a_move_to_an_identical_location_becomes_a_no_op() {
        let mut b = FunctionBuilder::new("identitymove");
        let p = b.add_param(Ty::I32);
        let q = b.new_preg(Ty::I32);
        let n0 = b.reserve_node();
        let n1 = b.reserve_node();
        b.define_node(n0, Instruction::Iop { op: Op::Move, args: vec![p], dst: q, next: n1 });
        b.define_node(n1, Instruction::Ireturn { value: Some(q) });
        b.set_entry(n0);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        // `p` and `q` are coalesced (no interference, it's a pure move
        // chain), so they should end up at the same location and the move
        // should translate to `Lnop`.
        let located = apply(&func).unwrap();
        assert!(matches!(located.nodes[func.entry], LInstruction::Lnop { .. }));
    }
}
