//! Callee-saved register discovery: scan a function's
//! body for every machine register it mentions and retain the ones that
//! are callee-saved, so the prologue/epilogue only spend cycles saving
//! registers this function actually clobbers.

use rustc_hash::FxHashSet;

use crate::ir::amode::AddrMode;
use crate::ir::instr::CallTarget;
use crate::ir::mreg::MReg;
use crate::linear::function::{LinInstr, LinearFunction};
use crate::located::loc::Loc;

fn rank(r: MReg) -> u32 {
    match r {
        MReg::X(n) => u32::from(n),
        MReg::Sp => 31,
        MReg::D(n) => 1000 + u32::from(n),
    }
}

fn visit_loc(loc: Loc, out: &mut FxHashSet<MReg>) {
    if let Loc::Reg(r) = loc {
        out.insert(r);
    }
}

fn visit_addr(addr: &AddrMode<Loc>, out: &mut FxHashSet<MReg>) {
    match addr {
        AddrMode::Aindexed { base, .. } => visit_loc(*base, out),
        AddrMode::Aindexed2 { base, index } | AddrMode::Aindexed2shift { base, index, .. } => {
            visit_loc(*base, out);
            visit_loc(*index, out);
        }
        AddrMode::Aglobal { .. } | AddrMode::Ainstack { .. } | AddrMode::Aoutgoing { .. } => {}
    }
}

fn visit_target(target: &CallTarget<Loc>, out: &mut FxHashSet<MReg>) {
    if let CallTarget::Indirect(r) = target {
        visit_loc(*r, out);
    }
}

/// Every `MReg` mentioned anywhere in `func`'s body (op args/dest, load and
/// store addresses/values, call targets, condition operands, jumptable
/// index), filtered to the callee-saved subset, sorted by numeric id for
/// deterministic emission, and padded to even length for paired
/// store/reload.
pub fn discover(func: &LinearFunction) -> Vec<MReg> {
    let mut mentioned = FxHashSet::default();

    for instr in &func.body {
        match instr {
            LinInstr::Llabel(_) | LinInstr::Lnop | LinInstr::Lgoto(_) => {}
            LinInstr::Lmove { src, dst, .. } => {
                visit_loc(*src, &mut mentioned);
                visit_loc(*dst, &mut mentioned);
            }
            LinInstr::Lop { args, dst, .. } => {
                for &a in args {
                    visit_loc(a, &mut mentioned);
                }
                visit_loc(*dst, &mut mentioned);
            }
            LinInstr::Lload { addr, dst, .. } => {
                visit_addr(addr, &mut mentioned);
                visit_loc(*dst, &mut mentioned);
            }
            LinInstr::Lstore { addr, src, .. } => {
                visit_addr(addr, &mut mentioned);
                visit_loc(*src, &mut mentioned);
            }
            LinInstr::Lcall { target, args, dst, .. } => {
                visit_target(target, &mut mentioned);
                for &a in args {
                    visit_loc(a, &mut mentioned);
                }
                if let Some(d) = dst {
                    visit_loc(*d, &mut mentioned);
                }
            }
            LinInstr::Lbuiltin { args, dst, .. } => {
                for &a in args {
                    visit_loc(a, &mut mentioned);
                }
                if let Some(d) = dst {
                    visit_loc(*d, &mut mentioned);
                }
            }
            LinInstr::Lcond { args, .. } => {
                for &a in args {
                    visit_loc(a, &mut mentioned);
                }
            }
            LinInstr::Ljumptable { index, .. } => visit_loc(*index, &mut mentioned),
            LinInstr::Ltailcall { target, args } => {
                visit_target(target, &mut mentioned);
                for &a in args {
                    visit_loc(a, &mut mentioned);
                }
            }
            LinInstr::Lreturn { value } => {
                if let Some(v) = value {
                    visit_loc(*v, &mut mentioned);
                }
            }
        }
    }
    for p in &func.params {
        visit_loc(p.loc, &mut mentioned);
    }

    let mut used: Vec<MReg> = mentioned.into_iter().filter(|r| r.is_callee_saved() && *r != MReg::Sp).collect();
    used.sort_by_key(|&r| rank(r));
    if used.len() % 2 == 1 {
        // Pad with the next unused callee-save of the same bank so the
        // pairing stays same-class; the padding register is never read or
        // written in the body, just saved and restored as dead space.
        let pad_int = MReg::ALLOCATABLE_INT
            .iter()
            .find(|r| r.is_callee_saved() && !used.contains(r));
        let pad_float = MReg::ALLOCATABLE_FLOAT
            .iter()
            .find(|r| r.is_callee_saved() && !used.contains(r));
        let last_is_float = used.last().is_some_and(|r| r.is_float());
        let pad = if last_is_float { pad_float.or(pad_int) } else { pad_int.or(pad_float) };
        if let Some(&p) = pad {
            used.push(p);
            used.sort_by_key(|&r| rank(r));
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::Ty;
    use crate::located::function::LParam;

    fn bare(body: Vec<LinInstr>, params: Vec<LParam>) -> LinearFunction {
        LinearFunction {
            name: "f".into(),
            params,
            ret_ty: None,
            body,
            stack_size: 0,
            spill_slot_count: 0,
            spill_types: Vec::new(),
        }
    }

    #[test]
    fn only_callee_saved_registers_are_retained() {
        let func = bare(
            vec![LinInstr::Lreturn { value: Some(Loc::Reg(MReg::X(19))) }],
            vec![LParam { loc: Loc::Reg(MReg::X(0)), ty: Ty::I64, incoming_offset: None }],
        );
        let used = discover(&func);
        assert!(used.contains(&MReg::X(19)));
        assert!(!used.contains(&MReg::X(0)));
    }

    #[test]
    fn odd_count_is_padded_to_even() {
        let func = bare(
            vec![LinInstr::Lreturn { value: Some(Loc::Reg(MReg::X(19))) }],
            vec![],
        );
        let used = discover(&func);
        assert_eq!(used.len() % 2, 0);
    }
}
