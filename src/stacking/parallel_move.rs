//! Parallel-move resolution: the parameter home-location
//! copy is a parallel-assignment problem (every source read before any
//! destination in the same batch is overwritten), resolved here with a
//! single reserved scratch register for cycle breaking.

use crate::ir::mreg::MReg;
use crate::ir::types::Ty;
use crate::located::loc::Loc;
use crate::mach::function::MInstr;
use crate::result::{CodegenError, CodegenResult};

/// Resolve `moves` (already filtered to same-bank register-to-register
/// copies with identity moves removed) into a sequence that is safe to
/// execute one instruction at a time, using `scratch` to break any cycle.
/// At most one scratch register is ever live at a
/// time, so a single register suffices regardless of how many disjoint
/// cycles `moves` contains.
pub fn resolve(moves: Vec<(MReg, MReg, Ty)>, scratch: MReg, func_name: &str) -> CodegenResult<Vec<MInstr>> {
    let moves = moves.into_iter().map(|(s, d, ty)| (Loc::Reg(s), d, ty)).collect();
    resolve_locs(moves, scratch, func_name, |ty, src, dst| {
        let src = src.as_reg().expect("resolve() never introduces a stack-resident move source");
        MInstr::Mmove { ty, src, dst }
    })
}

/// Generalisation of `resolve` whose move sources may be either a register
/// or a spilled pseudo-register's stack slot (as with a call argument
/// staged straight out of a spill slot into its ABI home register). A
/// stack-resident source can never be part of a genuine cycle — nothing in
/// this batch ever writes back to memory — so it only ever has to wait for
/// its home register to stop being read by another pending move, which the
/// same safe-move/cycle-break loop `resolve` uses already handles without
/// change: the safety check only inspects destinations, and the cycle
/// break's self-redirect converts a stalled stack source into a register
/// source (through `scratch`) so it becomes resolvable on the next pass.
pub fn resolve_locs<T>(
    mut moves: Vec<(Loc, MReg, Ty)>,
    scratch: MReg,
    func_name: &str,
    mut mk: impl FnMut(Ty, Loc, MReg) -> T,
) -> CodegenResult<Vec<T>> {
    let mut out = Vec::new();
    // Bounded by `moves.len()` emissions-or-breaks per outstanding move;
    // a real cycle breaks in one step, so this only trips if `moves`
    // itself is malformed (e.g. two entries writing the same destination).
    let budget = moves.len() * moves.len() + moves.len() + 1;
    let mut steps = 0usize;

    while !moves.is_empty() {
        steps += 1;
        if steps > budget {
            return Err(CodegenError::ScratchExhaustion {
                function: func_name.to_string(),
                detail: "parallel-move resolver made no progress; pending moves form an unresolvable conflict".to_string(),
            });
        }

        let safe = moves.iter().position(|(_, d, _)| !moves.iter().any(|(s2, _, _)| s2.as_reg() == Some(*d)));
        if let Some(i) = safe {
            let (s, d, ty) = moves.remove(i);
            out.push(mk(ty, s, d));
            continue;
        }

        // Every remaining destination is also read by some other pending
        // move: a cycle. Break it by staging the first pending move's
        // source through `scratch`, then redirecting every move that reads
        // that same source to read `scratch` instead; this includes the picked move itself, which becomes
        // unblocked once nothing else still depends on its original
        // source register.
        let (s0, _, ty0) = moves[0];
        out.push(mk(ty0, s0, scratch));
        for m in moves.iter_mut() {
            if m.0 == s0 {
                m.0 = Loc::Reg(scratch);
            }
        }
    }

    Ok(out)
}
