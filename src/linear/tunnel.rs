//! Branch tunnelling and dead-label cleanup.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::entities::Label;
use crate::linear::function::{LinInstr, LinearFunction};

/// `L -> L'` for every label `L` immediately followed by `Lgoto{L'}` — a
/// block whose entire body is an unconditional jump.
fn follow_map(body: &[LinInstr]) -> FxHashMap<Label, Label> {
    let mut map = FxHashMap::default();
    for w in body.windows(2) {
        if let (LinInstr::Llabel(l), LinInstr::Lgoto(target)) = (&w[0], &w[1]) {
            map.insert(*l, *target);
        }
    }
    map
}

/// Resolve every chain `L -> L' -> L'' -> ...` in `follow` to its final
/// target, stopping (and returning the repeated label) if a cycle is
/// encountered rather than looping forever.
fn resolve_chains(follow: &FxHashMap<Label, Label>) -> FxHashMap<Label, Label> {
    let mut resolved = FxHashMap::default();
    for &start in follow.keys() {
        let mut seen = FxHashSet::default();
        let mut cur = start;
        while let Some(&next) = follow.get(&cur) {
            if !seen.insert(cur) {
                break;
            }
            cur = next;
        }
        resolved.insert(start, cur);
    }
    resolved
}

/// Rewrite every `Lgoto`, `Lcond.ifso`, and `Ljumptable` target through the
/// tunnelled-chain resolution.
pub fn tunnel(func: &mut LinearFunction) {
    let follow = follow_map(&func.body);
    let resolved = resolve_chains(&follow);
    for instr in func.body.iter_mut() {
        instr.map_targets(|l| resolved.get(&l).copied().unwrap_or(l));
    }
}

/// Delete every `Llabel` not named as a target by some `Lgoto`/`Lcond`/
/// `Ljumptable`, except the function's entry label.
pub fn remove_dead_labels(func: &mut LinearFunction) {
    let mut referenced: FxHashSet<Label> = FxHashSet::default();
    for instr in &func.body {
        referenced.extend(instr.targets());
    }
    if let Some(LinInstr::Llabel(entry)) = func.body.first() {
        referenced.insert(*entry);
    }
    func.body.retain(|instr| !matches!(instr, LinInstr::Llabel(l) if !referenced.contains(l)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::entities::Label;
    use crate::located::function::LParam;

    fn lbl(n: u32) -> Label {
        Label::from_u32(n)
    }

    fn bare_func(body: Vec<LinInstr>) -> LinearFunction {
        LinearFunction {
            name: "f".into(),
            params: Vec::<LParam>::new(),
            ret_ty: None,
            body,
            stack_size: 0,
            spill_slot_count: 0,
            spill_types: Vec::new(),
        }
    }

    #[test]
    fn tunnelling_follows_chain_to_final_target() {
        // L0: goto L1 ; L1: goto L2 ; L2: goto L3 ; L3: return
        let mut f = bare_func(vec![
            LinInstr::Llabel(lbl(0)),
            LinInstr::Lgoto(lbl(1)),
            LinInstr::Llabel(lbl(1)),
            LinInstr::Lgoto(lbl(2)),
            LinInstr::Llabel(lbl(2)),
            LinInstr::Lgoto(lbl(3)),
            LinInstr::Llabel(lbl(3)),
            LinInstr::Lreturn { value: None },
            // An external caller's goto L0, standing in for another block.
            LinInstr::Lgoto(lbl(0)),
        ]);
        tunnel(&mut f);
        assert_eq!(f.body[f.body.len() - 1], LinInstr::Lgoto(lbl(3)));
    }

    #[test]
    fn tunnelling_terminates_on_a_cycle() {
        // L0: goto L1 ; L1: goto L0  (no escape)
        let mut f = bare_func(vec![
            LinInstr::Llabel(lbl(0)),
            LinInstr::Lgoto(lbl(1)),
            LinInstr::Llabel(lbl(1)),
            LinInstr::Lgoto(lbl(0)),
        ]);
        tunnel(&mut f);
        // Must terminate (this assertion running at all is the point);
        // whichever label it resolves to must exist in the function.
        assert!(f.body.iter().any(|i| matches!(i, LinInstr::Llabel(_))));
    }

    #[test]
    fn dead_labels_are_removed_but_entry_is_kept() {
        let mut f = bare_func(vec![
            LinInstr::Llabel(lbl(0)),
            LinInstr::Lgoto(lbl(2)),
            LinInstr::Llabel(lbl(1)), // unreferenced, not entry: removed
            LinInstr::Lreturn { value: None },
            LinInstr::Llabel(lbl(2)), // referenced: kept
            LinInstr::Lreturn { value: None },
        ]);
        remove_dead_labels(&mut f);
        assert!(!f.body.contains(&LinInstr::Llabel(lbl(1))));
        assert!(f.body.contains(&LinInstr::Llabel(lbl(0))));
        assert!(f.body.contains(&LinInstr::Llabel(lbl(2))));
    }
}
