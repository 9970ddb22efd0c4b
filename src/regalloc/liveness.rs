//! Liveness analysis over a CFG-IR function. A standard
//! backward, iterate-to-fixpoint dataflow problem; grounded on the
//! structure of `register_allocator.rs`'s `liveness_analysis` (reverse
//! postorder iteration with a changed-flag loop) from the corpus rather
//! than on any forward/SSA-based liveness scheme.

use cranelift_entity::SecondaryMap;
use rustc_hash::FxHashSet;

use crate::ir::entities::{Node, PReg};
use crate::ir::instr::Function;

/// `live_in`/`live_out` sets for every node in a function.
pub struct Liveness {
    pub live_in: SecondaryMap<Node, FxHashSet<PReg>>,
    pub live_out: SecondaryMap<Node, FxHashSet<PReg>>,
}

/// Reverse postorder over the CFG-IR graph, computed by a DFS from `entry`
/// and reversing the postorder. Nodes unreachable from `entry` (dead code
/// a front-end emitted but never wired up) are appended afterwards in `Node`
/// order so every node still gets a liveness entry.
fn reverse_postorder(func: &Function) -> Vec<Node> {
    let mut visited = FxHashSet::default();
    let mut postorder = Vec::new();

    fn visit(
        func: &Function,
        node: Node,
        visited: &mut FxHashSet<Node>,
        postorder: &mut Vec<Node>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for succ in func.nodes[node].successors() {
            visit(func, succ, visited, postorder);
        }
        postorder.push(node);
    }

    visit(func, func.entry, &mut visited, &mut postorder);
    postorder.reverse();

    for (id, _) in func.nodes_in_order() {
        if !visited.contains(&id) {
            postorder.push(id);
        }
    }
    postorder
}

/// Compute liveness for `func` by iterating the standard
/// `live_in[n] = use[n] U (live_out[n] - def[n])`,
/// `live_out[n] = U live_in[s]` for successors `s`
/// equations to a fixpoint over reverse postorder.
pub fn analyze(func: &Function) -> Liveness {
    let order = reverse_postorder(func);
    let mut live_in: SecondaryMap<Node, FxHashSet<PReg>> = SecondaryMap::new();
    let mut live_out: SecondaryMap<Node, FxHashSet<PReg>> = SecondaryMap::new();

    let mut changed = true;
    while changed {
        changed = false;
        // Walk in reverse of the forward RPO so a node's successors (which
        // for back edges may appear later in `order`) have usually already
        // been refreshed this pass, speeding convergence.
        for &id in order.iter().rev() {
            let instr = &func.nodes[id];

            let mut out = FxHashSet::default();
            for succ in instr.successors() {
                out.extend(live_in[succ].iter().copied());
            }

            let def = instr.def_reg();
            let mut new_in = instr.use_regs().into_iter().collect::<FxHashSet<_>>();
            for &r in out.iter() {
                if Some(r) != def {
                    new_in.insert(r);
                }
            }

            if live_out[id] != out {
                live_out[id] = out;
                changed = true;
            }
            if live_in[id] != new_in {
                live_in[id] = new_in;
                changed = true;
            }
        }
    }

    Liveness { live_in, live_out }
}

/// Pseudo-registers live across at least one call-family instruction
/// (`Icall`/`Ibuiltin`): those are the ones the coloring pass must not
/// place below `FIRST_CALLEE_SAVED_*_COLOR` unless the color itself is
/// callee-saved.
pub fn live_across_calls(func: &Function, liveness: &Liveness) -> FxHashSet<PReg> {
    let mut result = FxHashSet::default();
    for (id, instr) in func.nodes_in_order() {
        if !instr.is_call() {
            continue;
        }
        let def = instr.def_reg();
        for &r in liveness.live_out[id].iter() {
            if Some(r) != def {
                result.insert(r);
            }
        }
    }
    result
}
