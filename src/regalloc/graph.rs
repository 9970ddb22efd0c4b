//! Interference and preference graphs, grounded on
//! `register_allocator.rs`'s `create_interference_graph`: a move
//! instruction's destination does **not** interfere with its own source
//! (that's exactly the pair IRC later tries to coalesce), but every other
//! instruction's destination interferes with everything else live out of
//! it.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::entities::PReg;
use crate::ir::instr::{Function, Instruction};
use crate::regalloc::liveness::Liveness;

/// An undirected graph over `PReg`s, stored as an adjacency set per node.
#[derive(Default)]
pub struct RegGraph {
    adjacency: FxHashMap<PReg, FxHashSet<PReg>>,
}

impl RegGraph {
    pub fn ensure_node(&mut self, r: PReg) {
        self.adjacency.entry(r).or_default();
    }

    pub fn add_edge(&mut self, a: PReg, b: PReg) {
        if a == b {
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    pub fn remove_edge(&mut self, a: PReg, b: PReg) {
        if let Some(n) = self.adjacency.get_mut(&a) {
            n.remove(&b);
        }
        if let Some(n) = self.adjacency.get_mut(&b) {
            n.remove(&a);
        }
    }

    pub fn neighbors(&self, r: PReg) -> impl Iterator<Item = PReg> + '_ {
        self.adjacency.get(&r).into_iter().flatten().copied()
    }

    pub fn degree(&self, r: PReg) -> usize {
        self.adjacency.get(&r).map_or(0, |s| s.len())
    }

    pub fn interferes(&self, a: PReg, b: PReg) -> bool {
        self.adjacency.get(&a).is_some_and(|s| s.contains(&b))
    }

    pub fn nodes(&self) -> impl Iterator<Item = PReg> + '_ {
        self.adjacency.keys().copied()
    }
}

/// Build the interference graph and the move-preference graph for `func`
/// in one pass over its instructions and liveness sets.
///
/// Returns `(interference, preferences)`. `preferences` pairs are the
/// (src, dst) of every `Move` instruction, used by `irc::coalesce` as
/// candidates; they are not graph edges in the interference sense.
pub fn build(func: &Function, liveness: &Liveness) -> (RegGraph, Vec<(PReg, PReg)>) {
    let mut graph = RegGraph::default();
    let mut moves = Vec::new();

    for param in &func.params {
        graph.ensure_node(param.reg);
    }

    for (id, instr) in func.nodes_in_order() {
        for r in instr.use_regs() {
            graph.ensure_node(r);
        }
        if let Some(d) = instr.def_reg() {
            graph.ensure_node(d);
        }

        let out = &liveness.live_out[id];
        for &r in out.iter() {
            graph.ensure_node(r);
        }

        let Some(def) = instr.def_reg() else { continue };

        let move_src = match instr {
            Instruction::Iop { op, args, .. } if op.is_move() => args.first().copied(),
            _ => None,
        };
        if let Some(src) = move_src {
            moves.push((src, def));
        }

        for &live in out.iter() {
            if live == def {
                continue;
            }
            // A move's own source does not interfere with its destination:
            // the whole point of coalescing is that they may end up sharing
            // a color.
            if move_src == Some(live) {
                continue;
            }
            graph.add_edge(def, live);
        }
    }

    // Parameter conservatism: a parameter arrives in a
    // fixed ABI register before its first use, so treat every parameter
    // pseudo-register that is read anywhere as maximally constrained —
    // interfering with every other node in the graph — rather than trying
    // to track the narrower window during which it actually occupies that
    // register.
    let mut used: FxHashSet<PReg> = FxHashSet::default();
    for (_, instr) in func.nodes_in_order() {
        used.extend(instr.use_regs());
    }
    let all_nodes: Vec<PReg> = graph.nodes().collect();
    for param in &func.params {
        if !used.contains(&param.reg) {
            continue;
        }
        for &other in &all_nodes {
            graph.add_edge(param.reg, other);
        }
    }

    (graph, moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::Ty;

    #[test]
    fn add_edge_is_symmetric_and_ignores_self_loops() {
        let mut g = RegGraph::default();
        let a = PReg::new(0);
        let b = PReg::new(1);
        g.add_edge(a, b);
        assert!(g.interferes(a, b));
        assert!(g.interferes(b, a));
        assert_eq!(g.degree(a), 1);
        assert_eq!(g.degree(b), 1);

        g.add_edge(a, a);
        assert_eq!(g.degree(a), 1, "a self-loop must not add an edge or inflate degree");
    }

    #[test]
    fn remove_edge_is_symmetric() {
        let mut g = RegGraph::default();
        let a = PReg::new(0);
        let b = PReg::new(1);
        g.add_edge(a, b);
        g.remove_edge(a, b);
        assert!(!g.interferes(a, b));
        assert!(!g.interferes(b, a));
    }

    #[test]
    fn move_source_does_not_interfere_with_its_own_destination() {
        // r0 = param; r1 = move r0; return r1 — r0 is live out of the move
        // but must not gain an interference edge with r1, since the whole
        // point of coalescing is that they can share a color.
        let mut b = crate::ir::builder::FunctionBuilder::new("movetest");
        let r0 = b.add_param(Ty::I32);
        let r1 = b.new_preg(Ty::I32);

        let n0 = b.reserve_node();
        let n1 = b.reserve_node();
        b.define_node(
            n0,
            Instruction::Iop { op: crate::ir::op::Op::Move, args: vec![r0], dst: r1, next: n1 },
        );
        b.define_node(n1, Instruction::Ireturn { value: Some(r1) });
        b.set_entry(n0);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        let liveness = crate::regalloc::liveness::analyze(&func);
        let (graph, moves) = build(&func, &liveness);
        assert!(moves.contains(&(r0, r1)));
        assert!(!graph.interferes(r0, r1), "a move's src/dst must not interfere");
    }

    #[test]
    fn a_used_parameter_interferes_with_every_other_node() {
        // Two independent values computed from the same parameter: the
        // parameter must end up interfering with both, per the
        // conservative "parameter occupies a fixed ABI register throughout"
        // treatment.
        let mut b = crate::ir::builder::FunctionBuilder::new("paramtest");
        let p = b.add_param(Ty::I32);
        let x = b.new_preg(Ty::I32);
        let y = b.new_preg(Ty::I32);
        let sum = b.new_preg(Ty::I32);

        let n0 = b.reserve_node();
        let n1 = b.reserve_node();
        let n2 = b.reserve_node();
        let n3 = b.reserve_node();
        b.define_node(n0, Instruction::Iop { op: crate::ir::op::Op::AddImm(1), args: vec![p], dst: x, next: n1 });
        b.define_node(n1, Instruction::Iop { op: crate::ir::op::Op::AddImm(2), args: vec![p], dst: y, next: n2 });
        b.define_node(n2, Instruction::Iop { op: crate::ir::op::Op::Add, args: vec![x, y], dst: sum, next: n3 });
        b.define_node(n3, Instruction::Ireturn { value: Some(sum) });
        b.set_entry(n0);
        b.set_return_type(Some(Ty::I32));
        let func = b.finish();

        let liveness = crate::regalloc::liveness::analyze(&func);
        let (graph, _moves) = build(&func, &liveness);
        assert!(graph.interferes(p, x));
        assert!(graph.interferes(p, y));
    }
}
