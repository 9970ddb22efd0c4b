//! Iterated Register Coalescing (Briggs/George).
//!
//! Grounded on `register_allocator.rs`'s worklist structure
//! (`simplify_worklist`/`freeze_worklist`/`spill_worklist`,
//! `worklist_moves`/`active_moves`/`coalesced_moves`/`constrained_moves`/
//! `frozen_moves`) and its `coalesce_registers`/`color_interference_graph`
//! shape, generalized here to run once per register class (integer,
//! float) since the two never share a color space.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::entities::PReg;
use crate::ir::mreg::MReg;
use crate::regalloc::graph::RegGraph;

/// The outcome of allocation for one register class: a color (by index
/// into the class's color table) for every non-spilled node, and the set
/// of nodes that could not be colored and must live on the stack.
pub struct ColoringResult {
    pub colors: FxHashMap<PReg, usize>,
    pub spilled: FxHashSet<PReg>,
    /// Coalesced-away nodes, mapped to the representative node that
    /// survived coalescing and was actually colored (or spilled).
    pub alias: FxHashMap<PReg, PReg>,
}

struct Move {
    src: PReg,
    dst: PReg,
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum MoveState {
    Worklist,
    Active,
    Coalesced,
    Constrained,
    Frozen,
}

struct Allocator<'a> {
    graph: &'a RegGraph,
    nodes: Vec<PReg>,
    in_class: FxHashSet<PReg>,
    k: usize,
    first_callee_saved_color: usize,
    live_across_calls: &'a FxHashSet<PReg>,
    /// Parameter pseudo-registers precolored to their ABI arrival register
    ///: never pushed onto any worklist, never recolored,
    /// and always the coalescing survivor (`u`, never `v`) when a move
    /// names one as an endpoint.
    precolored: &'a FxHashMap<PReg, usize>,

    degree: FxHashMap<PReg, usize>,
    alias: FxHashMap<PReg, PReg>,
    move_list: FxHashMap<PReg, Vec<usize>>,
    moves: Vec<Move>,
    move_state: Vec<MoveState>,

    select_stack: Vec<PReg>,
    coalesced_nodes: FxHashSet<PReg>,
    spilled_nodes: FxHashSet<PReg>,
    colored_nodes: FxHashSet<PReg>,

    simplify_worklist: Vec<PReg>,
    freeze_worklist: FxHashSet<PReg>,
    spill_worklist: FxHashSet<PReg>,
}

impl<'a> Allocator<'a> {
    fn class_neighbors(&self, r: PReg) -> Vec<PReg> {
        self.graph
            .neighbors(r)
            .filter(|n| self.in_class.contains(n))
            .collect()
    }

    fn node_moves(&self, r: PReg) -> Vec<usize> {
        self.move_list
            .get(&r)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&m| matches!(self.move_state[m], MoveState::Worklist | MoveState::Active))
            .collect()
    }

    fn move_related(&self, r: PReg) -> bool {
        !self.node_moves(r).is_empty()
    }

    fn build_worklists(&mut self) {
        for &n in &self.nodes.clone() {
            if self.precolored.contains_key(&n) {
                continue;
            }
            let d = self.degree[&n];
            if d >= self.k {
                self.spill_worklist.insert(n);
            } else if self.move_related(n) {
                self.freeze_worklist.insert(n);
            } else {
                self.simplify_worklist.push(n);
            }
        }
    }

    fn decrement_degree(&mut self, n: PReg) {
        let d = self.degree[&n];
        self.degree.insert(n, d.saturating_sub(1));
        if d == self.k {
            let mut enable = self.class_neighbors(n);
            enable.push(n);
            for m in enable {
                if self.spilled_nodes.contains(&m)
                    || self.coalesced_nodes.contains(&m)
                    || self.precolored.contains_key(&m)
                {
                    continue;
                }
                if self.move_related(m) {
                    self.spill_worklist.remove(&m);
                    self.freeze_worklist.insert(m);
                } else {
                    self.spill_worklist.remove(&m);
                    self.simplify_worklist.push(m);
                }
            }
        }
    }

    fn simplify(&mut self) {
        while let Some(n) = self.simplify_worklist.pop() {
            self.select_stack.push(n);
            for m in self.class_neighbors(n) {
                if !self.select_stack.contains(&m)
                    && !self.coalesced_nodes.contains(&m)
                    && !self.spilled_nodes.contains(&m)
                {
                    self.decrement_degree(m);
                }
            }
        }
    }

    fn get_alias(&self, n: PReg) -> PReg {
        let mut cur = n;
        while self.coalesced_nodes.contains(&cur) {
            cur = self.alias[&cur];
        }
        cur
    }

    /// Briggs' criterion: the combined node has fewer than `k` neighbors
    /// of significant (>= k) degree.
    fn briggs_ok(&self, u: PReg, v: PReg) -> bool {
        let mut adj: FxHashSet<PReg> = self.class_neighbors(u).into_iter().collect();
        adj.extend(self.class_neighbors(v));
        let significant = adj.iter().filter(|&&n| self.degree[&n] >= self.k).count();
        significant < self.k
    }

    /// George's criterion: every neighbor of `u` either already interferes
    /// with `v` or has insignificant degree.
    fn george_ok(&self, u: PReg, v: PReg) -> bool {
        self.class_neighbors(u)
            .iter()
            .all(|&t| self.degree[&t] < self.k || self.graph.interferes(t, v))
    }

    fn add_edge_live(&mut self, u: PReg, v: PReg) {
        if u == v || self.graph.interferes(u, v) {
            return;
        }
        // Coalescing does not mutate the original interference graph (it
        // is shared, immutable reference data); it only raises the working
        // degree counters, mirroring `register_allocator.rs`'s treatment
        // of combined nodes.
        *self.degree.entry(u).or_insert(0) += 1;
        *self.degree.entry(v).or_insert(0) += 1;
    }

    fn combine(&mut self, u: PReg, v: PReg) {
        if self.freeze_worklist.contains(&v) {
            self.freeze_worklist.remove(&v);
        } else {
            self.spill_worklist.remove(&v);
        }
        self.coalesced_nodes.insert(v);
        self.alias.insert(v, u);

        let v_moves = self.move_list.get(&v).cloned().unwrap_or_default();
        self.move_list.entry(u).or_default().extend(v_moves);

        for t in self.class_neighbors(v) {
            self.add_edge_live(t, u);
            self.decrement_degree(t);
        }

        if self.degree[&u] >= self.k && self.freeze_worklist.contains(&u) {
            self.freeze_worklist.remove(&u);
            self.spill_worklist.insert(u);
        }
    }

    fn coalesce(&mut self) {
        let worklist: Vec<usize> = (0..self.moves.len())
            .filter(|&i| self.move_state[i] == MoveState::Worklist)
            .collect();
        let Some(&idx) = worklist.first() else { return };
        let (x, y) = (self.moves[idx].src, self.moves[idx].dst);
        let mut x = self.get_alias(x);
        let mut y = self.get_alias(y);
        // A precolored node is always the coalescing survivor: combining
        // must never erase a parameter's fixed ABI color.
        if self.precolored.contains_key(&y) && !self.precolored.contains_key(&x) {
            std::mem::swap(&mut x, &mut y);
        }

        if x == y {
            self.move_state[idx] = MoveState::Coalesced;
        } else if self.precolored.contains_key(&y) {
            // Two distinct precolored nodes can never be coalesced into one.
            self.move_state[idx] = MoveState::Constrained;
        } else if self.graph.interferes(x, y) {
            self.move_state[idx] = MoveState::Constrained;
        } else {
            let ok = if self.precolored.contains_key(&x) {
                // Briggs' criterion assumes both endpoints have finite,
                // comparable degree; a precolored node's "degree" is just
                // its real interference count, so George's criterion (every
                // neighbor of the absorbed node is already safe) is the
                // only one that applies when merging into a fixed color.
                self.george_ok(x, y)
            } else {
                self.briggs_ok(x, y) || self.george_ok(x, y)
            };
            if ok {
                self.move_state[idx] = MoveState::Coalesced;
                self.combine(x, y);
            } else {
                self.move_state[idx] = MoveState::Active;
            }
        }
    }

    fn freeze_moves(&mut self, u: PReg) {
        for m in self.node_moves(u) {
            self.move_state[m] = MoveState::Frozen;
        }
    }

    fn freeze(&mut self) {
        let Some(&n) = self.freeze_worklist.iter().next() else { return };
        self.freeze_worklist.remove(&n);
        self.simplify_worklist.push(n);
        self.freeze_moves(n);
    }

    fn select_spill(&mut self) {
        // Spill the highest-degree candidate: a reasonable static heuristic
        // in the absence of per-node spill-cost weighting (no loop-nesting
        // information is available at this IR layer).
        let n = *self
            .spill_worklist
            .iter()
            .max_by_key(|&&n| self.degree[&n])
            .expect("select_spill called on empty spill worklist");
        self.spill_worklist.remove(&n);
        self.simplify_worklist.push(n);
        self.freeze_moves(n);
    }

    fn run_worklists(&mut self) {
        loop {
            if !self.simplify_worklist.is_empty() {
                self.simplify();
            } else if self.moves.iter().enumerate().any(|(i, _)| self.move_state[i] == MoveState::Worklist)
            {
                self.coalesce();
            } else if !self.freeze_worklist.is_empty() {
                self.freeze();
            } else if !self.spill_worklist.is_empty() {
                self.select_spill();
            } else {
                break;
            }
        }
    }

    fn assign_colors(&mut self) -> FxHashMap<PReg, usize> {
        // Precolored parameters are already fixed before the first pop off
        // `select_stack`: they never entered any worklist, so they would
        // otherwise never receive an entry in `colors` at all.
        let mut colors: FxHashMap<PReg, usize> = self.precolored.clone();
        while let Some(n) = self.select_stack.pop() {
            let mut used: FxHashSet<usize> = FxHashSet::default();
            for w in self.graph.neighbors(n) {
                let alias = self.get_alias(w);
                if let Some(&c) = colors.get(&alias) {
                    used.insert(c);
                }
            }

            let must_be_callee_saved = self.live_across_calls.contains(&n);
            let candidate_range: Box<dyn Iterator<Item = usize>> = if must_be_callee_saved {
                Box::new(self.first_callee_saved_color..self.k)
            } else {
                Box::new(0..self.k)
            };
            let chosen = candidate_range.into_iter().find(|c| !used.contains(c));

            match chosen {
                Some(c) => {
                    colors.insert(n, c);
                    self.colored_nodes.insert(n);
                }
                None => {
                    self.spilled_nodes.insert(n);
                }
            }
        }

        for &n in &self.coalesced_nodes.clone() {
            let alias = self.get_alias(n);
            if let Some(&c) = colors.get(&alias) {
                colors.insert(n, c);
            } else if self.spilled_nodes.contains(&alias) {
                self.spilled_nodes.insert(n);
            }
        }

        colors
    }
}

/// Run IRC for one register class.
///
/// `nodes` must all be pseudo-registers of the same class (all-integer or
/// all-float), and must include any `precolored` entries (a precolored
/// node still needs its real degree counted so other nodes avoid its
/// fixed color); `move_candidates` is filtered to same-class pairs
/// internally. `colors.len()` is `k`; `first_callee_saved_color` is the
/// index into `colors` where the callee-saved registers begin — see
/// `MReg::FIRST_CALLEE_SAVED_INT_COLOR`. `precolored` maps a parameter
/// pseudo-register already fixed to its ABI arrival register to that register's color index; such nodes are never
/// (re)colored by this pass, only ever the survivor of a coalesce.
pub fn allocate(
    graph: &RegGraph,
    nodes: &[PReg],
    move_candidates: &[(PReg, PReg)],
    colors: &[MReg],
    first_callee_saved_color: usize,
    live_across_calls: &FxHashSet<PReg>,
    precolored: &FxHashMap<PReg, usize>,
) -> ColoringResult {
    let in_class: FxHashSet<PReg> = nodes.iter().copied().collect();
    let k = colors.len();

    let mut degree = FxHashMap::default();
    for &n in nodes {
        let d = graph.neighbors(n).filter(|m| in_class.contains(m)).count();
        degree.insert(n, d);
    }

    let moves: Vec<Move> = move_candidates
        .iter()
        .filter(|(s, d)| in_class.contains(s) && in_class.contains(d))
        .map(|&(src, dst)| Move { src, dst })
        .collect();
    let move_state = vec![MoveState::Worklist; moves.len()];
    let mut move_list: FxHashMap<PReg, Vec<usize>> = FxHashMap::default();
    for (i, m) in moves.iter().enumerate() {
        move_list.entry(m.src).or_default().push(i);
        move_list.entry(m.dst).or_default().push(i);
    }

    let mut alloc = Allocator {
        graph,
        nodes: nodes.to_vec(),
        in_class,
        k,
        first_callee_saved_color,
        live_across_calls,
        precolored,
        degree,
        alias: FxHashMap::default(),
        move_list,
        moves,
        move_state,
        select_stack: Vec::new(),
        coalesced_nodes: FxHashSet::default(),
        spilled_nodes: FxHashSet::default(),
        colored_nodes: FxHashSet::default(),
        simplify_worklist: Vec::new(),
        freeze_worklist: FxHashSet::default(),
        spill_worklist: FxHashSet::default(),
    };

    alloc.build_worklists();
    alloc.run_worklists();
    let colors_map = alloc.assign_colors();

    ColoringResult {
        colors: colors_map,
        spilled: alloc.spilled_nodes,
        alias: alloc.alias,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::mreg::MReg;

    fn colors(n: usize) -> Vec<MReg> {
        (0..n as u8).map(MReg::X).collect()
    }

    #[test]
    fn two_interfering_nodes_get_distinct_colors() {
        let mut graph = RegGraph::default();
        let a = PReg::new(0);
        let b = PReg::new(1);
        graph.add_edge(a, b);

        let result = allocate(&graph, &[a, b], &[], &colors(2), 2, &FxHashSet::default(), &FxHashMap::default());
        assert!(result.spilled.is_empty());
        assert_ne!(result.colors[&a], result.colors[&b]);
    }

    #[test]
    fn a_move_pair_with_no_interference_coalesces_to_one_color() {
        let mut graph = RegGraph::default();
        let a = PReg::new(0);
        let b = PReg::new(1);
        graph.ensure_node(a);
        graph.ensure_node(b);

        let result = allocate(&graph, &[a, b], &[(a, b)], &colors(4), 4, &FxHashSet::default(), &FxHashMap::default());
        assert!(result.spilled.is_empty());
        // Coalesced: both endpoints end up with the same color, and one
        // aliases to the other.
        assert_eq!(result.colors[&a], result.colors[&b]);
    }

    #[test]
    fn more_mutually_interfering_nodes_than_colors_forces_a_spill() {
        let mut graph = RegGraph::default();
        let nodes: Vec<PReg> = (0..4).map(PReg::new).collect();
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                graph.add_edge(nodes[i], nodes[j]);
            }
        }

        let result = allocate(&graph, &nodes, &[], &colors(3), 3, &FxHashSet::default(), &FxHashMap::default());
        assert_eq!(result.spilled.len(), 1, "a 4-clique with only 3 colors must spill exactly one node");

        let colored: FxHashSet<_> = nodes.iter().filter(|n| !result.spilled.contains(n)).collect();
        let mut used = FxHashSet::default();
        for n in colored {
            assert!(used.insert(result.colors[n]), "two colored clique members share a color");
        }
    }

    #[test]
    fn live_across_call_node_never_gets_a_caller_saved_color() {
        let mut graph = RegGraph::default();
        let a = PReg::new(0);
        graph.ensure_node(a);

        let mut live_across_calls = FxHashSet::default();
        live_across_calls.insert(a);

        // Colors 0..2 caller-saved, 2..4 callee-saved (first_callee_saved=2).
        let result = allocate(&graph, &[a], &[], &colors(4), 2, &live_across_calls, &FxHashMap::default());
        assert!(result.spilled.is_empty());
        assert!(result.colors[&a] >= 2, "a live-across-call node must be colored from the callee-saved range");
    }

    #[test]
    fn precolored_param_keeps_its_fixed_color_and_never_spills() {
        let mut graph = RegGraph::default();
        let param = PReg::new(0);
        let other = PReg::new(1);
        graph.add_edge(param, other);

        let mut precolored = FxHashMap::default();
        precolored.insert(param, 0usize);

        let result = allocate(&graph, &[param, other], &[], &colors(2), 2, &FxHashSet::default(), &precolored);
        assert_eq!(result.colors[&param], 0);
        assert_ne!(result.colors[&other], 0, "a node interfering with a precolored param must avoid its color");
    }
}
