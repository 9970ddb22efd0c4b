//! CFG-to-sequence linearization: order blocks by
//! reverse postorder, assign each a fresh label, then emit with
//! fall-through awareness so a branch to the immediately-following block
//! is omitted rather than materialized as a `goto`.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::entities::{Label, Node};
use crate::located::function::{LFunction, LInstruction};
use crate::linear::function::{LinInstr, LinearFunction};
use crate::settings::Flags;

/// DFS from `func.entry`, emitted in postorder and then reversed; any node
/// unreachable from the entry (should not occur in well-formed input, but
/// is not itself a `MalformedIr` condition) is
/// appended afterwards in ascending `Node` order. Grounded on
/// `liveness::reverse_postorder`'s identical traversal over the CFG-IR
/// layer, reused here one layer downstream.
fn reverse_postorder(func: &LFunction) -> Vec<Node> {
    let mut visited = FxHashSet::default();
    let mut postorder = Vec::new();

    fn visit(func: &LFunction, node: Node, visited: &mut FxHashSet<Node>, postorder: &mut Vec<Node>) {
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

    let mut rest: Vec<Node> = func.nodes.keys().filter(|n| !visited.contains(n)).collect();
    rest.sort();
    postorder.extend(rest);
    postorder
}

/// Whether the edge to `succ` needs an explicit `Lgoto`, given that the
/// current node sits at `order[i]`.
fn needs_goto(i: usize, order: &[Node], succ: Node) -> bool {
    order.get(i + 1) != Some(&succ)
}

fn emit_one(
    instr: &LInstruction,
    i: usize,
    order: &[Node],
    labels: &FxHashMap<Node, Label>,
    flags: &Flags,
    out: &mut Vec<LinInstr>,
) {
    macro_rules! fallthrough {
        ($next:expr) => {
            if needs_goto(i, order, $next) {
                out.push(LinInstr::Lgoto(labels[&$next]));
            }
        };
    }

    match instr {
        LInstruction::Lnop { next } => {
            out.push(LinInstr::Lnop);
            fallthrough!(*next);
        }
        LInstruction::Lmove { ty, src, dst, next } => {
            out.push(LinInstr::Lmove { ty: *ty, src: *src, dst: *dst });
            fallthrough!(*next);
        }
        LInstruction::Lop { op, args, dst, next } => {
            out.push(LinInstr::Lop { op: op.clone(), args: args.clone(), dst: *dst });
            fallthrough!(*next);
        }
        LInstruction::Lload { chunk, addr, dst, next } => {
            out.push(LinInstr::Lload { chunk: *chunk, addr: addr.clone(), dst: *dst });
            fallthrough!(*next);
        }
        LInstruction::Lstore { chunk, addr, src, next } => {
            out.push(LinInstr::Lstore { chunk: *chunk, addr: addr.clone(), src: *src });
            fallthrough!(*next);
        }
        LInstruction::Lcall { target, args, dst, ty, next } => {
            out.push(LinInstr::Lcall {
                target: target.clone(),
                args: args.clone(),
                dst: *dst,
                ty: *ty,
            });
            fallthrough!(*next);
        }
        LInstruction::Lbuiltin { name, args, dst, ty, next } => {
            out.push(LinInstr::Lbuiltin {
                name: name.clone(),
                args: args.clone(),
                dst: *dst,
                ty: *ty,
            });
            fallthrough!(*next);
        }
        LInstruction::Ltailcall { target, args } => {
            out.push(LinInstr::Ltailcall { target: target.clone(), args: args.clone() });
        }
        LInstruction::Lcond { cond, args, ifso, ifnot } => {
            // If the true side, not the false side, is the block that
            // falls through, negating the test lets that side fall
            // through too instead of paying for a `Bcond` over a `Lgoto`
            //.
            if flags.negate_for_fallthrough() && !needs_goto(i, order, *ifso) && needs_goto(i, order, *ifnot) {
                out.push(LinInstr::Lcond {
                    cond: cond.negate(),
                    args: args.clone(),
                    ifso: labels[ifnot],
                });
                fallthrough!(*ifso);
            } else {
                out.push(LinInstr::Lcond {
                    cond: *cond,
                    args: args.clone(),
                    ifso: labels[ifso],
                });
                fallthrough!(*ifnot);
            }
        }
        LInstruction::Ljumptable { index, targets, default } => {
            out.push(LinInstr::Ljumptable {
                index: *index,
                targets: targets.iter().map(|n| labels[n]).collect(),
                default: labels[default],
            });
        }
        LInstruction::Lreturn { value } => {
            out.push(LinInstr::Lreturn { value: *value });
        }
    }
}

/// Flatten `func` into a `LinearFunction`. The result still
/// needs `tunnel` and `remove_dead_labels` run over it before it is ready
/// for stacking.
pub fn linearize(func: &LFunction, flags: &Flags) -> LinearFunction {
    let order = reverse_postorder(func);
    log::trace!("linearize: `{}` ordered into {} block(s)", func.name, order.len());

    let mut labels = FxHashMap::default();
    for (i, &n) in order.iter().enumerate() {
        labels.insert(n, Label::from_u32(i as u32));
    }

    let mut body = Vec::with_capacity(order.len() * 2);
    for (i, &n) in order.iter().enumerate() {
        body.push(LinInstr::Llabel(labels[&n]));
        emit_one(&func.nodes[n], i, &order, &labels, flags, &mut body);
    }

    LinearFunction {
        name: func.name.clone(),
        params: func.params.clone(),
        ret_ty: func.ret_ty,
        body,
        stack_size: func.stack_size,
        spill_slot_count: func.spill_slot_count,
        spill_types: func.spill_types.clone(),
    }
}
