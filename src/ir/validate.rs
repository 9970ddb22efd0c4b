//! Pre-allocator well-formedness checks.
//!
//! `regalloc::apply::apply` runs this before touching liveness or the
//! interference graph: both of those passes index straight into
//! `func.nodes` and would otherwise panic (via `cranelift_entity`'s
//! `Index` impl) on a successor that doesn't exist, rather than
//! surfacing a structured `CodegenError`.

use cranelift_entity::EntityRef;
use rustc_hash::FxHashSet;

use crate::ir::entities::{Node, PReg};
use crate::ir::instr::Function;
use crate::result::{CodegenError, CodegenResult};

fn malformed(func: &Function, node: impl std::fmt::Display, detail: impl Into<String>) -> CodegenError {
    CodegenError::MalformedIr {
        function: func.name.clone(),
        node: node.to_string(),
        detail: detail.into(),
    }
}

/// Checks that every CFG node referenced as a successor exists in the
/// function's code map, that the entry node itself is a member, and that
/// every used pseudo-register has a defining write somewhere in the
/// function.
pub fn validate(func: &Function) -> CodegenResult<()> {
    let node_exists = |n: Node| n.index() < func.nodes.len();

    if !node_exists(func.entry) {
        return Err(malformed(
            func,
            func.entry,
            format!("entry node {} is not present in the function's code map", func.entry),
        ));
    }

    for (id, instr) in func.nodes_in_order() {
        for succ in instr.successors() {
            if !node_exists(succ) {
                return Err(malformed(
                    func,
                    id,
                    format!("successor {succ} named by node {id} is not present in the function's code map"),
                ));
            }
        }
    }

    let mut defined: FxHashSet<PReg> = func.params.iter().map(|p| p.reg).collect();
    for (_, instr) in func.nodes_in_order() {
        if let Some(d) = instr.def_reg() {
            defined.insert(d);
        }
    }

    for (id, instr) in func.nodes_in_order() {
        for used in instr.use_regs() {
            if !defined.contains(&used) {
                return Err(malformed(
                    func,
                    id,
                    format!("pseudo-register {used} is used at node {id} with no defining instruction anywhere in `{}`", func.name),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::FunctionBuilder;
    use crate::ir::instr::Instruction;
    use crate::ir::op::Op;
    use crate::ir::types::Ty;

    #[test]
    fn well_formed_function_passes() {
        let mut b = FunctionBuilder::new("f");
        let r0 = b.add_param(Ty::I32);
        let n0 = b.reserve_node();
        b.define_node(n0, Instruction::Ireturn { value: Some(r0) });
        b.set_entry(n0);
        let func = b.finish();
        assert!(validate(&func).is_ok());
    }

    #[test]
    fn successor_to_nonexistent_node_is_rejected() {
        let mut b = FunctionBuilder::new("f");
        let n0 = b.reserve_node();
        // `next` names a `Node` id that was never reserved in this
        // function's map.
        b.define_node(n0, Instruction::Inop { next: Node::from_u32(99) });
        b.set_entry(n0);
        let func = b.finish();

        let err = validate(&func).unwrap_err();
        assert!(matches!(err, CodegenError::MalformedIr { .. }));
    }

    #[test]
    fn use_without_any_defining_instruction_is_rejected() {
        let mut b = FunctionBuilder::new("f");
        let ghost = b.new_preg(Ty::I32);
        let n0 = b.reserve_node();
        b.define_node(n0, Instruction::Ireturn { value: Some(ghost) });
        b.set_entry(n0);
        let func = b.finish();

        let err = validate(&func).unwrap_err();
        assert!(matches!(err, CodegenError::MalformedIr { .. }));
    }

    #[test]
    fn op_reads_from_its_own_def_target_before_any_write_is_rejected() {
        let mut b = FunctionBuilder::new("f");
        let r0 = b.new_preg(Ty::I32);
        let n0 = b.reserve_node();
        let n1 = b.reserve_node();
        b.define_node(
            n0,
            Instruction::Iop { op: Op::Add, args: vec![r0, r0], dst: r0, next: n1 },
        );
        b.define_node(n1, Instruction::Ireturn { value: Some(r0) });
        b.set_entry(n0);
        let func = b.finish();

        // `r0` is used by `n0` itself and is its own `dst`; the
        // over-approximate "defined anywhere" check used here accepts
        // this (a full reaching-definitions analysis would not), which
        // is deliberate: see DESIGN.md.
        assert!(validate(&func).is_ok());
    }
}
