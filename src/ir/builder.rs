//! A small imperative builder for CFG-IR functions. Modelled after
//! the reserve-then-fill pattern `cranelift_codegen::ir::Function` callers
//! use when a node's successor must be named before the successor itself
//! has been built.

use cranelift_entity::{EntityRef, PrimaryMap};
use std::collections::BTreeMap;

use crate::ir::entities::{Node, PReg};
use crate::ir::instr::{Function, Instruction, Param};
use crate::ir::types::Ty;

pub struct FunctionBuilder {
    name: String,
    params: Vec<Param>,
    ret_ty: Option<Ty>,
    nodes: PrimaryMap<Node, Instruction>,
    preg_tys: PrimaryMap<PReg, Ty>,
    entry: Option<Node>,
    stack_size: i64,
    reg_names: BTreeMap<PReg, String>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionBuilder {
            name: name.into(),
            params: Vec::new(),
            ret_ty: None,
            nodes: PrimaryMap::new(),
            preg_tys: PrimaryMap::new(),
            entry: None,
            stack_size: 0,
            reg_names: BTreeMap::new(),
        }
    }

    /// Allocate a fresh pseudo-register of the given type.
    pub fn new_preg(&mut self, ty: Ty) -> PReg {
        self.preg_tys.push(ty)
    }

    /// Declare the next formal parameter, returning its home register.
    pub fn add_param(&mut self, ty: Ty) -> PReg {
        let reg = self.new_preg(ty);
        self.params.push(Param { reg, ty });
        reg
    }

    pub fn set_return_type(&mut self, ty: Option<Ty>) {
        self.ret_ty = ty;
    }

    pub fn set_stack_size(&mut self, bytes: i64) {
        self.stack_size = bytes;
    }

    pub fn name_reg(&mut self, reg: PReg, name: impl Into<String>) {
        self.reg_names.insert(reg, name.into());
    }

    /// Reserve a `Node` slot so it can be named as a successor before its
    /// real instruction is known. The placeholder self-loops as a `Inop`;
    /// `define_node` must be called before `finish` or the placeholder
    /// survives into the built function (a builder-misuse bug, not
    /// something `finish` tries to detect on the caller's behalf).
    pub fn reserve_node(&mut self) -> Node {
        self.nodes.push(Instruction::Inop { next: Node::new(0) })
    }

    /// Fill in a previously reserved node.
    pub fn define_node(&mut self, node: Node, instr: Instruction) {
        self.nodes[node] = instr;
    }

    /// Allocate and immediately define a node in one step.
    pub fn push_node(&mut self, instr: Instruction) -> Node {
        self.nodes.push(instr)
    }

    pub fn set_entry(&mut self, node: Node) {
        self.entry = Some(node);
    }

    pub fn preg_type(&self, reg: PReg) -> Ty {
        self.preg_tys[reg]
    }

    /// Consume the builder, producing the finished `Function`.
    ///
    /// # Panics
    /// Panics if `set_entry` was never called; a function with no entry
    /// point cannot be compiled and the builder has no sensible default.
    pub fn finish(self) -> Function {
        let entry = self.entry.expect("FunctionBuilder::finish: entry node never set");
        Function {
            name: self.name,
            params: self.params,
            ret_ty: self.ret_ty,
            nodes: self.nodes,
            entry,
            stack_size: self.stack_size,
            reg_names: self.reg_names,
            reg_types: self.preg_tys,
        }
    }
}
