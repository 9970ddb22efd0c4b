//! Textual CFG-IR printer. Used by golden tests and by
//! `RUST_LOG=trace` tracing of intermediate pipeline stages; not used by any
//! lowering pass, which always walks the `PrimaryMap` directly.

use core::fmt;
use core::fmt::Write as _;

use crate::ir::entities::{Node, PReg};
use crate::ir::instr::{CallTarget, Function, Instruction};

fn fmt_args(args: &[PReg]) -> String {
    args.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_target(t: &CallTarget<PReg>) -> String {
    match t {
        CallTarget::Direct(name) => name.clone(),
        CallTarget::Indirect(r) => format!("*{r}"),
    }
}

/// Render one instruction's body (without its node label or trailing
/// `goto`); shared by the CFG-IR printer and any later-stage printer that
/// wants a familiar rendering of the underlying operation.
fn fmt_body(instr: &Instruction) -> String {
    match instr {
        Instruction::Inop { .. } => "nop".to_string(),
        Instruction::Iop { op, args, dst, .. } => {
            format!("{dst} = {op}({})", fmt_args(args))
        }
        Instruction::Iload { chunk, addr, dst, .. } => {
            format!("{dst} = load.{chunk} [{addr}]")
        }
        Instruction::Istore { chunk, addr, src, .. } => {
            format!("store.{chunk} [{addr}], {src}")
        }
        Instruction::Icall { target, args, dst, .. } => match dst {
            Some(d) => format!("{d} = call {}({})", fmt_target(target), fmt_args(args)),
            None => format!("call {}({})", fmt_target(target), fmt_args(args)),
        },
        Instruction::Itailcall { target, args } => {
            format!("tailcall {}({})", fmt_target(target), fmt_args(args))
        }
        Instruction::Ibuiltin { name, args, dst, .. } => match dst {
            Some(d) => format!("{d} = builtin {name}({})", fmt_args(args)),
            None => format!("builtin {name}({})", fmt_args(args)),
        },
        Instruction::Icond { cond, args, .. } => {
            format!("if {cond:?}({})", fmt_args(args))
        }
        Instruction::Ijumptable { index, .. } => format!("jumptable {index}"),
        Instruction::Ireturn { value } => match value {
            Some(v) => format!("return {v}"),
            None => "return".to_string(),
        },
    }
}

fn fmt_goto(instr: &Instruction) -> Option<String> {
    match instr {
        Instruction::Inop { next }
        | Instruction::Iop { next, .. }
        | Instruction::Iload { next, .. }
        | Instruction::Istore { next, .. }
        | Instruction::Icall { next, .. }
        | Instruction::Ibuiltin { next, .. } => Some(format!("goto {next}")),
        Instruction::Icond { ifso, ifnot, .. } => Some(format!("goto {ifso} else goto {ifnot}")),
        Instruction::Ijumptable { targets, default, .. } => {
            let mut s = String::new();
            for (i, t) in targets.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                write!(s, "{i} -> {t}").unwrap();
            }
            write!(s, ", default -> {default}").unwrap();
            Some(format!("goto [{s}]"))
        }
        Instruction::Itailcall { .. } | Instruction::Ireturn { .. } => None,
    }
}

/// Print `func` in a deterministic, node-id-sorted textual form.
pub fn print_function(func: &Function) -> String {
    let mut out = String::new();
    let params = func
        .params
        .iter()
        .map(|p| format!("{}: {}", p.reg, p.ty))
        .collect::<Vec<_>>()
        .join(", ");
    let ret = func
        .ret_ty
        .map(|t| format!(" -> {t}"))
        .unwrap_or_default();
    writeln!(out, "function {}({params}){ret} {{", func.name).unwrap();
    writeln!(out, "  entry: {}", func.entry).unwrap();

    let mut ids: Vec<Node> = func.nodes.keys().collect();
    ids.sort();
    for id in ids {
        let instr = &func.nodes[id];
        let body = fmt_body(instr);
        match fmt_goto(instr) {
            Some(goto) => writeln!(out, "  {id}: {body}; {goto}").unwrap(),
            None => writeln!(out, "  {id}: {body}").unwrap(),
        }
    }
    writeln!(out, "}}").unwrap();
    out
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_function(self))
    }
}
