//! Textual Linear-IR printer: "labels on their own line
//! `L<n>:`; body instructions indented two spaces." Mirrors
//! `ir::printer`'s shape, one layer downstream.

use core::fmt;
use core::fmt::Write as _;

use crate::ir::instr::CallTarget;
use crate::ir::types::Ty;
use crate::linear::function::{LinInstr, LinearFunction};
use crate::located::loc::Loc;

fn fmt_args(args: &[Loc]) -> String {
    args.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}

fn fmt_target(t: &CallTarget<Loc>) -> String {
    match t {
        CallTarget::Direct(name) => name.clone(),
        CallTarget::Indirect(r) => format!("*{r}"),
    }
}

fn fmt_body(instr: &LinInstr) -> Option<String> {
    Some(match instr {
        LinInstr::Llabel(_) => return None,
        LinInstr::Lnop => "nop".to_string(),
        LinInstr::Lmove { src, dst, .. } => format!("{dst} = {src}"),
        LinInstr::Lop { op, args, dst } => format!("{dst} = {op}({})", fmt_args(args)),
        LinInstr::Lload { chunk, addr, dst } => format!("{dst} = load.{chunk} [{addr}]"),
        LinInstr::Lstore { chunk, addr, src } => format!("store.{chunk} [{addr}], {src}"),
        LinInstr::Lcall { target, args, dst, .. } => match dst {
            Some(d) => format!("{d} = call {}({})", fmt_target(target), fmt_args(args)),
            None => format!("call {}({})", fmt_target(target), fmt_args(args)),
        },
        LinInstr::Lbuiltin { name, args, dst, .. } => match dst {
            Some(d) => format!("{d} = builtin {name}({})", fmt_args(args)),
            None => format!("builtin {name}({})", fmt_args(args)),
        },
        LinInstr::Lgoto(target) => format!("goto {target}"),
        LinInstr::Lcond { cond, args, ifso } => format!("if {cond:?}({}) goto {ifso}", fmt_args(args)),
        LinInstr::Ljumptable { index, targets, default } => {
            let mut s = String::new();
            for (i, t) in targets.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                write!(s, "{i} -> {t}").unwrap();
            }
            write!(s, ", default -> {default}").unwrap();
            format!("jumptable {index} [{s}]")
        }
        LinInstr::Ltailcall { target, args } => format!("tailcall {}({})", fmt_target(target), fmt_args(args)),
        LinInstr::Lreturn { value } => match value {
            Some(v) => format!("return {v}"),
            None => "return".to_string(),
        },
    })
}

/// Print `func` as labels on their own unindented line and every other
/// instruction indented two spaces, in program order.
pub fn print_function(func: &LinearFunction) -> String {
    let mut out = String::new();
    let params = func
        .params
        .iter()
        .map(|p| format!("{}: {}", p.loc, p.ty))
        .collect::<Vec<_>>()
        .join(", ");
    let ret = func.ret_ty.map(|t: Ty| format!(" -> {t}")).unwrap_or_default();
    writeln!(out, "function {}({params}){ret} {{", func.name).unwrap();
    for instr in &func.body {
        match instr {
            LinInstr::Llabel(l) => writeln!(out, "{l}:").unwrap(),
            other => writeln!(out, "  {}", fmt_body(other).unwrap()).unwrap(),
        }
    }
    writeln!(out, "}}").unwrap();
    out
}

impl fmt::Display for LinearFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_function(self))
    }
}
