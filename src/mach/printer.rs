//! Textual Mach-IR printer: "identical to Linear format but
//! with concrete FP-relative offsets." Reuses `linear::printer`'s shape of
//! labels-on-their-own-line, body indented two spaces.

use core::fmt;
use core::fmt::Write as _;

use crate::ir::instr::CallTarget;
use crate::ir::mreg::MReg;
use crate::mach::function::{MInstr, MachFunction};

fn fmt_args(args: &[MReg]) -> String {
    args.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}

fn fmt_target(t: &CallTarget<MReg>) -> String {
    match t {
        CallTarget::Direct(name) => name.clone(),
        CallTarget::Indirect(r) => format!("*{r}"),
    }
}

fn fmt_body(instr: &MInstr) -> Option<String> {
    Some(match instr {
        MInstr::Mlabel(_) => return None,
        MInstr::Mnop => "nop".to_string(),
        MInstr::Mmove { src, dst, .. } => format!("{dst} = {src}"),
        MInstr::Mop { op, args, dst } => format!("{dst} = {op}({})", fmt_args(args)),
        MInstr::Mload { chunk, addr, dst } => format!("{dst} = load.{chunk} [{addr}]"),
        MInstr::Mstore { chunk, addr, src } => format!("store.{chunk} [{addr}], {src}"),
        MInstr::Mcall { target, args, dst, .. } => match dst {
            Some(d) => format!("{d} = call {}({})", fmt_target(target), fmt_args(args)),
            None => format!("call {}({})", fmt_target(target), fmt_args(args)),
        },
        MInstr::Mbuiltin { name, args, dst, .. } => match dst {
            Some(d) => format!("{d} = builtin {name}({})", fmt_args(args)),
            None => format!("builtin {name}({})", fmt_args(args)),
        },
        MInstr::Mgoto(target) => format!("goto {target}"),
        MInstr::Mcond { cond, args, ifso } => format!("if {cond:?}({}) goto {ifso}", fmt_args(args)),
        MInstr::Mjumptable { index, targets, default } => {
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
        MInstr::Mtailcall { target, args } => format!("tailcall {}({})", fmt_target(target), fmt_args(args)),
        MInstr::Mreturn { value } => match value {
            Some(v) => format!("return {v}"),
            None => "return".to_string(),
        },
        MInstr::Mgetstack { offset, dst, .. } => format!("{dst} = getstack [fp+{offset}]"),
        MInstr::Msetstack { offset, src, .. } => format!("setstack [fp+{offset}], {src}"),
        MInstr::Mgetparam { offset, dst, .. } => format!("{dst} = getparam [fp+{offset}]"),
    })
}

pub fn print_function(func: &MachFunction) -> String {
    let mut out = String::new();
    let ret = func.ret_ty.map(|t| format!(" -> {t}")).unwrap_or_default();
    writeln!(
        out,
        "function {}(){ret} {{ ; frame_size={}",
        func.name, func.frame.total_size
    )
    .unwrap();
    for instr in &func.body {
        match instr {
            MInstr::Mlabel(l) => writeln!(out, "{l}:").unwrap(),
            other => writeln!(out, "  {}", fmt_body(other).unwrap()).unwrap(),
        }
    }
    writeln!(out, "}}").unwrap();
    out
}

impl fmt::Display for MachFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_function(self))
    }
}
