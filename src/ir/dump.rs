//! IR Dump Utility
//!
//! Pretty-prints the IR in a human-readable format, useful when debugging
//! optimization passes. Blocks print in layout order, matching the order
//! passes walk them in.

use super::{
    BinaryOp, CompareOp, IrBasicBlock, IrFunction, IrInstruction, IrModule, IrTerminator, UnaryOp,
};
use std::fmt::Write;

/// Dump an entire module to a string.
pub fn dump_module(module: &IrModule) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "; Module: {}", module.name);
    let _ = writeln!(out, "; Functions: {}", module.functions.len());
    let _ = writeln!(out);

    for func in module.functions.values() {
        let _ = writeln!(out, "{}", dump_function(func));
    }

    out
}

/// Dump a single function to a string.
pub fn dump_function(func: &IrFunction) -> String {
    let mut out = String::new();

    let params: Vec<String> = func
        .signature
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.reg, p.ty))
        .collect();

    let _ = writeln!(
        out,
        "fn @{}({}) -> {} {{",
        func.name,
        params.join(", "),
        func.signature.return_type
    );

    for block in func.cfg.blocks.values() {
        let _ = write!(out, "{}", dump_block(block));
    }

    let _ = writeln!(out, "}}");
    out
}

/// Dump a basic block to a string.
pub fn dump_block(block: &IrBasicBlock) -> String {
    let mut out = String::new();

    let label = block
        .label
        .as_ref()
        .map(|l| format!(" ; {}", l))
        .unwrap_or_default();
    let _ = writeln!(out, "  {}:{}", block.id, label);

    if !block.predecessors.is_empty() {
        let preds: Vec<String> = block.predecessors.iter().map(|p| p.to_string()).collect();
        let _ = writeln!(out, "    ; preds: {}", preds.join(", "));
    }

    for inst in &block.instructions {
        let _ = writeln!(out, "    {}", dump_instruction(inst));
    }
    let _ = writeln!(out, "    {}", dump_terminator(&block.terminator));

    out
}

/// Dump a single instruction to a string.
pub fn dump_instruction(inst: &IrInstruction) -> String {
    match inst {
        IrInstruction::Const { dest, value } => format!("{} = const {}", dest, value),
        IrInstruction::Copy { dest, src } => format!("{} = copy {}", dest, src),
        IrInstruction::Load { dest, ptr, ty } => format!("{} = load {} {}", dest, ty, ptr),
        IrInstruction::Store { ptr, value } => format!("store {} -> {}", value, ptr),
        IrInstruction::BinOp {
            dest,
            op,
            left,
            right,
        } => format!("{} = {} {}, {}", dest, dump_binop(*op), left, right),
        IrInstruction::UnOp { dest, op, operand } => {
            format!("{} = {} {}", dest, dump_unop(*op), operand)
        }
        IrInstruction::Cmp {
            dest,
            op,
            left,
            right,
        } => format!("{} = cmp.{} {}, {}", dest, dump_cmpop(*op), left, right),
        IrInstruction::Alloc { dest, ty } => format!("{} = alloc {}", dest, ty),
        IrInstruction::Cast {
            dest,
            src,
            from_ty,
            to_ty,
        } => format!("{} = cast {} {} to {}", dest, from_ty, src, to_ty),
        IrInstruction::Select {
            dest,
            condition,
            true_val,
            false_val,
        } => format!(
            "{} = select {}, {}, {}",
            dest, condition, true_val, false_val
        ),
        IrInstruction::CallDirect { dest, callee, args } => {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            match dest {
                Some(dest) => format!("{} = call @{}({})", dest, callee, args.join(", ")),
                None => format!("call @{}({})", callee, args.join(", ")),
            }
        }
        IrInstruction::CallIndirect {
            dest,
            func_ptr,
            args,
        } => {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            match dest {
                Some(dest) => format!("{} = call_indirect {}({})", dest, func_ptr, args.join(", ")),
                None => format!("call_indirect {}({})", func_ptr, args.join(", ")),
            }
        }
    }
}

/// Dump a terminator to a string.
pub fn dump_terminator(term: &IrTerminator) -> String {
    match term {
        IrTerminator::Branch { target } => format!("br {}", target),
        IrTerminator::CondBranch {
            condition,
            true_target,
            false_target,
        } => format!("br_if {}, {}, {}", condition, true_target, false_target),
        IrTerminator::Switch {
            value,
            cases,
            default,
        } => {
            let cases: Vec<String> = cases
                .iter()
                .map(|(val, target)| format!("{} -> {}", val, target))
                .collect();
            format!("switch {} [{}], default {}", value, cases.join(", "), default)
        }
        IrTerminator::Return { value: Some(val) } => format!("return {}", val),
        IrTerminator::Return { value: None } => "return".to_string(),
        IrTerminator::Unreachable => "unreachable".to_string(),
    }
}

fn dump_binop(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Rem => "rem",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
        BinaryOp::Xor => "xor",
    }
}

fn dump_unop(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "neg",
        UnaryOp::Not => "not",
    }
}

fn dump_cmpop(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "eq",
        CompareOp::Ne => "ne",
        CompareOp::Lt => "lt",
        CompareOp::Le => "le",
        CompareOp::Gt => "gt",
        CompareOp::Ge => "ge",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, IrFunctionSignature, IrType};

    #[test]
    fn test_dump_function() {
        let mut builder = IrBuilder::new("test".to_string(), "test.cpp".to_string());
        builder.start_function("main".to_string(), IrFunctionSignature::void());
        let slot = builder.build_alloc(IrType::ptr_to_named("unique_ptr")).unwrap();
        builder.build_void_call("_Z4takev", vec![slot]).unwrap();
        builder.build_return(None).unwrap();
        builder.finish_function();

        let text = dump_function(builder.module.function_by_name("main").unwrap());
        assert!(text.contains("fn @main() -> void {"));
        assert!(text.contains("bb0:"));
        assert!(text.contains("$0 = alloc *%unique_ptr"));
        assert!(text.contains("call @_Z4takev($0)"));
        assert!(text.contains("return"));
    }

    #[test]
    fn test_dump_module_header() {
        let builder = IrBuilder::new("m".to_string(), "m.cpp".to_string());
        let text = dump_module(&builder.module);
        assert!(text.starts_with("; Module: m"));
    }
}
