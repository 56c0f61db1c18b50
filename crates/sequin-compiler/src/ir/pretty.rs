//! Pretty-printing for IR
//!
//! Provides human-readable output for debugging compiled programs.

use crate::bytecode::instr::{Immediate, Instruction};
use crate::bytecode::program::Program;
use crate::ir::block::{BasicBlock, Label};
use std::fmt::Write;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Program {
    fn pretty_print(&self) -> String {
        let mut output = String::new();

        if !self.variables().is_empty() {
            write!(output, "; variables: ").unwrap();
            let vars: Vec<String> = self
                .variables()
                .iter()
                .map(|v| format!("{} {}: {}", v.id, v.name, v.ty))
                .collect();
            writeln!(output, "{}", vars.join(", ")).unwrap();
        }

        for (index, constant) in self.const_data().iter().enumerate() {
            writeln!(output, "; const {}: {} = {}", index, constant.ty, constant.value).unwrap();
        }

        for func in self.functions() {
            let params: Vec<String> = func
                .params
                .iter()
                .map(|(name, ty)| format!("{name}: {ty}"))
                .collect();
            match func.return_ty {
                Some(ty) => {
                    writeln!(output, "; fn {}({}) -> {}", func.name, params.join(", "), ty)
                }
                None => writeln!(output, "; fn {}({})", func.name, params.join(", ")),
            }
            .unwrap();
        }

        for block in self.blocks() {
            output.push_str(&format_block(block, self.labels()));
        }

        output
    }
}

fn format_block(block: &BasicBlock, labels: &[Label]) -> String {
    let mut output = String::new();

    // Block header, annotated with any labels hooked to its start.
    let hooked: Vec<String> = labels
        .iter()
        .filter(|l| l.target() == Some((block.id, 0)))
        .map(|l| l.id.to_string())
        .collect();
    if hooked.is_empty() {
        writeln!(output, "{}:", block.id).unwrap();
    } else {
        writeln!(output, "{}: ; {}", block.id, hooked.join(", ")).unwrap();
    }

    for (index, instr) in block.instructions.iter().enumerate() {
        let mid: Vec<String> = labels
            .iter()
            .filter(|l| index > 0 && l.target() == Some((block.id, index)))
            .map(|l| l.id.to_string())
            .collect();
        if !mid.is_empty() {
            writeln!(output, "  ; {}", mid.join(", ")).unwrap();
        }
        writeln!(output, "  {}", format_instr(instr)).unwrap();
    }

    if let Some(next) = block.next {
        writeln!(output, "  ; falls through to {next}").unwrap();
    }

    output
}

fn format_instr(instr: &Instruction) -> String {
    match instr {
        Instruction::BinaryOp { op, dst, lhs, rhs } => {
            format!("{dst} = {op} {lhs}, {rhs}")
        }
        Instruction::LoadImmediate { dst, ty, value } => match value {
            Immediate::Inline(v) => format!("{dst} = load_immediate {ty} {v}"),
            Immediate::ConstIndex(index) => {
                format!("{dst} = load_immediate {ty} const[{index}]")
            }
        },
        Instruction::LoadVariable { dst, variable } => {
            format!("{dst} = load_variable {variable}")
        }
        Instruction::Branch {
            cond,
            target,
            branch_if,
        } => {
            let mnemonic = if *branch_if { "branch_true" } else { "branch_false" };
            format!("{mnemonic} {cond}, {target}")
        }
        Instruction::Jump { target } => format!("jump {target}"),
        Instruction::Command {
            opcode,
            args,
            arg_types,
        } => {
            let operands: Vec<String> = args
                .iter()
                .zip(arg_types)
                .map(|(reg, ty)| format!("{reg} as {ty}"))
                .collect();
            format!("command {:#06x}({})", opcode, operands.join(", "))
        }
        Instruction::CommandReturn { dst } => format!("{dst} = command_return"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::opcode::Opcode;
    use crate::ir::value::{Register, RegisterId};
    use crate::types::{ConstValue, Type};

    fn make_reg(id: u32, ty: Type) -> Register {
        Register {
            id: RegisterId(id),
            ty,
        }
    }

    #[test]
    fn test_format_binary_op() {
        let instr = Instruction::BinaryOp {
            op: Opcode::Add,
            dst: make_reg(2, Type::I32),
            lhs: make_reg(0, Type::I32),
            rhs: make_reg(1, Type::I32),
        };
        assert_eq!(format_instr(&instr), "r2:i32 = add r0:i32, r1:i32");
    }

    #[test]
    fn test_format_load_immediate() {
        let instr = Instruction::LoadImmediate {
            dst: make_reg(0, Type::Bool),
            ty: Type::Bool,
            value: Immediate::Inline(ConstValue::Bool(true)),
        };
        assert_eq!(format_instr(&instr), "r0:bool = load_immediate bool true");

        let instr = Instruction::LoadImmediate {
            dst: make_reg(1, Type::String),
            ty: Type::String,
            value: Immediate::ConstIndex(3),
        };
        assert_eq!(
            format_instr(&instr),
            "r1:string = load_immediate string const[3]"
        );
    }

    #[test]
    fn test_format_command() {
        let instr = Instruction::Command {
            opcode: 0x0102,
            args: vec![make_reg(0, Type::U8)],
            arg_types: vec![Type::U8],
        };
        assert_eq!(format_instr(&instr), "command 0x0102(r0:u8 as u8)");
    }
}
