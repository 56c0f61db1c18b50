//! Instruction set and fixed-layout encoding
//!
//! Every instruction encodes as its 2-byte big-endian opcode followed by a
//! fixed operand layout. Registers encode as their 1-byte allocated slot,
//! labels and variables as 4-byte big-endian ids. Encoding requires the
//! register table and label list, passed in as an [`EncodeCtx`].

use crate::bytecode::encoder::BytecodeWriter;
use crate::bytecode::opcode::Opcode;
use crate::error::{CompileError, CompileResult};
use crate::ir::block::{Label, LabelId};
use crate::ir::value::{Register, RegisterId, RegisterTable, VariableId};
use crate::types::{ConstValue, Type};

/// Payload of a `LoadImmediate` instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Immediate {
    /// Value embedded directly, encoded with its type's canonical form
    Inline(ConstValue),
    /// 4-byte big-endian index into the constant-data pool (strings)
    ConstIndex(u32),
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Binary operation over two registers of one shared type
    BinaryOp {
        /// Comparison, logical, or arithmetic opcode
        op: Opcode,
        /// Result register
        dst: Register,
        /// Left operand
        lhs: Register,
        /// Right operand
        rhs: Register,
    },
    /// Load a literal into a register
    LoadImmediate {
        /// Result register
        dst: Register,
        /// Static type of the value
        ty: Type,
        /// Literal payload
        value: Immediate,
    },
    /// Load a variable's storage into a register
    LoadVariable {
        /// Result register
        dst: Register,
        /// Variable to load
        variable: VariableId,
    },
    /// Conditional branch on a register
    Branch {
        /// Condition register (truncated to bool by the VM)
        cond: Register,
        /// Branch target
        target: LabelId,
        /// Branch when the condition is true (`BranchTrue`) or false
        branch_if: bool,
    },
    /// Unconditional jump
    Jump {
        /// Jump target
        target: LabelId,
    },
    /// Execute a dictionary command over argument registers
    Command {
        /// Command opcode from the external dictionary
        opcode: u16,
        /// Argument registers, in declaration order
        args: Vec<Register>,
        /// Declared argument types, annotating the operands at runtime
        arg_types: Vec<Type>,
    },
    /// Fetch the most recent command result
    CommandReturn {
        /// Result register (always `bytes`)
        dst: Register,
    },
}

/// Lookup context handed to instruction encoding.
pub struct EncodeCtx<'a> {
    /// Register table with slot assignments
    pub registers: &'a RegisterTable,
    /// Label list with hook state
    pub labels: &'a [Label],
}

impl EncodeCtx<'_> {
    fn slot(&self, id: RegisterId) -> CompileResult<u8> {
        self.registers.slot(id)
    }

    fn label_ref(&self, id: LabelId) -> CompileResult<u32> {
        self.labels[id.0 as usize].wire_id()
    }
}

impl Instruction {
    /// Opcode this instruction encodes with.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::BinaryOp { op, .. } => *op,
            Instruction::LoadImmediate { .. } => Opcode::LoadImmediate,
            Instruction::LoadVariable { .. } => Opcode::LoadVariable,
            Instruction::Branch { branch_if, .. } => {
                if *branch_if {
                    Opcode::BranchTrue
                } else {
                    Opcode::BranchFalse
                }
            }
            Instruction::Jump { .. } => Opcode::Jump,
            Instruction::Command { .. } => Opcode::Command,
            Instruction::CommandReturn { .. } => Opcode::CommandReturn,
        }
    }

    /// The register this instruction produces, if it produces one.
    pub fn result(&self) -> Option<Register> {
        match self {
            Instruction::BinaryOp { dst, .. }
            | Instruction::LoadImmediate { dst, .. }
            | Instruction::LoadVariable { dst, .. }
            | Instruction::CommandReturn { dst } => Some(*dst),
            Instruction::Branch { .. } | Instruction::Jump { .. } | Instruction::Command { .. } => {
                None
            }
        }
    }

    /// Registers this instruction consumes, in operand order.
    pub fn operands(&self) -> Vec<RegisterId> {
        match self {
            Instruction::BinaryOp { lhs, rhs, .. } => vec![lhs.id, rhs.id],
            Instruction::Branch { cond, .. } => vec![cond.id],
            Instruction::Command { args, .. } => args.iter().map(|r| r.id).collect(),
            Instruction::LoadImmediate { .. }
            | Instruction::LoadVariable { .. }
            | Instruction::Jump { .. }
            | Instruction::CommandReturn { .. } => Vec::new(),
        }
    }

    /// Encode the instruction into `out`.
    pub fn encode(&self, ctx: &EncodeCtx<'_>, out: &mut BytecodeWriter) -> CompileResult<()> {
        out.emit_u16(self.opcode().as_u16());
        match self {
            Instruction::BinaryOp { dst, lhs, rhs, .. } => {
                // Operand types were validated during lowering; re-checked
                // here as a defensive invariant.
                if lhs.ty != rhs.ty {
                    return Err(CompileError::OperandTypeMismatch {
                        lhs: lhs.ty,
                        rhs: rhs.ty,
                    });
                }
                out.emit_u8(lhs.ty as u8);
                out.emit_u8(ctx.slot(dst.id)?);
                out.emit_u8(ctx.slot(lhs.id)?);
                out.emit_u8(ctx.slot(rhs.id)?);
            }
            Instruction::LoadImmediate { dst, ty, value } => {
                out.emit_u8(ctx.slot(dst.id)?);
                out.emit_u8(encode_type_nibbles(&[*ty])[0]);
                match value {
                    Immediate::Inline(v) => out.emit_bytes(&ty.serialize(v)?),
                    Immediate::ConstIndex(index) => out.emit_u32(*index),
                }
            }
            Instruction::LoadVariable { dst, variable } => {
                out.emit_u8(ctx.slot(dst.id)?);
                out.emit_u32(variable.as_u32());
            }
            Instruction::Branch { cond, target, .. } => {
                out.emit_u8(ctx.slot(cond.id)?);
                out.emit_u32(ctx.label_ref(*target)?);
            }
            Instruction::Jump { target } => {
                out.emit_u32(ctx.label_ref(*target)?);
            }
            Instruction::Command {
                args, arg_types, ..
            } => {
                if args.len() != arg_types.len() {
                    return Err(CompileError::CommandArity {
                        operands: args.len(),
                        types: arg_types.len(),
                    });
                }
                out.emit_u8(args.len() as u8);
                out.emit_bytes(&encode_type_nibbles(arg_types));
                for arg in args {
                    out.emit_u8(ctx.slot(arg.id)?);
                }
            }
            Instruction::CommandReturn { .. } => {}
        }
        Ok(())
    }
}

/// Pack a type list into 4-bit nibbles, two per byte, high nibble first.
/// A trailing odd nibble is zero-padded.
pub fn encode_type_nibbles(types: &[Type]) -> Vec<u8> {
    let mut out = Vec::with_capacity(types.len().div_ceil(2));
    for pair in types.chunks(2) {
        let high = pair[0].nibble() << 4;
        let low = pair.get(1).map_or(0, |ty| ty.nibble());
        out.push(high | low);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::block::BlockId;

    fn ctx_with<'a>(
        registers: &'a RegisterTable,
        labels: &'a [Label],
    ) -> EncodeCtx<'a> {
        EncodeCtx { registers, labels }
    }

    #[test]
    fn test_nibble_packing() {
        // i32 = 5, bool = 11 (0xB), f64 = 10 (0xA)
        assert_eq!(encode_type_nibbles(&[Type::I32]), vec![0x50]);
        assert_eq!(encode_type_nibbles(&[Type::I32, Type::Bool]), vec![0x5B]);
        assert_eq!(
            encode_type_nibbles(&[Type::I32, Type::Bool, Type::F64]),
            vec![0x5B, 0xA0]
        );
        assert_eq!(encode_type_nibbles(&[]), Vec::<u8>::new());
    }

    #[test]
    fn test_binary_op_encoding() {
        let mut regs = RegisterTable::new();
        let lhs = regs.alloc(Type::I32);
        let rhs = regs.alloc(Type::I32);
        let dst = regs.alloc(Type::I32);
        regs.assign_slot(lhs.id, 0);
        regs.assign_slot(rhs.id, 1);
        regs.assign_slot(dst.id, 2);

        let instr = Instruction::BinaryOp {
            op: Opcode::Add,
            dst,
            lhs,
            rhs,
        };
        let mut w = BytecodeWriter::new();
        instr.encode(&ctx_with(&regs, &[]), &mut w).unwrap();
        // opcode 0x000C, type i32 = 5, dst 2, lhs 0, rhs 1
        assert_eq!(w.as_bytes(), &[0x00, 0x0C, 0x05, 0x02, 0x00, 0x01]);
    }

    #[test]
    fn test_binary_op_type_disagreement_is_internal() {
        let mut regs = RegisterTable::new();
        let lhs = regs.alloc(Type::I32);
        let rhs = regs.alloc(Type::I64);
        let dst = regs.alloc(Type::I32);
        for r in [lhs, rhs, dst] {
            regs.assign_slot(r.id, r.id.as_u32() as u8);
        }
        let instr = Instruction::BinaryOp {
            op: Opcode::Add,
            dst,
            lhs,
            rhs,
        };
        let mut w = BytecodeWriter::new();
        let err = instr.encode(&ctx_with(&regs, &[]), &mut w).unwrap_err();
        assert!(matches!(err, CompileError::OperandTypeMismatch { .. }));
    }

    #[test]
    fn test_load_immediate_encoding() {
        let mut regs = RegisterTable::new();
        let dst = regs.alloc(Type::I32);
        regs.assign_slot(dst.id, 3);

        let instr = Instruction::LoadImmediate {
            dst,
            ty: Type::I32,
            value: Immediate::Inline(ConstValue::Int(1)),
        };
        let mut w = BytecodeWriter::new();
        instr.encode(&ctx_with(&regs, &[]), &mut w).unwrap();
        // opcode 0x0010, dst 3, nibble 0x50, value 00 00 00 01
        assert_eq!(w.as_bytes(), &[0x00, 0x10, 0x03, 0x50, 0, 0, 0, 1]);
    }

    #[test]
    fn test_unassigned_register_fails() {
        let mut regs = RegisterTable::new();
        let dst = regs.alloc(Type::I32);
        let instr = Instruction::LoadVariable {
            dst,
            variable: VariableId(0),
        };
        let mut w = BytecodeWriter::new();
        let err = instr.encode(&ctx_with(&regs, &[]), &mut w).unwrap_err();
        assert_eq!(err, CompileError::UnassignedRegister { register: 0 });
    }

    #[test]
    fn test_branch_requires_hooked_label() {
        let mut regs = RegisterTable::new();
        let cond = regs.alloc(Type::Bool);
        regs.assign_slot(cond.id, 0);

        let mut label = Label::new(LabelId(0));
        let instr = Instruction::Branch {
            cond,
            target: LabelId(0),
            branch_if: false,
        };

        let labels = vec![label.clone()];
        let mut w = BytecodeWriter::new();
        let err = instr.encode(&ctx_with(&regs, &labels), &mut w).unwrap_err();
        assert_eq!(err, CompileError::UnhookedLabel { label: 0 });

        label.hook(BlockId(1), 0).unwrap();
        let labels = vec![label];
        let mut w = BytecodeWriter::new();
        instr.encode(&ctx_with(&regs, &labels), &mut w).unwrap();
        // opcode branch_false 0x0013, cond slot 0, label id 0
        assert_eq!(w.as_bytes(), &[0x00, 0x13, 0x00, 0, 0, 0, 0]);
    }

    #[test]
    fn test_command_encoding() {
        let mut regs = RegisterTable::new();
        let a = regs.alloc(Type::U8);
        let b = regs.alloc(Type::U16);
        let c = regs.alloc(Type::Bool);
        for (i, r) in [a, b, c].into_iter().enumerate() {
            regs.assign_slot(r.id, i as u8);
        }
        let instr = Instruction::Command {
            opcode: 0x0102,
            args: vec![a, b, c],
            arg_types: vec![Type::U8, Type::U16, Type::Bool],
        };
        let mut w = BytecodeWriter::new();
        instr.encode(&ctx_with(&regs, &[]), &mut w).unwrap();
        // opcode 0x000E, count 3, nibbles (u8=2, u16=4, bool=11): 0x24 0xB0,
        // then slots 0 1 2
        assert_eq!(w.as_bytes(), &[0x00, 0x0E, 3, 0x24, 0xB0, 0, 1, 2]);
    }

    #[test]
    fn test_command_arity_mismatch_is_internal() {
        let mut regs = RegisterTable::new();
        let a = regs.alloc(Type::U8);
        regs.assign_slot(a.id, 0);
        let instr = Instruction::Command {
            opcode: 1,
            args: vec![a],
            arg_types: vec![Type::U8, Type::U16],
        };
        let mut w = BytecodeWriter::new();
        let err = instr.encode(&ctx_with(&regs, &[]), &mut w).unwrap_err();
        assert_eq!(
            err,
            CompileError::CommandArity {
                operands: 1,
                types: 2
            }
        );
    }
}
