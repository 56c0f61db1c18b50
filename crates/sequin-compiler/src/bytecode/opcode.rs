//! Instruction opcodes
//!
//! Every instruction starts with a 2-byte big-endian opcode. The values are
//! part of the wire protocol and never change between releases; `Nop`,
//! `Not`, and `Return` are reserved by the protocol but not produced by the
//! current lowering.

use std::fmt;

/// Operation tag of an encoded instruction.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation
    Nop = 0x00,

    // Comparison operators
    /// Less-than comparison
    Lt = 0x01,
    /// Greater-than comparison
    Gt = 0x02,
    /// Less-or-equal comparison
    Le = 0x03,
    /// Greater-or-equal comparison
    Ge = 0x04,
    /// Equality comparison
    Eq = 0x05,
    /// Inequality comparison
    Neq = 0x06,

    // Logical combinators
    /// Logical and
    And = 0x07,
    /// Logical or
    Or = 0x08,
    /// Logical not (unary; reserved)
    Not = 0x09,

    // Arithmetic operators
    /// Division
    Div = 0x0A,
    /// Multiplication
    Mul = 0x0B,
    /// Addition
    Add = 0x0C,
    /// Subtraction
    Sub = 0x0D,

    /// Execute a dictionary command over a variable number of registers
    Command = 0x0E,
    /// Place the most recent command result into a register
    CommandReturn = 0x0F,

    /// Load a literal value into a register
    LoadImmediate = 0x10,
    /// Load a variable's storage into a register
    LoadVariable = 0x11,

    /// Branch to a label when the condition register is true
    BranchTrue = 0x12,
    /// Branch to a label when the condition register is false
    BranchFalse = 0x13,
    /// Unconditional jump to a label
    Jump = 0x14,
    /// Return from the sequence (reserved)
    Return = 0x15,
}

impl Opcode {
    /// Wire value of this opcode.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Ordered and equality comparisons. These always produce `bool`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Opcode::Lt | Opcode::Gt | Opcode::Le | Opcode::Ge | Opcode::Eq | Opcode::Neq
        )
    }

    /// Equality-class operators: the only ones legal on `bool` operands.
    pub fn is_equality_class(self) -> bool {
        matches!(self, Opcode::Eq | Opcode::Neq | Opcode::And | Opcode::Or)
    }

    /// Comparisons plus the logical combinators.
    pub fn is_logical_binary(self) -> bool {
        self.is_comparison() || matches!(self, Opcode::And | Opcode::Or)
    }

    /// Arithmetic binary operators.
    pub fn is_arithmetic_binary(self) -> bool {
        matches!(self, Opcode::Div | Opcode::Mul | Opcode::Add | Opcode::Sub)
    }

    /// Lower-case mnemonic, for IR dumps.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Lt => "lt",
            Opcode::Gt => "gt",
            Opcode::Le => "le",
            Opcode::Ge => "ge",
            Opcode::Eq => "eq",
            Opcode::Neq => "neq",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Not => "not",
            Opcode::Div => "div",
            Opcode::Mul => "mul",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Command => "command",
            Opcode::CommandReturn => "command_return",
            Opcode::LoadImmediate => "load_immediate",
            Opcode::LoadVariable => "load_variable",
            Opcode::BranchTrue => "branch_true",
            Opcode::BranchFalse => "branch_false",
            Opcode::Jump => "jump",
            Opcode::Return => "return",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
