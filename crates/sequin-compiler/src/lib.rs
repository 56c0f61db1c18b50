//! Sequin Compiler - sequence AST to register bytecode
//!
//! This crate lowers a validated syntax tree for the sequence language into
//! a register-addressed control-flow graph and serializes it into a compact
//! binary instruction stream. Commands are validated against an externally
//! loaded dictionary; branch offsets stay symbolic (label ids) for a
//! downstream assembler to resolve.

#![warn(missing_docs)]

pub mod ast;
pub mod bytecode;
pub mod diag;
pub mod dictionary;
pub mod error;
pub mod ir;
pub mod lower;
pub mod types;

pub use diag::{Diagnostic, Diagnostics, Severity};
pub use dictionary::{CommandArg, CommandDictionary, CommandSpec};
pub use error::{CompileError, CompileResult, LowerError};
pub use lower::{CompileOutput, Lowerer};
pub use types::{ConstValue, Type};

// Re-export bytecode and IR types for convenience
pub use bytecode::{
    BytecodeReader, BytecodeWriter, DecodeError, Immediate, Instruction, Opcode, Program,
};
pub use ir::{BasicBlock, BlockId, Builder, Label, LabelId, Register, Variable, VariableId};

/// Lower a compilation unit against a command dictionary.
///
/// Convenience wrapper over [`Lowerer`]: returns the built program and
/// every diagnostic recorded along the way. `Err` means an internal
/// invariant was violated, not a source error.
pub fn compile(
    suite: &ast::Suite,
    dictionary: CommandDictionary,
) -> CompileResult<CompileOutput> {
    Lowerer::new(dictionary).lower(suite)
}
