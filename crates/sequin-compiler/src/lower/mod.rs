//! AST lowering
//!
//! Walks a validated syntax tree depth-first and drives the IR builder.
//! Every node goes through two phases: *check* validates children, resolves
//! names, and computes the node's static type; *emit* appends instructions.
//! The phases are interleaved per statement so scope entry and exit stay
//! aligned with emission order.
//!
//! Recoverable errors are absorbed at the statement boundary inside suite
//! lowering and recorded as diagnostics, so one invocation reports every
//! independent error it can reach. Internal invariant violations propagate
//! and abort the compile.

pub mod control_flow;
pub mod expr;
pub mod stmt;

use crate::ast::{BinOp, Suite};
use crate::bytecode::opcode::Opcode;
use crate::bytecode::program::Program;
use crate::diag::Diagnostics;
use crate::dictionary::CommandDictionary;
use crate::error::{CompileResult, LowerError};
use crate::ir::builder::Builder;

/// Result of lowering one compilation unit.
#[derive(Debug)]
pub struct CompileOutput {
    /// The built program, structurally complete even when errors were
    /// recorded
    pub program: Program,
    /// Every diagnostic recorded during lowering
    pub diagnostics: Diagnostics,
}

impl CompileOutput {
    /// True when no error-severity diagnostic was recorded.
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Driver for one compilation unit.
pub struct Lowerer {
    pub(crate) builder: Builder,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) dictionary: CommandDictionary,
}

impl Lowerer {
    /// Create a lowerer resolving commands against `dictionary`.
    pub fn new(dictionary: CommandDictionary) -> Self {
        Self {
            builder: Builder::new(),
            diagnostics: Diagnostics::new(),
            dictionary,
        }
    }

    /// Lower a whole compilation unit.
    ///
    /// Returns `Err` only for internal invariant violations; source errors
    /// are recorded in the output's diagnostics.
    pub fn lower(mut self, suite: &Suite) -> CompileResult<CompileOutput> {
        self.lower_suite(suite)?;
        Ok(CompileOutput {
            program: self.builder.finish(),
            diagnostics: self.diagnostics,
        })
    }

    /// Lower a statement block in a fresh scope.
    ///
    /// Each statement is lowered independently: a source error is recorded
    /// and lowering moves to the next statement.
    pub(crate) fn lower_suite(&mut self, suite: &Suite) -> CompileResult<()> {
        self.builder.push_context();
        for stmt in &suite.statements {
            match self.lower_stmt(stmt) {
                Ok(()) => {}
                Err(LowerError::Source(diag)) => self.diagnostics.push(diag),
                Err(LowerError::Internal(err)) => return Err(err),
            }
        }
        self.builder.pop_context()
    }
}

/// Instruction opcode implementing a surface binary operator.
pub(crate) fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Lt => Opcode::Lt,
        BinOp::Gt => Opcode::Gt,
        BinOp::Le => Opcode::Le,
        BinOp::Ge => Opcode::Ge,
        BinOp::Eq => Opcode::Eq,
        BinOp::Neq => Opcode::Neq,
        BinOp::And => Opcode::And,
        BinOp::Or => Opcode::Or,
        BinOp::Div => Opcode::Div,
        BinOp::Mul => Opcode::Mul,
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
    }
}
