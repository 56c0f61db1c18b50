//! Compiler error types
//!
//! Errors are split into two tiers. [`CompileError`] covers internal
//! invariant violations: defects in an earlier phase that must propagate and
//! terminate the compile. Recoverable, user-visible problems travel as
//! [`LowerError::Source`] and are absorbed at the statement boundary during
//! suite lowering, becoming diagnostics.

use crate::ast::Span;
use crate::diag::Diagnostic;
use crate::types::Type;
use thiserror::Error;

/// Internal invariant violations.
///
/// Any of these signals a bug in an earlier validation or construction step.
/// They are never downgraded to diagnostics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// A label was hooked to a second location
    #[error("label L{label} hooked twice")]
    LabelRehooked {
        /// Label id
        label: u32,
    },

    /// A label was serialized before being hooked
    #[error("label L{label} serialized before it was hooked")]
    UnhookedLabel {
        /// Label id
        label: u32,
    },

    /// A register was serialized before slot assignment
    #[error("register r{register} serialized before slot assignment")]
    UnassignedRegister {
        /// Register id
        register: u32,
    },

    /// A literal value's runtime kind disagrees with its declared type
    #[error("cannot encode a {found} value as {ty}")]
    ValueTypeMismatch {
        /// Declared type
        ty: Type,
        /// Kind of the value actually present
        found: &'static str,
    },

    /// An integer literal does not fit its declared type
    #[error("value {value} does not fit in {ty}")]
    ImmediateOutOfRange {
        /// Declared type
        ty: Type,
        /// Offending value
        value: i64,
    },

    /// BinaryOp operands with different types reached encoding
    #[error("binary operands disagree on type: {lhs} vs {rhs}")]
    OperandTypeMismatch {
        /// Left operand type
        lhs: Type,
        /// Right operand type
        rhs: Type,
    },

    /// A command's type stream does not describe its operands
    #[error("command type stream describes {types} operand(s) but {operands} were given")]
    CommandArity {
        /// Number of operand registers
        operands: usize,
        /// Number of types in the stream
        types: usize,
    },

    /// More registers were allocated than 1-byte slots can address
    #[error("{count} registers exceed the 256 addressable slots")]
    RegisterOverflow {
        /// Number of registers allocated
        count: usize,
    },

    /// A string constant was materialized without a constant-pool entry
    #[error("string constant materialized before pooling")]
    UnpooledString,

    /// Two variables of one name declared in overlapping scopes
    #[error("variable '{name}' already declared in an enclosing scope")]
    DuplicateVariable {
        /// Variable name
        name: String,
    },

    /// The root context was popped
    #[error("attempted to pop the root context")]
    PopRootContext,

    /// `break` or `continue` reached lowering outside any loop
    #[error("loop control statement outside of a loop")]
    LoopControlOutsideLoop,
}

/// Convenience alias for fallible compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Failure surface of a single lowering step.
///
/// `Source` is caught at the suite boundary and recorded; `Internal`
/// propagates until it aborts the compile.
#[derive(Debug, Error)]
pub enum LowerError {
    /// Recoverable, source-located compilation error
    #[error("{0}")]
    Source(Diagnostic),

    /// Unrecoverable internal invariant violation
    #[error(transparent)]
    Internal(#[from] CompileError),
}

impl LowerError {
    /// Build a recoverable error attributed to `span`.
    pub fn source(message: impl Into<String>, span: Span) -> Self {
        LowerError::Source(Diagnostic::new(
            crate::diag::Severity::Error,
            message,
            span,
        ))
    }
}
