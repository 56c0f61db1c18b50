//! Input syntax tree contract
//!
//! The compiler consumes an already-validated syntax tree produced by an
//! external parser for the indentation-structured sequence grammar. The
//! closed enums below are the contract: node kinds and child arity are fixed
//! by construction, so a malformed tree cannot be expressed, and adding a
//! kind forces every lowering dispatch to handle it.

use crate::types::Type;
use std::fmt;

/// Source location of a node, in 1-based lines and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// First line of the node
    pub line: u32,
    /// First column of the node
    pub column: u32,
    /// Last line of the node
    pub end_line: u32,
    /// One past the last column of the node
    pub end_column: u32,
}

impl Span {
    /// Create a span from explicit coordinates.
    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if (self.line, self.column) <= (other.line, other.column) {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        let (end_line, end_column) =
            if (self.end_line, self.end_column) >= (other.end_line, other.end_column) {
                (self.end_line, self.end_column)
            } else {
                (other.end_line, other.end_column)
            };
        Span {
            line,
            column,
            end_line,
            end_column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Literal expression payload.
///
/// The literal kind fixes the static type: floats are `f64`, integers `i32`,
/// text `string`, and the keywords `bool`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Floating-point literal
    Float(f64),
    /// Integer literal
    Int(i64),
    /// Text literal
    Str(String),
    /// The `true` keyword
    True,
    /// The `false` keyword
    False,
}

/// Binary operator surface forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `and`
    And,
    /// `or`
    Or,
    /// `/`
    Div,
    /// `*`
    Mul,
    /// `+`
    Add,
    /// `-`
    Sub,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Div => "/",
            BinOp::Mul => "*",
            BinOp::Add => "+",
            BinOp::Sub => "-",
        };
        write!(f, "{s}")
    }
}

/// An expression node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Node payload
    pub kind: ExprKind,
    /// Source location
    pub span: Span,
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal constant
    Literal(Literal),
    /// Variable reference by name
    Var(String),
    /// Binary expression
    Binary {
        /// Operator
        op: BinOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Command invocation, validated against the external dictionary
    Command(CommandCall),
}

/// A `COMPONENT.MNEMONIC(args...)` command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandCall {
    /// Target component name
    pub component: String,
    /// Command mnemonic within the component
    pub mnemonic: String,
    /// Ordered argument expressions
    pub args: Vec<Expr>,
}

/// A statement node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Node payload
    pub kind: StmtKind,
    /// Source location (the statement's full extent)
    pub span: Span,
}

/// Statement node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `name: type` variable declaration
    VarDecl {
        /// Variable name
        name: String,
        /// Declared type
        ty: Type,
    },
    /// `name = expr` assignment
    Assign {
        /// Target variable name
        name: String,
        /// Assigned value
        value: Expr,
    },
    /// Bare expression evaluated for effect (typically a command)
    Expr(Expr),
    /// `if`/`elif`/`else` conditional
    If(IfStmt),
    /// `while` loop
    While {
        /// Loop condition
        cond: Expr,
        /// Loop body
        body: Suite,
    },
    /// `break` out of the innermost loop
    Break,
    /// `continue` the innermost loop
    Continue,
    /// `pass` placeholder
    Pass,
    /// Function declaration (declaration-time validation only)
    FunctionDecl(FunctionDecl),
}

/// An indented block of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    /// Statements in source order
    pub statements: Vec<Stmt>,
    /// Source extent of the block
    pub span: Span,
}

/// A guarded clause: `if cond:` or `elif cond:` with its body.
#[derive(Debug, Clone, PartialEq)]
pub struct CondClause {
    /// Guard condition
    pub cond: Expr,
    /// Clause body
    pub body: Suite,
}

/// An `if` statement with optional `elif` and `else` arms.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// The leading `if` clause
    pub if_clause: CondClause,
    /// Zero or more `elif` clauses, in source order
    pub elif_clauses: Vec<CondClause>,
    /// Optional trailing `else` body
    pub else_clause: Option<Suite>,
}

/// A named, typed function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: Type,
}

/// A function declaration.
///
/// Only the signature is meaningful to this core; body and call lowering
/// are future work.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Function name
    pub name: String,
    /// Ordered parameter declarations
    pub params: Vec<Param>,
    /// Declared return type, if any
    pub return_ty: Option<Type>,
    /// Function body
    pub body: Suite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(1, 2, 2, 3);
        let m = a.merge(&b);
        assert_eq!(m, Span::new(1, 2, 2, 3));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(3, 7, 3, 9).to_string(), "3:7");
    }
}
