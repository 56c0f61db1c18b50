//! Expression checking and emission
//!
//! `check_expr` is the construct phase: it resolves names, validates
//! operator/operand combinations, and produces a [`TypedExpr`] carrying the
//! static type of every node. `emit_expr` is the build phase: it walks a
//! checked tree and appends instructions, evaluating operands left to right.

use crate::ast::{CommandCall, Expr, ExprKind, Literal, Span};
use crate::bytecode::instr::Immediate;
use crate::bytecode::opcode::Opcode;
use crate::error::{CompileResult, LowerError};
use crate::ir::value::{Constant, IrValue, Register, VariableId};
use crate::lower::{binop_opcode, Lowerer};
use crate::types::{ConstValue, Type};

/// A checked expression node.
#[derive(Debug, Clone)]
pub struct TypedExpr {
    /// Static type of the value this expression produces
    pub ty: Type,
    /// Source location
    pub span: Span,
    /// Checked payload
    pub kind: TypedExprKind,
}

/// Checked expression payloads.
#[derive(Debug, Clone)]
pub enum TypedExprKind {
    /// Literal constant
    Literal(Constant),
    /// Resolved variable reference
    Var(VariableId),
    /// Validated binary operation
    Binary {
        /// Selected instruction opcode
        op: Opcode,
        /// Left operand
        lhs: Box<TypedExpr>,
        /// Right operand
        rhs: Box<TypedExpr>,
    },
    /// Validated command invocation
    Command {
        /// Dictionary opcode
        opcode: u16,
        /// Declared argument types, in order
        arg_types: Vec<Type>,
        /// Checked argument expressions
        args: Vec<TypedExpr>,
    },
    /// Placeholder for a reference that failed to resolve.
    ///
    /// Typed `i32` so the surrounding expression keeps checking without a
    /// cascade of follow-on errors.
    Error,
}

impl Lowerer {
    /// Check an expression: resolve names, validate operators, compute
    /// types.
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> Result<TypedExpr, LowerError> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(check_literal(lit, expr.span)),
            ExprKind::Var(name) => match self.builder.lookup(name) {
                Some(var) => Ok(TypedExpr {
                    ty: self.builder.variable(var).ty,
                    span: expr.span,
                    kind: TypedExprKind::Var(var),
                }),
                None => {
                    // Recorded directly rather than raised so the enclosing
                    // expression continues checking.
                    self.diagnostics
                        .error(format!("undefined variable '{name}'"), expr.span);
                    Ok(TypedExpr {
                        ty: Type::I32,
                        span: expr.span,
                        kind: TypedExprKind::Error,
                    })
                }
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_expr(lhs)?;
                let rhs = self.check_expr(rhs)?;
                let op = binop_opcode(*op);
                validate_binary(op, &lhs, &rhs, expr.span)?;
                let ty = if op.is_logical_binary() {
                    Type::Bool
                } else {
                    lhs.ty
                };
                Ok(TypedExpr {
                    ty,
                    span: expr.span,
                    kind: TypedExprKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                })
            }
            ExprKind::Command(call) => self.check_command(call, expr.span),
        }
    }

    /// Check a command invocation against the external dictionary.
    fn check_command(&mut self, call: &CommandCall, span: Span) -> Result<TypedExpr, LowerError> {
        let spec = self
            .dictionary
            .get(&call.component, &call.mnemonic)
            .ok_or_else(|| {
                LowerError::source(
                    format!("unknown command '{}.{}'", call.component, call.mnemonic),
                    span,
                )
            })?
            .clone();

        if call.args.len() != spec.args.len() {
            return Err(LowerError::source(
                format!(
                    "command '{}' expects {} argument(s), got {}",
                    spec.qualified_name(),
                    spec.args.len(),
                    call.args.len()
                ),
                span,
            ));
        }

        let mut args = Vec::with_capacity(call.args.len());
        for (arg, decl) in call.args.iter().zip(&spec.args) {
            let checked = self.check_expr(arg)?;
            let poisoned = matches!(checked.kind, TypedExprKind::Error);
            if checked.ty != decl.ty && !poisoned {
                return Err(LowerError::source(
                    format!(
                        "argument '{}' of '{}' expects {}, found {}",
                        decl.name,
                        spec.qualified_name(),
                        decl.ty,
                        checked.ty
                    ),
                    checked.span,
                ));
            }
            args.push(checked);
        }

        Ok(TypedExpr {
            ty: Type::Bytes,
            span,
            kind: TypedExprKind::Command {
                opcode: spec.opcode,
                arg_types: spec.args.iter().map(|a| a.ty).collect(),
                args,
            },
        })
    }

    /// Emit a checked expression, returning the register holding its value.
    pub(crate) fn emit_expr(&mut self, expr: &TypedExpr) -> CompileResult<Register> {
        match &expr.kind {
            TypedExprKind::Literal(constant) => {
                let mut constant = constant.clone();
                // Strings live in the constant-data pool; the immediate
                // payload becomes the pool index.
                if constant.ty == Type::String {
                    let index = self.builder.intern_const(constant.clone());
                    constant.const_id = Some(index);
                }
                self.builder.materialize(&IrValue::Constant(constant))
            }
            TypedExprKind::Var(var) => self.builder.materialize(&IrValue::Variable(*var)),
            TypedExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.emit_expr(lhs)?;
                let rhs = self.emit_expr(rhs)?;
                self.builder.emit_binary(*op, lhs, rhs)
            }
            TypedExprKind::Command {
                opcode,
                arg_types,
                args,
            } => {
                self.emit_command_effect(*opcode, arg_types, args)?;
                Ok(self.builder.emit_command_return())
            }
            TypedExprKind::Error => Ok(self
                .builder
                .emit_load_immediate(Type::I32, Immediate::Inline(ConstValue::Int(0)))),
        }
    }

    /// Emit a command for effect only, without capturing its result.
    pub(crate) fn emit_command_effect(
        &mut self,
        opcode: u16,
        arg_types: &[Type],
        args: &[TypedExpr],
    ) -> CompileResult<()> {
        let mut regs = Vec::with_capacity(args.len());
        for arg in args {
            regs.push(self.emit_expr(arg)?);
        }
        self.builder.emit_command(opcode, regs, arg_types.to_vec());
        Ok(())
    }
}

fn check_literal(lit: &Literal, span: Span) -> TypedExpr {
    let (ty, value) = match lit {
        Literal::Float(v) => (Type::F64, ConstValue::Float(*v)),
        Literal::Int(v) => (Type::I32, ConstValue::Int(*v)),
        Literal::Str(v) => (Type::String, ConstValue::Str(v.clone())),
        Literal::True => (Type::Bool, ConstValue::Bool(true)),
        Literal::False => (Type::Bool, ConstValue::Bool(false)),
    };
    TypedExpr {
        ty,
        span,
        kind: TypedExprKind::Literal(Constant::new(ty, value)),
    }
}

/// Operator/operand validation, run before any instruction is selected.
fn validate_binary(
    op: Opcode,
    lhs: &TypedExpr,
    rhs: &TypedExpr,
    span: Span,
) -> Result<(), LowerError> {
    if op.is_arithmetic_binary() {
        if !(lhs.ty.is_integral() && rhs.ty.is_integral()) {
            return Err(LowerError::source(
                "arithmetic requires integral operands",
                span,
            ));
        }
    } else if lhs.ty.is_integral() && rhs.ty.is_integral() {
        // Integral operands compare and combine freely.
    } else if lhs.ty == Type::Bool || rhs.ty == Type::Bool {
        if lhs.ty != rhs.ty {
            return Err(LowerError::source("bool only combines with bool", span));
        }
        if !op.is_equality_class() {
            return Err(LowerError::source(
                "bool supports only '==', '!=', 'and', and 'or'",
                span,
            ));
        }
    } else if lhs.ty == Type::String || rhs.ty == Type::String {
        if !matches!(op, Opcode::Eq | Opcode::Neq) {
            return Err(LowerError::source(
                "string supports only '==' and '!='",
                span,
            ));
        }
        if lhs.ty != rhs.ty {
            return Err(LowerError::source(
                "string only combines with string",
                span,
            ));
        }
    } else {
        return Err(LowerError::source(
            "cannot perform a logical operation on bytes",
            span,
        ));
    }

    if lhs.ty != rhs.ty {
        return Err(LowerError::source(
            format!("operands have mismatched types: {} vs {}", lhs.ty, rhs.ty),
            span,
        ));
    }
    Ok(())
}
