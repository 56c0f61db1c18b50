//! Statement lowering
//!
//! One handler per statement kind, dispatched exhaustively. Conditionals and
//! loops live in the control-flow module.

use crate::ast::{Expr, FunctionDecl, Span, Stmt, StmtKind, Suite};
use crate::error::{CompileError, LowerError};
use crate::ir::builder::FunctionSig;
use crate::lower::expr::TypedExprKind;
use crate::lower::Lowerer;

impl Lowerer {
    /// Lower one statement.
    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LowerError> {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty } => {
                self.builder.declare(name, *ty, stmt.span)?;
                Ok(())
            }
            StmtKind::Assign { name, value } => self.lower_assign(name, value, stmt.span),
            StmtKind::Expr(expr) => self.lower_expr_stmt(expr),
            StmtKind::If(if_stmt) => self.lower_if(if_stmt),
            StmtKind::While { cond, body } => self.lower_while(cond, body),
            StmtKind::Break => {
                let (_, end) = self
                    .builder
                    .loop_stack
                    .current()
                    .ok_or(CompileError::LoopControlOutsideLoop)?;
                self.builder.emit_jump(end);
                Ok(())
            }
            StmtKind::Continue => {
                let (start, _) = self
                    .builder
                    .loop_stack
                    .current()
                    .ok_or(CompileError::LoopControlOutsideLoop)?;
                self.builder.emit_jump(start);
                Ok(())
            }
            StmtKind::Pass => Ok(()),
            StmtKind::FunctionDecl(decl) => self.lower_function_decl(decl, stmt.span),
        }
    }

    fn lower_assign(&mut self, name: &str, value: &Expr, span: Span) -> Result<(), LowerError> {
        let var = self.builder.lookup(name).ok_or_else(|| {
            LowerError::source(format!("assignment to undefined variable '{name}'"), span)
        })?;

        let checked = self.check_expr(value)?;
        let var_ty = self.builder.variable(var).ty;
        let poisoned = matches!(checked.kind, TypedExprKind::Error);
        if checked.ty != var_ty && !poisoned {
            return Err(LowerError::source(
                format!(
                    "cannot assign {} to '{}' of type {}",
                    checked.ty, name, var_ty
                ),
                span,
            ));
        }

        // The materialized result register becomes the variable's storage
        // cell; there is no separate store instruction.
        let reg = self.emit_expr(&checked)?;
        self.builder.bind_variable_storage(var, reg.id);
        Ok(())
    }

    fn lower_expr_stmt(&mut self, expr: &Expr) -> Result<(), LowerError> {
        let checked = self.check_expr(expr)?;
        match &checked.kind {
            // A command in statement position runs for effect; its result
            // is not fetched.
            TypedExprKind::Command {
                opcode,
                arg_types,
                args,
            } => {
                self.emit_command_effect(*opcode, arg_types, args)?;
            }
            _ => {
                self.emit_expr(&checked)?;
            }
        }
        Ok(())
    }

    /// Validate a function declaration and record its signature.
    ///
    /// Bodies are not lowered; only nesting is checked and the signature
    /// kept for later work.
    fn lower_function_decl(&mut self, decl: &FunctionDecl, span: Span) -> Result<(), LowerError> {
        for nested_span in nested_decl_spans(&decl.body) {
            self.diagnostics
                .error("nested function declarations are not allowed", nested_span);
            self.diagnostics.note("enclosing declaration is here", span);
        }

        self.builder.add_function(FunctionSig {
            name: decl.name.clone(),
            params: decl
                .params
                .iter()
                .map(|p| (p.name.clone(), p.ty))
                .collect(),
            return_ty: decl.return_ty,
            span,
        });
        Ok(())
    }
}

/// Spans of every function declaration nested anywhere inside `suite`.
fn nested_decl_spans(suite: &Suite) -> Vec<Span> {
    let mut spans = Vec::new();
    collect_nested(suite, &mut spans);
    spans
}

fn collect_nested(suite: &Suite, spans: &mut Vec<Span>) {
    for stmt in &suite.statements {
        match &stmt.kind {
            StmtKind::FunctionDecl(inner) => {
                spans.push(stmt.span);
                collect_nested(&inner.body, spans);
            }
            StmtKind::If(if_stmt) => {
                collect_nested(&if_stmt.if_clause.body, spans);
                for clause in &if_stmt.elif_clauses {
                    collect_nested(&clause.body, spans);
                }
                if let Some(body) = &if_stmt.else_clause {
                    collect_nested(body, spans);
                }
            }
            StmtKind::While { body, .. } => collect_nested(body, spans),
            _ => {}
        }
    }
}
