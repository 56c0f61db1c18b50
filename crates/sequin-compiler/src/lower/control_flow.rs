//! Conditional and loop lowering
//!
//! Forward branches go through labels: a label is created before the target
//! exists, referenced by the branch, and hooked once the target block opens.
//! Conditions are checked before any label is created, so a condition that
//! fails to check never leaves a dangling label behind.

use crate::ast::{Expr, IfStmt, Suite};
use crate::error::LowerError;
use crate::lower::expr::{TypedExpr, TypedExprKind};
use crate::lower::Lowerer;
use crate::types::Type;

impl Lowerer {
    /// Check a guard condition, warning when its type is not `bool`.
    fn check_condition(&mut self, cond: &Expr) -> Result<TypedExpr, LowerError> {
        let checked = self.check_expr(cond)?;
        let poisoned = matches!(checked.kind, TypedExprKind::Error);
        if checked.ty != Type::Bool && !poisoned {
            self.diagnostics.warning(
                "expression does not return bool, truncating to bool",
                cond.span,
            );
        }
        Ok(checked)
    }

    /// Lower an `if`/`elif`/`else` ladder.
    ///
    /// Each arm branches past itself to a fresh "next" label when its
    /// condition is false; the last "next" lands on the join block, and
    /// every arm's first block records the join as its fallthrough so
    /// control reconverges at one point.
    pub(crate) fn lower_if(&mut self, stmt: &IfStmt) -> Result<(), LowerError> {
        let checked = self.check_condition(&stmt.if_clause.cond)?;
        let mut next = self.builder.create_label();
        let cond = self.emit_expr(&checked)?;
        self.builder.emit_branch(cond, next, false);

        let mut arm_blocks = vec![self.builder.new_block(true)];
        self.lower_suite(&stmt.if_clause.body)?;

        for clause in &stmt.elif_clauses {
            // The previous arm's false edge lands on this arm's condition.
            let block = self.builder.new_block(false);
            self.builder.hook_label(next, block)?;
            arm_blocks.push(block);

            let checked = self.check_condition(&clause.cond)?;
            next = self.builder.create_label();
            let cond = self.emit_expr(&checked)?;
            self.builder.emit_branch(cond, next, false);
            self.lower_suite(&clause.body)?;
        }

        if let Some(body) = &stmt.else_clause {
            let block = self.builder.new_block(false);
            self.builder.hook_label(next, block)?;
            arm_blocks.push(block);

            next = self.builder.create_label();
            self.lower_suite(body)?;
        }

        let join = self.builder.new_block(false);
        self.builder.hook_label(next, join)?;
        for block in arm_blocks {
            self.builder.set_next(block, join);
        }
        Ok(())
    }

    /// Lower a `while` loop.
    pub(crate) fn lower_while(&mut self, cond: &Expr, body: &Suite) -> Result<(), LowerError> {
        let checked = self.check_condition(cond)?;

        let loop_start = self.builder.create_label();
        let loop_end = self.builder.create_label();

        let loop_block = self.builder.new_block(true);
        self.builder.hook_label(loop_start, loop_block)?;
        self.builder.loop_stack.push(loop_start, loop_end);

        // The condition re-evaluates on every iteration, so it lives at the
        // top of the loop block.
        let cond_reg = self.emit_expr(&checked)?;
        self.builder.emit_branch(cond_reg, loop_end, false);

        self.lower_suite(body)?;
        self.builder.emit_jump(loop_start);

        let after = self.builder.new_block(false);
        self.builder.hook_label(loop_end, after)?;
        self.builder.loop_stack.pop();
        Ok(())
    }
}
