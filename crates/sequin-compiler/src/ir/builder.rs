//! IR builder
//!
//! Owns everything an in-progress compilation produces: the ordered block
//! list, the label table, the constant-data pool, the register table, the
//! variable arena, the lexical context tree, and the current-block cursor.
//! Lowering handlers drive it; `finish` hands the result to the program
//! container.
//!
//! Contexts are stored in an arena indexed by [`ContextId`]: children refer
//! to parents by index, which keeps upward lookup cheap and makes reference
//! cycles structurally impossible.

use crate::ast::Span;
use crate::bytecode::instr::{Immediate, Instruction};
use crate::bytecode::opcode::Opcode;
use crate::bytecode::program::Program;
use crate::error::{CompileError, CompileResult};
use crate::ir::block::{BasicBlock, BlockId, Label, LabelId};
use crate::ir::value::{
    Constant, InstrPos, IrValue, Register, RegisterId, RegisterTable, Variable, VariableId,
};
use crate::types::Type;
use rustc_hash::FxHashMap;

/// Index of a context in the builder's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);

/// One lexical scope: a name table plus tree links.
#[derive(Debug)]
struct ContextNode {
    parent: Option<ContextId>,
    children: Vec<ContextId>,
    variables: FxHashMap<String, VariableId>,
}

/// Stack of active loop label pairs (loop-start, loop-end).
///
/// Pushed on loop entry and popped on exit, so `break`/`continue` always see
/// the innermost loop regardless of nesting depth.
#[derive(Debug, Default)]
pub struct LoopStack {
    stack: Vec<(LabelId, LabelId)>,
}

impl LoopStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a loop.
    pub fn push(&mut self, start: LabelId, end: LabelId) {
        self.stack.push((start, end));
    }

    /// Leave the innermost loop.
    pub fn pop(&mut self) -> Option<(LabelId, LabelId)> {
        self.stack.pop()
    }

    /// Innermost loop's label pair.
    pub fn current(&self) -> Option<(LabelId, LabelId)> {
        self.stack.last().copied()
    }

    /// True while at least one loop is active.
    pub fn is_in_loop(&self) -> bool {
        !self.stack.is_empty()
    }
}

/// A recorded function signature.
///
/// Bodies and call sites are not lowered; declarations are validated and
/// their signatures recorded for future work.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    /// Function name
    pub name: String,
    /// Ordered (name, type) parameter list
    pub params: Vec<(String, Type)>,
    /// Declared return type, if any
    pub return_ty: Option<Type>,
    /// Declaration site
    pub span: Span,
}

/// Builder for one compilation unit's control-flow graph.
#[derive(Debug)]
pub struct Builder {
    blocks: Vec<BasicBlock>,
    labels: Vec<Label>,
    const_data: Vec<Constant>,
    registers: RegisterTable,
    variables: Vec<Variable>,
    functions: Vec<FunctionSig>,

    contexts: Vec<ContextNode>,
    current_context: ContextId,
    current_block: BlockId,

    /// Active loop labels for `break`/`continue` lowering.
    pub loop_stack: LoopStack,
}

impl Builder {
    /// Create a builder with the top-level execution block and the global
    /// scope in place.
    pub fn new() -> Self {
        Self {
            blocks: vec![BasicBlock::new(BlockId(0))],
            labels: Vec::new(),
            const_data: Vec::new(),
            registers: RegisterTable::new(),
            variables: Vec::new(),
            functions: Vec::new(),
            contexts: vec![ContextNode {
                parent: None,
                children: Vec::new(),
                variables: FxHashMap::default(),
            }],
            current_context: ContextId(0),
            current_block: BlockId(0),
            loop_stack: LoopStack::new(),
        }
    }

    // ===== Contexts =====

    /// Enter a new scope as a child of the current one.
    pub fn push_context(&mut self) {
        let id = ContextId(self.contexts.len() as u32);
        self.contexts.push(ContextNode {
            parent: Some(self.current_context),
            children: Vec::new(),
            variables: FxHashMap::default(),
        });
        let parent = self.current_context;
        self.contexts[parent.0 as usize].children.push(id);
        self.current_context = id;
    }

    /// Leave the current scope. Popping the root is an internal invariant
    /// failure.
    pub fn pop_context(&mut self) -> CompileResult<()> {
        let parent = self.contexts[self.current_context.0 as usize]
            .parent
            .ok_or(CompileError::PopRootContext)?;
        self.current_context = parent;
        Ok(())
    }

    /// Resolve a name through the context chain, innermost first.
    pub fn lookup(&self, name: &str) -> Option<VariableId> {
        let mut ctx = Some(self.current_context);
        while let Some(id) = ctx {
            let node = &self.contexts[id.0 as usize];
            if let Some(&var) = node.variables.get(name) {
                return Some(var);
            }
            ctx = node.parent;
        }
        None
    }

    /// Declare a variable in the current scope.
    ///
    /// A name that already resolves through the chain is an internal
    /// invariant failure: redeclaration must be rejected by an earlier
    /// validation step.
    pub fn declare(&mut self, name: &str, ty: Type, span: Span) -> CompileResult<VariableId> {
        if self.lookup(name).is_some() {
            return Err(CompileError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(Variable {
            name: name.to_string(),
            ty,
            id,
            storage: None,
            span,
        });
        self.contexts[self.current_context.0 as usize]
            .variables
            .insert(name.to_string(), id);
        Ok(id)
    }

    /// A declared variable.
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    /// Bind `reg` as the variable's current storage cell.
    pub fn bind_variable_storage(&mut self, var: VariableId, reg: RegisterId) {
        self.variables[var.0 as usize].storage = Some(reg);
    }

    // ===== Blocks and labels =====

    /// Open a new block and move the cursor into it. When `chain` is set,
    /// the previous current block records the new one as its structural
    /// fallthrough successor.
    pub fn new_block(&mut self, chain: bool) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id));
        if chain {
            self.blocks[self.current_block.0 as usize].next = Some(id);
        }
        self.current_block = id;
        id
    }

    /// Overwrite a block's fallthrough successor.
    pub fn set_next(&mut self, block: BlockId, next: BlockId) {
        self.blocks[block.0 as usize].next = Some(next);
    }

    /// Allocate a fresh, unhooked label.
    pub fn create_label(&mut self) -> LabelId {
        let id = LabelId(self.labels.len() as u32);
        self.labels.push(Label::new(id));
        id
    }

    /// Hook a label to the current end of `block`.
    pub fn hook_label(&mut self, label: LabelId, block: BlockId) -> CompileResult<()> {
        let index = self.blocks[block.0 as usize].len();
        self.labels[label.0 as usize].hook(block, index)
    }

    /// The block the cursor points at.
    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    /// A block by id.
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    /// Number of blocks created so far.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    // ===== Instructions =====

    /// Append an instruction to the current block, recording consumer links
    /// for its operands.
    pub fn append(&mut self, instr: Instruction) -> InstrPos {
        let pos = InstrPos {
            block: self.current_block,
            index: self.blocks[self.current_block.0 as usize].len(),
        };
        for operand in instr.operands() {
            self.registers.mark_used(operand, pos);
        }
        self.blocks[self.current_block.0 as usize].push(instr);
        pos
    }

    /// Emit a binary operation. The result register's type is the shared
    /// operand type for arithmetic and `bool` for logical operators.
    pub fn emit_binary(
        &mut self,
        op: Opcode,
        lhs: Register,
        rhs: Register,
    ) -> CompileResult<Register> {
        if lhs.ty != rhs.ty {
            return Err(CompileError::OperandTypeMismatch {
                lhs: lhs.ty,
                rhs: rhs.ty,
            });
        }
        let result_ty = if op.is_logical_binary() {
            Type::Bool
        } else {
            lhs.ty
        };
        let dst = self.registers.alloc(result_ty);
        self.append(Instruction::BinaryOp { op, dst, lhs, rhs });
        Ok(dst)
    }

    /// Emit a `LoadImmediate` and return its result register.
    pub fn emit_load_immediate(&mut self, ty: Type, value: Immediate) -> Register {
        let dst = self.registers.alloc(ty);
        self.append(Instruction::LoadImmediate { dst, ty, value });
        dst
    }

    /// Emit a `LoadVariable` and return its result register.
    pub fn emit_load_variable(&mut self, var: VariableId) -> Register {
        let ty = self.variable(var).ty;
        let dst = self.registers.alloc(ty);
        self.append(Instruction::LoadVariable { dst, variable: var });
        dst
    }

    /// Emit a conditional branch.
    pub fn emit_branch(&mut self, cond: Register, target: LabelId, branch_if: bool) {
        self.append(Instruction::Branch {
            cond,
            target,
            branch_if,
        });
    }

    /// Emit an unconditional jump.
    pub fn emit_jump(&mut self, target: LabelId) {
        self.append(Instruction::Jump { target });
    }

    /// Emit a dictionary command over already-materialized arguments.
    pub fn emit_command(&mut self, opcode: u16, args: Vec<Register>, arg_types: Vec<Type>) {
        self.append(Instruction::Command {
            opcode,
            args,
            arg_types,
        });
    }

    /// Emit a `CommandReturn` capturing the most recent command result.
    pub fn emit_command_return(&mut self) -> Register {
        let dst = self.registers.alloc(Type::Bytes);
        self.append(Instruction::CommandReturn { dst });
        dst
    }

    // ===== Constants and values =====

    /// Register a constant into the constant-data pool by value (no
    /// deduplication) and return its pool index.
    pub fn intern_const(&mut self, mut constant: Constant) -> u32 {
        let index = self.const_data.len() as u32;
        constant.const_id = Some(index);
        self.const_data.push(constant);
        index
    }

    /// Materialize a value into a register.
    pub fn materialize(&mut self, value: &IrValue) -> CompileResult<Register> {
        match value {
            IrValue::Register(reg) => Ok(*reg),
            IrValue::Variable(var) => Ok(self.emit_load_variable(*var)),
            IrValue::Constant(constant) => {
                if constant.ty.is_immediate() {
                    Ok(self.emit_load_immediate(
                        constant.ty,
                        Immediate::Inline(constant.value.clone()),
                    ))
                } else if let Some(index) = constant.const_id {
                    // Pooled string: the immediate payload is the pool index.
                    Ok(self.emit_load_immediate(constant.ty, Immediate::ConstIndex(index)))
                } else {
                    Err(CompileError::UnpooledString)
                }
            }
        }
    }

    /// Static type of a value.
    pub fn value_ty(&self, value: &IrValue) -> Type {
        match value {
            IrValue::Constant(c) => c.ty,
            IrValue::Variable(v) => self.variable(*v).ty,
            IrValue::Register(r) => r.ty,
        }
    }

    // ===== Functions =====

    /// Record a validated function signature.
    pub fn add_function(&mut self, sig: FunctionSig) {
        self.functions.push(sig);
    }

    /// Recorded function signatures.
    pub fn functions(&self) -> &[FunctionSig] {
        &self.functions
    }

    /// Register table, for tests and in-flight inspection.
    pub fn registers(&self) -> &RegisterTable {
        &self.registers
    }

    /// Finish the compilation and hand everything to the program container.
    pub fn finish(self) -> Program {
        Program::new(
            self.blocks,
            self.labels,
            self.const_data,
            self.registers,
            self.variables,
            self.functions,
        )
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstValue;

    fn span() -> Span {
        Span::new(1, 1, 1, 2)
    }

    #[test]
    fn test_scope_chain_lookup() {
        let mut b = Builder::new();
        let outer = b.declare("x", Type::I32, span()).unwrap();
        b.push_context();
        assert_eq!(b.lookup("x"), Some(outer));
        let inner = b.declare("y", Type::Bool, span()).unwrap();
        assert_eq!(b.lookup("y"), Some(inner));
        b.pop_context().unwrap();
        assert_eq!(b.lookup("y"), None);
        assert_eq!(b.lookup("x"), Some(outer));
    }

    #[test]
    fn test_duplicate_declaration_is_internal() {
        let mut b = Builder::new();
        b.declare("x", Type::I32, span()).unwrap();
        // Shadowing through a child scope is also a duplicate: the name
        // still resolves through the chain.
        b.push_context();
        let err = b.declare("x", Type::I32, span()).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateVariable { .. }));
    }

    #[test]
    fn test_pop_root_context_fails() {
        let mut b = Builder::new();
        assert_eq!(b.pop_context(), Err(CompileError::PopRootContext));
    }

    #[test]
    fn test_block_chaining() {
        let mut b = Builder::new();
        let entry = b.current_block();
        let chained = b.new_block(true);
        assert_eq!(b.block(entry).next, Some(chained));
        let unchained = b.new_block(false);
        assert_eq!(b.block(chained).next, None);
        assert_eq!(b.current_block(), unchained);
    }

    #[test]
    fn test_emit_binary_result_types() {
        let mut b = Builder::new();
        let lhs = b.emit_load_immediate(Type::I32, Immediate::Inline(ConstValue::Int(1)));
        let rhs = b.emit_load_immediate(Type::I32, Immediate::Inline(ConstValue::Int(2)));
        let sum = b.emit_binary(Opcode::Add, lhs, rhs).unwrap();
        assert_eq!(sum.ty, Type::I32);
        let cmp = b.emit_binary(Opcode::Eq, sum, sum).unwrap();
        assert_eq!(cmp.ty, Type::Bool);
    }

    #[test]
    fn test_emit_binary_mismatch_is_internal() {
        let mut b = Builder::new();
        let lhs = b.emit_load_immediate(Type::I32, Immediate::Inline(ConstValue::Int(1)));
        let rhs = b.emit_load_immediate(Type::I64, Immediate::Inline(ConstValue::Int(2)));
        let err = b.emit_binary(Opcode::Add, lhs, rhs).unwrap_err();
        assert!(matches!(err, CompileError::OperandTypeMismatch { .. }));
    }

    #[test]
    fn test_consumers_recorded() {
        let mut b = Builder::new();
        let lhs = b.emit_load_immediate(Type::I32, Immediate::Inline(ConstValue::Int(1)));
        let rhs = b.emit_load_immediate(Type::I32, Immediate::Inline(ConstValue::Int(2)));
        b.emit_binary(Opcode::Add, lhs, rhs).unwrap();
        assert_eq!(b.registers().info(lhs.id).used_by.len(), 1);
        assert_eq!(b.registers().info(rhs.id).used_by.len(), 1);
    }

    #[test]
    fn test_loop_stack_nesting() {
        let mut b = Builder::new();
        assert!(!b.loop_stack.is_in_loop());
        let (s1, e1) = (b.create_label(), b.create_label());
        let (s2, e2) = (b.create_label(), b.create_label());
        b.loop_stack.push(s1, e1);
        b.loop_stack.push(s2, e2);
        assert_eq!(b.loop_stack.current(), Some((s2, e2)));
        b.loop_stack.pop();
        assert_eq!(b.loop_stack.current(), Some((s1, e1)));
        b.loop_stack.pop();
        assert!(!b.loop_stack.is_in_loop());
    }

    #[test]
    fn test_materialize_unpooled_string_is_internal() {
        let mut b = Builder::new();
        let value = IrValue::Constant(Constant::new(
            Type::String,
            ConstValue::Str("hi".to_string()),
        ));
        assert_eq!(b.materialize(&value), Err(CompileError::UnpooledString));
    }

    #[test]
    fn test_materialize_pooled_string() {
        let mut b = Builder::new();
        let mut constant = Constant::new(Type::String, ConstValue::Str("hi".to_string()));
        let index = b.intern_const(constant.clone());
        constant.const_id = Some(index);
        let reg = b.materialize(&IrValue::Constant(constant)).unwrap();
        assert_eq!(reg.ty, Type::String);
    }
}
