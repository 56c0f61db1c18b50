//! Basic blocks and labels
//!
//! A basic block is a straight-line run of instructions; `next` records the
//! structural fallthrough order of blocks, not a branch. Labels are forward
//! branch targets, created empty and hooked exactly once to a concrete
//! (block, instruction index) location.

use crate::bytecode::instr::Instruction;
use crate::error::CompileError;
use std::fmt;

/// Dense basic-block identifier, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Raw index.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// An ordered run of instructions with a recorded fallthrough successor.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Block identity
    pub id: BlockId,
    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
    /// Structural fallthrough successor, if any
    pub next: Option<BlockId>,
}

impl BasicBlock {
    /// Create an empty block.
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            instructions: Vec::new(),
            next: None,
        }
    }

    /// Append an instruction.
    pub fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Number of instructions in the block.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the block holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Label identifier; also the value branch operands serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub u32);

impl LabelId {
    /// Raw index.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A forward branch target.
///
/// Resolving label ids into absolute offsets once blocks are laid out
/// contiguously is the downstream assembler's job; this core only records
/// the (block, instruction index) the label is hooked to.
#[derive(Debug, Clone)]
pub struct Label {
    /// Label identity
    pub id: LabelId,
    target: Option<(BlockId, usize)>,
}

impl Label {
    /// Create an unhooked label.
    pub fn new(id: LabelId) -> Self {
        Self { id, target: None }
    }

    /// Bind the label to a concrete location. Hooking twice is an internal
    /// invariant failure.
    pub fn hook(&mut self, block: BlockId, index: usize) -> Result<(), CompileError> {
        if self.target.is_some() {
            return Err(CompileError::LabelRehooked { label: self.id.0 });
        }
        self.target = Some((block, index));
        Ok(())
    }

    /// The hooked location, if any.
    pub fn target(&self) -> Option<(BlockId, usize)> {
        self.target
    }

    /// True once the label has been hooked.
    pub fn is_hooked(&self) -> bool {
        self.target.is_some()
    }

    /// Wire reference of the label. Serializing before hooking is an
    /// internal invariant failure.
    pub fn wire_id(&self) -> Result<u32, CompileError> {
        if self.target.is_none() {
            return Err(CompileError::UnhookedLabel { label: self.id.0 });
        }
        Ok(self.id.0)
    }
}
