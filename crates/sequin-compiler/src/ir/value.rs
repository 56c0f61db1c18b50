//! Values, registers, and variables
//!
//! Anything that can produce a value — a literal constant, a declared
//! variable, or an instruction result — is an [`IrValue`], and any of them
//! can be materialized into a [`Register`] through the builder. Registers
//! are symbolic until a downstream allocation pass assigns concrete slots.

use crate::ast::Span;
use crate::error::CompileError;
use crate::ir::block::BlockId;
use crate::types::{ConstValue, Type};
use std::fmt;

/// Identifier of a virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterId(pub u32);

impl RegisterId {
    /// Raw index.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A typed virtual register: the output slot of a value-producing
/// instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    /// Register identity in the table
    pub id: RegisterId,
    /// Static type of the value the register holds
    pub ty: Type,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.ty)
    }
}

/// Position of an instruction inside the block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrPos {
    /// Containing block
    pub block: BlockId,
    /// Index within the block's instruction list
    pub index: usize,
}

/// Bookkeeping for one virtual register.
#[derive(Debug, Clone)]
pub struct RegisterInfo {
    /// Static type
    pub ty: Type,
    /// Concrete slot, assigned by a downstream allocation pass
    pub slot: Option<u8>,
    /// Instructions that consume this register, for liveness analysis
    pub used_by: Vec<InstrPos>,
}

/// Dense table of every register allocated during a compilation.
#[derive(Debug, Clone, Default)]
pub struct RegisterTable {
    regs: Vec<RegisterInfo>,
}

impl RegisterTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh register of type `ty`.
    pub fn alloc(&mut self, ty: Type) -> Register {
        let id = RegisterId(self.regs.len() as u32);
        self.regs.push(RegisterInfo {
            ty,
            slot: None,
            used_by: Vec::new(),
        });
        Register { id, ty }
    }

    /// Bookkeeping for a register.
    pub fn info(&self, id: RegisterId) -> &RegisterInfo {
        &self.regs[id.0 as usize]
    }

    /// Record that the instruction at `pos` consumes `id`.
    pub fn mark_used(&mut self, id: RegisterId, pos: InstrPos) {
        self.regs[id.0 as usize].used_by.push(pos);
    }

    /// Assign a concrete slot. The downstream allocator's entry point.
    pub fn assign_slot(&mut self, id: RegisterId, slot: u8) {
        self.regs[id.0 as usize].slot = Some(slot);
    }

    /// Concrete slot of a register.
    ///
    /// Serializing a register before slot assignment is an internal
    /// invariant failure.
    pub fn slot(&self, id: RegisterId) -> Result<u8, CompileError> {
        self.regs[id.0 as usize]
            .slot
            .ok_or(CompileError::UnassignedRegister { register: id.0 })
    }

    /// Number of registers allocated.
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    /// True if no register was allocated.
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}

/// Identifier of a declared variable; doubles as its wire id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(pub u32);

impl VariableId {
    /// Raw index.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A named, typed storage location.
///
/// The numeric id is assigned at declaration and is what `LoadVariable`
/// serializes. `storage` tracks the register last assigned to the variable,
/// for the downstream allocator.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Declared name
    pub name: String,
    /// Declared type
    pub ty: Type,
    /// Declaration-time id
    pub id: VariableId,
    /// Register currently bound as this variable's storage cell
    pub storage: Option<RegisterId>,
    /// Declaration site
    pub span: Span,
}

/// A literal constant.
///
/// String constants are routed through the builder's constant-data pool at
/// build time and carry their pool index in `const_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    /// Static type
    pub ty: Type,
    /// Literal value
    pub value: ConstValue,
    /// Constant-pool index, set when the constant is pooled
    pub const_id: Option<u32>,
}

impl Constant {
    /// Create an unpooled constant.
    pub fn new(ty: Type, value: ConstValue) -> Self {
        Self {
            ty,
            value,
            const_id: None,
        }
    }
}

/// Anything that can be materialized into a register.
#[derive(Debug, Clone)]
pub enum IrValue {
    /// A literal constant
    Constant(Constant),
    /// A declared variable's storage cell
    Variable(VariableId),
    /// An instruction result
    Register(Register),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_slots() {
        let mut table = RegisterTable::new();
        let r0 = table.alloc(Type::I32);
        let r1 = table.alloc(Type::Bool);
        assert_eq!(r0.id, RegisterId(0));
        assert_eq!(r1.id, RegisterId(1));
        assert_eq!(r1.ty, Type::Bool);

        assert_eq!(
            table.slot(r0.id),
            Err(CompileError::UnassignedRegister { register: 0 })
        );
        table.assign_slot(r0.id, 7);
        assert_eq!(table.slot(r0.id), Ok(7));
    }

    #[test]
    fn test_consumer_tracking() {
        let mut table = RegisterTable::new();
        let r = table.alloc(Type::I32);
        let pos = InstrPos {
            block: BlockId(0),
            index: 2,
        };
        table.mark_used(r.id, pos);
        assert_eq!(table.info(r.id).used_by, vec![pos]);
    }

    #[test]
    fn test_register_display() {
        let r = Register {
            id: RegisterId(4),
            ty: Type::F64,
        };
        assert_eq!(r.to_string(), "r4:f64");
    }
}
