//! Intermediate representation: blocks, labels, registers, variables, and
//! the builder that assembles them.

pub mod block;
pub mod builder;
pub mod pretty;
pub mod value;

pub use block::{BasicBlock, BlockId, Label, LabelId};
pub use builder::{Builder, ContextId, FunctionSig, LoopStack};
pub use value::{
    Constant, InstrPos, IrValue, Register, RegisterId, RegisterInfo, RegisterTable, Variable,
    VariableId,
};
