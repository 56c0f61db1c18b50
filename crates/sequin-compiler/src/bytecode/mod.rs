//! Bytecode model: opcodes, instructions, wire encoding, and the compiled
//! program container.

pub mod encoder;
pub mod instr;
pub mod opcode;
pub mod program;

pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use instr::{EncodeCtx, Immediate, Instruction};
pub use opcode::Opcode;
pub use program::{Program, MAGIC, VERSION};
