//! Compiled program container and module encoding
//!
//! A [`Program`] is the finished output of a compilation: the block list in
//! layout order, the resolved label table, the constant-data pool, and the
//! register and variable tables. `encode` serializes it into the module
//! format: a magic/version header, the pooled constants, the code section,
//! the label table, and a trailing CRC32 of everything before it.

use crate::bytecode::encoder::BytecodeWriter;
use crate::bytecode::instr::EncodeCtx;
use crate::error::{CompileError, CompileResult};
use crate::ir::block::{BasicBlock, Label};
use crate::ir::builder::FunctionSig;
use crate::ir::value::{Constant, RegisterId, RegisterTable, Variable};

/// Module file magic.
pub const MAGIC: &[u8; 4] = b"SEQB";

/// Module format version.
pub const VERSION: u16 = 1;

/// A fully built compilation unit.
#[derive(Debug)]
pub struct Program {
    blocks: Vec<BasicBlock>,
    labels: Vec<Label>,
    const_data: Vec<Constant>,
    registers: RegisterTable,
    variables: Vec<Variable>,
    functions: Vec<FunctionSig>,
}

impl Program {
    /// Assemble a program from the builder's final state.
    pub fn new(
        blocks: Vec<BasicBlock>,
        labels: Vec<Label>,
        const_data: Vec<Constant>,
        registers: RegisterTable,
        variables: Vec<Variable>,
        functions: Vec<FunctionSig>,
    ) -> Self {
        Self {
            blocks,
            labels,
            const_data,
            registers,
            variables,
            functions,
        }
    }

    /// Blocks in layout order.
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// All labels created during the compilation.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Constant-data pool in interning order.
    pub fn const_data(&self) -> &[Constant] {
        &self.const_data
    }

    /// Register table.
    pub fn registers(&self) -> &RegisterTable {
        &self.registers
    }

    /// Register table, for the downstream slot allocator.
    pub fn registers_mut(&mut self) -> &mut RegisterTable {
        &mut self.registers
    }

    /// Declared variables in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Recorded function signatures.
    pub fn functions(&self) -> &[FunctionSig] {
        &self.functions
    }

    /// Total instruction count across all blocks.
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }

    /// Resolved label table: `(label id, block id, instruction index)` rows.
    ///
    /// An unhooked label at this point is an internal invariant failure.
    pub fn label_table(&self) -> CompileResult<Vec<(u32, u32, u32)>> {
        self.labels
            .iter()
            .map(|label| {
                let (block, index) = label
                    .target()
                    .ok_or(CompileError::UnhookedLabel { label: label.id.0 })?;
                Ok((label.id.0, block.as_u32(), index as u32))
            })
            .collect()
    }

    /// Assign each register the slot matching its id.
    ///
    /// A stand-in for a real allocator; rejects programs with more live
    /// registers than slots.
    pub fn assign_sequential_slots(&mut self) -> CompileResult<()> {
        let count = self.registers.len();
        if count > 256 {
            return Err(CompileError::RegisterOverflow { count });
        }
        for id in 0..count {
            self.registers.assign_slot(RegisterId(id as u32), id as u8);
        }
        Ok(())
    }

    /// Serialize the program into the module format.
    ///
    /// Every register slot must be assigned and every label hooked, or the
    /// matching internal error surfaces here.
    pub fn encode(&self) -> CompileResult<Vec<u8>> {
        let mut out = BytecodeWriter::new();
        out.emit_bytes(MAGIC);
        out.emit_u16(VERSION);

        // Constant-data pool: each entry is a type byte and a
        // length-prefixed payload.
        out.emit_u32(self.const_data.len() as u32);
        for constant in &self.const_data {
            let payload = constant.ty.serialize(&constant.value)?;
            out.emit_u8(constant.ty as u8);
            out.emit_u32(payload.len() as u32);
            out.emit_bytes(&payload);
        }

        out.emit_u32(self.registers.len() as u32);
        out.emit_u32(self.variables.len() as u32);

        // Code section: blocks in layout order, each with its instruction
        // count.
        let ctx = EncodeCtx {
            registers: &self.registers,
            labels: &self.labels,
        };
        out.emit_u32(self.blocks.len() as u32);
        for block in &self.blocks {
            out.emit_u32(block.len() as u32);
            for instr in &block.instructions {
                instr.encode(&ctx, &mut out)?;
            }
        }

        // Resolved label table.
        let table = self.label_table()?;
        out.emit_u32(table.len() as u32);
        for (label, block, index) in table {
            out.emit_u32(label);
            out.emit_u32(block);
            out.emit_u32(index);
        }

        let checksum = crc32fast::hash(out.as_bytes());
        out.emit_u32(checksum);
        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::encoder::BytecodeReader;
    use crate::bytecode::instr::{Immediate, Instruction};
    use crate::ir::block::{BlockId, LabelId};
    use crate::types::{ConstValue, Type};

    fn empty_program() -> Program {
        Program::new(
            vec![BasicBlock::new(BlockId(0))],
            Vec::new(),
            Vec::new(),
            RegisterTable::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_header_and_checksum() {
        let bytes = empty_program().encode().unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        let mut r = BytecodeReader::new(&bytes[4..]);
        assert_eq!(r.read_u16().unwrap(), VERSION);

        let body_len = bytes.len() - 4;
        let mut r = BytecodeReader::new(&bytes[body_len..]);
        assert_eq!(r.read_u32().unwrap(), crc32fast::hash(&bytes[..body_len]));
    }

    #[test]
    fn test_unhooked_label_aborts_encoding() {
        let mut program = empty_program();
        program.labels.push(Label::new(LabelId(0)));
        assert_eq!(
            program.encode(),
            Err(CompileError::UnhookedLabel { label: 0 })
        );
    }

    #[test]
    fn test_encode_roundtrips_code_section() {
        let mut registers = RegisterTable::new();
        let dst = registers.alloc(Type::I16);
        let mut block = BasicBlock::new(BlockId(0));
        block.push(Instruction::LoadImmediate {
            dst,
            ty: Type::I16,
            value: Immediate::Inline(ConstValue::Int(-2)),
        });
        let mut program = Program::new(
            vec![block],
            Vec::new(),
            Vec::new(),
            registers,
            Vec::new(),
            Vec::new(),
        );
        program.assign_sequential_slots().unwrap();
        let bytes = program.encode().unwrap();

        // Skip magic, version, empty pool count, register and variable
        // counts, block count.
        let mut r = BytecodeReader::new(&bytes[4 + 2 + 4 + 4 + 4 + 4..]);
        assert_eq!(r.read_u32().unwrap(), 1); // instruction count
        assert_eq!(r.read_u16().unwrap(), 0x10); // load_immediate
        assert_eq!(r.read_u8().unwrap(), 0); // slot
        assert_eq!(r.read_u8().unwrap(), 0x30); // i16 nibble
        assert_eq!(r.read_i16().unwrap(), -2);
    }

    #[test]
    fn test_label_table_resolution() {
        let mut program = empty_program();
        let mut label = Label::new(LabelId(0));
        label.hook(BlockId(0), 4).unwrap();
        program.labels.push(label);
        assert_eq!(program.label_table().unwrap(), vec![(0, 0, 4)]);
    }
}
