//! Instruction streams and the environment a processor runs in.
//!
//! A program image on disk is a flat sequence of little-endian 4-byte words,
//! one per instruction, with no header.

use crate::interpreter::errors::{VmError, VmResult};
use crate::interpreter::instruction::Instruction;
use crate::interpreter::isa::{Address, WORD_SIZE, Word};
use crate::interpreter::output::OutputSink;
use std::path::Path;

/// Fixed-capacity sequence of instructions, addressed by index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
    capacity: usize,
}

impl Program {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instructions: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    /// Appends one instruction.
    pub fn push(&mut self, instruction: Instruction) -> VmResult {
        if self.instructions.len() >= self.capacity {
            return Err(VmError::ProgramFull {
                capacity: self.capacity,
            });
        }
        self.instructions.push(instruction);
        Ok(())
    }

    /// Appends raw instruction words in order.
    pub fn extend_from_words(&mut self, words: impl IntoIterator<Item = Word>) -> VmResult {
        for word in words {
            self.push(Instruction::from_word(word))?;
        }
        Ok(())
    }

    /// Decodes a program image. A trailing partial word is rejected.
    pub fn from_bytes(bytes: &[u8], capacity: usize) -> VmResult<Self> {
        let chunks = bytes.chunks_exact(WORD_SIZE);
        let trailing = chunks.remainder().len();
        if trailing != 0 {
            return Err(VmError::TruncatedProgram { trailing });
        }

        let mut program = Self::with_capacity(capacity);
        program.extend_from_words(chunks.map(|chunk| {
            let mut word = [0u8; WORD_SIZE];
            word.copy_from_slice(chunk);
            Word::from_le_bytes(word)
        }))?;
        Ok(program)
    }

    /// Reads and decodes a program image from disk.
    pub fn load_file(path: impl AsRef<Path>, capacity: usize) -> VmResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, capacity)
    }

    /// Encodes the program as an image readable by [`Program::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        self.instructions
            .iter()
            .flat_map(|instruction| instruction.word().to_le_bytes())
            .collect()
    }

    pub fn get(&self, address: Address) -> Option<Instruction> {
        self.instructions.get(address as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }
}

/// A program together with the sink its print instructions write to.
///
/// The sink is borrowed; whoever created it keeps ownership.
pub struct Environment<'a> {
    program: Program,
    output: &'a mut dyn OutputSink,
}

impl<'a> Environment<'a> {
    pub fn new(program: Program, output: &'a mut dyn OutputSink) -> Self {
        Self { program, output }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn output(&mut self) -> &mut dyn OutputSink {
        &mut *self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::isa::Opcode;
    use crate::interpreter::output::StringSink;
    use std::io::Write;

    #[test]
    fn push_respects_capacity() {
        let mut program = Program::with_capacity(2);
        program.push(Instruction::new(Opcode::Nop)).unwrap();
        program.push(Instruction::new(Opcode::End)).unwrap();
        assert!(matches!(
            program.push(Instruction::new(Opcode::Nop)),
            Err(VmError::ProgramFull { capacity: 2 })
        ));
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn bytes_are_little_endian_words() {
        let bytes = [0x2A, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x01];
        let program = Program::from_bytes(&bytes, 16).unwrap();
        assert_eq!(
            program.get(0),
            Some(Instruction::with_unsigned(Opcode::Push, 42))
        );
        assert_eq!(program.get(1), Some(Instruction::new(Opcode::End)));
        assert_eq!(program.get(2), None);
        assert_eq!(program.to_bytes(), bytes);
    }

    #[test]
    fn trailing_partial_word_is_rejected() {
        let err = Program::from_bytes(&[1, 2, 3, 4, 5, 6], 16).unwrap_err();
        assert!(matches!(err, VmError::TruncatedProgram { trailing: 2 }));
    }

    #[test]
    fn oversized_image_is_rejected() {
        let err = Program::from_bytes(&[0; 12], 2).unwrap_err();
        assert!(matches!(err, VmError::ProgramFull { capacity: 2 }));
    }

    #[test]
    fn load_file_reads_image() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut original = Program::with_capacity(8);
        original
            .extend_from_words([0x1000_0007, 0x0300_0000, 0x0100_0000])
            .unwrap();
        file.write_all(&original.to_bytes()).unwrap();

        let loaded = Program::load_file(file.path(), 8).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Program::load_file(dir.path().join("absent.bin"), 8).unwrap_err();
        assert!(matches!(err, VmError::Io { .. }));
    }

    #[test]
    fn environment_exposes_program_and_sink() {
        let mut sink = StringSink::new();
        let mut program = Program::with_capacity(1);
        program.push(Instruction::new(Opcode::End)).unwrap();
        {
            let mut env = Environment::new(program, &mut sink);
            assert_eq!(env.program().len(), 1);
            env.output().print_str("hi");
        }
        assert_eq!(sink.as_str(), "hi");
    }
}
