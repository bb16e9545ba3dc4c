//! 32-bit instruction words.
//!
//! Layout: `[opcode:8][operand:24]`. The operand is read either zero-extended
//! or sign-extended from bit 23, depending on the opcode.

use crate::interpreter::errors::VmResult;
use crate::interpreter::isa::{AddressOffset, Opcode, OperandKind, SWord, Word};
use std::fmt;

const OPCODE_SHIFT: u32 = 24;
const OPERAND_MASK: Word = 0x00FF_FFFF;
const SIGN_BIT: Word = 0x0080_0000;
const SIGN_EXTENSION: Word = 0xFF00_0000;

/// Largest value an unsigned operand can hold.
pub const MAX_UNSIGNED_OPERAND: Word = OPERAND_MASK;
/// Range of values a signed operand can hold.
pub const SIGNED_OPERAND_RANGE: std::ops::RangeInclusive<SWord> = -0x80_0000..=0x7F_FFFF;

/// One encoded instruction.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Instruction(Word);

impl Instruction {
    /// Wraps a raw instruction word.
    pub const fn from_word(word: Word) -> Self {
        Self(word)
    }

    /// Encodes an instruction with no operand.
    pub const fn new(opcode: Opcode) -> Self {
        Self((opcode as Word) << OPCODE_SHIFT)
    }

    /// Encodes an instruction with an unsigned operand; bits above 23 are discarded.
    pub const fn with_unsigned(opcode: Opcode, operand: Word) -> Self {
        Self(((opcode as Word) << OPCODE_SHIFT) | (operand & OPERAND_MASK))
    }

    /// Encodes an instruction with a signed operand stored in 24-bit two's complement.
    pub const fn with_signed(opcode: Opcode, operand: SWord) -> Self {
        Self(((opcode as Word) << OPCODE_SHIFT) | ((operand as Word) & OPERAND_MASK))
    }

    pub const fn word(&self) -> Word {
        self.0
    }

    /// Top 8 bits, not yet validated.
    pub const fn opcode_byte(&self) -> u8 {
        (self.0 >> OPCODE_SHIFT) as u8
    }

    /// Decodes the opcode byte.
    pub fn opcode(&self) -> VmResult<Opcode> {
        Opcode::try_from(self.opcode_byte())
    }

    /// Low 24 bits, zero-extended.
    pub const fn unsigned_operand(&self) -> Word {
        self.0 & OPERAND_MASK
    }

    /// Low 24 bits, sign-extended from bit 23.
    pub const fn signed_operand(&self) -> AddressOffset {
        if self.0 & SIGN_BIT != 0 {
            (self.0 | SIGN_EXTENSION) as SWord
        } else {
            (self.0 & (OPERAND_MASK >> 1)) as SWord
        }
    }
}

impl From<Word> for Instruction {
    fn from(word: Word) -> Self {
        Self(word)
    }
}

impl From<Instruction> for Word {
    fn from(instruction: Instruction) -> Self {
        instruction.0
    }
}

/// Disassembly, e.g. `PUSH 42`, `JUMP_REL -3` or `DB 0x7F000000` for unknown words.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(opcode) = self.opcode() else {
            return write!(f, "DB 0x{:08X}", self.0);
        };
        match opcode.operand_kind() {
            OperandKind::None => write!(f, "{}", opcode.mnemonic()),
            OperandKind::Unsigned => {
                write!(f, "{} {}", opcode.mnemonic(), self.unsigned_operand())
            }
            OperandKind::Signed => write!(f, "{} {}", opcode.mnemonic(), self.signed_operand()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_occupies_top_byte() {
        let instruction = Instruction::with_unsigned(Opcode::Push, 0x1234);
        assert_eq!(instruction.word(), 0x1000_1234);
        assert_eq!(instruction.opcode().unwrap(), Opcode::Push);
        assert_eq!(instruction.unsigned_operand(), 0x1234);
    }

    #[test]
    fn unsigned_operand_is_truncated_to_24_bits() {
        let instruction = Instruction::with_unsigned(Opcode::Push, 0xABCD_EF01);
        assert_eq!(instruction.opcode().unwrap(), Opcode::Push);
        assert_eq!(instruction.unsigned_operand(), 0xCD_EF01);
    }

    #[test]
    fn signed_operand_extends_bit_23() {
        assert_eq!(
            Instruction::with_signed(Opcode::JumpRelative, -1).signed_operand(),
            -1
        );
        assert_eq!(
            Instruction::with_signed(Opcode::JumpRelative, -0x80_0000).signed_operand(),
            -0x80_0000
        );
        assert_eq!(
            Instruction::with_signed(Opcode::JumpRelative, 0x7F_FFFF).signed_operand(),
            0x7F_FFFF
        );
        assert_eq!(Instruction::from_word(0x23FF_FFFE).signed_operand(), -2);
    }

    #[test]
    fn signed_roundtrip_over_range_edges() {
        for value in [
            *SIGNED_OPERAND_RANGE.start(),
            -5,
            0,
            5,
            *SIGNED_OPERAND_RANGE.end(),
        ] {
            let word = Instruction::with_signed(Opcode::JumpRelative, value);
            assert_eq!(word.signed_operand(), value);
            assert_eq!(word.opcode().unwrap(), Opcode::JumpRelative);
        }
    }

    #[test]
    fn every_opcode_roundtrips_both_operand_ranges() {
        let stride = 0x1_0001;
        let mut signed: Vec<SWord> = SIGNED_OPERAND_RANGE.step_by(stride).collect();
        signed.extend([-0x80_0000, -0x7F_FFFF, -1, 0, 1, 0x7F_FFFE, 0x7F_FFFF]);
        let mut unsigned: Vec<Word> = (0..=MAX_UNSIGNED_OPERAND).step_by(stride).collect();
        unsigned.extend([0, 1, 0x7F_FFFF, 0x80_0000, MAX_UNSIGNED_OPERAND]);

        for &opcode in Opcode::ALL {
            for &value in &signed {
                let instruction = Instruction::with_signed(opcode, value);
                assert_eq!(instruction.opcode().unwrap(), opcode);
                assert_eq!(instruction.signed_operand(), value, "{opcode} {value}");
                assert_eq!(instruction.unsigned_operand(), value as Word & MAX_UNSIGNED_OPERAND);
            }
            for &value in &unsigned {
                let instruction = Instruction::with_unsigned(opcode, value);
                assert_eq!(instruction.opcode().unwrap(), opcode);
                assert_eq!(instruction.unsigned_operand(), value, "{opcode} {value}");
                let expected = if value > 0x7F_FFFF {
                    value as SWord - 0x100_0000
                } else {
                    value as SWord
                };
                assert_eq!(instruction.signed_operand(), expected);
            }
        }
    }

    #[test]
    fn unknown_opcode_byte_is_reported() {
        let instruction = Instruction::from_word(0xEE00_0000);
        assert_eq!(instruction.opcode_byte(), 0xEE);
        assert!(instruction.opcode().is_err());
    }

    #[test]
    fn disassembly() {
        assert_eq!(Instruction::with_unsigned(Opcode::Push, 42).to_string(), "PUSH 42");
        assert_eq!(
            Instruction::with_signed(Opcode::JumpRelative, -3).to_string(),
            "JUMP_REL -3"
        );
        assert_eq!(Instruction::new(Opcode::Add).to_string(), "ADD");
        assert_eq!(Instruction::from_word(0x7F00_0000).to_string(), "DB 0x7F000000");
    }
}
