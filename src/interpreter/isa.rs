//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode table and invokes a callback macro for code generation, so the enum,
//! the decoder and the fingerprint test all read the same list.
//!
//! This module generates:
//! - The [`Opcode`] enum with its byte values
//! - `TryFrom<u8>` for decoding opcode bytes
//! - Mnemonics, operand kinds and categories
//!
//! # Numbering
//!
//! Category `N` occupies the `0xN0..=0xNF` range. The top byte of an encoded
//! [`Instruction`](super::instruction::Instruction) is the opcode value.

use crate::interpreter::errors::VmError;

/// Unsigned machine word held on the data stack.
pub type Word = u32;
/// Signed view of a [`Word`].
pub type SWord = i32;
/// Single byte of arena memory.
pub type Byte = u8;
/// Index into the program, or offset into the memory arena.
pub type Address = Word;
/// Signed displacement applied to the instruction pointer.
pub type AddressOffset = SWord;

/// Size of a [`Word`] in bytes.
pub const WORD_SIZE: usize = size_of::<Word>();

/// Invokes a callback macro with the complete opcode definition list.
///
/// Each entry reads `Name = byte, "MNEMONIC" => OperandKind, Category`.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Category 0 - Control
            // =========================
            /// NOP ; no effect
            Nop = 0x00, "NOP" => None, Control,
            /// END ; stop the processor successfully
            End = 0x01, "END" => None, Control,
            /// BREAK ; invoke the break handler, if any
            Break = 0x02, "BREAK" => None, Control,
            /// PRINT_INT ; print top as unsigned integer ( a -- a )
            PrintInt = 0x03, "PRINT_INT" => None, Control,
            /// PRINT_CHAR ; print low byte of top as a character ( a -- a )
            PrintChar = 0x04, "PRINT_CHAR" => None, Control,
            /// PRINT_LINE ; emit a line terminator
            PrintLine = 0x05, "PRINT_LINE" => None, Control,
            /// PRINT_STACK ; print `[a, b, c]` bottom to top, then a line terminator
            PrintStack = 0x06, "PRINT_STACK" => None, Control,
            // =========================
            // Category 1 - Stack manipulation
            // =========================
            /// PUSH imm ; ( -- imm )
            Push = 0x10, "PUSH" => Unsigned, Stack,
            /// DROP n ; remove n elements
            Drop = 0x11, "DROP" => Unsigned, Stack,
            /// PICK n ; copy the element n-from-top onto the top
            Pick = 0x12, "PICK" => Unsigned, Stack,
            /// ROLL n ; move the element n-from-top onto the top
            Roll = 0x13, "ROLL" => Unsigned, Stack,
            /// DUP ; ( a -- a a )
            Duplicate = 0x14, "DUP" => None, Stack,
            /// SWAP ; ( b a -- a b )
            Swap = 0x15, "SWAP" => None, Stack,
            /// ROT ; ( c b a -- b a c )
            Rotate = 0x16, "ROT" => None, Stack,
            /// OVER ; ( b a -- b a b )
            Over = 0x17, "OVER" => None, Stack,
            // =========================
            // Category 2 - Flow control
            // =========================
            /// CALL addr ; push return address, jump to addr
            Call = 0x20, "CALL" => Unsigned, Flow,
            /// CALL_IND ; ( addr -- ) push return address, jump to addr
            CallIndirect = 0x21, "CALL_IND" => None, Flow,
            /// RET ; pop return address into the instruction pointer
            Return = 0x22, "RET" => None, Flow,
            /// JUMP_REL off ; ip += off (relative to the next instruction)
            JumpRelative = 0x23, "JUMP_REL" => Signed, Flow,
            /// JUMP_ABS addr ; ip = addr
            JumpAbsolute = 0x24, "JUMP_ABS" => Unsigned, Flow,
            // =========================
            // Category 3 - Arithmetic
            // =========================
            /// ADD ; ( b a -- b+a )
            Add = 0x30, "ADD" => None, Arithmetic,
            /// ADDI imm ; ( a -- a+imm )
            AddImmediate = 0x31, "ADDI" => Unsigned, Arithmetic,
            /// SUB ; ( b a -- b-a )
            Subtract = 0x32, "SUB" => None, Arithmetic,
            /// SUBI imm ; ( a -- a-imm )
            SubtractImmediate = 0x33, "SUBI" => Unsigned, Arithmetic,
            /// NEG ; ( a -- -a )
            Negate = 0x34, "NEG" => None, Arithmetic,
            // =========================
            // Category 4 - Bitwise
            // =========================
            /// AND ; ( b a -- b&a )
            And = 0x40, "AND" => None, Bitwise,
            /// ANDI imm ; ( b a -- b a&imm )
            AndImmediate = 0x41, "ANDI" => Unsigned, Bitwise,
            /// OR ; ( b a -- b|a )
            Or = 0x42, "OR" => None, Bitwise,
            /// ORI imm ; ( b a -- b a|imm )
            OrImmediate = 0x43, "ORI" => Unsigned, Bitwise,
            /// XOR ; ( b a -- b^a )
            ExclusiveOr = 0x44, "XOR" => None, Bitwise,
            /// XORI imm ; ( b a -- b a^imm )
            ExclusiveOrImmediate = 0x45, "XORI" => Unsigned, Bitwise,
            /// SHL ; ( b a -- b<<a )
            ShiftLeft = 0x46, "SHL" => None, Bitwise,
            /// SHLI imm ; ( b a -- b a<<imm )
            ShiftLeftImmediate = 0x47, "SHLI" => Unsigned, Bitwise,
            /// SHR ; ( b a -- b>>a )
            ShiftRight = 0x48, "SHR" => None, Bitwise,
            /// SHRI imm ; ( b a -- b a>>imm )
            ShiftRightImmediate = 0x49, "SHRI" => Unsigned, Bitwise,
            /// NOT ; ( a -- !a )
            Not = 0x4A, "NOT" => None, Bitwise,
            // =========================
            // Category 5 - Bit operations
            // =========================
            /// BIT_SET ; ( b i -- b|(1<<i) )
            BitSet = 0x50, "BIT_SET" => None, Bit,
            /// BIT_CLR ; ( b i -- b&!(1<<i) )
            BitClear = 0x51, "BIT_CLR" => None, Bit,
            /// BIT_TGL ; ( b i -- b^(1<<i) )
            BitToggle = 0x52, "BIT_TGL" => None, Bit,
            // =========================
            // Category 6 - Load/Store
            // =========================
            /// LOAD_B ; ( addr -- byte )
            LoadByte = 0x60, "LOAD_B" => None, Memory,
            /// LOAD_W ; ( addr -- word )
            LoadWord = 0x61, "LOAD_W" => None, Memory,
            /// STORE_B ; ( addr value -- )
            StoreByte = 0x62, "STORE_B" => None, Memory,
            /// STORE_W ; ( addr value -- )
            StoreWord = 0x63, "STORE_W" => None, Memory,
            /// STORE_BI imm ; reserved, not executable
            StoreByteImmediate = 0x64, "STORE_BI" => Unsigned, Memory,
            /// STORE_WI imm ; reserved, not executable
            StoreWordImmediate = 0x65, "STORE_WI" => Unsigned, Memory,
            // =========================
            // Category 7 - Dynamic allocation
            // =========================
            /// MALLOC ; ( size -- addr )
            Malloc = 0x70, "MALLOC" => None, Allocation,
            /// MALLOCI imm ; ( -- addr )
            MallocImmediate = 0x71, "MALLOCI" => Unsigned, Allocation,
            /// CALLOC ; ( size count -- addr )
            Calloc = 0x72, "CALLOC" => None, Allocation,
            /// CALLOCI imm ; ( count -- addr ), element size = imm
            CallocImmediate = 0x73, "CALLOCI" => Unsigned, Allocation,
            /// REALLOC ; ( addr size -- addr' )
            Realloc = 0x74, "REALLOC" => None, Allocation,
            /// REALLOCI imm ; ( addr -- addr' ), size = imm
            ReallocImmediate = 0x75, "REALLOCI" => Unsigned, Allocation,
            /// FREE ; ( addr -- )
            Free = 0x76, "FREE" => None, Allocation,
        }
    };
}

/// How the 24-bit operand field of an instruction is interpreted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// The operand field is ignored.
    None,
    /// The low 24 bits, zero-extended.
    Unsigned,
    /// The low 24 bits, sign-extended from bit 23.
    Signed,
}

/// Opcode families, matching the high nibble of the opcode byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Category {
    Control,
    Stack,
    Flow,
    Arithmetic,
    Bitwise,
    Bit,
    Memory,
    Allocation,
}

impl Category {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Control => "control",
            Category::Stack => "stack manipulation",
            Category::Flow => "flow control",
            Category::Arithmetic => "arithmetic",
            Category::Bitwise => "bitwise",
            Category::Bit => "bit operations",
            Category::Memory => "load/store",
            Category::Allocation => "dynamic allocation",
        }
    }
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => $kind:ident, $category:ident
        ),* $(,)?
    ) => {
        /// Operation selector stored in the top byte of an instruction.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Opcode {
            type Error = VmError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(VmError::UnrecognisedOpcode {
                        opcode: value,
                        address: 0,
                    }),
                }
            }
        }

        impl Opcode {
            /// Every opcode in table order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            pub const fn operand_kind(&self) -> OperandKind {
                match self {
                    $( Opcode::$name => OperandKind::$kind, )*
                }
            }

            pub const fn category(&self) -> Category {
                match self {
                    $( Opcode::$name => Category::$category, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_roundtrip() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op as u8).unwrap(), op);
        }
    }

    #[test]
    fn unassigned_bytes_are_rejected() {
        for byte in [0x07u8, 0x18, 0x25, 0x35, 0x4B, 0x53, 0x66, 0x77, 0x80, 0xFF] {
            let err = Opcode::try_from(byte).unwrap_err();
            assert!(matches!(err, VmError::UnrecognisedOpcode { opcode, .. } if opcode == byte));
        }
    }

    #[test]
    fn category_matches_high_nibble() {
        let order = [
            Category::Control,
            Category::Stack,
            Category::Flow,
            Category::Arithmetic,
            Category::Bitwise,
            Category::Bit,
            Category::Memory,
            Category::Allocation,
        ];
        for &op in Opcode::ALL {
            assert_eq!(op.category(), order[(op as u8 >> 4) as usize], "{op}");
        }
    }

    #[test]
    fn category_names() {
        assert_eq!(Opcode::Push.category().as_str(), "stack manipulation");
        assert_eq!(Opcode::LoadWord.category().as_str(), "load/store");
        assert_eq!(Opcode::Free.category().as_str(), "dynamic allocation");
    }

    #[test]
    fn mnemonics_are_unique() {
        for (i, a) in Opcode::ALL.iter().enumerate() {
            for b in &Opcode::ALL[i + 1..] {
                assert_ne!(a.mnemonic(), b.mnemonic());
            }
        }
    }

    #[test]
    fn operand_kinds() {
        assert_eq!(Opcode::Push.operand_kind(), OperandKind::Unsigned);
        assert_eq!(Opcode::JumpRelative.operand_kind(), OperandKind::Signed);
        assert_eq!(Opcode::Add.operand_kind(), OperandKind::None);
    }
}
