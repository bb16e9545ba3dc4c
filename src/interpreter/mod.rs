//! Fixed-resource stack machine.
//!
//! Programs are sequences of 32-bit instructions executed against a bounded
//! data stack, a bounded return stack and a checked memory arena.
//!
//! # Architecture
//!
//! - **Instruction format**: `[opcode:8][operand:24]`, operand zero- or sign-extended per opcode
//! - **Data stack**: bounded stack of 32-bit words; binary operations pop one
//!   operand and fold it into the new top
//! - **Return stack**: bounded stack of resume addresses for CALL/RET
//! - **Memory arena**: byte buffer with an allocation table; addresses are
//!   arena offsets and every access is checked
//! - **Execution model**: one instruction per cycle, first error halts the run
//!
//! # Modules
//!
//! - [`arena`]: Memory arena behind the load/store and allocation opcodes
//! - [`config`]: Stack, program and arena capacities
//! - [`container`]: Fixed-capacity sequence backing both stacks
//! - [`errors`]: Load and execution error types
//! - [`instruction`]: Instruction word encoding and disassembly
//! - [`isa`]: Opcode table and machine word types
//! - [`output`]: Output sink used by the print opcodes
//! - [`processor`]: Fetch/dispatch loop and opcode handlers
//! - [`program`]: Program images and the execution environment
//! - [`stack`]: LIFO adapter over the container
//! - [`state`]: Stacks and instruction pointer of a processor

pub mod arena;
pub mod config;
pub mod container;
pub mod errors;
pub mod instruction;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod output;
pub mod processor;
pub mod program;
pub mod stack;
pub mod state;
