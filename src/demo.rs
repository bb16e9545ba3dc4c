//! Built-in program run when the binary is given no file.

use crate::interpreter::errors::VmResult;
use crate::interpreter::instruction::Instruction;
use crate::interpreter::isa::{Opcode, Word};
use crate::interpreter::program::Program;

/// Adds two numbers, prints the stack before and after, then prints `A`,
/// pausing at a BREAK after each step.
pub fn demo_program(capacity: usize) -> VmResult<Program> {
    let mut program = Program::with_capacity(capacity);
    for instruction in [
        Instruction::with_unsigned(Opcode::Push, 15),
        Instruction::with_unsigned(Opcode::Push, 30),
        Instruction::new(Opcode::PrintStack),
        Instruction::new(Opcode::Add),
        Instruction::new(Opcode::PrintStack),
        Instruction::new(Opcode::Break),
        Instruction::with_unsigned(Opcode::Push, 'A' as Word),
        Instruction::new(Opcode::PrintChar),
        Instruction::new(Opcode::Break),
        Instruction::new(Opcode::End),
    ] {
        program.push(instruction)?;
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::config::Config;
    use crate::interpreter::output::StringSink;
    use crate::interpreter::processor::Processor;
    use crate::interpreter::program::Environment;

    #[test]
    fn demo_prints_sum_and_letter() {
        let config = Config::default();
        let mut sink = StringSink::new();
        let mut breaks = 0;
        {
            let env = Environment::new(demo_program(config.program_capacity).unwrap(), &mut sink);
            let mut cpu = Processor::new(env, &config).with_break_handler(|_, _| breaks += 1);
            cpu.run().unwrap();
            assert!(cpu.has_completed());
        }
        assert_eq!(breaks, 2);
        assert_eq!(sink.as_str(), "[15, 30]\n[45]\nA");
    }

    #[test]
    fn demo_disassembles() {
        let program = demo_program(16).unwrap();
        let listing: Vec<String> = program.iter().map(ToString::to_string).collect();
        assert_eq!(listing[0], "PUSH 15");
        assert_eq!(listing[6], "PUSH 65");
        assert_eq!(listing.last().map(String::as_str), Some("END"));
    }

    #[test]
    fn demo_needs_ten_slots() {
        assert!(demo_program(9).is_err());
        assert_eq!(demo_program(10).unwrap().len(), 10);
    }
}
