use crate::interpreter::config::Config;
use crate::interpreter::errors::{VmError, VmResult};
use crate::interpreter::isa::{Address, AddressOffset, Word};
use crate::interpreter::stack::BoundedStack;
use std::fmt;

/// Registers of a processor: both stacks and the instruction pointer.
///
/// Jumps are not bounds checked here. An instruction pointer outside the
/// program is caught on the next fetch.
#[derive(Clone, Debug)]
pub struct ProcessorState {
    data_stack: BoundedStack<Word>,
    return_stack: BoundedStack<Address>,
    instruction_pointer: Address,
}

impl ProcessorState {
    pub fn new(config: &Config) -> Self {
        Self {
            data_stack: BoundedStack::new(config.data_stack_capacity),
            return_stack: BoundedStack::new(config.return_stack_capacity),
            instruction_pointer: 0,
        }
    }

    pub fn data_stack(&self) -> &BoundedStack<Word> {
        &self.data_stack
    }

    pub fn data_stack_mut(&mut self) -> &mut BoundedStack<Word> {
        &mut self.data_stack
    }

    pub fn return_stack(&self) -> &BoundedStack<Address> {
        &self.return_stack
    }

    /// Address of the next instruction to fetch.
    pub fn instruction_pointer(&self) -> Address {
        self.instruction_pointer
    }

    /// Moves past the instruction just fetched.
    pub fn advance(&mut self) {
        self.instruction_pointer = self.instruction_pointer.wrapping_add(1);
    }

    /// Saves the current instruction pointer and jumps to `address`.
    ///
    /// Nothing changes if the return stack is full.
    pub fn function_call(&mut self, address: Address) -> VmResult {
        if !self.return_stack.push(self.instruction_pointer) {
            return Err(VmError::ReturnStackOverflow {
                capacity: self.return_stack.capacity(),
            });
        }
        self.instruction_pointer = address;
        Ok(())
    }

    /// Resumes at the most recently saved address.
    pub fn function_return(&mut self) -> VmResult {
        let address = self
            .return_stack
            .pop()
            .ok_or(VmError::ReturnStackUnderflow)?;
        self.instruction_pointer = address;
        Ok(())
    }

    pub fn jump_absolute(&mut self, address: Address) {
        self.instruction_pointer = address;
    }

    /// Offsets the instruction pointer, which already points past the jump.
    pub fn jump_relative(&mut self, offset: AddressOffset) {
        self.instruction_pointer = self.instruction_pointer.wrapping_add_signed(offset);
    }
}

/// One-line summary used by the break handler and trace logs.
impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ip={} data={:?} return={:?}",
            self.instruction_pointer,
            self.data_stack.as_slice(),
            self.return_stack.as_slice()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(return_capacity: usize) -> ProcessorState {
        ProcessorState::new(&Config {
            return_stack_capacity: return_capacity,
            ..Config::default()
        })
    }

    #[test]
    fn call_saves_advanced_pointer() {
        let mut state = state(4);
        state.jump_absolute(5);
        state.advance();
        state.function_call(20).unwrap();
        assert_eq!(state.instruction_pointer(), 20);
        assert_eq!(state.return_stack().peek(), Some(6));
        state.function_return().unwrap();
        assert_eq!(state.instruction_pointer(), 6);
    }

    #[test]
    fn return_without_call_underflows() {
        let mut state = state(4);
        assert!(matches!(
            state.function_return(),
            Err(VmError::ReturnStackUnderflow)
        ));
        assert_eq!(state.instruction_pointer(), 0);
    }

    #[test]
    fn call_on_full_return_stack_changes_nothing() {
        let mut state = state(1);
        state.function_call(3).unwrap();
        let err = state.function_call(9).unwrap_err();
        assert!(matches!(err, VmError::ReturnStackOverflow { capacity: 1 }));
        assert_eq!(state.instruction_pointer(), 3);
        assert_eq!(state.return_stack().len(), 1);
    }

    #[test]
    fn relative_jumps_in_both_directions() {
        let mut state = state(1);
        state.jump_absolute(10);
        state.jump_relative(-4);
        assert_eq!(state.instruction_pointer(), 6);
        state.jump_relative(7);
        assert_eq!(state.instruction_pointer(), 13);
    }

    #[test]
    fn display_lists_both_stacks() {
        let mut state = state(2);
        state.data_stack_mut().push(1);
        state.data_stack_mut().push(2);
        state.function_call(4).unwrap();
        assert_eq!(state.to_string(), "ip=4 data=[1, 2] return=[0]");
    }
}
