//! Fetch/decode/dispatch loop.
//!
//! A [`Processor`] owns its [`ProcessorState`] and [`Arena`], borrows an
//! [`Environment`] for the program and output sink, and executes one
//! instruction per [`Processor::execute_cycle`].
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Running --END--> Completed
//!   ^                |
//!   +------stop------+---error---> Halted
//! ```
//!
//! Handlers validate stack depth and memory addresses before touching any
//! state, so an instruction that fails leaves both stacks as they were.

use crate::debug;
use crate::interpreter::arena::Arena;
use crate::interpreter::config::Config;
use crate::interpreter::errors::{VmError, VmResult};
use crate::interpreter::instruction::Instruction;
use crate::interpreter::isa::{Address, AddressOffset, Opcode, Word};
use crate::interpreter::program::Environment;
use crate::interpreter::state::ProcessorState;


/// Where a processor is in its lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProcessorStatus {
    /// Not started, or paused with [`Processor::stop`].
    Idle,
    Running,
    /// END executed. Further cycles are no-ops.
    Completed,
    /// An instruction failed. The processor will not run again.
    Halted,
}

/// Callback run by the BREAK instruction. It may block.
pub type BreakHandler<'a> = Box<dyn FnMut(&Environment<'_>, &ProcessorState) + 'a>;

/// Expands the opcode-to-handler table into a `match`.
///
/// Handlers receive the opcode first, then the decoded operand when the entry
/// names an operand kind. Opcodes not listed fall through to the wildcard and
/// are reported as unrecognised.
macro_rules! dispatch {
    (
        cpu = $cpu:ident,
        opcode = $opcode:ident,
        instruction = $instruction:ident,
        address = $address:ident,
        { $( $variant:ident => $handler:ident ( $( $kind:ident )? ) ),* $(,)? }
    ) => {{
        match $opcode {
            $(
                Opcode::$variant => dispatch!(@call $cpu, $opcode, $instruction, $handler $(, $kind)?),
            )*
            #[allow(unreachable_patterns)]
            _ => Err(VmError::UnrecognisedOpcode {
                opcode: $opcode as u8,
                address: $address,
            }),
        }
    }};

    (@call $cpu:ident, $opcode:ident, $instruction:ident, $handler:ident) => {
        $cpu.$handler($opcode)
    };

    (@call $cpu:ident, $opcode:ident, $instruction:ident, $handler:ident, Unsigned) => {
        $cpu.$handler($opcode, $instruction.unsigned_operand())
    };

    (@call $cpu:ident, $opcode:ident, $instruction:ident, $handler:ident, Signed) => {
        $cpu.$handler($opcode, $instruction.signed_operand())
    };
}

/// Stack machine executing one [`Environment`]'s program.
pub struct Processor<'a> {
    environment: Environment<'a>,
    state: ProcessorState,
    arena: Arena,
    status: ProcessorStatus,
    break_handler: Option<BreakHandler<'a>>,
}

impl<'a> Processor<'a> {
    /// Creates an idle processor with stacks and arena sized by `config`.
    pub fn new(environment: Environment<'a>, config: &Config) -> Self {
        Self {
            environment,
            state: ProcessorState::new(config),
            arena: Arena::new(config.arena_capacity),
            status: ProcessorStatus::Idle,
            break_handler: None,
        }
    }

    /// Installs the callback invoked by BREAK.
    pub fn with_break_handler(
        mut self,
        handler: impl FnMut(&Environment<'_>, &ProcessorState) + 'a,
    ) -> Self {
        self.break_handler = Some(Box::new(handler));
        self
    }

    pub fn environment(&self) -> &Environment<'a> {
        &self.environment
    }

    pub fn state(&self) -> &ProcessorState {
        &self.state
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn status(&self) -> ProcessorStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessorStatus::Running
    }

    pub fn has_completed(&self) -> bool {
        self.status == ProcessorStatus::Completed
    }

    /// Moves an idle processor to running. Other states are left alone.
    pub fn start(&mut self) {
        if self.status == ProcessorStatus::Idle {
            self.status = ProcessorStatus::Running;
        }
    }

    /// Pauses a running processor. [`Processor::run`] resumes where it stopped.
    pub fn stop(&mut self) {
        if self.status == ProcessorStatus::Running {
            self.status = ProcessorStatus::Idle;
        }
    }

    /// Executes until END or the first error.
    pub fn run(&mut self) -> VmResult {
        match self.status {
            ProcessorStatus::Completed => return Ok(()),
            ProcessorStatus::Halted => return Err(VmError::Halted),
            ProcessorStatus::Idle | ProcessorStatus::Running => self.start(),
        }
        while self.is_running() {
            self.execute_cycle()?;
        }
        Ok(())
    }

    /// Fetches, decodes and executes one instruction.
    ///
    /// Returns `Ok` without doing anything once the processor has completed.
    pub fn execute_cycle(&mut self) -> VmResult {
        match self.status {
            ProcessorStatus::Completed => return Ok(()),
            ProcessorStatus::Running => {}
            ProcessorStatus::Idle | ProcessorStatus::Halted => return Err(VmError::NotRunning),
        }
        let result = self.fetch_and_execute();
        if result.is_err() {
            self.status = ProcessorStatus::Halted;
        }
        result
    }

    fn fetch_and_execute(&mut self) -> VmResult {
        let address = self.state.instruction_pointer();
        let program = self.environment.program();
        let instruction = program.get(address).ok_or(VmError::InvalidJumpTarget {
            address,
            length: program.len(),
        })?;
        self.state.advance();

        let opcode = instruction
            .opcode()
            .map_err(|_| VmError::UnrecognisedOpcode {
                opcode: instruction.opcode_byte(),
                address,
            })?;
        debug!(
            "{:>6}: {} ({})",
            address,
            instruction,
            opcode.category().as_str()
        );
        self.execute(opcode, instruction, address)
    }

    fn execute(&mut self, opcode: Opcode, instruction: Instruction, address: Address) -> VmResult {
        dispatch! {
            cpu = self,
            opcode = opcode,
            instruction = instruction,
            address = address,
            {
                // Control
                Nop => op_nop(),
                End => op_end(),
                Break => op_break(),
                PrintInt => op_print_int(),
                PrintChar => op_print_char(),
                PrintLine => op_print_line(),
                PrintStack => op_print_stack(),
                // Stack manipulation
                Push => op_push(Unsigned),
                Drop => op_drop(Unsigned),
                Pick => op_pick(Unsigned),
                Roll => op_roll(Unsigned),
                Duplicate => op_duplicate(),
                Swap => op_swap(),
                Rotate => op_rotate(),
                Over => op_over(),
                // Flow control
                Call => op_call(Unsigned),
                CallIndirect => op_call_indirect(),
                Return => op_return(),
                JumpRelative => op_jump_relative(Signed),
                JumpAbsolute => op_jump_absolute(Unsigned),
                // Arithmetic
                Add => op_add(),
                AddImmediate => op_add_immediate(Unsigned),
                Subtract => op_subtract(),
                SubtractImmediate => op_subtract_immediate(Unsigned),
                Negate => op_negate(),
                // Bitwise
                And => op_and(),
                AndImmediate => op_and_immediate(Unsigned),
                Or => op_or(),
                OrImmediate => op_or_immediate(Unsigned),
                ExclusiveOr => op_xor(),
                ExclusiveOrImmediate => op_xor_immediate(Unsigned),
                ShiftLeft => op_shift_left(),
                ShiftLeftImmediate => op_shift_left_immediate(Unsigned),
                ShiftRight => op_shift_right(),
                ShiftRightImmediate => op_shift_right_immediate(Unsigned),
                Not => op_not(),
                // Bit operations
                BitSet => op_bit_set(),
                BitClear => op_bit_clear(),
                BitToggle => op_bit_toggle(),
                // Load/store
                LoadByte => op_load_byte(),
                LoadWord => op_load_word(),
                StoreByte => op_store_byte(),
                StoreWord => op_store_word(),
                // Dynamic allocation
                Malloc => op_malloc(),
                MallocImmediate => op_malloc_immediate(Unsigned),
                Calloc => op_calloc(),
                CallocImmediate => op_calloc_immediate(Unsigned),
                Realloc => op_realloc(),
                ReallocImmediate => op_realloc_immediate(Unsigned),
                Free => op_free(),
            }
        }
    }

    // ==================== Stack helpers ====================

    fn underflow(&self, opcode: Opcode, required: usize) -> VmError {
        VmError::DataStackUnderflow {
            opcode,
            required,
            available: self.state.data_stack().len(),
        }
    }

    fn require(&self, opcode: Opcode, required: usize) -> VmResult {
        if self.state.data_stack().len() < required {
            return Err(self.underflow(opcode, required));
        }
        Ok(())
    }

    /// Element `depth` below the top, without removing it.
    fn peek_at(&self, opcode: Opcode, depth: usize) -> VmResult<Word> {
        self.state
            .data_stack()
            .from_top(depth)
            .ok_or_else(|| self.underflow(opcode, depth.saturating_add(1)))
    }

    fn push(&mut self, opcode: Opcode, value: Word) -> VmResult {
        if !self.state.data_stack_mut().push(value) {
            return Err(VmError::DataStackOverflow {
                opcode,
                capacity: self.state.data_stack().capacity(),
            });
        }
        Ok(())
    }

    /// Removes `count` elements; callers have already checked the depth.
    fn discard(&mut self, opcode: Opcode, count: usize) -> VmResult {
        if !self.state.data_stack_mut().drop_top(count) {
            return Err(self.underflow(opcode, count));
        }
        Ok(())
    }

    fn set_top(&mut self, opcode: Opcode, value: Word) -> VmResult {
        self.update_top(opcode, |_| value)
    }

    fn update_top(&mut self, opcode: Opcode, f: impl FnOnce(Word) -> Word) -> VmResult {
        match self.state.data_stack_mut().peek_mut() {
            Some(top) => {
                *top = f(*top);
                Ok(())
            }
            None => Err(self.underflow(opcode, 1)),
        }
    }

    /// Pops `a`, then replaces the new top `b` with `f(b, a)`.
    fn combine(&mut self, opcode: Opcode, f: impl FnOnce(Word, Word) -> Word) -> VmResult {
        self.require(opcode, 2)?;
        let a = self.peek_at(opcode, 0)?;
        self.discard(opcode, 1)?;
        self.update_top(opcode, |b| f(b, a))
    }

    /// Replaces the top `a` with `f(a, immediate)` after checking for `required` elements.
    fn combine_immediate(
        &mut self,
        opcode: Opcode,
        required: usize,
        immediate: Word,
        f: impl FnOnce(Word, Word) -> Word,
    ) -> VmResult {
        self.require(opcode, required)?;
        self.update_top(opcode, |a| f(a, immediate))
    }

    // ==================== Control ====================

    fn op_nop(&mut self, _opcode: Opcode) -> VmResult {
        Ok(())
    }

    fn op_end(&mut self, _opcode: Opcode) -> VmResult {
        self.status = ProcessorStatus::Completed;
        self.environment.output().flush();
        Ok(())
    }

    fn op_break(&mut self, _opcode: Opcode) -> VmResult {
        if let Some(handler) = self.break_handler.as_mut() {
            self.environment.output().flush();
            handler(&self.environment, &self.state);
        }
        Ok(())
    }

    fn op_print_int(&mut self, opcode: Opcode) -> VmResult {
        let value = self.peek_at(opcode, 0)?;
        self.environment.output().print_u32(value);
        Ok(())
    }

    fn op_print_char(&mut self, opcode: Opcode) -> VmResult {
        let value = self.peek_at(opcode, 0)?;
        self.environment.output().print_byte(value as u8);
        Ok(())
    }

    fn op_print_line(&mut self, _opcode: Opcode) -> VmResult {
        self.environment.output().print_line();
        Ok(())
    }

    fn op_print_stack(&mut self, _opcode: Opcode) -> VmResult {
        let output = self.environment.output();
        output.print_char('[');
        for (i, &value) in self.state.data_stack().iter().enumerate() {
            if i > 0 {
                output.print_str(", ");
            }
            output.print_u32(value);
        }
        output.print_char(']');
        output.print_line();
        Ok(())
    }

    // ==================== Stack manipulation ====================

    fn op_push(&mut self, opcode: Opcode, value: Word) -> VmResult {
        self.push(opcode, value)
    }

    fn op_drop(&mut self, opcode: Opcode, count: Word) -> VmResult {
        let count = count as usize;
        self.require(opcode, count)?;
        self.discard(opcode, count)
    }

    fn op_pick(&mut self, opcode: Opcode, depth: Word) -> VmResult {
        let value = self.peek_at(opcode, depth as usize)?;
        self.push(opcode, value)
    }

    fn op_roll(&mut self, opcode: Opcode, depth: Word) -> VmResult {
        let depth = depth as usize;
        self.require(opcode, depth)?;
        self.peek_at(opcode, depth)?;
        let index = self.state.data_stack().len() - 1 - depth;
        let value = self
            .state
            .data_stack_mut()
            .remove_at(index)
            .ok_or_else(|| self.underflow(opcode, depth + 1))?;
        self.push(opcode, value)
    }

    fn op_duplicate(&mut self, opcode: Opcode) -> VmResult {
        let value = self.peek_at(opcode, 0)?;
        self.push(opcode, value)
    }

    fn op_swap(&mut self, opcode: Opcode) -> VmResult {
        self.require(opcode, 2)?;
        let len = self.state.data_stack().len();
        self.state.data_stack_mut().swap(len - 2, len - 1);
        Ok(())
    }

    fn op_rotate(&mut self, opcode: Opcode) -> VmResult {
        self.require(opcode, 3)?;
        let index = self.state.data_stack().len() - 3;
        let value = self
            .state
            .data_stack_mut()
            .remove_at(index)
            .ok_or_else(|| self.underflow(opcode, 3))?;
        self.push(opcode, value)
    }

    fn op_over(&mut self, opcode: Opcode) -> VmResult {
        self.require(opcode, 2)?;
        let value = self.peek_at(opcode, 1)?;
        self.push(opcode, value)
    }

    // ==================== Flow control ====================

    fn op_call(&mut self, _opcode: Opcode, address: Address) -> VmResult {
        self.state.function_call(address)
    }

    fn op_call_indirect(&mut self, opcode: Opcode) -> VmResult {
        let address = self.peek_at(opcode, 0)?;
        self.state.function_call(address)?;
        self.discard(opcode, 1)
    }

    fn op_return(&mut self, _opcode: Opcode) -> VmResult {
        self.state.function_return()
    }

    fn op_jump_relative(&mut self, _opcode: Opcode, offset: AddressOffset) -> VmResult {
        self.state.jump_relative(offset);
        Ok(())
    }

    fn op_jump_absolute(&mut self, _opcode: Opcode, address: Address) -> VmResult {
        self.state.jump_absolute(address);
        Ok(())
    }

    // ==================== Arithmetic ====================

    fn op_add(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, Word::wrapping_add)
    }

    fn op_add_immediate(&mut self, opcode: Opcode, immediate: Word) -> VmResult {
        self.combine_immediate(opcode, 1, immediate, Word::wrapping_add)
    }

    fn op_subtract(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, Word::wrapping_sub)
    }

    fn op_subtract_immediate(&mut self, opcode: Opcode, immediate: Word) -> VmResult {
        self.combine_immediate(opcode, 1, immediate, Word::wrapping_sub)
    }

    fn op_negate(&mut self, opcode: Opcode) -> VmResult {
        self.update_top(opcode, Word::wrapping_neg)
    }

    // ==================== Bitwise ====================
    //
    // The immediate forms require two elements even though they only touch
    // the top.

    fn op_and(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, |b, a| b & a)
    }

    fn op_and_immediate(&mut self, opcode: Opcode, immediate: Word) -> VmResult {
        self.combine_immediate(opcode, 2, immediate, |a, imm| a & imm)
    }

    fn op_or(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, |b, a| b | a)
    }

    fn op_or_immediate(&mut self, opcode: Opcode, immediate: Word) -> VmResult {
        self.combine_immediate(opcode, 2, immediate, |a, imm| a | imm)
    }

    fn op_xor(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, |b, a| b ^ a)
    }

    fn op_xor_immediate(&mut self, opcode: Opcode, immediate: Word) -> VmResult {
        self.combine_immediate(opcode, 2, immediate, |a, imm| a ^ imm)
    }

    fn op_shift_left(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, shift_left)
    }

    fn op_shift_left_immediate(&mut self, opcode: Opcode, immediate: Word) -> VmResult {
        self.combine_immediate(opcode, 2, immediate, shift_left)
    }

    fn op_shift_right(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, shift_right)
    }

    fn op_shift_right_immediate(&mut self, opcode: Opcode, immediate: Word) -> VmResult {
        self.combine_immediate(opcode, 2, immediate, shift_right)
    }

    fn op_not(&mut self, opcode: Opcode) -> VmResult {
        self.update_top(opcode, |a| !a)
    }

    // ==================== Bit operations ====================

    fn op_bit_set(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, |value, index| value | bit_mask(index))
    }

    fn op_bit_clear(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, |value, index| value & !bit_mask(index))
    }

    fn op_bit_toggle(&mut self, opcode: Opcode) -> VmResult {
        self.combine(opcode, |value, index| value ^ bit_mask(index))
    }

    // ==================== Load/store ====================

    fn op_load_byte(&mut self, opcode: Opcode) -> VmResult {
        let address = self.peek_at(opcode, 0)?;
        let value = self.arena.load_byte(address)?;
        self.set_top(opcode, Word::from(value))
    }

    fn op_load_word(&mut self, opcode: Opcode) -> VmResult {
        let address = self.peek_at(opcode, 0)?;
        let value = self.arena.load_word(address)?;
        self.set_top(opcode, value)
    }

    /// ( address value -- )
    fn op_store_byte(&mut self, opcode: Opcode) -> VmResult {
        self.require(opcode, 2)?;
        let value = self.peek_at(opcode, 0)?;
        let address = self.peek_at(opcode, 1)?;
        self.arena.store_byte(address, value as u8)?;
        self.discard(opcode, 2)
    }

    /// ( address value -- )
    fn op_store_word(&mut self, opcode: Opcode) -> VmResult {
        self.require(opcode, 2)?;
        let value = self.peek_at(opcode, 0)?;
        let address = self.peek_at(opcode, 1)?;
        self.arena.store_word(address, value)?;
        self.discard(opcode, 2)
    }

    // ==================== Dynamic allocation ====================

    /// ( size -- address )
    fn op_malloc(&mut self, opcode: Opcode) -> VmResult {
        let size = self.peek_at(opcode, 0)?;
        let address = self.arena.allocate(size as usize)?;
        self.set_top(opcode, address)
    }

    /// ( -- address )
    fn op_malloc_immediate(&mut self, opcode: Opcode, size: Word) -> VmResult {
        if self.state.data_stack().is_full() {
            return Err(VmError::DataStackOverflow {
                opcode,
                capacity: self.state.data_stack().capacity(),
            });
        }
        let address = self.arena.allocate(size as usize)?;
        self.push(opcode, address)
    }

    /// ( size count -- address )
    fn op_calloc(&mut self, opcode: Opcode) -> VmResult {
        self.require(opcode, 2)?;
        let count = self.peek_at(opcode, 0)?;
        let size = self.peek_at(opcode, 1)?;
        let address = self.arena.allocate_zeroed(count as usize, size as usize)?;
        self.discard(opcode, 1)?;
        self.set_top(opcode, address)
    }

    /// ( count -- address ), element size from the operand
    fn op_calloc_immediate(&mut self, opcode: Opcode, size: Word) -> VmResult {
        let count = self.peek_at(opcode, 0)?;
        let address = self.arena.allocate_zeroed(count as usize, size as usize)?;
        self.set_top(opcode, address)
    }

    /// ( address size -- address' )
    fn op_realloc(&mut self, opcode: Opcode) -> VmResult {
        self.require(opcode, 2)?;
        let size = self.peek_at(opcode, 0)?;
        let address = self.peek_at(opcode, 1)?;
        let resized = self.arena.resize(address, size as usize)?;
        self.discard(opcode, 1)?;
        self.set_top(opcode, resized)
    }

    /// ( address -- address' ), new size from the operand
    fn op_realloc_immediate(&mut self, opcode: Opcode, size: Word) -> VmResult {
        let address = self.peek_at(opcode, 0)?;
        let resized = self.arena.resize(address, size as usize)?;
        self.set_top(opcode, resized)
    }

    /// ( address -- )
    fn op_free(&mut self, opcode: Opcode) -> VmResult {
        let address = self.peek_at(opcode, 0)?;
        self.arena.free(address)?;
        self.discard(opcode, 1)
    }
}

fn shift_left(value: Word, amount: Word) -> Word {
    value.checked_shl(amount).unwrap_or(0)
}

fn shift_right(value: Word, amount: Word) -> Word {
    value.checked_shr(amount).unwrap_or(0)
}

/// `1 << index`, or an empty mask when the index is past the word.
fn bit_mask(index: Word) -> Word {
    shift_left(1, index)
}
