use crate::interpreter::isa::{Address, Opcode};
use stack_vm_derive::Error;

/// Errors that can occur while loading or executing a program.
#[derive(Debug, Error)]
pub enum VmError {
    /// An instruction needed more data stack elements than were present.
    #[error("{opcode}: data stack underflow, needs {required} but holds {available}")]
    DataStackUnderflow {
        opcode: Opcode,
        required: usize,
        available: usize,
    },
    /// A push would exceed the data stack capacity.
    #[error("{opcode}: data stack overflow, capacity is {capacity}")]
    DataStackOverflow { opcode: Opcode, capacity: usize },
    /// RET executed with no return address recorded.
    #[error("return stack underflow")]
    ReturnStackUnderflow,
    /// CALL executed with a full return stack.
    #[error("return stack overflow, capacity is {capacity}")]
    ReturnStackOverflow { capacity: usize },
    /// The instruction pointer left the program.
    #[error("jumped to invalid address {address} (program length {length})")]
    InvalidJumpTarget { address: Address, length: usize },
    /// The top byte of an instruction is not an executable opcode.
    #[error("unrecognised opcode 0x{opcode:02X} at address {address}")]
    UnrecognisedOpcode { opcode: u8, address: Address },
    /// The memory arena cannot satisfy a request.
    #[error("out of memory: requested {requested} bytes, largest free block is {available}")]
    OutOfMemory { requested: usize, available: usize },
    /// A load or store touched memory outside every live allocation.
    #[error("invalid memory access of {width} bytes at address {address}")]
    InvalidAddress { address: Address, width: usize },
    /// FREE or REALLOC named an address that is not a live allocation.
    #[error("invalid free of address {address}")]
    InvalidFree { address: Address },
    /// `step` called while the processor is not running.
    #[error("processor not running")]
    NotRunning,
    /// `run` called on a processor stopped by an earlier error.
    #[error("processor halted by an earlier error")]
    Halted,
    /// Appending to a program that already holds its capacity.
    #[error("program is full, capacity is {capacity} instructions")]
    ProgramFull { capacity: usize },
    /// A program image whose length is not a multiple of the word size.
    #[error("program image has {trailing} trailing bytes")]
    TruncatedProgram { trailing: usize },
    /// Reading a program file failed.
    #[error("io error: {reason}")]
    Io { reason: String },
    /// A configuration value could not be parsed or is out of range.
    #[error("invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },
}

impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> Self {
        VmError::Io {
            reason: err.to_string(),
        }
    }
}

/// Result alias used across the interpreter.
pub type VmResult<T = ()> = Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = VmError::DataStackUnderflow {
            opcode: Opcode::Add,
            required: 2,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "ADD: data stack underflow, needs 2 but holds 1"
        );

        let err = VmError::UnrecognisedOpcode {
            opcode: 0x7F,
            address: 3,
        };
        assert_eq!(err.to_string(), "unrecognised opcode 0x7F at address 3");
        assert_eq!(VmError::NotRunning.to_string(), "processor not running");
    }

    #[test]
    fn variant_names() {
        assert_eq!(VmError::Halted.variant_name(), "Halted");
        let err = VmError::InvalidFree { address: 8 };
        assert_eq!(err.variant_name(), "InvalidFree");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VmError = io.into();
        assert!(matches!(err, VmError::Io { ref reason } if reason == "missing"));
    }
}
