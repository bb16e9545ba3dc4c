//! Stack machine bytecode interpreter.
//!
//! Provides the interpreter core, a built-in demonstration program and the
//! logging used by the `stack_vm` binary.

pub mod demo;
pub mod interpreter;
pub mod utils;
