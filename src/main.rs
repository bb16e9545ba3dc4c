//! Command-line runner for the stack machine.
//!
//! # Usage
//! ```text
//! stack_vm [PROGRAM]
//! ```
//!
//! With no argument the built-in demo runs. With one argument the file is
//! loaded as a raw program image (little-endian 32-bit words) and run.
//! BREAK instructions pause until a line is entered on stdin.
//!
//! # Environment
//! - `STACK_VM_LOG`: minimum log level (`debug` traces every instruction)
//! - `STACK_VM_DATA_STACK`, `STACK_VM_RETURN_STACK`, `STACK_VM_PROGRAM_SIZE`,
//!   `STACK_VM_ARENA_SIZE`: resource capacities
//!
//! Exits with status 0 only if the program reaches END.

use stack_vm::demo::demo_program;
use stack_vm::interpreter::config::Config;
use stack_vm::interpreter::errors::VmResult;
use stack_vm::interpreter::output::{ConsoleSink, OutputSink};
use stack_vm::interpreter::processor::Processor;
use stack_vm::interpreter::program::{Environment, Program};
use stack_vm::interpreter::state::ProcessorState;
use stack_vm::utils::log;
use stack_vm::{error, info, warn};
use std::env;
use std::io::BufRead;
use std::process;

fn main() {
    if let Err(value) = log::init_from_env() {
        warn!("ignoring {}={value:?}", log::LOG_LEVEL_ENV);
    }

    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map(String::as_str).unwrap_or("stack_vm");

    let path = match args.len() {
        1 => None,
        2 if args[1] == "--help" || args[1] == "-h" => {
            print_usage(program_name);
            process::exit(0);
        }
        2 => Some(args[1].as_str()),
        _ => {
            eprintln!("Takes one or zero arguments\n");
            print_usage(program_name);
            process::exit(1);
        }
    };

    let config = Config::from_env().unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });

    let program = load_program(path, &config).unwrap_or_else(|e| {
        error!("<ERROR>: {e}");
        process::exit(1);
    });

    process::exit(match run(program, &config) {
        Ok(()) => 0,
        Err(e) => {
            error!("<ERROR>: {e}");
            1
        }
    });
}

fn load_program(path: Option<&str>, config: &Config) -> VmResult<Program> {
    match path {
        None => demo_program(config.program_capacity),
        Some(path) => {
            let program = Program::load_file(path, config.program_capacity)?;
            info!("Loaded {} instructions from {}", program.len(), path);
            Ok(program)
        }
    }
}

fn run(program: Program, config: &Config) -> VmResult {
    let mut console = ConsoleSink::new();
    let result = {
        let environment = Environment::new(program, &mut console);
        let mut processor = Processor::new(environment, config).with_break_handler(pause);

        println!("<Begin>");
        processor.run()
    };
    console.flush();
    println!("<End>");
    result
}

/// Reports where execution stopped and blocks until a line is read from stdin.
fn pause(_: &Environment<'_>, state: &ProcessorState) {
    info!("Break at {}", state);
    let mut line = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        warn!("failed to read from stdin: {e}");
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} [PROGRAM]");
    eprintln!();
    eprintln!("Runs PROGRAM, a file of little-endian 32-bit instruction words.");
    eprintln!("Without PROGRAM, runs the built-in demo.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STACK_VM_LOG            debug | info | warn | error");
    eprintln!("  STACK_VM_DATA_STACK     data stack capacity (default 64)");
    eprintln!("  STACK_VM_RETURN_STACK   return stack capacity (default 32)");
    eprintln!("  STACK_VM_PROGRAM_SIZE   program capacity in instructions (default 4096)");
    eprintln!("  STACK_VM_ARENA_SIZE     memory arena size in bytes (default 65536)");
}
