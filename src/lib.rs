// Machine
mod alu;
pub use alu::{AluOp, AluOutput, Flag};
mod isa;
pub use isa::{disassemble, opcode, Condition, Disassembly, Instruction, Listing, ALU_BIT};
mod machine;
pub use machine::{Machine, State};
mod memory;
pub use memory::{Memory, MEMORY_SIZE};
mod registers;
pub use registers::{Register, Registers, REGISTER_COUNT, STACK_START};

// Loading
mod loader;
pub use loader::parse_program;

// Running
mod runtime;
pub use runtime::RunEnvironment;
#[macro_use]
pub mod output;

mod error;
pub use error::{ArithmeticError, Fault};

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
