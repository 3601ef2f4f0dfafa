use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, Report, Severity};

/// Condition which stops the machine, other than `HLT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Opcode is neither an ALU operation nor a known control instruction.
    UnknownInstruction { opcode: u8, pc: usize },
    Arithmetic { pc: usize, error: ArithmeticError },
    /// Memory access outside the 256 addressable cells.
    AddressOutOfRange { address: usize },
    /// Instruction at `pc` does not end before the last address, so there is nowhere to advance to.
    EndOfMemory { pc: usize },
    /// Register operand does not name one of the 8 registers.
    InvalidRegister { index: u8, pc: usize },
    /// Push with the stack pointer already at address 0.
    StackOverflow { pc: usize },
    /// Pop with the stack pointer already at the last address.
    StackUnderflow { pc: usize },
    ProgramTooLarge { len: usize },
}

/// Error raised by the ALU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticError {
    DivisionByZero { opcode: u8 },
    /// Opcode is marked as an ALU operation but none is defined for it.
    UnsupportedOperation { opcode: u8 },
}

impl Error for Fault {}
impl Error for ArithmeticError {}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownInstruction { opcode, pc } => {
                write!(f, "Unknown instruction 0b{:08b} at address {}", opcode, pc)
            }
            Self::Arithmetic { pc, error } => {
                write!(f, "At address {}: {}", pc, error)
            }
            Self::AddressOutOfRange { address } => {
                write!(f, "Address {} is outside of memory", address)
            }
            Self::EndOfMemory { pc } => {
                write!(f, "Instruction at address {} runs past the end of memory", pc)
            }
            Self::InvalidRegister { index, pc } => {
                write!(f, "Invalid register R{} at address {}", index, pc)
            }
            Self::StackOverflow { pc } => write!(f, "Stack overflow at address {}", pc),
            Self::StackUnderflow { pc } => write!(f, "Stack underflow at address {}", pc),
            Self::ProgramTooLarge { len } => {
                write!(f, "Program of {} bytes does not fit in memory", len)
            }
        }
    }
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero { opcode } => {
                write!(f, "Division by zero (opcode 0b{:08b})", opcode)
            }
            Self::UnsupportedOperation { opcode } => {
                write!(f, "No ALU operation for opcode 0b{:08b}", opcode)
            }
        }
    }
}

// Load errors

pub fn load_bad_literal(span: (usize, usize), src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::bad_literal",
        help = "each line holds one byte written with the digits 0 and 1, e.g. 10000010",
        labels = vec![LabeledSpan::at(span, "not a binary literal")],
        "Encountered an invalid binary literal.",
    )
    .with_source_code(src.to_string())
}

pub fn load_literal_overflow(span: (usize, usize), src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::literal_overflow",
        help = "literals range from 0 to 11111111",
        labels = vec![LabeledSpan::at(span, "more than 8 bits")],
        "Literal does not fit in a byte.",
    )
    .with_source_code(src.to_string())
}

pub fn load_too_large(span: (usize, usize), src: &str, max: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::too_large",
        help = format!("memory holds {max} bytes, starting at address 0"),
        labels = vec![LabeledSpan::at(span, "first byte past the end of memory")],
        "Program is too large to fit in memory.",
    )
    .with_source_code(src.to_string())
}

// Runtime errors

pub fn runtime_fault(fault: Fault) -> Report {
    let (code, help) = match fault {
        Fault::UnknownInstruction { .. } => (
            "runtime::unknown_instruction",
            "check the opcode table; execution may have run into data",
        ),
        Fault::Arithmetic {
            error: ArithmeticError::DivisionByZero { .. },
            ..
        } => (
            "runtime::division_by_zero",
            "the second register of DIV and MOD must not be zero",
        ),
        Fault::Arithmetic {
            error: ArithmeticError::UnsupportedOperation { .. },
            ..
        } => (
            "runtime::unsupported_alu",
            "opcodes with bit 5 set are ALU operations",
        ),
        Fault::AddressOutOfRange { .. } | Fault::EndOfMemory { .. } => (
            "runtime::address",
            "execution or a memory access went past address 255",
        ),
        Fault::InvalidRegister { .. } => ("runtime::register", "registers are R0 to R7"),
        Fault::StackOverflow { .. } | Fault::StackUnderflow { .. } => (
            "runtime::stack",
            "check that every PUSH and CALL is matched by a POP or RET",
        ),
        Fault::ProgramTooLarge { .. } => ("runtime::load", "memory holds 256 bytes"),
    };
    miette!(
        severity = Severity::Error,
        code = code,
        help = help,
        "{fault}",
    )
}
