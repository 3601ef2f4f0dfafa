use std::fmt;

use crate::error::Fault;

/// Amount of slots in the register file.
pub const REGISTER_COUNT: usize = 8;

/// Value of the stack pointer on a fresh machine.
/// The stack grows downward from here, below the reserved top of memory.
pub const STACK_START: u8 = 0xF4;

/// Represents the CPU registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    /// Reserved as the stack pointer.
    R7,
}

impl Register {
    pub const SP: Register = Register::R7;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Validates a register operand read from memory at `pc`.
    pub fn from_operand(index: u8, pc: usize) -> Result<Self, Fault> {
        Self::try_from(index).map_err(|()| Fault::InvalidRegister { index, pc })
    }
}

impl TryFrom<u8> for Register {
    type Error = ();

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Register::R0),
            1 => Ok(Register::R1),
            2 => Ok(Register::R2),
            3 => Ok(Register::R3),
            4 => Ok(Register::R4),
            5 => Ok(Register::R5),
            6 => Ok(Register::R6),
            7 => Ok(Register::R7),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// 8x 8-bit registers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers([u8; REGISTER_COUNT]);

impl Registers {
    pub fn new() -> Self {
        let mut reg = [0; REGISTER_COUNT];
        reg[Register::SP.index()] = STACK_START;
        Registers(reg)
    }

    pub fn get(&self, reg: Register) -> u8 {
        self.0[reg.index()]
    }

    pub fn get_mut(&mut self, reg: Register) -> &mut u8 {
        &mut self.0[reg.index()]
    }

    pub fn sp(&self) -> u8 {
        self.get(Register::SP)
    }

    pub fn iter(&self) -> impl Iterator<Item = &u8> {
        self.0.iter()
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
