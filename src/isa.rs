use std::fmt;

use crate::alu::{AluOp, Flag};
use crate::error::Fault;
use crate::registers::Register;

/// Control instruction opcodes. ALU opcodes live on [`AluOp`].
pub mod opcode {
    pub const HLT: u8 = 0b0000_0001;
    pub const RET: u8 = 0b0001_0001;
    pub const PUSH: u8 = 0b0100_0101;
    pub const POP: u8 = 0b0100_0110;
    pub const PRN: u8 = 0b0100_0111;
    pub const PRA: u8 = 0b0100_1000;
    pub const CALL: u8 = 0b0101_0000;
    pub const JMP: u8 = 0b0101_0100;
    pub const JEQ: u8 = 0b0101_0101;
    pub const JNE: u8 = 0b0101_0110;
    pub const JGT: u8 = 0b0101_0111;
    pub const JLT: u8 = 0b0101_1000;
    pub const JLE: u8 = 0b0101_1001;
    pub const JGE: u8 = 0b0101_1010;
    pub const LDI: u8 = 0b1000_0010;
    pub const LD: u8 = 0b1000_0011;
    pub const ST: u8 = 0b1000_0100;
}

/// Set on every opcode routed to the ALU.
pub const ALU_BIT: u8 = 0b0010_0000;
/// Opcode bits 7-6 hold the amount of operand bytes.
const OPERAND_COUNT_SHIFT: u32 = 6;

/// Flag test made by a conditional jump.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Condition {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

impl Condition {
    pub fn holds(self, flag: Flag) -> bool {
        match self {
            Condition::Equal => flag == Flag::Equal,
            Condition::NotEqual => flag != Flag::Equal,
            Condition::Greater => flag == Flag::Greater,
            Condition::Less => flag == Flag::Less,
            Condition::GreaterEqual => matches!(flag, Flag::Greater | Flag::Equal),
            Condition::LessEqual => matches!(flag, Flag::Less | Flag::Equal),
        }
    }
}

/// One decoded instruction, operands included.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// Apply `op` to `a` and `b`, storing into `a` (or into the flags for `CMP`)
    Alu { op: AluOp, a: Register, b: Register },
    /// Load an immediate value into `dest`
    Ldi { dest: Register, value: u8 },
    /// Load `dest` from the address held in `addr`
    Ld { dest: Register, addr: Register },
    /// Store `src` at the address held in `addr`
    St { addr: Register, src: Register },
    /// Print register as a decimal number
    Prn(Register),
    /// Print register as an ASCII character
    Pra(Register),
    Push(Register),
    Pop(Register),
    /// Push the return address and jump to the address held in the register
    Call(Register),
    Ret,
    Jmp(Register),
    /// Jump to the address held in `target` if `cond` holds for the flags
    Branch { cond: Condition, target: Register },
    Hlt,
}

impl Instruction {
    /// Decode the instruction starting at `pc`.
    ///
    /// Only the operand bytes the opcode declares are read, so a short instruction at the very
    /// end of memory decodes fine.
    pub fn decode(memory: &[u8], pc: usize) -> Result<Self, Fault> {
        let byte = |offset: usize| -> Result<u8, Fault> {
            let address = pc + offset;
            memory
                .get(address)
                .copied()
                .ok_or(Fault::AddressOutOfRange { address })
        };
        let reg = |offset: usize| -> Result<Register, Fault> {
            Register::from_operand(byte(offset)?, pc)
        };

        let instr = byte(0)?;
        if instr & ALU_BIT != 0 {
            let op = AluOp::try_from(instr).map_err(|error| Fault::Arithmetic { pc, error })?;
            return Ok(Instruction::Alu {
                op,
                a: reg(1)?,
                b: reg(2)?,
            });
        }

        let branch = |cond| -> Result<Self, Fault> {
            Ok(Instruction::Branch {
                cond,
                target: reg(1)?,
            })
        };
        match instr {
            opcode::HLT => Ok(Instruction::Hlt),
            opcode::RET => Ok(Instruction::Ret),
            opcode::PUSH => Ok(Instruction::Push(reg(1)?)),
            opcode::POP => Ok(Instruction::Pop(reg(1)?)),
            opcode::PRN => Ok(Instruction::Prn(reg(1)?)),
            opcode::PRA => Ok(Instruction::Pra(reg(1)?)),
            opcode::CALL => Ok(Instruction::Call(reg(1)?)),
            opcode::JMP => Ok(Instruction::Jmp(reg(1)?)),
            opcode::JEQ => branch(Condition::Equal),
            opcode::JNE => branch(Condition::NotEqual),
            opcode::JGT => branch(Condition::Greater),
            opcode::JLT => branch(Condition::Less),
            opcode::JLE => branch(Condition::LessEqual),
            opcode::JGE => branch(Condition::GreaterEqual),
            opcode::LDI => Ok(Instruction::Ldi {
                dest: reg(1)?,
                value: byte(2)?,
            }),
            opcode::LD => Ok(Instruction::Ld {
                dest: reg(1)?,
                addr: reg(2)?,
            }),
            opcode::ST => Ok(Instruction::St {
                addr: reg(1)?,
                src: reg(2)?,
            }),
            _ => Err(Fault::UnknownInstruction { opcode: instr, pc }),
        }
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::Alu { op, .. } => op.opcode(),
            Instruction::Ldi { .. } => opcode::LDI,
            Instruction::Ld { .. } => opcode::LD,
            Instruction::St { .. } => opcode::ST,
            Instruction::Prn(_) => opcode::PRN,
            Instruction::Pra(_) => opcode::PRA,
            Instruction::Push(_) => opcode::PUSH,
            Instruction::Pop(_) => opcode::POP,
            Instruction::Call(_) => opcode::CALL,
            Instruction::Ret => opcode::RET,
            Instruction::Jmp(_) => opcode::JMP,
            Instruction::Branch { cond, .. } => match cond {
                Condition::Equal => opcode::JEQ,
                Condition::NotEqual => opcode::JNE,
                Condition::Greater => opcode::JGT,
                Condition::Less => opcode::JLT,
                Condition::LessEqual => opcode::JLE,
                Condition::GreaterEqual => opcode::JGE,
            },
            Instruction::Hlt => opcode::HLT,
        }
    }

    /// Size in bytes, opcode included.
    pub fn width(&self) -> u8 {
        1 + (self.opcode() >> OPERAND_COUNT_SHIFT)
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Alu { op, .. } => op.mnemonic(),
            Instruction::Ldi { .. } => "LDI",
            Instruction::Ld { .. } => "LD",
            Instruction::St { .. } => "ST",
            Instruction::Prn(_) => "PRN",
            Instruction::Pra(_) => "PRA",
            Instruction::Push(_) => "PUSH",
            Instruction::Pop(_) => "POP",
            Instruction::Call(_) => "CALL",
            Instruction::Ret => "RET",
            Instruction::Jmp(_) => "JMP",
            Instruction::Branch { cond, .. } => match cond {
                Condition::Equal => "JEQ",
                Condition::NotEqual => "JNE",
                Condition::Greater => "JGT",
                Condition::Less => "JLT",
                Condition::LessEqual => "JLE",
                Condition::GreaterEqual => "JGE",
            },
            Instruction::Hlt => "HLT",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match *self {
            Instruction::Alu { a, b, .. } => write!(f, "{name} {a}, {b}"),
            Instruction::Ldi { dest, value } => write!(f, "{name} {dest}, {value}"),
            Instruction::Ld { dest, addr } => write!(f, "{name} {dest}, {addr}"),
            Instruction::St { addr, src } => write!(f, "{name} {addr}, {src}"),
            Instruction::Prn(reg)
            | Instruction::Pra(reg)
            | Instruction::Push(reg)
            | Instruction::Pop(reg)
            | Instruction::Call(reg)
            | Instruction::Jmp(reg)
            | Instruction::Branch { target: reg, .. } => write!(f, "{name} {reg}"),
            Instruction::Ret | Instruction::Hlt => write!(f, "{name}"),
        }
    }
}

/// Linear sweep over a program image.
///
/// Bytes which do not decode are yielded as errors one at a time, so data mixed with code
/// shows up without stopping the listing.
pub struct Disassembly<'a> {
    program: &'a [u8],
    addr: usize,
}

/// A single entry of a [`Disassembly`].
#[derive(Debug)]
pub struct Listing<'a> {
    pub addr: usize,
    pub bytes: &'a [u8],
    pub instr: Result<Instruction, Fault>,
}

pub fn disassemble(program: &[u8]) -> Disassembly<'_> {
    Disassembly { program, addr: 0 }
}

impl<'a> Iterator for Disassembly<'a> {
    type Item = Listing<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let program = self.program;
        let addr = self.addr;
        if addr >= program.len() {
            return None;
        }
        let instr = Instruction::decode(program, addr);
        let width = match &instr {
            Ok(instr) => usize::from(instr.width()),
            Err(_) => 1,
        };
        self.addr += width;
        Some(Listing {
            addr,
            bytes: &program[addr..self.addr],
            instr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::opcode::*;
    use super::*;
    use crate::error::ArithmeticError;

    const CONTROL: [(u8, u8); 17] = [
        (HLT, 0),
        (RET, 0),
        (PUSH, 1),
        (POP, 1),
        (PRN, 1),
        (PRA, 1),
        (CALL, 1),
        (JMP, 1),
        (JEQ, 1),
        (JNE, 1),
        (JGT, 1),
        (JLT, 1),
        (JLE, 1),
        (JGE, 1),
        (LDI, 2),
        (LD, 2),
        (ST, 2),
    ];

    #[test]
    fn operand_count_matches_opcode_bits() {
        for (op, operands) in CONTROL {
            assert_eq!(op & ALU_BIT, 0, "0b{op:08b} must not be an ALU opcode");
            let memory = [op, 0, 0];
            let instr = Instruction::decode(&memory, 0).unwrap();
            assert_eq!(instr.opcode(), op);
            assert_eq!(instr.width(), 1 + operands, "{instr}");
        }
    }

    #[test]
    fn decodes_operands() {
        let memory = [LDI, 3, 200, 0b1010_0000, 1, 2];
        assert_eq!(
            Instruction::decode(&memory, 0),
            Ok(Instruction::Ldi {
                dest: Register::R3,
                value: 200
            })
        );
        assert_eq!(
            Instruction::decode(&memory, 3),
            Ok(Instruction::Alu {
                op: AluOp::Add,
                a: Register::R1,
                b: Register::R2
            })
        );
        assert_eq!(Instruction::decode(&memory, 3).unwrap().width(), 3);
    }

    #[test]
    fn unknown_and_unsupported_are_distinct() {
        assert_eq!(
            Instruction::decode(&[0b0000_0000], 0),
            Err(Fault::UnknownInstruction {
                opcode: 0b0000_0000,
                pc: 0
            })
        );
        assert_eq!(
            Instruction::decode(&[0, 0b1011_1111, 0, 0], 1),
            Err(Fault::Arithmetic {
                pc: 1,
                error: ArithmeticError::UnsupportedOperation {
                    opcode: 0b1011_1111
                }
            })
        );
    }

    #[test]
    fn bad_register_operand() {
        assert_eq!(
            Instruction::decode(&[PRN, 9], 0),
            Err(Fault::InvalidRegister { index: 9, pc: 0 })
        );
    }

    #[test]
    fn reads_only_declared_operands() {
        let mut memory = [0; 256];
        memory[255] = HLT;
        assert_eq!(Instruction::decode(&memory, 255), Ok(Instruction::Hlt));
        memory[255] = PRN;
        assert_eq!(
            Instruction::decode(&memory, 255),
            Err(Fault::AddressOutOfRange { address: 256 })
        );
    }

    #[test]
    fn branch_conditions() {
        use Condition::*;
        let table = [
            (Flag::Less, [false, true, false, true, false, true]),
            (Flag::Greater, [false, true, true, false, true, false]),
            (Flag::Equal, [true, false, false, false, true, true]),
            (Flag::Uninit, [false, true, false, false, false, false]),
        ];
        for (flag, expected) in table {
            let conds = [Equal, NotEqual, Greater, Less, GreaterEqual, LessEqual];
            for (cond, taken) in conds.into_iter().zip(expected) {
                assert_eq!(cond.holds(flag), taken, "{cond:?} with {flag:?}");
            }
        }
    }

    #[test]
    fn disassembly_listing() {
        let program = [LDI, 0, 8, PRN, 0, 0b0000_0000, HLT];
        let listing: Vec<_> = disassemble(&program)
            .map(|line| {
                let text = match line.instr {
                    Ok(instr) => instr.to_string(),
                    Err(_) => "??".to_string(),
                };
                (line.addr, line.bytes.len(), text)
            })
            .collect();
        assert_eq!(
            listing,
            vec![
                (0, 3, "LDI R0, 8".to_string()),
                (3, 2, "PRN R0".to_string()),
                (5, 1, "??".to_string()),
                (6, 1, "HLT".to_string()),
            ]
        );
    }

    #[test]
    fn disassembly_of_truncated_instruction() {
        let program = [LDI, 0];
        let lines: Vec<_> = disassemble(&program).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].instr,
            Err(Fault::AddressOutOfRange { address: 2 })
        );
    }
}
