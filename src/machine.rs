use crate::alu::{AluOp, AluOutput, Flag};
use crate::error::Fault;
use crate::isa::Instruction;
use crate::memory::Memory;
use crate::output::Console;
use crate::registers::{Register, Registers};

/// Whether the fetch-decode-execute loop may continue.
///
/// There is no way back to `Running`; run another program on a new [`Machine`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum State {
    #[default]
    Running,
    Halted,
}

/// Represents complete machine state during runtime.
#[derive(Clone, Debug)]
pub struct Machine {
    /// System memory - 256 bytes in size.
    mem: Memory,
    /// 8x 8-bit registers, R7 being the stack pointer
    reg: Registers,
    /// Program counter
    pc: u8,
    /// Outcome of the latest comparison
    flag: Flag,
    state: State,
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            mem: Memory::new(),
            reg: Registers::new(),
            pc: 0,
            flag: Flag::default(),
            state: State::default(),
        }
    }

    pub fn with_program(program: &[u8]) -> Result<Self, Fault> {
        let mut machine = Self::new();
        machine.load(program)?;
        Ok(machine)
    }

    /// Place `program` in memory from address 0.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Fault> {
        self.mem.load(program)
    }

    /// Run until `HLT` or a fault.
    pub fn run(&mut self, console: &mut impl Console) -> Result<(), Fault> {
        while self.state == State::Running {
            self.step(console)?;
        }
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Any fault halts the machine before it is returned. Stepping a halted machine does nothing.
    pub fn step(&mut self, console: &mut impl Console) -> Result<State, Fault> {
        if self.state == State::Halted {
            return Ok(State::Halted);
        }
        match self.execute(console) {
            Ok(()) => Ok(self.state),
            Err(fault) => {
                self.state = State::Halted;
                Err(fault)
            }
        }
    }

    fn execute(&mut self, console: &mut impl Console) -> Result<(), Fault> {
        let instr = Instruction::decode(self.mem.as_slice(), self.pc())?;
        // Instructions which fall through must fit in memory before their effects apply
        let next_pc = match instr {
            Instruction::Call(_)
            | Instruction::Ret
            | Instruction::Jmp(_)
            | Instruction::Branch { .. }
            | Instruction::Hlt => self.pc,
            _ => self.next_pc(instr)?,
        };
        match instr {
            Instruction::Alu { op, a, b } => self.alu(op, a, b)?,
            Instruction::Ldi { dest, value } => *self.reg.get_mut(dest) = value,
            Instruction::Ld { dest, addr } => {
                let value = self.mem.read(usize::from(self.reg.get(addr)))?;
                *self.reg.get_mut(dest) = value;
            }
            Instruction::St { addr, src } => {
                let addr = usize::from(self.reg.get(addr));
                self.mem.write(addr, self.reg.get(src))?;
            }
            Instruction::Prn(reg) => console.print_decimal(self.reg.get(reg)),
            Instruction::Pra(reg) => console.print_char(self.reg.get(reg)),
            Instruction::Push(reg) => {
                let sp = self.decrement_sp()?;
                // Read after the decrement, so PUSH R7 saves the new stack pointer
                self.mem.write(usize::from(sp), self.reg.get(reg))?;
            }
            Instruction::Pop(reg) => {
                let sp = self.reg.sp();
                if sp == u8::MAX {
                    return Err(Fault::StackUnderflow { pc: self.pc() });
                }
                let value = self.mem.read(usize::from(sp))?;
                // POP R7 increments the popped value
                let base = if reg == Register::SP { value } else { sp };
                let next_sp = base
                    .checked_add(1)
                    .ok_or(Fault::StackUnderflow { pc: self.pc() })?;
                *self.reg.get_mut(reg) = value;
                *self.reg.get_mut(Register::SP) = next_sp;
            }
            Instruction::Call(reg) => {
                let return_addr = self.next_pc(instr)?;
                self.push_val(return_addr)?;
                self.pc = self.reg.get(reg);
                return Ok(());
            }
            Instruction::Ret => {
                self.pc = self.pop_val()?;
                return Ok(());
            }
            Instruction::Jmp(target) => {
                self.pc = self.reg.get(target);
                return Ok(());
            }
            Instruction::Branch { cond, target } => {
                self.pc = if cond.holds(self.flag) {
                    self.reg.get(target)
                } else {
                    self.next_pc(instr)?
                };
                return Ok(());
            }
            Instruction::Hlt => {
                self.state = State::Halted;
                return Ok(());
            }
        }
        self.pc = next_pc;
        Ok(())
    }

    fn alu(&mut self, op: AluOp, a: Register, b: Register) -> Result<(), Fault> {
        let result = op
            .apply(self.reg.get(a), self.reg.get(b))
            .map_err(|error| Fault::Arithmetic {
                pc: self.pc(),
                error,
            })?;
        match result {
            AluOutput::Value(value) => *self.reg.get_mut(a) = value,
            AluOutput::Flag(flag) => self.flag = flag,
        }
        Ok(())
    }

    /// Address following `instr`, which must be the instruction at the program counter.
    fn next_pc(&self, instr: Instruction) -> Result<u8, Fault> {
        self.pc
            .checked_add(instr.width())
            .ok_or(Fault::EndOfMemory { pc: self.pc() })
    }

    /// Move the stack pointer down one cell and return it.
    fn decrement_sp(&mut self) -> Result<u8, Fault> {
        let sp = self
            .reg
            .sp()
            .checked_sub(1)
            .ok_or(Fault::StackOverflow { pc: self.pc() })?;
        *self.reg.get_mut(Register::SP) = sp;
        Ok(sp)
    }

    fn push_val(&mut self, val: u8) -> Result<(), Fault> {
        let sp = self.decrement_sp()?;
        self.mem.write(usize::from(sp), val)
    }

    fn pop_val(&mut self) -> Result<u8, Fault> {
        let sp = self.reg.sp();
        let next_sp = sp
            .checked_add(1)
            .ok_or(Fault::StackUnderflow { pc: self.pc() })?;
        let val = self.mem.read(usize::from(sp))?;
        *self.reg.get_mut(Register::SP) = next_sp;
        Ok(val)
    }

    pub fn pc(&self) -> usize {
        usize::from(self.pc)
    }

    pub fn reg(&self, reg: Register) -> u8 {
        self.reg.get(reg)
    }

    pub fn registers(&self) -> &Registers {
        &self.reg
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
