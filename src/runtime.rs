use miette::Result;

use crate::error;
use crate::machine::Machine;
use crate::output::{Condition, Output};
use crate::tprintln;

/// Runs a machine on behalf of the command line: tracing, fault diagnostics and statistics.
pub struct RunEnvironment {
    machine: Machine,
    trace: bool,
    /// Amount of instructions executed so far.
    instruction_count: u64,
}

impl RunEnvironment {
    pub fn from_raw(program: &[u8]) -> Result<RunEnvironment> {
        let machine = Machine::with_program(program).map_err(error::runtime_fault)?;
        Ok(RunEnvironment {
            machine,
            trace: false,
            instruction_count: 0,
        })
    }

    /// Write a trace line to stderr before every instruction.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Run until `HLT`.
    ///
    /// A fault prints the machine state with the `End` label and is returned as a diagnostic.
    pub fn run(&mut self) -> Result<()> {
        let mut console = Output::Normal;
        while self.machine.is_running() {
            if self.trace {
                Output::Trace(Condition::Always).print_trace(&self.machine, None);
            }
            if let Err(fault) = self.machine.step(&mut console) {
                Output::Normal.start_new_line();
                Output::Trace(Condition::Always).print_trace(&self.machine, Some("End"));
                return Err(error::runtime_fault(fault));
            }
            self.instruction_count += 1;
        }
        Output::Normal.start_new_line();
        tprintln!(
            Sometimes,
            "Halted after {} instructions",
            self.instruction_count
        );
        Ok(())
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }
}
