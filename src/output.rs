use std::cell::RefCell;
use std::fmt::Write;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::machine::Machine;
use crate::registers::STACK_START;

/// Print to the trace channel (stderr).
#[macro_export]
macro_rules! tprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::Output::Trace($cond).print_str("\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Trace($cond).print_str(&s);
    }};
}

/// Side channel written by `PRN` and `PRA`.
pub trait Console {
    fn print_decimal(&mut self, value: u8);
    fn print_char(&mut self, value: u8);
}

#[derive(Clone, Copy, Debug)]
pub enum Output {
    /// Program output on stdout.
    Normal,
    /// Trace and diagnostics on stderr.
    Trace(Condition),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Printed in every mode, without color if `--minimal`.
    Always,
    /// Dropped if `--minimal`.
    Sometimes,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

/// Cells shown by the trace line, just below the initial stack pointer.
const STACK_WINDOW: usize = 4;

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                print!("{}", string);
                if let Some(ch) = string.chars().last() {
                    Self::set_line_start(ch == '\n');
                }
            }
            Self::Trace(condition) => match (Self::is_minimal(), *condition) {
                (false, _) => eprint!("{}", ColoredString::from(string).blue()),
                (true, Condition::Always) => eprint_colorless(string),
                (true, Condition::Sometimes) => (),
            },
        }
    }

    /// Finish a line of program output left open by `PRA`.
    ///
    /// Does nothing if `--minimal`, so stdout stays exactly what the program printed.
    pub fn start_new_line(&self) {
        if !Self::is_minimal() && !Self::is_line_start() {
            self.print_str("\n");
        }
    }

    pub fn print_trace(&self, machine: &Machine, label: Option<&str>) {
        self.print_str(&trace_line(machine, label));
        self.print_str("\n");
    }
}

impl Console for Output {
    fn print_decimal(&mut self, value: u8) {
        self.print_str(&format!("{}\n", value));
    }

    fn print_char(&mut self, value: u8) {
        self.print_str(&(value as char).to_string());
    }
}

/// Collects program output, used to check what a program prints.
impl Console for String {
    fn print_decimal(&mut self, value: u8) {
        let _ = writeln!(self, "{}", value);
    }

    fn print_char(&mut self, value: u8) {
        self.push(value as char);
    }
}

/// Single line snapshot of machine state.
pub fn trace_line(machine: &Machine, label: Option<&str>) -> String {
    let mut line = String::new();
    if let Some(label) = label {
        line.push_str(label);
        line.push(' ');
    }
    let pc = machine.pc();
    let _ = write!(line, "TRACE --> PC: {:02} | RAM:", pc);
    for addr in pc..pc + 3 {
        match machine.memory().read(addr) {
            Ok(byte) => {
                let _ = write!(line, " {:03}", byte);
            }
            Err(_) => line.push_str(" ---"),
        }
    }
    line.push_str(" | Register:");
    for value in machine.registers().iter() {
        let _ = write!(line, " {:02}", value);
    }
    line.push_str(" | Stack:");
    let top = usize::from(STACK_START);
    for value in machine.memory().window(top - STACK_WINDOW..top) {
        let _ = write!(line, " {:02}", value);
    }
    line
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl Iterator for Decolored<'_> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    eprint!("{}", Decolored::new(string).collect::<String>());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decolored() {
        assert_eq!(Decolored::new("abcdef").collect::<String>(), "abcdef");
        assert_eq!(
            Decolored::new("PC\x1b[0;34m 00\x1b[0m").collect::<String>(),
            "PC 00"
        );
        assert_eq!(Decolored::new("abc\x1b[0xyz").collect::<String>(), "abc");
    }

    #[test]
    fn trace_of_fresh_machine() {
        let machine = Machine::with_program(&[0b1000_0010, 0, 8]).unwrap();
        assert_eq!(
            trace_line(&machine, None),
            "TRACE --> PC: 00 | RAM: 130 000 008 | Register: 00 00 00 00 00 00 00 244 | Stack: 00 00 00 00"
        );
        assert!(trace_line(&machine, Some("End")).starts_with("End TRACE --> PC: 00"));
    }

    #[test]
    fn trace_past_end_of_memory() {
        let mut program = vec![0; 256];
        // JMP R0 with R0 = 0xFF
        program[..5].copy_from_slice(&[0b1000_0010, 0, 0xFF, 0b0101_0100, 0]);
        let mut machine = Machine::with_program(&program).unwrap();
        let mut out = String::new();
        machine.step(&mut out).unwrap();
        machine.step(&mut out).unwrap();
        assert_eq!(machine.pc(), 0xFF);
        assert!(trace_line(&machine, None).contains("RAM: 000 --- ---"));
    }

    #[test]
    fn string_console() {
        let mut out = String::new();
        out.print_decimal(17);
        out.print_char(b'A');
        out.print_decimal(0);
        assert_eq!(out, "17\nA0\n");
    }
}
