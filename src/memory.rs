use std::ops::Range;

use crate::error::Fault;

/// LS-8 can address 256 bytes of memory.
pub const MEMORY_SIZE: usize = 0x100;

/// Zero-initialised, bounds-checked system memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            cells: [0; MEMORY_SIZE],
        }
    }

    /// Copy `program` into memory, starting at address 0.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Fault> {
        if program.len() > MEMORY_SIZE {
            return Err(Fault::ProgramTooLarge { len: program.len() });
        }
        self.cells = [0; MEMORY_SIZE];
        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }

    pub fn read(&self, address: usize) -> Result<u8, Fault> {
        self.cells
            .get(address)
            .copied()
            .ok_or(Fault::AddressOutOfRange { address })
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<(), Fault> {
        let cell = self
            .cells
            .get_mut(address)
            .ok_or(Fault::AddressOutOfRange { address })?;
        *cell = value;
        Ok(())
    }

    /// Cells in `range`, truncated at the end of memory.
    pub fn window(&self, range: Range<usize>) -> &[u8] {
        let end = range.end.min(MEMORY_SIZE);
        let start = range.start.min(end);
        &self.cells[start..end]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_access_fails() {
        let mut mem = Memory::new();
        assert_eq!(mem.read(255), Ok(0));
        assert_eq!(
            mem.read(256),
            Err(Fault::AddressOutOfRange { address: 256 })
        );
        assert_eq!(
            mem.write(300, 1),
            Err(Fault::AddressOutOfRange { address: 300 })
        );
    }

    #[test]
    fn load_fills_from_address_zero() {
        let mut mem = Memory::new();
        mem.load(&[1, 2, 3]).unwrap();
        assert_eq!(mem.window(0..4), &[1, 2, 3, 0]);

        let full = [0xAB; MEMORY_SIZE];
        assert!(mem.load(&full).is_ok());
        assert_eq!(
            mem.load(&[0; MEMORY_SIZE + 1]),
            Err(Fault::ProgramTooLarge { len: 257 })
        );
    }

    #[test]
    fn reload_clears_previous_program() {
        let mut mem = Memory::new();
        mem.load(&[1, 2, 3]).unwrap();
        mem.load(&[9]).unwrap();
        assert_eq!(mem.window(0..4), &[9, 0, 0, 0]);
    }

    #[test]
    fn window_is_truncated() {
        let mem = Memory::new();
        assert_eq!(mem.window(254..258).len(), 2);
        assert!(mem.window(300..310).is_empty());
    }
}
