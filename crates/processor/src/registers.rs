//! The register file.

use serde::{Deserialize, Serialize};
use vpu_isa::{Register, REGISTER_COUNT};

/// Fixed-size register file, one 64-bit slot per [`Register`].
///
/// Indexed directly by the register's dense id, so no access can fail.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegisterFile {
    slots: [u64; REGISTER_COUNT],
}

impl RegisterFile {
    /// Create a zero-initialized register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a register value.
    #[inline]
    pub fn get(&self, reg: Register) -> u64 {
        self.slots[reg.index()]
    }

    /// Set a register value.
    #[inline]
    pub fn set(&mut self, reg: Register, value: u64) {
        self.slots[reg.index()] = value;
    }

    /// Clear the volatile registers. The loop calls this after every
    /// instruction, once the halt request has already been observed.
    #[inline]
    pub fn reset_volatile(&mut self) {
        self.slots[Register::Exit.index()] = 0;
    }

    /// Snapshot of all slots in id order.
    pub fn snapshot(&self) -> [u64; REGISTER_COUNT] {
        self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_initialized() {
        let regs = RegisterFile::new();
        assert_eq!(regs.snapshot(), [0; REGISTER_COUNT]);
    }

    #[test]
    fn test_get_set() {
        let mut regs = RegisterFile::new();
        regs.set(Register::A, 42);
        regs.set(Register::StackPointer, 0x1000);
        assert_eq!(regs.get(Register::A), 42);
        assert_eq!(regs.get(Register::StackPointer), 0x1000);
        assert_eq!(regs.get(Register::B), 0);
    }

    #[test]
    fn test_reset_volatile_only_clears_exit() {
        let mut regs = RegisterFile::new();
        regs.set(Register::Exit, 1);
        regs.set(Register::A, 7);
        regs.reset_volatile();
        assert_eq!(regs.get(Register::Exit), 0);
        assert_eq!(regs.get(Register::A), 7);
    }
}
