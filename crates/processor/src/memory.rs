//! Flat byte-addressable memory.
//!
//! A single contiguous buffer of fixed capacity is the sole substrate
//! for code, data, and stack. Every access is bounds-checked up front:
//! an access that would leave the buffer fails with a [`MemoryFault`]
//! and performs no partial write.
//!
//! Multi-byte integers are stored little-endian. The width-tagged
//! accessors [`Memory::read_uint`] and [`Memory::write_uint`] read and
//! write exactly `width` bytes; callers are expected to have validated
//! the width against the legal operand widths.

use crate::error::MemoryFault;
use serde::{Deserialize, Serialize};

/// Default memory capacity: 64 KiB.
pub const DEFAULT_MEM_SIZE: usize = 64 * 1024;

/// Memory subsystem for the processor.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Flat byte-addressable storage; never resized.
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory with the given capacity in bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Create memory with the default capacity.
    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_MEM_SIZE)
    }

    /// Get the memory capacity.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bounds-check an access and return its starting index.
    #[inline]
    fn check(&self, addr: u64, size: u64) -> Result<usize, MemoryFault> {
        let end = addr.checked_add(size).ok_or(MemoryFault { addr, size })?;
        if end > self.data.len() as u64 {
            return Err(MemoryFault { addr, size });
        }
        Ok(addr as usize)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_byte(&self, addr: u64) -> Result<u8, MemoryFault> {
        let idx = self.check(addr, 1)?;
        Ok(self.data[idx])
    }

    /// Read `size` contiguous bytes.
    #[inline]
    pub fn read_bytes(&self, addr: u64, size: u64) -> Result<&[u8], MemoryFault> {
        let idx = self.check(addr, size)?;
        Ok(&self.data[idx..idx + size as usize])
    }

    /// Copy `bytes` into memory starting at `addr`.
    #[inline]
    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), MemoryFault> {
        let idx = self.check(addr, bytes.len() as u64)?;
        self.data[idx..idx + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Get a writable window for in-place updates.
    #[inline]
    pub fn bytes_mut(&mut self, addr: u64, size: u64) -> Result<&mut [u8], MemoryFault> {
        let idx = self.check(addr, size)?;
        Ok(&mut self.data[idx..idx + size as usize])
    }

    /// Read a `width`-byte little-endian unsigned integer,
    /// zero-extended to 64 bits.
    #[inline]
    pub fn read_uint(&self, addr: u64, width: u8) -> Result<u64, MemoryFault> {
        let bytes = self.read_bytes(addr, width as u64)?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Write the low `width` bytes of `value` little-endian at `addr`.
    #[inline]
    pub fn write_uint(&mut self, addr: u64, value: u64, width: u8) -> Result<(), MemoryFault> {
        let bytes = value.to_le_bytes();
        self.write_bytes(addr, &bytes[..width as usize])
    }

    /// Get a slice of memory for inspection.
    pub fn slice(&self, start: u64, len: usize) -> Option<&[u8]> {
        self.read_bytes(start, len as u64).ok()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::with_default_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_bytes() {
        let mut mem = Memory::new(1024);
        mem.write_bytes(0x100, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(mem.read_bytes(0x100, 4).unwrap(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(mem.read_byte(0x103).unwrap(), 0xEF);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut mem = Memory::new(16);
        assert_eq!(
            mem.read_byte(16),
            Err(MemoryFault { addr: 16, size: 1 })
        );
        assert!(mem.read_bytes(8, 9).is_err());
        assert!(mem.write_bytes(15, &[1, 2]).is_err());
        // address + size overflow must not wrap into bounds
        assert!(mem.read_bytes(u64::MAX, 2).is_err());
    }

    #[test]
    fn test_no_partial_write() {
        let mut mem = Memory::new(16);
        assert!(mem.write_bytes(14, &[1, 2, 3]).is_err());
        assert_eq!(mem.read_bytes(14, 2).unwrap(), &[0, 0]);
    }

    #[test]
    fn test_uint_roundtrip_zero_extends() {
        let mut mem = Memory::new(64);
        mem.write_uint(0, 0xAABB_CCDD_EEFF_1122, 2).unwrap();
        // only the low two bytes were written
        assert_eq!(mem.read_uint(0, 2).unwrap(), 0x1122);
        assert_eq!(mem.read_uint(0, 8).unwrap(), 0x1122);

        mem.write_uint(8, u64::MAX, 8).unwrap();
        assert_eq!(mem.read_uint(8, 8).unwrap(), u64::MAX);
        assert_eq!(mem.read_uint(8, 4).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_bytes_mut_window() {
        let mut mem = Memory::new(32);
        mem.bytes_mut(4, 2).unwrap().copy_from_slice(&[7, 9]);
        assert_eq!(mem.read_bytes(4, 2).unwrap(), &[7, 9]);
        assert!(mem.bytes_mut(31, 2).is_err());
    }
}
