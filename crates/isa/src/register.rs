//! Register identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of registers in the file.
pub const REGISTER_COUNT: usize = 8;

/// Registers of the processor.
///
/// Identifiers map to a dense 0-based range and double as the
/// one-byte wire encoding of register operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Register {
    /// General-purpose accumulator; first operand and destination of
    /// the arithmetic instructions.
    A = 0,
    /// General-purpose register; second operand of the arithmetic
    /// instructions.
    B = 1,
    /// 1 when the last arithmetic result was zero.
    ZeroFlag = 2,
    /// 1 when the last arithmetic result was negative.
    SignFlag = 3,
    /// Remainder of the last division, zero after everything else.
    RemainderFlag = 4,
    /// Address of the next byte to fetch.
    ProgramCounter = 5,
    /// Top of the upward-growing stack.
    StackPointer = 6,
    /// Halt request; volatile, cleared by the loop every cycle.
    Exit = 7,
}

impl Register {
    /// Decode a register-id byte. Returns `None` for bytes outside
    /// the enumeration.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::A),
            1 => Some(Self::B),
            2 => Some(Self::ZeroFlag),
            3 => Some(Self::SignFlag),
            4 => Some(Self::RemainderFlag),
            5 => Some(Self::ProgramCounter),
            6 => Some(Self::StackPointer),
            7 => Some(Self::Exit),
            _ => None,
        }
    }

    /// Get the register id as its wire byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Dense index into the register file.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::ZeroFlag => "ZERO_FLAG",
            Self::SignFlag => "SIGN_FLAG",
            Self::RemainderFlag => "REMAINDER_FLAG",
            Self::ProgramCounter => "PROGRAM_COUNTER",
            Self::StackPointer => "STACK_POINTER",
            Self::Exit => "EXIT",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
