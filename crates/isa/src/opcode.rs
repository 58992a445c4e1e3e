//! Opcode byte definitions.
//!
//! One byte per instruction. The operand bytes that follow each opcode
//! are fixed by the instruction:
//!
//! - register operands are one byte (a [`Register`] identifier)
//! - width operands are one byte, restricted to {1, 2, 4, 8}
//! - immediates are `width` little-endian bytes
//! - address literals are 8 little-endian bytes
//!
//! [`Register`]: crate::Register

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcodes understood by the processor.
///
/// The discriminants are the wire encoding; an encoder placing any
/// other byte in opcode position produces a stream the processor
/// rejects with an unknown-opcode fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    /// `A := A + B` (wrapping). Updates arithmetic flags.
    Add = 0x00,
    /// `A := A - B` (wrapping). Updates arithmetic flags.
    Sub = 0x01,
    /// `A := A * B` (wrapping). Updates arithmetic flags.
    Mul = 0x02,
    /// Unsigned `A := A / B`; the remainder lands in the remainder
    /// flag. Divide-by-zero fault when B is zero.
    Div = 0x03,
    /// Unsigned `A := A % B`. Divide-by-zero fault when B is zero.
    Mod = 0x04,

    /// Operand: register. Wrapping increment of the register.
    IncReg = 0x05,
    /// Operands: width, register holding the address. Narrow
    /// increment of the value in memory.
    IncAddrInReg = 0x06,
    /// Operands: width, 8-byte address literal.
    IncAddrLiteral = 0x07,
    /// Operand: register. Wrapping decrement of the register.
    DecReg = 0x08,
    /// Operands: width, register holding the address.
    DecAddrInReg = 0x09,
    /// Operands: width, 8-byte address literal.
    DecAddrLiteral = 0x0A,

    /// Consumes no operands and changes no state.
    NoOperation = 0x0B,

    /// Operands: destination register, source register. Raw 64-bit
    /// copy, flags untouched.
    MoveRegReg = 0x0C,
    /// Operands: width, destination register, register holding the
    /// source address. Zero-extending load.
    MoveRegAddrInReg = 0x0D,
    /// Operands: width, destination register, `width`-byte immediate.
    /// Zero-extending load.
    MoveRegConst = 0x0E,
    /// Operands: width, destination register, 8-byte address literal.
    /// Zero-extending load.
    MoveRegAddrLiteral = 0x0F,
    /// Operands: width, register holding the destination address,
    /// source register. Stores the low `width` bytes of the source.
    MoveAddrInRegReg = 0x10,

    /// Requests a halt by setting the exit register; the execution
    /// loop observes the request in the same cycle.
    Exit = 0x11,
}

impl OpCode {
    /// Decode an opcode byte. Returns `None` for unmapped bytes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Add),
            0x01 => Some(Self::Sub),
            0x02 => Some(Self::Mul),
            0x03 => Some(Self::Div),
            0x04 => Some(Self::Mod),
            0x05 => Some(Self::IncReg),
            0x06 => Some(Self::IncAddrInReg),
            0x07 => Some(Self::IncAddrLiteral),
            0x08 => Some(Self::DecReg),
            0x09 => Some(Self::DecAddrInReg),
            0x0A => Some(Self::DecAddrLiteral),
            0x0B => Some(Self::NoOperation),
            0x0C => Some(Self::MoveRegReg),
            0x0D => Some(Self::MoveRegAddrInReg),
            0x0E => Some(Self::MoveRegConst),
            0x0F => Some(Self::MoveRegAddrLiteral),
            0x10 => Some(Self::MoveAddrInRegReg),
            0x11 => Some(Self::Exit),
            _ => None,
        }
    }

    /// Get the opcode as its wire byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Symbolic name, as emitted in the per-instruction trace.
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::IncReg => "INC_REG",
            Self::IncAddrInReg => "INC_ADDR_IN_REG",
            Self::IncAddrLiteral => "INC_ADDR_LITERAL",
            Self::DecReg => "DEC_REG",
            Self::DecAddrInReg => "DEC_ADDR_IN_REG",
            Self::DecAddrLiteral => "DEC_ADDR_LITERAL",
            Self::NoOperation => "NO_OPERATION",
            Self::MoveRegReg => "MOVE_REG_REG",
            Self::MoveRegAddrInReg => "MOVE_REG_ADDR_IN_REG",
            Self::MoveRegConst => "MOVE_REG_CONST",
            Self::MoveRegAddrLiteral => "MOVE_REG_ADDR_LITERAL",
            Self::MoveAddrInRegReg => "MOVE_ADDR_IN_REG_REG",
            Self::Exit => "EXIT",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let opcodes = [
            OpCode::Add,
            OpCode::Div,
            OpCode::IncAddrLiteral,
            OpCode::NoOperation,
            OpCode::MoveAddrInRegReg,
            OpCode::Exit,
        ];

        for op in opcodes.iter() {
            let raw = op.as_byte();
            assert_eq!(Some(*op), OpCode::from_byte(raw));
        }
    }

    #[test]
    fn test_unknown_opcode_bytes() {
        assert_eq!(None, OpCode::from_byte(0x12));
        assert_eq!(None, OpCode::from_byte(0xFF));
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(OpCode::Add.name(), "ADD");
        assert_eq!(OpCode::MoveRegConst.name(), "MOVE_REG_CONST");
        assert_eq!(format!("{}", OpCode::Exit), "EXIT");
    }
}
