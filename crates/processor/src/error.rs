//! Execution faults.
//!
//! Every fault is fatal to the current run: no retries, no rollback,
//! no in-ISA trap mechanism. Register and memory state stay as last
//! written, and the variants carry enough context (failing address,
//! opcode, width, program counter) to diagnose the abort.

use thiserror::Error;
use vpu_isa::OpCode;

/// Out-of-bounds access raised by the memory subsystem.
///
/// The memory has no notion of a program counter; the processor wraps
/// this into [`VmError::Memory`] with the pc attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory access out of bounds: address {addr:#x}, size {size}")]
pub struct MemoryFault {
    /// First address of the failing access.
    pub addr: u64,
    /// Size of the failing access in bytes.
    pub size: u64,
}

/// Faults that abort an execution run.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("{fault} at pc={pc:#x}")]
    Memory {
        pc: u64,
        #[source]
        fault: MemoryFault,
    },

    #[error("invalid operand size {size} at pc={pc:#x} (expected 1, 2, 4 or 8)")]
    InvalidOperandSize { size: u8, pc: u64 },

    #[error("unknown opcode {opcode:#04x} at pc={pc:#x}")]
    UnknownOpcode { opcode: u8, pc: u64 },

    #[error("invalid register id {byte:#04x} at pc={pc:#x}")]
    InvalidRegister { byte: u8, pc: u64 },

    #[error("division by zero in {opcode} at pc={pc:#x}")]
    DivideByZero { opcode: OpCode, pc: u64 },

    #[error("execution halted: reached max steps ({max_steps})")]
    MaxStepsReached { max_steps: u64 },
}
