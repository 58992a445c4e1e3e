//! vpu-isa: Instruction-set definitions for the VPU bytecode processor.
//!
//! This crate is the single source of truth for the numeric encoding of
//! the instruction set: opcode bytes, register identifiers, and operand
//! widths. The execution engine (`vpu-processor`) and any external
//! encoder or assembler must agree on these values, so they live in a
//! crate of their own with no engine dependencies.

pub mod opcode;
pub mod register;

pub use opcode::OpCode;
pub use register::{Register, REGISTER_COUNT};

/// Check whether `width` is a legal operand width in bytes.
///
/// Every width-parameterized instruction (moves, memory
/// increment/decrement) restricts its width operand to one of these
/// four values; anything else is an invalid-operand-size fault.
#[inline]
pub fn is_valid_width(width: u8) -> bool {
    matches!(width, 1 | 2 | 4 | 8)
}

/// Bit mask selecting the low `width` bytes of a 64-bit value.
#[inline]
pub fn width_mask(width: u8) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width as u32 * 8)) - 1
    }
}
