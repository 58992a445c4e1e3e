//! vpu-processor: deterministic register-based bytecode execution engine.
//!
//! This crate provides:
//! - A fixed register file and flat bounds-checked memory
//! - A sequential program-counter-driven decoder
//! - Opcode dispatch and the instruction handlers
//! - Stack-style push/pop primitives (also the program load mechanism)
//! - Optional execution trace recording
//!
//! Encoding of the instruction stream lives in `vpu-isa`; producing
//! such streams (assembler, file loading, CLI) is out of scope here.

pub mod error;
pub mod memory;
pub mod processor;
pub mod registers;
pub mod trace;

pub use error::{MemoryFault, VmError};
pub use memory::{Memory, DEFAULT_MEM_SIZE};
pub use processor::Processor;
pub use registers::RegisterFile;
pub use trace::{ExecutionTrace, TraceRow};
pub use vpu_isa::{OpCode, Register};
