//! Execution trace recording.
//!
//! Each executed instruction produces one [`TraceRow`] capturing the
//! pre-fetch program counter, the opcode, and the register file as it
//! looked before the instruction ran. Recording is opt-in and distinct
//! from the verbose per-instruction log line.

use serde::{Deserialize, Serialize};
use vpu_isa::{OpCode, REGISTER_COUNT};

/// A single row of the execution trace.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceRow {
    /// Cycle / step number.
    pub clk: u64,
    /// Program counter before this instruction was fetched.
    pub pc: u64,
    /// The executed opcode.
    pub opcode: OpCode,
    /// Register values BEFORE this instruction, in id order.
    pub regs: [u64; REGISTER_COUNT],
}

/// Complete execution trace.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// All trace rows.
    pub rows: Vec<TraceRow>,
    /// Final register state.
    pub final_regs: [u64; REGISTER_COUNT],
    /// Final program counter.
    pub final_pc: u64,
    /// Total cycles executed.
    pub total_cycles: u64,
    /// Halt reason (if the run halted rather than faulted).
    pub halt_reason: Option<String>,
}

impl ExecutionTrace {
    /// Create a new empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to the trace.
    pub fn push(&mut self, row: TraceRow) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the trace is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
