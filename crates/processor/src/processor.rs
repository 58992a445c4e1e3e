//! The fetch-decode-execute engine.
//!
//! # Execution model
//!
//! Strictly single-threaded and synchronous: one loop fetches an
//! opcode byte at the program counter, dispatches on the decoded
//! [`OpCode`], runs the handler to completion, observes any halt
//! request, clears the volatile registers, and repeats. Every fault is
//! fatal to the run and leaves register and memory state as last
//! written.
//!
//! # Halt semantics
//!
//! A handler requests a halt by writing a nonzero value into the
//! [`Register::Exit`] slot. The loop inspects that slot immediately
//! after the handler returns and before the volatile reset, so a halt
//! request is observed in the same cycle that raised it.
//!
//! # Memory layout
//!
//! Code, data, and stack share the one flat address space. `execute`
//! loads the program by pushing it onto the stack (which grows toward
//! increasing addresses) and points the program counter at the load
//! address.

use crate::error::{MemoryFault, VmError};
use crate::memory::{Memory, DEFAULT_MEM_SIZE};
use crate::registers::RegisterFile;
use crate::trace::{ExecutionTrace, TraceRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use vpu_isa::{is_valid_width, width_mask, OpCode, Register};

/// Virtual processor state: one register file, one memory, and the
/// loop bookkeeping. Exclusively owned; discarding the value is the
/// only teardown.
#[derive(Clone, Serialize, Deserialize)]
pub struct Processor {
    /// Register file, zero-initialized at construction.
    pub registers: RegisterFile,
    /// Memory subsystem.
    pub memory: Memory,
    /// True only while an execution request is running.
    running: bool,
    /// Cycle counter.
    cycle: u64,
    /// Emit one log line per executed instruction.
    verbose: bool,
    /// Execution trace; recording is enabled iff this is present.
    trace: Option<ExecutionTrace>,
}

impl Processor {
    /// Create a processor with the given memory capacity in bytes.
    pub fn new(memory_size: usize) -> Self {
        Self {
            registers: RegisterFile::new(),
            memory: Memory::new(memory_size),
            running: false,
            cycle: 0,
            verbose: false,
            trace: None,
        }
    }

    /// Create a processor with the default memory capacity.
    pub fn with_default_memory() -> Self {
        Self::new(DEFAULT_MEM_SIZE)
    }

    /// Cycles executed by the current run.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Whether an execution request is currently running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Enable execution trace recording.
    pub fn enable_tracing(&mut self) {
        self.trace = Some(ExecutionTrace::new());
    }

    /// Disable recording and return the collected trace.
    pub fn take_trace(&mut self) -> Option<ExecutionTrace> {
        let mut trace = self.trace.take()?;
        trace.final_regs = self.registers.snapshot();
        trace.final_pc = self.registers.get(Register::ProgramCounter);
        trace.total_cycles = self.cycle;
        Some(trace)
    }

    // === Stack ===

    /// Push raw bytes: write at the stack pointer, then grow it.
    ///
    /// The stack grows toward increasing addresses; this direction is
    /// part of the ISA and the load scheme for programs.
    pub fn push_stack_bytes(&mut self, bytes: &[u8]) -> Result<(), VmError> {
        let sp = self.registers.get(Register::StackPointer);
        self.memory
            .write_bytes(sp, bytes)
            .map_err(|fault| self.memory_fault(fault))?;
        self.registers
            .set(Register::StackPointer, sp.wrapping_add(bytes.len() as u64));
        Ok(())
    }

    /// Push the 8-byte little-endian representation of a 64-bit value.
    pub fn push_stack(&mut self, value: u64) -> Result<(), VmError> {
        self.push_stack_bytes(&value.to_le_bytes())
    }

    /// Pop raw bytes: shrink the stack pointer, then read at it. Exact
    /// LIFO inverse of [`Processor::push_stack_bytes`].
    pub fn pop_stack_bytes(&mut self, size: u64) -> Result<&[u8], VmError> {
        let sp = self.registers.get(Register::StackPointer);
        let new_sp = sp.checked_sub(size).ok_or_else(|| {
            self.memory_fault(MemoryFault { addr: sp, size })
        })?;
        self.registers.set(Register::StackPointer, new_sp);
        let pc = self.registers.get(Register::ProgramCounter);
        self.memory
            .read_bytes(new_sp, size)
            .map_err(|fault| VmError::Memory { pc, fault })
    }

    fn memory_fault(&self, fault: MemoryFault) -> VmError {
        VmError::Memory {
            pc: self.registers.get(Register::ProgramCounter),
            fault,
        }
    }

    // === Decoder: program-counter-driven fetch ===

    /// Fetch one byte at the program counter, then advance it.
    fn fetch_byte(&mut self) -> Result<u8, VmError> {
        let pc = self.registers.get(Register::ProgramCounter);
        let byte = self
            .memory
            .read_byte(pc)
            .map_err(|fault| VmError::Memory { pc, fault })?;
        self.registers
            .set(Register::ProgramCounter, pc.wrapping_add(1));
        Ok(byte)
    }

    /// Fetch a `width`-byte little-endian immediate, zero-extended,
    /// then advance the program counter by `width`.
    fn fetch_uint(&mut self, width: u8) -> Result<u64, VmError> {
        let pc = self.registers.get(Register::ProgramCounter);
        let value = self
            .memory
            .read_uint(pc, width)
            .map_err(|fault| VmError::Memory { pc, fault })?;
        self.registers
            .set(Register::ProgramCounter, pc.wrapping_add(width as u64));
        Ok(value)
    }

    /// Fetch an 8-byte address literal.
    fn fetch_address(&mut self) -> Result<u64, VmError> {
        self.fetch_uint(8)
    }

    /// Fetch a register-id operand.
    fn fetch_register(&mut self) -> Result<Register, VmError> {
        let pc = self.registers.get(Register::ProgramCounter);
        let byte = self.fetch_byte()?;
        Register::from_byte(byte).ok_or(VmError::InvalidRegister { byte, pc })
    }

    /// Fetch a width operand, restricted to {1, 2, 4, 8}.
    fn fetch_width(&mut self) -> Result<u8, VmError> {
        let pc = self.registers.get(Register::ProgramCounter);
        let size = self.fetch_byte()?;
        if is_valid_width(size) {
            Ok(size)
        } else {
            Err(VmError::InvalidOperandSize { size, pc })
        }
    }

    // === Execution ===

    /// Load `byte_code` and run it to halt or fault.
    ///
    /// The program is pushed onto the stack (code and data share the
    /// stack address space), the program counter is pointed at the
    /// load address, and the fetch-execute loop runs until a halt
    /// request or a fault. The observable result is the final register
    /// and memory state.
    pub fn execute(&mut self, byte_code: &[u8], verbose: bool) -> Result<(), VmError> {
        self.start(byte_code, verbose)?;
        while self.running {
            self.step().inspect_err(|err| self.abort(err))?;
        }
        self.finish_trace();
        Ok(())
    }

    /// Like [`Processor::execute`], but fail with
    /// [`VmError::MaxStepsReached`] if the program has not halted
    /// after `max_steps` instructions.
    pub fn execute_bounded(
        &mut self,
        byte_code: &[u8],
        verbose: bool,
        max_steps: u64,
    ) -> Result<(), VmError> {
        self.start(byte_code, verbose)?;
        for _ in 0..max_steps {
            if !self.running {
                self.finish_trace();
                return Ok(());
            }
            self.step().inspect_err(|err| self.abort(err))?;
        }
        if self.running {
            self.running = false;
            return Err(VmError::MaxStepsReached { max_steps });
        }
        self.finish_trace();
        Ok(())
    }

    fn start(&mut self, byte_code: &[u8], verbose: bool) -> Result<(), VmError> {
        let entry = self.registers.get(Register::StackPointer);
        self.push_stack_bytes(byte_code)?;
        self.registers.set(Register::ProgramCounter, entry);
        self.verbose = verbose;
        // each execution request counts cycles and records rows of
        // its own, not accumulated across earlier runs
        self.cycle = 0;
        if self.trace.is_some() {
            self.trace = Some(ExecutionTrace::new());
        }
        self.running = true;
        Ok(())
    }

    fn abort(&mut self, err: &VmError) {
        self.running = false;
        error!(%err, "execution fault");
    }

    fn finish_trace(&mut self) {
        if let Some(trace) = &mut self.trace {
            trace.final_regs = self.registers.snapshot();
            trace.final_pc = self.registers.get(Register::ProgramCounter);
            trace.total_cycles = self.cycle;
        }
    }

    /// Execute exactly one instruction.
    ///
    /// An unmapped opcode byte fails before the program counter
    /// advances, so a failed dispatch leaves all state untouched.
    pub fn step(&mut self) -> Result<(), VmError> {
        let pc = self.registers.get(Register::ProgramCounter);
        let regs = self.registers.snapshot();

        let byte = self
            .memory
            .read_byte(pc)
            .map_err(|fault| VmError::Memory { pc, fault })?;
        let opcode = OpCode::from_byte(byte).ok_or(VmError::UnknownOpcode { opcode: byte, pc })?;
        self.registers
            .set(Register::ProgramCounter, pc.wrapping_add(1));

        if self.verbose {
            debug!(pc, opcode = opcode.name(), "executing");
        }

        match opcode {
            OpCode::Add => self.handle_add(),
            OpCode::Sub => self.handle_sub(),
            OpCode::Mul => self.handle_mul(),
            OpCode::Div => self.handle_div(pc)?,
            OpCode::Mod => self.handle_mod(pc)?,
            OpCode::IncReg => self.handle_inc_reg()?,
            OpCode::IncAddrInReg => self.handle_inc_addr_in_reg()?,
            OpCode::IncAddrLiteral => self.handle_inc_addr_literal()?,
            OpCode::DecReg => self.handle_dec_reg()?,
            OpCode::DecAddrInReg => self.handle_dec_addr_in_reg()?,
            OpCode::DecAddrLiteral => self.handle_dec_addr_literal()?,
            OpCode::NoOperation => {}
            OpCode::MoveRegReg => self.handle_move_reg_reg()?,
            OpCode::MoveRegAddrInReg => self.handle_move_reg_addr_in_reg()?,
            OpCode::MoveRegConst => self.handle_move_reg_const()?,
            OpCode::MoveRegAddrLiteral => self.handle_move_reg_addr_literal()?,
            OpCode::MoveAddrInRegReg => self.handle_move_addr_in_reg_reg()?,
            OpCode::Exit => self.handle_exit(),
        }

        // The halt check must precede the volatile reset, or the exit
        // request set by this very instruction would be erased unseen.
        let exit = self.registers.get(Register::Exit);
        if exit != 0 {
            self.running = false;
            if let Some(trace) = &mut self.trace {
                trace.halt_reason = Some(format!("exit({exit})"));
            }
        }
        self.registers.reset_volatile();

        if let Some(trace) = &mut self.trace {
            trace.push(TraceRow {
                clk: self.cycle,
                pc,
                opcode,
                regs,
            });
        }
        self.cycle += 1;
        Ok(())
    }

    // === Flags ===

    /// Flags from a full-width 64-bit result.
    fn set_arithmetical_flags(&mut self, result: i64, remainder: u64) {
        self.registers
            .set(Register::ZeroFlag, (result == 0) as u64);
        self.registers.set(Register::SignFlag, (result < 0) as u64);
        self.registers.set(Register::RemainderFlag, remainder);
    }

    /// Flags from a narrow `width`-byte result: the sign bit is the
    /// top bit of the narrow value, not of a 64-bit extension.
    fn set_narrow_flags(&mut self, result: u64, width: u8) {
        let sign = (result >> (width as u32 * 8 - 1)) & 1;
        self.registers.set(Register::ZeroFlag, (result == 0) as u64);
        self.registers.set(Register::SignFlag, sign);
        self.registers.set(Register::RemainderFlag, 0);
    }

    // === Instruction handlers ===

    fn handle_add(&mut self) {
        let a = self.registers.get(Register::A);
        let b = self.registers.get(Register::B);
        let result = a.wrapping_add(b);
        self.registers.set(Register::A, result);
        self.set_arithmetical_flags(result as i64, 0);
    }

    fn handle_sub(&mut self) {
        let a = self.registers.get(Register::A);
        let b = self.registers.get(Register::B);
        let result = a.wrapping_sub(b);
        self.registers.set(Register::A, result);
        self.set_arithmetical_flags(result as i64, 0);
    }

    fn handle_mul(&mut self) {
        let a = self.registers.get(Register::A);
        let b = self.registers.get(Register::B);
        let result = a.wrapping_mul(b);
        self.registers.set(Register::A, result);
        self.set_arithmetical_flags(result as i64, 0);
    }

    fn handle_div(&mut self, pc: u64) -> Result<(), VmError> {
        let a = self.registers.get(Register::A);
        let b = self.registers.get(Register::B);
        if b == 0 {
            return Err(VmError::DivideByZero {
                opcode: OpCode::Div,
                pc,
            });
        }
        // the remainder is computed before A is overwritten
        let remainder = a % b;
        let result = a / b;
        self.registers.set(Register::A, result);
        self.set_arithmetical_flags(result as i64, remainder);
        Ok(())
    }

    fn handle_mod(&mut self, pc: u64) -> Result<(), VmError> {
        let a = self.registers.get(Register::A);
        let b = self.registers.get(Register::B);
        if b == 0 {
            return Err(VmError::DivideByZero {
                opcode: OpCode::Mod,
                pc,
            });
        }
        let result = a % b;
        self.registers.set(Register::A, result);
        self.set_arithmetical_flags(result as i64, 0);
        Ok(())
    }

    fn handle_inc_reg(&mut self) -> Result<(), VmError> {
        let reg = self.fetch_register()?;
        let result = self.registers.get(reg).wrapping_add(1);
        self.registers.set(reg, result);
        self.set_arithmetical_flags(result as i64, 0);
        Ok(())
    }

    fn handle_dec_reg(&mut self) -> Result<(), VmError> {
        let reg = self.fetch_register()?;
        let result = self.registers.get(reg).wrapping_sub(1);
        self.registers.set(reg, result);
        self.set_arithmetical_flags(result as i64, 0);
        Ok(())
    }

    /// Increment the `width`-byte unsigned value at `addr`, wrapping
    /// modulo 2^(8*width).
    fn increment_unsigned(&mut self, addr: u64, width: u8) -> Result<(), VmError> {
        let value = self
            .memory
            .read_uint(addr, width)
            .map_err(|fault| self.memory_fault(fault))?;
        let result = value.wrapping_add(1) & width_mask(width);
        self.memory
            .write_uint(addr, result, width)
            .map_err(|fault| self.memory_fault(fault))?;
        self.set_narrow_flags(result, width);
        Ok(())
    }

    /// Decrement the `width`-byte unsigned value at `addr`, wrapping
    /// modulo 2^(8*width).
    fn decrement_unsigned(&mut self, addr: u64, width: u8) -> Result<(), VmError> {
        let value = self
            .memory
            .read_uint(addr, width)
            .map_err(|fault| self.memory_fault(fault))?;
        let result = value.wrapping_sub(1) & width_mask(width);
        self.memory
            .write_uint(addr, result, width)
            .map_err(|fault| self.memory_fault(fault))?;
        self.set_narrow_flags(result, width);
        Ok(())
    }

    fn handle_inc_addr_in_reg(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let reg = self.fetch_register()?;
        let addr = self.registers.get(reg);
        self.increment_unsigned(addr, width)
    }

    fn handle_inc_addr_literal(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let addr = self.fetch_address()?;
        self.increment_unsigned(addr, width)
    }

    fn handle_dec_addr_in_reg(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let reg = self.fetch_register()?;
        let addr = self.registers.get(reg);
        self.decrement_unsigned(addr, width)
    }

    fn handle_dec_addr_literal(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let addr = self.fetch_address()?;
        self.decrement_unsigned(addr, width)
    }

    fn handle_move_reg_reg(&mut self) -> Result<(), VmError> {
        let dst = self.fetch_register()?;
        let src = self.fetch_register()?;
        let value = self.registers.get(src);
        self.registers.set(dst, value);
        Ok(())
    }

    fn handle_move_reg_const(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let dst = self.fetch_register()?;
        let value = self.fetch_uint(width)?;
        self.registers.set(dst, value);
        Ok(())
    }

    fn handle_move_reg_addr_in_reg(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let dst = self.fetch_register()?;
        let addr_reg = self.fetch_register()?;
        let addr = self.registers.get(addr_reg);
        let value = self
            .memory
            .read_uint(addr, width)
            .map_err(|fault| self.memory_fault(fault))?;
        self.registers.set(dst, value);
        Ok(())
    }

    fn handle_move_reg_addr_literal(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let dst = self.fetch_register()?;
        let addr = self.fetch_address()?;
        let value = self
            .memory
            .read_uint(addr, width)
            .map_err(|fault| self.memory_fault(fault))?;
        self.registers.set(dst, value);
        Ok(())
    }

    fn handle_move_addr_in_reg_reg(&mut self) -> Result<(), VmError> {
        let width = self.fetch_width()?;
        let addr_reg = self.fetch_register()?;
        let src = self.fetch_register()?;
        let addr = self.registers.get(addr_reg);
        let value = self.registers.get(src);
        self.memory
            .write_uint(addr, value, width)
            .map_err(|fault| self.memory_fault(fault))
    }

    fn handle_exit(&mut self) {
        self.registers.set(Register::Exit, 1);
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::with_default_memory()
    }
}
