//! End-to-end execution tests driving the engine through whole
//! bytecode programs, the way an external encoder would.

use vpu_processor::{OpCode, Processor, Register, VmError};

fn load_const(program: &mut Vec<u8>, width: u8, dst: Register, value: u64) {
    program.push(OpCode::MoveRegConst.as_byte());
    program.push(width);
    program.push(dst.as_byte());
    program.extend_from_slice(&value.to_le_bytes()[..width as usize]);
}

#[test]
fn test_add_program() {
    // MOVE A <- 5 (w=1); MOVE B <- 3 (w=1); ADD; EXIT
    let mut program = Vec::new();
    load_const(&mut program, 1, Register::A, 5);
    load_const(&mut program, 1, Register::B, 3);
    program.push(OpCode::Add.as_byte());
    program.push(OpCode::Exit.as_byte());

    let mut cpu = Processor::new(65536);
    cpu.execute(&program, false).unwrap();

    assert_eq!(cpu.registers.get(Register::A), 8);
    assert_eq!(cpu.registers.get(Register::ZeroFlag), 0);
    assert_eq!(cpu.registers.get(Register::SignFlag), 0);
    assert_eq!(cpu.registers.get(Register::RemainderFlag), 0);
}

#[test]
fn test_memory_counter_program() {
    // Bump a 2-byte counter at 0x1000 three times through both
    // addressing modes, then read it back into A.
    let mut program = Vec::new();
    load_const(&mut program, 2, Register::B, 0x1000);
    program.push(OpCode::IncAddrInReg.as_byte());
    program.push(2);
    program.push(Register::B.as_byte());
    program.push(OpCode::IncAddrLiteral.as_byte());
    program.push(2);
    program.extend_from_slice(&0x1000u64.to_le_bytes());
    program.push(OpCode::IncAddrInReg.as_byte());
    program.push(2);
    program.push(Register::B.as_byte());
    program.push(OpCode::MoveRegAddrInReg.as_byte());
    program.push(2);
    program.push(Register::A.as_byte());
    program.push(Register::B.as_byte());
    program.push(OpCode::Exit.as_byte());

    let mut cpu = Processor::new(65536);
    cpu.execute(&program, false).unwrap();

    assert_eq!(cpu.registers.get(Register::A), 3);
    assert_eq!(cpu.memory.read_uint(0x1000, 2).unwrap(), 3);
}

#[test]
fn test_store_program_writes_low_bytes_only() {
    // A := 0x0102030405060708; store 2 bytes of A at 0x2000
    let mut program = Vec::new();
    load_const(&mut program, 8, Register::A, 0x0102_0304_0506_0708);
    load_const(&mut program, 2, Register::B, 0x2000);
    program.push(OpCode::MoveAddrInRegReg.as_byte());
    program.push(2);
    program.push(Register::B.as_byte());
    program.push(Register::A.as_byte());
    program.push(OpCode::Exit.as_byte());

    let mut cpu = Processor::new(65536);
    cpu.execute(&program, false).unwrap();

    assert_eq!(cpu.memory.slice(0x2000, 4).unwrap(), &[0x08, 0x07, 0, 0]);
}

#[test]
fn test_fault_reports_pc() {
    // DIV with B == 0 sits at entry + 0
    let mut program = vec![OpCode::Div.as_byte()];
    program.push(OpCode::Exit.as_byte());

    let mut cpu = Processor::new(65536);
    let err = cpu.execute(&program, false).unwrap_err();
    match err {
        VmError::DivideByZero { opcode, pc } => {
            assert_eq!(opcode, OpCode::Div);
            assert_eq!(pc, 0);
        }
        other => panic!("unexpected fault: {other}"),
    }
}

#[test]
fn test_out_of_bounds_store_faults_without_halting_engine_state() {
    let mut program = Vec::new();
    load_const(&mut program, 8, Register::B, u64::MAX - 3);
    program.push(OpCode::MoveAddrInRegReg.as_byte());
    program.push(4);
    program.push(Register::B.as_byte());
    program.push(Register::A.as_byte());

    let mut cpu = Processor::new(65536);
    let err = cpu.execute(&program, false).unwrap_err();
    assert!(matches!(err, VmError::Memory { .. }));
    // state as last written, no rollback
    assert_eq!(cpu.registers.get(Register::B), u64::MAX - 3);
}

#[test]
fn test_traced_run_matches_executed_instructions() {
    let mut program = Vec::new();
    load_const(&mut program, 1, Register::A, 10);
    load_const(&mut program, 1, Register::B, 4);
    program.push(OpCode::Div.as_byte());
    program.push(OpCode::Exit.as_byte());

    let mut cpu = Processor::new(65536);
    cpu.enable_tracing();
    cpu.execute(&program, true).unwrap();
    let trace = cpu.take_trace().unwrap();

    assert_eq!(trace.len(), 4);
    assert_eq!(trace.total_cycles, 4);
    assert_eq!(trace.rows[2].opcode, OpCode::Div);
    assert_eq!(trace.final_regs[Register::A.index()], 2);
    assert_eq!(
        trace.final_regs[Register::RemainderFlag.index()],
        2
    );
    assert!(trace.halt_reason.is_some());
}

#[test]
fn test_bounded_run_of_halting_program_succeeds() {
    let mut program = Vec::new();
    load_const(&mut program, 1, Register::A, 1);
    program.push(OpCode::Exit.as_byte());

    let mut cpu = Processor::new(65536);
    cpu.execute_bounded(&program, false, 10).unwrap();
    assert_eq!(cpu.registers.get(Register::A), 1);
}
