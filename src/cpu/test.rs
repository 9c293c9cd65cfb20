use super::*;
use crate::isa::{basic, DecodedInstruction, OperandValues};

fn at(mnemonic: &'static str) -> &'static crate::isa::Instruction {
    basic::ALL.iter().find(|i| i.mnemonic == mnemonic).copied().unwrap()
}

fn place(cpu: &mut Cpu, addr: u32, mnemonic: &'static str, ops: OperandValues) {
    cpu.memory
        .write_instruction(
            addr,
            DecodedInstruction {
                instruction: at(mnemonic),
                operands: ops,
            },
        )
        .unwrap();
}

fn reg(cpu: &Cpu, name: &str) -> u32 {
    cpu.gpr.index_of_name(name).unwrap()
}

fn val(cpu: &Cpu, name: &str) -> u64 {
    cpu.gpr.read_integer(reg(cpu, name), false)
}

#[test]
fn add_two_immediates_and_halt_via_syscall_exit() {
    let mut cpu = Cpu::new();
    let pc0 = TEXT_LOWER;
    place(&mut cpu, pc0, "addiu", OperandValues { rt: reg(&cpu, "t0"), rs: 0, immediate: 40, ..Default::default() });
    place(&mut cpu, pc0 + 4, "addiu", OperandValues { rt: reg(&cpu, "t1"), rs: 0, immediate: 2, ..Default::default() });
    place(
        &mut cpu,
        pc0 + 8,
        "add",
        OperandValues { rd: reg(&cpu, "t2"), rs: reg(&cpu, "t0"), rt: reg(&cpu, "t1"), ..Default::default() },
    );
    place(&mut cpu, pc0 + 12, "addiu", OperandValues { rt: reg(&cpu, "v0"), rs: 0, immediate: 10, ..Default::default() });
    place(&mut cpu, pc0 + 16, "syscall", OperandValues::default());

    let (reason, exit_code) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramStopped(StopReason::Exit(0)));
    assert_eq!(exit_code, Some(0));
    assert_eq!(val(&cpu, "t2"), 42);
}

#[test]
fn program_dropping_off_the_end_is_reported() {
    let mut cpu = Cpu::new();
    place(&mut cpu, TEXT_LOWER, "nop", OperandValues::default());
    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramDroppedOff(TEXT_LOWER + 4));
}

#[test]
fn bne_not_taken_falls_through_one_word_without_delay_slots() {
    let mut cpu = Cpu::new();
    cpu.config.delay_slots = false;
    let pc0 = TEXT_LOWER;
    // t0 == t1 == 0, so bne is not taken.
    place(&mut cpu, pc0, "bne", OperandValues { rs: reg(&cpu, "t0"), rt: reg(&cpu, "t1"), immediate: 4, ..Default::default() });
    place(&mut cpu, pc0 + 4, "addiu", OperandValues { rt: reg(&cpu, "v0"), rs: 0, immediate: 10, ..Default::default() });
    place(&mut cpu, pc0 + 8, "syscall", OperandValues::default());
    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramStopped(StopReason::Exit(0)));
}

#[test]
fn taken_branch_with_delay_slot_executes_delay_slot_before_landing() {
    let mut cpu = Cpu::new();
    cpu.config.delay_slots = true;
    let pc0 = TEXT_LOWER;
    // beq $zero, $zero, +2 (words) -> target = pc0 + 4 + 8 = pc0 + 12
    place(&mut cpu, pc0, "beq", OperandValues { rs: 0, rt: 0, immediate: 2, ..Default::default() });
    place(&mut cpu, pc0 + 4, "addiu", OperandValues { rt: reg(&cpu, "t0"), rs: 0, immediate: 7, ..Default::default() });
    place(&mut cpu, pc0 + 8, "addiu", OperandValues { rt: reg(&cpu, "v0"), rs: 0, immediate: 999, ..Default::default() });
    place(&mut cpu, pc0 + 12, "addiu", OperandValues { rt: reg(&cpu, "v0"), rs: 0, immediate: 10, ..Default::default() });
    place(&mut cpu, pc0 + 16, "syscall", OperandValues::default());

    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramStopped(StopReason::Exit(0)));
    // Delay slot at pc0+4 ran (t0 == 7); the skipped instruction at pc0+8 did not.
    assert_eq!(val(&cpu, "t0"), 7);
    assert_eq!(val(&cpu, "v0"), 10);
}

#[test]
fn control_transfer_inside_a_delay_slot_is_reserved_instruction() {
    let mut cpu = Cpu::new();
    cpu.config.delay_slots = true;
    let pc0 = TEXT_LOWER;
    place(&mut cpu, pc0, "beq", OperandValues { rs: 0, rt: 0, immediate: 2, ..Default::default() });
    place(&mut cpu, pc0 + 4, "j", OperandValues { target: 0, ..Default::default() });
    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramCrashed(MipsException::ReservedInstruction));
}

#[test]
fn divide_by_zero_with_no_kernel_handler_crashes_the_program() {
    let mut cpu = Cpu::new();
    let pc0 = TEXT_LOWER;
    place(&mut cpu, pc0, "div", OperandValues { rd: reg(&cpu, "t0"), rs: reg(&cpu, "t1"), rt: 0, ..Default::default() });
    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramCrashed(MipsException::DivideByZero));
}

#[test]
fn exception_with_installed_kernel_handler_transfers_control_there() {
    let mut cpu = Cpu::new();
    place(&mut cpu, TEXT_LOWER, "break", OperandValues::default());
    cpu.memory
        .write_instruction(
            KTEXT_LOWER,
            DecodedInstruction {
                instruction: at("syscall"),
                operands: OperandValues::default(),
            },
        )
        .unwrap();
    // `break` still reports as a program stop: it never routes through dispatch_to_handler.
    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramStopped(StopReason::Break));
}

#[test]
fn memory_write_observer_fires_with_the_composed_word() {
    let mut cpu = Cpu::new();
    let seen = std::rc::Rc::new(std::cell::RefCell::new(None));
    let seen2 = seen.clone();
    cpu.on_memory_write(move |addr, _bytes, word| {
        *seen2.borrow_mut() = Some((addr, word));
    });
    cpu.mem_write(DATA_LOWER, 0x1234_5678, 4, false).unwrap();
    assert_eq!(*seen.borrow(), Some((DATA_LOWER, 0x1234_5678)));
}

#[test]
fn runaway_loop_is_stopped_after_the_configured_limit() {
    let mut cpu = Cpu::new();
    cpu.config.loop_limit = 3;
    let pc0 = TEXT_LOWER;
    // beq $zero, $zero, -1 word -> branches back to itself forever.
    place(&mut cpu, pc0, "beq", OperandValues { rs: 0, rt: 0, immediate: -1, ..Default::default() });
    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramStopped(StopReason::LoopLimitExceeded(pc0)));
}

#[test]
fn stop_handle_halts_the_engine_before_its_next_fetch() {
    let mut cpu = Cpu::new();
    let pc0 = TEXT_LOWER;
    place(&mut cpu, pc0, "nop", OperandValues::default());
    let handle = cpu.stop_handle();
    handle.store(true, std::sync::atomic::Ordering::Relaxed);
    let (reason, _) = cpu.run();
    assert_eq!(reason, ExitReason::ProgramStopped(StopReason::Exit(0)));
}

#[test]
fn step_executes_exactly_one_instruction_without_resetting_pc() {
    let mut cpu = Cpu::new();
    let pc0 = TEXT_LOWER;
    place(&mut cpu, pc0, "addiu", OperandValues { rt: reg(&cpu, "t0"), rs: 0, immediate: 1, ..Default::default() });
    place(&mut cpu, pc0 + 4, "addiu", OperandValues { rt: reg(&cpu, "t0"), rs: reg(&cpu, "t0"), immediate: 1, ..Default::default() });
    cpu.pc = pc0;
    cpu.step().unwrap();
    assert_eq!(cpu.pc, pc0 + 4);
    assert_eq!(val(&cpu, "t0"), 1);
    cpu.step().unwrap();
    assert_eq!(val(&cpu, "t0"), 2);
}
