use crate::cpu::*;
use crate::exit_reason::*;
use crate::memory::*;
use crate::program::*;
use crate::register::*;
use crate::result::*;
use mips_core::Cpu;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr::null_mut;

fn get_c_str(value: &str) -> CString {
    CString::new(value).expect("CString::new failed.")
}

const GPR: i32 = MipsRegisterBank::Gpr as i32;

#[test]
fn create_destroy_cpu() {
    unsafe {
        let cpu = mips_cpu_create();
        assert_ne!(cpu, null_mut());
        mips_cpu_destroy(cpu);
    }
}

#[test]
fn get_set_register_round_trips() {
    unsafe {
        let cpu = mips_cpu_create();
        let mut value: i64 = 0;

        assert_eq!(mips_cpu_set_register(cpu, GPR, 8, 42), MipsInteropResult::Ok);
        assert_eq!(
            mips_cpu_get_register(cpu, GPR, 8, true, &mut value),
            MipsInteropResult::Ok
        );
        assert_eq!(value, 42);

        mips_cpu_destroy(cpu);
    }
}

#[test]
fn get_register_out_of_range_bank() {
    unsafe {
        let cpu = mips_cpu_create();
        let mut value: i64 = 0;
        assert_eq!(
            mips_cpu_get_register(cpu, 99, 8, true, &mut value),
            MipsInteropResult::OutOfRange
        );
        mips_cpu_destroy(cpu);
    }
}

#[test]
fn assemble_and_run_simple_loop() {
    unsafe {
        let source_str = ".text\n\
             loop: slti $t2, $t0, 4\n\
                   beq $t2, $zero, end\n\
                   sll $t1, $t0, 2\n\
                   addiu $t0, $t0, 1\n\
                   j loop\n\
                   nop\n\
             end:  li $v0, 10\n\
                   syscall\n";

        let source = get_c_str(source_str);
        let mut program: *mut mips_exe::Program = null_mut();
        let mut error: *const c_char = null_mut();

        assert_eq!(
            mips_program_assemble(source.as_ptr(), &mut program, &mut error),
            MipsInteropResult::Ok
        );
        assert_ne!(program, null_mut());

        let cpu = mips_cpu_create();
        assert_eq!(mips_cpu_load_program(cpu, program), MipsInteropResult::Ok);
        mips_cpu_set_pc(cpu, mips_core::constants::TEXT_LOWER);

        let mut reason_tag: i32 = -1;
        let mut detail: u32 = 0;
        let mut exit_code: i64 = 0;
        let mut has_exit_code = false;
        mips_cpu_run(cpu, &mut reason_tag, &mut detail, &mut exit_code, &mut has_exit_code);

        assert_eq!(reason_tag, MipsExitReasonTag::StoppedExit as i32);
        assert!(has_exit_code);

        mips_program_destroy(program);
        mips_cpu_destroy(cpu);
    }
}

#[test]
fn assemble_with_error_reports_description() {
    unsafe {
        let source_str = ".text\nj nowhere\n";

        let source = get_c_str(source_str);
        let mut program: *mut mips_exe::Program = null_mut();
        let mut error: *const c_char = null_mut();

        assert_eq!(
            mips_program_assemble(source.as_ptr(), &mut program, &mut error),
            MipsInteropResult::AssemblerError
        );
        assert_eq!(program, null_mut());
        assert_ne!(error, null_mut());
        assert!(!CStr::from_ptr(error).to_str().unwrap().is_empty());
    }
}

#[test]
fn step_executes_one_instruction_at_a_time() {
    unsafe {
        let source_str = ".text\naddiu $t0, $zero, 1\naddiu $t0, $t0, 1\n";

        let source = get_c_str(source_str);
        let mut program: *mut mips_exe::Program = null_mut();
        let mut error: *const c_char = null_mut();

        assert_eq!(
            mips_program_assemble(source.as_ptr(), &mut program, &mut error),
            MipsInteropResult::Ok
        );

        let cpu = mips_cpu_create();
        mips_cpu_load_program(cpu, program);
        mips_cpu_set_pc(cpu, mips_core::constants::TEXT_LOWER);

        let mut stopped = true;
        let mut reason_tag: i32 = -1;
        let mut detail: u32 = 0;

        mips_cpu_step(cpu, &mut stopped, &mut reason_tag, &mut detail);
        assert!(!stopped);

        let mut value: i64 = 0;
        mips_cpu_get_register(cpu, GPR, 8, true, &mut value);
        assert_eq!(value, 1);

        mips_cpu_step(cpu, &mut stopped, &mut reason_tag, &mut detail);
        assert!(!stopped);
        mips_cpu_get_register(cpu, GPR, 8, true, &mut value);
        assert_eq!(value, 2);

        mips_program_destroy(program);
        mips_cpu_destroy(cpu);
    }
}

#[test]
fn mex_round_trip() {
    unsafe {
        let source = get_c_str(".text\naddiu $t0, $zero, 7\n");
        let mut program: *mut mips_exe::Program = null_mut();
        let mut error: *const c_char = null_mut();
        assert_eq!(
            mips_program_assemble(source.as_ptr(), &mut program, &mut error),
            MipsInteropResult::Ok
        );

        let mut buf = vec![0u8; 4096];
        let mut written: usize = 0;
        assert_eq!(
            mips_program_save_mex(program, buf.as_mut_ptr(), buf.len(), &mut written),
            MipsInteropResult::Ok
        );
        assert!(written > 0);

        let mut reloaded: *mut mips_exe::Program = null_mut();
        assert_eq!(
            mips_program_load_mex(buf.as_ptr(), written, &mut reloaded),
            MipsInteropResult::Ok
        );

        let mut text: *const u32 = null_mut();
        let mut text_len: usize = 0;
        mips_program_get_text(reloaded, &mut text, &mut text_len);
        assert!(text_len > 0);

        mips_program_destroy(program);
        mips_program_destroy(reloaded);
    }
}

#[test]
fn dump_data_segment_reflects_memory_writes() {
    unsafe {
        let mut cpu = Cpu::new();
        cpu.mem_write(mips_core::constants::DATA_LOWER, 0xAABBCCDD, 4, false)
            .unwrap();

        let name = get_c_str("User Data");
        let mut dump: *mut MemoryDump = null_mut();
        assert_eq!(
            mips_memory_dump_segment(&cpu, name.as_ptr(), &mut dump),
            MipsInteropResult::Ok
        );

        let mut data: *const u32 = null_mut();
        let mut data_len: usize = 0;
        mips_memory_dump_get_data(dump, &mut data, &mut data_len);
        assert!(data_len >= 2);

        let pairs = std::slice::from_raw_parts(data, data_len);
        assert!(pairs
            .chunks(2)
            .any(|p| p[0] == mips_core::constants::DATA_LOWER && p[1] == 0xAABBCCDD));

        mips_memory_dump_destroy(dump);
    }
}

#[test]
fn dump_segment_of_unknown_name_is_out_of_range() {
    unsafe {
        let cpu = Cpu::new();
        let name = get_c_str("Not A Segment");
        let mut dump: *mut MemoryDump = null_mut();
        assert_eq!(
            mips_memory_dump_segment(&cpu, name.as_ptr(), &mut dump),
            MipsInteropResult::OutOfRange
        );
    }
}

#[test]
fn gpr_register_names_match_abi_names() {
    unsafe {
        assert_eq!(mips_register_gpr_count(), 32);

        let mut name: *const c_char = null_mut();
        assert_eq!(mips_register_gpr_name(8, &mut name), MipsInteropResult::Ok);
        assert_eq!(CStr::from_ptr(name).to_str(), Ok("t0"));

        assert_eq!(mips_register_gpr_name(31, &mut name), MipsInteropResult::Ok);
        assert_eq!(CStr::from_ptr(name).to_str(), Ok("ra"));

        assert_eq!(
            mips_register_gpr_name(32, &mut name),
            MipsInteropResult::OutOfRange
        );
    }
}

#[test]
fn result_description_round_trips() {
    unsafe {
        let mut desc: *const c_char = null_mut();
        assert_eq!(
            mips_result_get_description(MipsInteropResult::Ok as i32, &mut desc),
            MipsInteropResult::Ok
        );
        assert_eq!(CStr::from_ptr(desc).to_str(), Ok("Ok"));

        assert_eq!(
            mips_result_get_description(999, &mut desc),
            MipsInteropResult::OutOfRange
        );
    }
}

#[test]
fn exit_reason_description_round_trips() {
    unsafe {
        let mut desc: *const c_char = null_mut();
        assert_eq!(
            mips_exit_reason_get_description(MipsExitReasonTag::StoppedExit as i32, &mut desc),
            MipsInteropResult::Ok
        );
        assert_eq!(CStr::from_ptr(desc).to_str(), Ok("StoppedExit"));
    }
}

#[test]
fn stop_handle_halts_run_with_exit_reason() {
    unsafe {
        let source = get_c_str(".text\nloop: j loop\nnop\n");
        let mut program: *mut mips_exe::Program = null_mut();
        let mut error: *const c_char = null_mut();
        mips_program_assemble(source.as_ptr(), &mut program, &mut error);

        let cpu = mips_cpu_create();
        mips_cpu_load_program(cpu, program);
        mips_cpu_set_pc(cpu, mips_core::constants::TEXT_LOWER);
        mips_cpu_set_config(cpu, false, 2);

        let mut reason_tag: i32 = -1;
        let mut detail: u32 = 0;
        let mut exit_code: i64 = 0;
        let mut has_exit_code = false;
        mips_cpu_run(cpu, &mut reason_tag, &mut detail, &mut exit_code, &mut has_exit_code);

        assert_eq!(reason_tag, MipsExitReasonTag::StoppedLoopLimitExceeded as i32);
        assert!(!has_exit_code);

        mips_program_destroy(program);
        mips_cpu_destroy(cpu);
    }
}
