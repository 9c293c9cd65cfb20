//! FFI surface over [`mips_core::Cpu`]: lifecycle, register access, single-step/run, the
//! external stop handle, and the fetch/write observer callback lists a collaborator can attach.

use std::ffi::c_void;
use std::sync::atomic::Ordering;

use mips_core::register_file::RegisterFile;
use mips_core::Cpu;

use crate::exit_reason::tag_and_detail;
use crate::result::MipsInteropResult;
use crate::util::{destroy, into_ptr};

/// Which of a [`Cpu`]'s three named register files an address is resolved against: GPR, FPR and
/// CP0 are distinct files, not one flat address space.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MipsRegisterBank {
    Gpr = 0,
    Fpr = 1,
    Cp0 = 2,
}

/// `bank` is a [`MipsRegisterBank`] value, taken as a raw `i32` across the FFI boundary.
fn bank_of(cpu: &Cpu, bank: i32) -> Option<&RegisterFile> {
    match bank {
        0 => Some(&cpu.gpr),
        1 => Some(&cpu.fpr),
        2 => Some(&cpu.cp0),
        _ => None,
    }
}

fn bank_of_mut(cpu: &mut Cpu, bank: i32) -> Option<&mut RegisterFile> {
    match bank {
        0 => Some(&mut cpu.gpr),
        1 => Some(&mut cpu.fpr),
        2 => Some(&mut cpu.cp0),
        _ => None,
    }
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_create() -> *mut Cpu {
    into_ptr(Cpu::new())
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_destroy(cpu: *mut Cpu) {
    destroy(cpu);
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_get_register(cpu: *const Cpu, bank: i32, address: u32, signed: bool, value: *mut i64) -> MipsInteropResult {
    match bank_of(&*cpu, bank) {
        Some(file) => {
            *value = file.read_integer(address, signed) as i64;
            MipsInteropResult::Ok
        }
        None => MipsInteropResult::OutOfRange,
    }
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_set_register(cpu: *mut Cpu, bank: i32, address: u32, value: i64) -> MipsInteropResult {
    match bank_of_mut(&mut *cpu, bank) {
        Some(file) => {
            file.write_integer(address, value as u64);
            MipsInteropResult::Ok
        }
        None => MipsInteropResult::OutOfRange,
    }
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_get_pc(cpu: *const Cpu) -> u32 {
    (*cpu).pc
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_set_pc(cpu: *mut Cpu, pc: u32) {
    (*cpu).pc = pc;
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_set_config(cpu: *mut Cpu, delay_slots: bool, loop_limit: u32) {
    (*cpu).config = mips_core::EngineConfig { delay_slots, loop_limit };
}

/// Flips the engine's external stop flag; the engine observes it at its next fetch.
#[no_mangle]
pub unsafe extern "C" fn mips_cpu_request_stop(cpu: *const Cpu) {
    (*cpu).stop_handle().store(true, Ordering::Relaxed);
}

/// Runs `cpu` to completion. `exit_code` is only meaningful when `has_exit_code` comes back
/// `true`.
#[no_mangle]
pub unsafe extern "C" fn mips_cpu_run(cpu: *mut Cpu, reason_tag: *mut i32, detail: *mut u32, exit_code: *mut i64, has_exit_code: *mut bool) {
    let (reason, code) = (*cpu).run();
    let (tag, det) = tag_and_detail(&reason);
    *reason_tag = tag as i32;
    *detail = det;
    match code {
        Some(c) => {
            *exit_code = c;
            *has_exit_code = true;
        }
        None => {
            *exit_code = 0;
            *has_exit_code = false;
        }
    }
}

/// Executes exactly one fetch/decode/dispatch cycle, for an embedding debugger stepping through
/// a program one instruction at a time. `stopped` comes back `true` only once the engine has
/// terminated; `reason_tag`/`detail` are only meaningful then.
#[no_mangle]
pub unsafe extern "C" fn mips_cpu_step(cpu: *mut Cpu, stopped: *mut bool, reason_tag: *mut i32, detail: *mut u32) {
    match (*cpu).step() {
        Ok(()) => *stopped = false,
        Err(reason) => {
            let (tag, det) = tag_and_detail(&reason);
            *stopped = true;
            *reason_tag = tag as i32;
            *detail = det;
        }
    }
}

pub type FetchCallback = extern "C" fn(address: u32, user_data: *mut c_void);
pub type WriteCallback = extern "C" fn(address: u32, bytes: *const u8, word: u32, user_data: *mut c_void);

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_on_fetch(cpu: *mut Cpu, callback: FetchCallback, user_data: *mut c_void) {
    let user_data = user_data as usize;
    (*cpu).on_fetch(move |addr| callback(addr, user_data as *mut c_void));
}

#[no_mangle]
pub unsafe extern "C" fn mips_cpu_on_memory_write(cpu: *mut Cpu, callback: WriteCallback, user_data: *mut c_void) {
    let user_data = user_data as usize;
    (*cpu).on_memory_write(move |addr, bytes, word| callback(addr, bytes.as_ptr(), word, user_data as *mut c_void));
}
