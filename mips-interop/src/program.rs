//! Assembles MIPS32 source from a C string into a [`mips_exe::Program`] and serializes it
//! to/from the `.mex` wire format. This mirrors `mips-cli`'s own assemble-then-serialize path,
//! kept separate here because an embedding IDE needs the result as an in-memory byte buffer it
//! owns, not a file on disk.

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::slice;

use mips_core::constants::{DATA_LOWER, TEXT_LOWER};
use mips_core::isa::DecodedInstruction;
use mips_core::Cpu;
use mips_exe::{MexError, Program};

use crate::result::MipsInteropResult;
use crate::util::{destroy, into_ptr};

thread_local! {
    static LAST_ERROR: Cell<CString> = Cell::new(Default::default());
}

fn program_from_cpu(cpu: &Cpu) -> Program {
    let data_words = cpu.memory.dump_segment("User Data").unwrap_or_default();
    let highest_data = data_words.iter().filter(|&&(_, w)| w != 0).map(|&(a, _)| a).max();
    let mut data = vec![0u8; highest_data.map(|a| (a - DATA_LOWER) as usize + 4).unwrap_or(0)];
    for (addr, word) in &data_words {
        let offset = (addr - DATA_LOWER) as usize;
        if offset + 4 <= data.len() {
            data[offset..offset + 4].copy_from_slice(&word.to_be_bytes());
        }
    }

    let text_words = cpu.memory.dump_text("User Text").unwrap_or_default();
    let mut text = Vec::new();
    for (addr, word) in &text_words {
        let index = ((addr - TEXT_LOWER) / 4) as usize;
        if text.len() <= index {
            text.resize(index + 1, 0);
        }
        text[index] = *word;
    }

    Program::new(data, text, TEXT_LOWER)
}

/// Assembles `source` (a NUL-terminated C string) into a fresh [`Program`], returning an
/// `AssemblerError` result and, if `error` is non-null, a thread-local description of what went
/// wrong — rendered the way `AssembleError`'s own `Display` impl already formats it, source
/// location included.
#[no_mangle]
pub unsafe extern "C" fn mips_program_assemble(source: *const c_char, program: *mut *mut Program, error: *mut *const c_char) -> MipsInteropResult {
    let src = match CStr::from_ptr(source).to_str() {
        Ok(s) => s,
        Err(_) => return MipsInteropResult::Utf8Error,
    };

    let mut cpu = Cpu::new();
    match mips_asm::assemble_str(&mut cpu, "<embedded>", src) {
        Ok(_) => {
            *program = into_ptr(program_from_cpu(&cpu));
            MipsInteropResult::Ok
        }
        Err(err) => {
            if !error.is_null() {
                LAST_ERROR.with(|f| {
                    let err_str = CString::new(format!("{}", err)).unwrap_or_default();
                    *error = err_str.as_ptr();
                    f.set(err_str);
                });
            }
            MipsInteropResult::AssemblerError
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn mips_program_load_mex(mex_data: *const u8, mex_data_len: usize, program: *mut *mut Program) -> MipsInteropResult {
    let mut reader = slice::from_raw_parts(mex_data, mex_data_len);
    match mips_exe::read(&mut reader) {
        Ok(p) => {
            *program = into_ptr(p);
            MipsInteropResult::Ok
        }
        Err(MexError::Io(_)) | Err(MexError::BadMagic(_)) => MipsInteropResult::ProgramLoadFailed,
    }
}

#[no_mangle]
pub unsafe extern "C" fn mips_program_save_mex(program: *const Program, mex_data: *mut u8, mex_data_len: usize, written: *mut usize) -> MipsInteropResult {
    let mut buf = Vec::new();
    if mips_exe::write(&mut buf, &*program).is_err() {
        return MipsInteropResult::ProgramSaveFailed;
    }
    if buf.len() > mex_data_len {
        return MipsInteropResult::ProgramSaveFailed;
    }
    std::ptr::copy_nonoverlapping(buf.as_ptr(), mex_data, buf.len());
    *written = buf.len();
    MipsInteropResult::Ok
}

#[no_mangle]
pub unsafe extern "C" fn mips_program_get_data(program: *const Program, data: *mut *const u8, data_len: *mut usize) {
    let bytes = (*program).data();
    *data = bytes.as_ptr();
    *data_len = bytes.len();
}

#[no_mangle]
pub unsafe extern "C" fn mips_program_get_text(program: *const Program, text: *mut *const u32, text_len: *mut usize) {
    let words = (*program).text();
    *text = words.as_ptr();
    *text_len = words.len();
}

#[no_mangle]
pub unsafe extern "C" fn mips_program_get_entry_point(program: *const Program) -> u32 {
    (*program).entry_point()
}

#[no_mangle]
pub unsafe extern "C" fn mips_program_destroy(program: *mut Program) {
    destroy(program);
}

/// Loads `program`'s data and text into a fresh [`Cpu`] the way `mips-cli run_mex` does,
/// decoding each raw word back into the registered instruction it was assembled from.
#[no_mangle]
pub unsafe extern "C" fn mips_cpu_load_program(cpu: *mut Cpu, program: *const Program) -> MipsInteropResult {
    let cpu = &mut *cpu;
    let program = &*program;
    for (i, &byte) in program.data().iter().enumerate() {
        if cpu.mem_write(DATA_LOWER + i as u32, byte as u64, 1, false).is_err() {
            return MipsInteropResult::ProgramLoadFailed;
        }
    }
    for (i, &word) in program.text().iter().enumerate() {
        let addr = TEXT_LOWER + (i as u32) * 4;
        let (instruction, operands) = match cpu.isa().decode(word) {
            Some(pair) => pair,
            None => return MipsInteropResult::ProgramLoadFailed,
        };
        if cpu
            .memory
            .write_instruction(addr, DecodedInstruction { instruction, operands })
            .is_err()
        {
            return MipsInteropResult::ProgramLoadFailed;
        }
    }
    MipsInteropResult::Ok
}
