//! A register enumerator (name, address, current value) for an embedding collaborator. GPR is
//! the bank an embedding IDE typically renders by name; exposing its count and names lets a
//! collaborator build a register view without hard-coding MIPS's 32 GPR names itself.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::OnceLock;

use crate::result::MipsInteropResult;

fn gpr_names() -> &'static [CString] {
    static NAMES: OnceLock<Vec<CString>> = OnceLock::new();
    NAMES.get_or_init(|| {
        mips_core::register_file::new_gpr_file()
            .iter()
            .map(|r| CString::new(r.primary_name()).expect("register name has no interior nul"))
            .collect()
    })
}

#[no_mangle]
pub unsafe extern "C" fn mips_register_gpr_count() -> u32 {
    32
}

#[no_mangle]
pub unsafe extern "C" fn mips_register_gpr_name(index: u32, name: *mut *const c_char) -> MipsInteropResult {
    match gpr_names().get(index as usize) {
        Some(cstr) => {
            *name = cstr.as_ptr();
            MipsInteropResult::Ok
        }
        None => MipsInteropResult::OutOfRange,
    }
}
