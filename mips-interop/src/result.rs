use mips_util::InteropGetName;
use mips_util_derive::InteropGetName;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::os::raw::c_char;

/// Every outcome an FFI entry point in this crate can return. `Ok` is always `0`; everything
/// else names a distinct failure a C caller can switch on without inspecting an error string.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, InteropGetName)]
pub enum MipsInteropResult {
    UnknownError = -1,
    Ok = 0,
    InvalidType = 1,
    Utf8Error = 2,
    AssemblerError = 3,
    OutOfRange = 4,
    ProgramLoadFailed = 5,
    ProgramSaveFailed = 6,
}

#[no_mangle]
pub unsafe extern "C" fn mips_result_get_description(
    result: i32,
    desc: *mut *const c_char,
) -> MipsInteropResult {
    match MipsInteropResult::from_i32(result) {
        Some(result) => {
            *desc = result.interop_name().as_ptr() as *const c_char;
            MipsInteropResult::Ok
        }
        None => MipsInteropResult::OutOfRange,
    }
}
