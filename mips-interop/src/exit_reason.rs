//! Flattens [`mips_core::ExitReason`] (which carries payload data Rust FFI can't hand across an
//! enum discriminant alone) into a fieldless tag plus a `u32` detail a C caller can switch on.

use mips_core::{ExitReason, MipsException, StopReason};
use mips_util::InteropGetName;
use mips_util_derive::InteropGetName;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::os::raw::c_char;

use crate::result::MipsInteropResult;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, InteropGetName)]
pub enum MipsExitReasonTag {
    ProgramDroppedOff,
    CrashedAddressLoad,
    CrashedAddressStore,
    CrashedArithmeticOverflow,
    CrashedDivideByZero,
    CrashedReservedInstruction,
    StoppedBreak,
    StoppedTrap,
    StoppedExit,
    StoppedInvalidSyscall,
    StoppedLoopLimitExceeded,
}

/// `detail` is the faulting/looping address for the variants that carry one, the invalid
/// syscall code for `StoppedInvalidSyscall`, the process exit code (truncated to `u32`) for
/// `StoppedExit`, and `0` otherwise.
pub fn tag_and_detail(reason: &ExitReason) -> (MipsExitReasonTag, u32) {
    match reason {
        ExitReason::ProgramDroppedOff(addr) => (MipsExitReasonTag::ProgramDroppedOff, *addr),
        ExitReason::ProgramCrashed(MipsException::AddressLoad(addr)) => (MipsExitReasonTag::CrashedAddressLoad, *addr),
        ExitReason::ProgramCrashed(MipsException::AddressStore(addr)) => (MipsExitReasonTag::CrashedAddressStore, *addr),
        ExitReason::ProgramCrashed(MipsException::ArithmeticOverflow) => (MipsExitReasonTag::CrashedArithmeticOverflow, 0),
        ExitReason::ProgramCrashed(MipsException::DivideByZero) => (MipsExitReasonTag::CrashedDivideByZero, 0),
        ExitReason::ProgramCrashed(MipsException::ReservedInstruction) => (MipsExitReasonTag::CrashedReservedInstruction, 0),
        ExitReason::ProgramCrashed(_) => (MipsExitReasonTag::CrashedReservedInstruction, 0),
        ExitReason::ProgramStopped(StopReason::Break) => (MipsExitReasonTag::StoppedBreak, 0),
        ExitReason::ProgramStopped(StopReason::Trap) => (MipsExitReasonTag::StoppedTrap, 0),
        ExitReason::ProgramStopped(StopReason::Exit(code)) => (MipsExitReasonTag::StoppedExit, *code as u32),
        ExitReason::ProgramStopped(StopReason::InvalidSyscall(code)) => (MipsExitReasonTag::StoppedInvalidSyscall, *code),
        ExitReason::ProgramStopped(StopReason::LoopLimitExceeded(addr)) => (MipsExitReasonTag::StoppedLoopLimitExceeded, *addr),
    }
}

#[no_mangle]
pub unsafe extern "C" fn mips_exit_reason_get_description(tag: i32, desc: *mut *const c_char) -> MipsInteropResult {
    match MipsExitReasonTag::from_i32(tag) {
        Some(tag) => {
            *desc = tag.interop_name().as_ptr() as *const c_char;
            MipsInteropResult::Ok
        }
        None => MipsInteropResult::OutOfRange,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn drop_off_detail_is_the_faulting_address() {
        let (tag, detail) = tag_and_detail(&ExitReason::ProgramDroppedOff(0x0040_0100));
        assert_eq!(tag, MipsExitReasonTag::ProgramDroppedOff);
        assert_eq!(detail, 0x0040_0100);
    }

    #[test]
    fn invalid_syscall_detail_is_the_code() {
        let (tag, detail) = tag_and_detail(&ExitReason::ProgramStopped(StopReason::InvalidSyscall(42)));
        assert_eq!(tag, MipsExitReasonTag::StoppedInvalidSyscall);
        assert_eq!(detail, 42);
    }
}
