use std::{error::Error, fmt};

/// Runtime CPU exceptions, raised by instruction executors and handled by the engine
///. Distinct from assembly-time errors in `mips-asm`, which never occur during
/// execution.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum MipsException {
    AddressLoad(u32),
    AddressStore(u32),
    ArithmeticOverflow,
    DivideByZero,
    ReservedInstruction,
    Syscall(u32),
    Break,
    Trap,
}

impl fmt::Display for MipsException {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MipsException::AddressLoad(addr) => write!(f, "address error on load at 0x{:08x}", addr),
            MipsException::AddressStore(addr) => write!(f, "address error on store at 0x{:08x}", addr),
            MipsException::ArithmeticOverflow => write!(f, "arithmetic overflow"),
            MipsException::DivideByZero => write!(f, "divide by zero"),
            MipsException::ReservedInstruction => write!(f, "reserved instruction"),
            MipsException::Syscall(code) => write!(f, "syscall {}", code),
            MipsException::Break => write!(f, "break"),
            MipsException::Trap => write!(f, "trap"),
        }
    }
}

impl Error for MipsException {}

impl MipsException {
    /// The MIPS32 `Cause.ExcCode` value for this exception (original source:
    /// `MIPSExceptionCodes`).
    pub fn code(&self) -> u32 {
        match self {
            MipsException::AddressLoad(_) => 4,
            MipsException::AddressStore(_) => 5,
            MipsException::Syscall(_) => 8,
            MipsException::Break => 9,
            MipsException::ReservedInstruction => 10,
            MipsException::ArithmeticOverflow => 12,
            MipsException::Trap => 13,
            MipsException::DivideByZero => 15,
        }
    }

    /// Faulting address, for the two address-error variants only.
    pub fn faulting_address(&self) -> Option<u32> {
        match self {
            MipsException::AddressLoad(addr) | MipsException::AddressStore(addr) => Some(*addr),
            _ => None,
        }
    }
}

/// Why the engine stopped running a program. The CPU never panics: every error
/// path reduces to one of these tags plus an optional integer exit code.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ExitReason {
    /// PC ran past the last instruction in its segment.
    ProgramDroppedOff(u32),
    /// A `MipsException` propagated out without a kernel handler to service it.
    ProgramCrashed(MipsException),
    /// A `break`, a `trap`, an unrecognized syscall, or a configured exit syscall.
    ProgramStopped(StopReason),
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum StopReason {
    Break,
    Trap,
    /// An `exit`/`exit with value` syscall, carrying the process exit code (0 for
    /// syscall 10, `$a0` for syscall 17).
    Exit(i64),
    InvalidSyscall(u32),
    LoopLimitExceeded(u32),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExitReason::ProgramDroppedOff(addr) => {
                write!(f, "program dropped off the end at 0x{:08x}", addr)
            }
            ExitReason::ProgramCrashed(e) => write!(f, "program crashed: {}", e),
            ExitReason::ProgramStopped(r) => write!(f, "program stopped: {:?}", r),
        }
    }
}

impl Error for ExitReason {}
