use crate::constants::*;
use crate::exception::{ExitReason, MipsException, StopReason};
use crate::isa::{DecodedInstruction, Family, Isa};
use crate::memory::MipsMemory;
use crate::register_file::{new_cp0_file, new_fpr_file, new_gpr_file, RegisterFile};
use crate::segment::AccessLevel;
use crate::syscall::{self, MipsIo};
use std::collections::HashMap;

/// Engine configuration passed to [`Cpu::run`].
///
/// Persisting this to disk is an excluded, IDE-side concern; this is purely an
/// in-process value a caller constructs and hands to the engine.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Whether delayed branches/jumps execute the instruction in their delay slot before the
    /// control transfer commits. Defaults to `false`.
    pub delay_slots: bool,
    /// How many times the engine tolerates re-fetching the same address before concluding the
    /// program is stuck in a runaway loop.
    pub loop_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            delay_slots: false,
            loop_limit: DEFAULT_LOOP_LIMIT,
        }
    }
}

/// The four bytes of a word-aligned memory write, as delivered to a write observer.
pub type WriteObserver = Box<dyn FnMut(u32, [u8; 4], u32)>;
pub type FetchObserver = Box<dyn FnMut(u32)>;

/// Owns every piece of CPU-visible state: register files, the segmented memory, the program
/// counter, and the callback lists an embedding collaborator (the excluded IDE) subscribes to.
pub struct Cpu {
    pub gpr: RegisterFile,
    pub fpr: RegisterFile,
    pub cp0: RegisterFile,
    pub pc: u32,
    pub memory: MipsMemory<DecodedInstruction>,
    pub config: EngineConfig,
    pub io: Box<dyn MipsIo>,

    isa: Isa,
    visit_counts: HashMap<u32, u32>,
    on_write: Vec<WriteObserver>,
    on_fetch: Vec<FetchObserver>,
    stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl Cpu {
    pub fn new() -> Self {
        let mut gpr = new_gpr_file();
        gpr.write_integer(gpr.index_of_name("gp").unwrap(), DEFAULT_GP as u64);
        gpr.write_integer(gpr.index_of_name("sp").unwrap(), DEFAULT_SP as u64);

        Cpu {
            gpr,
            fpr: new_fpr_file(),
            cp0: new_cp0_file(),
            pc: TEXT_LOWER,
            memory: MipsMemory::new(),
            config: EngineConfig::default(),
            io: Box::new(syscall::StdIo),
            isa: Isa::new(),
            visit_counts: HashMap::new(),
            on_write: Vec::new(),
            on_fetch: Vec::new(),
            stop: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn isa(&self) -> &Isa {
        &self.isa
    }

    pub fn on_memory_write<F: FnMut(u32, [u8; 4], u32) + 'static>(&mut self, f: F) {
        self.on_write.push(Box::new(f));
    }

    pub fn on_fetch<F: FnMut(u32) + 'static>(&mut self, f: F) {
        self.on_fetch.push(Box::new(f));
    }

    /// A handle the caller can flip from another thread to ask the engine to stop at its next
    /// fetch.
    pub fn stop_handle(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.stop.clone()
    }

    /// Whether `pc` currently sits in a kernel-privileged text segment.
    pub fn requester_level(&self) -> AccessLevel {
        if (KTEXT_LOWER..=KTEXT_UPPER).contains(&self.pc) {
            AccessLevel::Kernel
        } else {
            AccessLevel::User
        }
    }

    /// Reads `n` bytes at `addr`, honoring the current privilege level, and notifies no
    /// observers (reads are not observable — only writes are).
    pub fn mem_read(&self, addr: u32, n: u32, signed: bool, downward: bool) -> Result<i64, MipsException> {
        self.memory.read_bytes(addr, n, signed, downward, self.requester_level())
    }

    /// Writes `n` bytes of `value` at `addr`, then fires every registered write observer with
    /// the word boundary containing the write, its four post-write bytes, and the composed word.
    pub fn mem_write(&mut self, addr: u32, value: u64, n: u32, downward: bool) -> Result<(), MipsException> {
        self.memory
            .write_bytes(addr, value, n, downward, self.requester_level())?;
        self.notify_write(addr);
        Ok(())
    }

    fn notify_write(&mut self, addr: u32) {
        if self.on_write.is_empty() {
            return;
        }
        let boundary = addr & !0x3;
        let mut bytes = [0u8; 4];
        let mut word: u32 = 0;
        for i in 0..4 {
            let b = self
                .memory
                .read_bytes(boundary + i, 1, false, false, AccessLevel::All)
                .unwrap_or(0) as u8;
            bytes[i as usize] = b;
            word = (word << 8) | b as u32;
        }
        log::debug!("memory write observed at 0x{:08x} -> 0x{:08x}", boundary, word);
        for cb in self.on_write.iter_mut() {
            cb(boundary, bytes, word);
        }
    }

    /// Sets `$cause`/`$exceptionpc`/`$badvaddr` and, if a kernel-text handler has been assembled
    /// at the kernel-text base, transfers control there. Returns `true` if control was
    /// transferred.
    fn dispatch_to_handler(&mut self, exc: MipsException, faulting_pc: u32) -> bool {
        let cause = self.cp0.index_of_name("cause").unwrap();
        self.cp0.write_integer(cause, exc.code() as u64);
        let epc = self.cp0.index_of_name("exceptionpc").unwrap();
        self.cp0.write_integer(epc, faulting_pc as u64);
        if let Some(addr) = exc.faulting_address() {
            let badvaddr = self.cp0.index_of_name("badvaddr").unwrap();
            self.cp0.write_integer(badvaddr, addr as u64);
        }
        if self.memory.read_instruction(KTEXT_LOWER).is_some() {
            self.pc = KTEXT_LOWER;
            true
        } else {
            false
        }
    }

    /// Executes one fetch/decode/dispatch cycle at `pc`, honoring delay slots.
    /// `in_delay_slot` is `true` only for the recursive call used to execute a delayed
    /// instruction's delay slot.
    fn step_at(&mut self, pc: u32, in_delay_slot: bool) -> Result<(), ExitReason> {
        for cb in self.on_fetch.iter_mut() {
            cb(pc);
        }
        log::trace!("fetch at 0x{:08x}{}", pc, if in_delay_slot { " (delay slot)" } else { "" });

        let decoded = match self.memory.read_instruction(pc) {
            Some(d) => *d,
            None => {
                if in_delay_slot {
                    // A drop-off inside a delay slot is a no-op.
                    return Ok(());
                }
                return Err(ExitReason::ProgramDroppedOff(pc));
            }
        };

        if !in_delay_slot {
            let count = self.visit_counts.entry(pc).or_insert(0);
            *count += 1;
            if *count > self.config.loop_limit {
                return Err(ExitReason::ProgramStopped(StopReason::LoopLimitExceeded(pc)));
            }
        }

        if in_delay_slot && decoded.instruction.is_control_transfer {
            return Err(ExitReason::ProgramCrashed(MipsException::ReservedInstruction));
        }

        let instr = decoded.instruction;
        let branch_target = match (instr.execute)(self, decoded.operands, pc) {
            Ok(target) => target,
            Err(exc) => return self.handle_exception(exc, pc),
        };

        // A delay slot always executes once delay-slot mode is on, whether or not the branch
        // that owns it is taken; a drop-off inside it is
        // absorbed as a no-op.
        let mut delay_slot_ran = false;
        if !in_delay_slot && instr.has_delay_slot && self.config.delay_slots {
            self.step_at(pc.wrapping_add(4), true)?;
            delay_slot_ran = true;
        }

        // `branch_target`, when present, already accounts for the delay slot; a plain
        // fall-through additionally skips the delay slot word when one was executed.
        self.pc = match branch_target {
            Some(target) => target,
            None => pc.wrapping_add(if delay_slot_ran { 8 } else { 4 }),
        };
        Ok(())
    }

    fn handle_exception(&mut self, exc: MipsException, pc: u32) -> Result<(), ExitReason> {
        match exc {
            MipsException::Syscall(code) => match syscall::dispatch(self, code) {
                Ok(syscall::SyscallOutcome::Continue) => {
                    self.pc = self.pc.wrapping_add(4);
                    Ok(())
                }
                Ok(syscall::SyscallOutcome::Exit(code)) => {
                    Err(ExitReason::ProgramStopped(StopReason::Exit(code)))
                }
                Err(invalid_code) => {
                    Err(ExitReason::ProgramStopped(StopReason::InvalidSyscall(invalid_code)))
                }
            },
            MipsException::Break => Err(ExitReason::ProgramStopped(StopReason::Break)),
            MipsException::Trap => Err(ExitReason::ProgramStopped(StopReason::Trap)),
            MipsException::ReservedInstruction => Err(ExitReason::ProgramCrashed(exc)),
            other => {
                if self.dispatch_to_handler(other, pc) {
                    Ok(())
                } else {
                    Err(ExitReason::ProgramCrashed(other))
                }
            }
        }
    }

    /// Runs until the engine terminates, returning the reason plus, when available, the exit
    /// code carried by an exit syscall's `StopReason::Exit`.
    pub fn run(&mut self) -> (ExitReason, Option<i64>) {
        self.pc = TEXT_LOWER;
        self.visit_counts.clear();
        loop {
            match self.step() {
                Ok(()) => continue,
                Err(reason) => {
                    let exit_code = match &reason {
                        ExitReason::ProgramStopped(StopReason::Exit(code)) => Some(*code),
                        _ => None,
                    };
                    return (reason, exit_code);
                }
            }
        }
    }

    /// Executes exactly one fetch/decode/dispatch cycle at the current `PC` without resetting
    /// engine state first, for an embedding collaborator that wants to single-step a program
    /// rather than run it to completion via [`run`](Self::run).
    pub fn step(&mut self) -> Result<(), ExitReason> {
        if self.stop.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(ExitReason::ProgramStopped(StopReason::Exit(0)));
        }
        let pc = self.pc;
        self.step_at(pc, false)
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test;
