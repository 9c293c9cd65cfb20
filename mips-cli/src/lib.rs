//! The glue between `mips-asm`'s in-process assembler, `mips-core`'s execution engine, and
//! `mips-exe`'s on-disk `.mex` container — everything `main.rs`'s clap front end needs that
//! isn't itself argument parsing.

use mips_asm::error::AssembleError;
use mips_core::constants::{DATA_LOWER, TEXT_LOWER};
use mips_core::{Cpu, EngineConfig, ExitReason};
use mips_exe::{MexError, Program};
use std::path::Path;

#[derive(Debug)]
pub enum CliError {
    Assemble(AssembleError),
    Mex(MexError),
    Io(std::io::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CliError::Assemble(e) => write!(f, "{}", e),
            CliError::Mex(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<AssembleError> for CliError {
    fn from(e: AssembleError) -> Self {
        CliError::Assemble(e)
    }
}

impl From<MexError> for CliError {
    fn from(e: MexError) -> Self {
        CliError::Mex(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

/// Assembles `path` into a fresh [`Cpu`] configured with `config` and runs it to completion.
pub fn run_source(path: &Path, config: EngineConfig) -> Result<(ExitReason, Option<i64>), CliError> {
    let mut cpu = Cpu::new();
    cpu.config = config;
    mips_asm::assemble_file(&mut cpu, path)?;
    Ok(cpu.run())
}

/// Loads a previously-assembled `.mex` file into a fresh [`Cpu`] and runs it to completion.
pub fn run_mex(path: &Path, config: EngineConfig) -> Result<(ExitReason, Option<i64>), CliError> {
    let mut cpu = Cpu::new();
    cpu.config = config;
    let program = mips_exe::read_file(path)?;
    load_program(&mut cpu, &program)?;
    Ok(cpu.run())
}

/// Assembles `path` and writes the result as a `.mex` file at `out_path`, without running it —
/// the `mips-asm` standalone assembler's `-o` behavior.
pub fn assemble_to_mex(path: &Path, out_path: &Path) -> Result<(), CliError> {
    let mut cpu = Cpu::new();
    mips_asm::assemble_file(&mut cpu, path)?;
    let program = program_from_cpu(&cpu);
    mips_exe::write_file(out_path, &program)?;
    Ok(())
}

/// Dumps the user data and user text segments of an already-assembled `Cpu` into a
/// [`Program`] container, trimming each to the highest address actually written so an empty
/// program serializes to a handful of header bytes rather than the full fixed segment range.
fn program_from_cpu(cpu: &Cpu) -> Program {
    let data_words = cpu.memory.dump_segment("User Data").unwrap_or_default();
    let data = trim_to_highest_nonzero(&data_words, DATA_LOWER, 4);

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

fn trim_to_highest_nonzero(words: &[(u32, u32)], base: u32, unit: u32) -> Vec<u8> {
    let highest = words.iter().filter(|&&(_, w)| w != 0).map(|&(a, _)| a).max();
    let len = match highest {
        Some(addr) => (addr - base) as usize + unit as usize,
        None => 0,
    };
    let mut bytes = vec![0u8; len];
    for &(addr, word) in words {
        let offset = (addr - base) as usize;
        if offset + 4 <= bytes.len() {
            bytes[offset..offset + 4].copy_from_slice(&word.to_be_bytes());
        }
    }
    bytes
}

/// Loads a [`Program`]'s data bytes and text words into `cpu`'s memory, decoding each raw word
/// back into the [`mips_core::isa::Instruction`] it was assembled from.
fn load_program(cpu: &mut Cpu, program: &Program) -> Result<(), CliError> {
    for (i, &byte) in program.data().iter().enumerate() {
        cpu.mem_write(DATA_LOWER + i as u32, byte as u64, 1, false)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "data segment too large"))?;
    }
    for (i, &word) in program.text().iter().enumerate() {
        let addr = TEXT_LOWER + (i as u32) * 4;
        let (instruction, operands) = cpu.isa().decode(word).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, format!("word 0x{:08x} at 0x{:08x} does not decode to a known instruction", word, addr))
        })?;
        cpu.memory
            .write_instruction(addr, mips_core::isa::DecodedInstruction { instruction, operands })
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "text segment too large"))?;
    }
    Ok(())
}

#[cfg(test)]
mod test;
