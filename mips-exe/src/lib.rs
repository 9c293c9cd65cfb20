//! The assembled-program container and its on-disk ".mex" serialization. `mips-asm` hands
//! `assemble` output here as plain encoded words and data bytes rather than its own richer
//! `Statement`/`Token` types, keeping this container decoupled from the assembler's grammar
//! types.
//!
//! File layout (big-endian, matching the engine's own word composition in `mips-core`):
//! `magic: u32 | entry_point: u32 | data_len: u32 | data: [u8; data_len] | text: [u8; ..]`.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;

const MAGIC: u32 = 0x4D45_5831; // "MEX1"

#[derive(Debug)]
pub enum MexError {
    Io(std::io::Error),
    BadMagic(u32),
}

impl std::fmt::Display for MexError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MexError::Io(e) => write!(f, "i/o error: {}", e),
            MexError::BadMagic(found) => write!(f, "not a .mex file (magic 0x{:08x})", found),
        }
    }
}

impl std::error::Error for MexError {}

impl From<std::io::Error> for MexError {
    fn from(e: std::io::Error) -> Self {
        MexError::Io(e)
    }
}

/// An assembled program ready to load into a [`mips_core`]-style engine: the user data segment's
/// initial bytes, the user text segment's encoded instruction words, and the address `run`
/// should set `PC` to before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    data: Vec<u8>,
    text: Vec<u32>,
    entry_point: u32,
}

impl Program {
    pub fn new(data: Vec<u8>, text: Vec<u32>, entry_point: u32) -> Program {
        Program { data, text, entry_point }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn text(&self) -> &[u32] {
        &self.text
    }

    pub fn entry_point(&self) -> u32 {
        self.entry_point
    }
}

pub fn read<R: Read>(reader: &mut R) -> Result<Program, MexError> {
    let magic = reader.read_u32::<BigEndian>()?;
    if magic != MAGIC {
        return Err(MexError::BadMagic(magic));
    }
    let entry_point = reader.read_u32::<BigEndian>()?;
    let data_len = reader.read_u32::<BigEndian>()?;
    let mut data = vec![0u8; data_len as usize];
    reader.read_exact(&mut data)?;

    let mut text = Vec::new();
    loop {
        match reader.read_u32::<BigEndian>() {
            Ok(word) => text.push(word),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }

    log::trace!("read .mex program: {} data bytes, {} text words", data.len(), text.len());
    Ok(Program::new(data, text, entry_point))
}

pub fn write<W: Write>(writer: &mut W, program: &Program) -> Result<(), MexError> {
    writer.write_u32::<BigEndian>(MAGIC)?;
    writer.write_u32::<BigEndian>(program.entry_point)?;
    writer.write_u32::<BigEndian>(program.data.len() as u32)?;
    writer.write_all(&program.data)?;
    for word in &program.text {
        writer.write_u32::<BigEndian>(*word)?;
    }
    log::trace!("wrote .mex program: {} data bytes, {} text words", program.data.len(), program.text.len());
    Ok(())
}

pub trait ReadMexExt: Read + Sized {
    fn read_mex(&mut self) -> Result<Program, MexError> {
        read(self)
    }
}

impl<R: Read + Sized> ReadMexExt for R {}

pub trait WriteMexExt: Write + Sized {
    fn write_mex(&mut self, program: &Program) -> Result<(), MexError> {
        write(self, program)
    }
}

impl<W: Write + Sized> WriteMexExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Program, MexError> {
    BufReader::new(File::open(path)?).read_mex()
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), MexError> {
    BufWriter::new(File::create(path)?).write_mex(program)
}

#[cfg(test)]
mod test;
