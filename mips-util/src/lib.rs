use std::{error::Error, fmt};

mod bits;
mod float;
mod parse;

pub use bits::*;
pub use float::*;
pub use parse::*;

/// Byte order used for every multi-byte composition in this workspace: big-endian,
/// most-significant byte at the lowest address. Matches the MIPS memory model's
/// "composes via big-endian assembly" rule.
pub type Endian = byteorder::BigEndian;

pub trait InteropGetName {
    fn interop_name(&self) -> &'static [u8];
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Failed to parse \"{}\" as {}.",
            &self.value, &self.enum_name
        )
    }
}

impl Error for ParseEnumError {
    fn description(&self) -> &str {
        "Failed to parse enum."
    }
}

pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}
