//! Assembly-time error and warning types. Every variant carries
//! the offending token's [`SourceLocation`] so a caller can render a `file(line,col): message`
//! diagnostic without re-walking the token stream.

use crate::token::{SourceLocation, TokenType};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum AssembleError {
    SyntaxError { location: SourceLocation, summary: String },
    UnexpectedToken { location: SourceLocation, got: TokenType, expected: &'static str },
    InvalidSegment { location: SourceLocation, directive: String },
    SymbolAlreadyExists { location: SourceLocation, name: String },
    SymbolDoesNotExist { location: SourceLocation, name: String },
    IncludeError { location: SourceLocation, reason: String },
}

impl AssembleError {
    pub fn location(&self) -> &SourceLocation {
        match self {
            AssembleError::SyntaxError { location, .. }
            | AssembleError::UnexpectedToken { location, .. }
            | AssembleError::InvalidSegment { location, .. }
            | AssembleError::SymbolAlreadyExists { location, .. }
            | AssembleError::SymbolDoesNotExist { location, .. }
            | AssembleError::IncludeError { location, .. } => location,
        }
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssembleError::SyntaxError { location, summary } => {
                write!(f, "{}: syntax error: {}", location, summary)
            }
            AssembleError::UnexpectedToken { location, got, expected } => {
                write!(f, "{}: expected {}, got {:?}", location, expected, got)
            }
            AssembleError::InvalidSegment { location, directive } => {
                write!(f, "{}: `{}` is not valid in the current segment", location, directive)
            }
            AssembleError::SymbolAlreadyExists { location, name } => {
                write!(f, "{}: symbol `{}` already exists", location, name)
            }
            AssembleError::SymbolDoesNotExist { location, name } => {
                write!(f, "{}: symbol `{}` does not exist", location, name)
            }
            AssembleError::IncludeError { location, reason } => {
                write!(f, "{}: include failed: {}", location, reason)
            }
        }
    }
}

impl std::error::Error for AssembleError {}

#[derive(Clone, Debug, PartialEq)]
pub struct AssembleWarning {
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for AssembleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: warning: {}", self.location, self.message)
    }
}
