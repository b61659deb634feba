//! Compile-time diagnostics.

use std::fmt;

/// Where a [`CompileError`] was reported, mirroring the parser's own
/// notion of "at the offending lexeme", "at end of input", or neither
/// (already-malformed tokens carry no usable lexeme).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    Lexeme(String),
    End,
    None,
}

/// A single diagnostic, formatted to match the reference interpreter's
/// `[line N] Error at 'lexeme': message` wire format.
///
/// Implements `std::error::Error` by hand rather than via `thiserror`,
/// since the derive macro's `#[error(...)]` format strings can't express
/// the three-way `at` branch below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: u32,
    pub at: ErrorLocation,
    pub message: String,
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub fn new(line: u32, at: ErrorLocation, message: impl Into<String>) -> Self {
        CompileError { line, at, message: message.into() }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.at {
            ErrorLocation::Lexeme(lexeme) => write!(f, " at '{lexeme}'")?,
            ErrorLocation::End => write!(f, " at end")?,
            ErrorLocation::None => {}
        }
        write!(f, ": {}", self.message)
    }
}
