//! Runtime errors: distinct from the language-level `InterpretResult` the
//! VM reports to its host. A `RuntimeError` carries a formatted message and
//! the call stack trace captured at the point of failure, the way the
//! reference VM prints `[line N] in <fn>` frames on a runtime fault.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
    /// One entry per call frame, innermost first, formatted as the
    /// reference VM's `[line N] in <name>()`.
    pub trace: Vec<String>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, trace: Vec<String>) -> Self {
        RuntimeError { message: message.into(), trace }
    }
}
