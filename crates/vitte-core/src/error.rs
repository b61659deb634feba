//! Crate-level error type for `vitte-core`.
//!
//! This is distinct from the language-level `InterpretResult` the VM
//! reports to its host: these errors only surface from malformed chunk or
//! constant-pool access, which a correctly emitted program should never
//! trigger. They exist for embedding/fuzzing robustness.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("constant index {0} out of bounds")]
    ConstantOutOfBounds(u32),

    #[error("too many constants in one chunk (max 255)")]
    TooManyConstants,

    #[error("too much code to jump over (max 65535)")]
    JumpTooLarge,

    #[error("invalid opcode byte {0:#04x}")]
    InvalidOpcode(u8),
}
