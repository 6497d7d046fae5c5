//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - the snapshot is unusable and must be rebuilt
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::error::AnswerError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Corrupted snapshot, automation should halt (code 2)
    BlockingError = 2,

    /// The store has no entries to answer from (code 3)
    NotReady = 3,

    /// The embedder failed (code 4)
    EmbeddingError = 4,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// An answer was found but fell below the confidence threshold (code 7)
    LowConfidence = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl ExitCode {
    /// Convert an `AnswerError` to the appropriate exit code.
    pub fn from_error(error: &AnswerError) -> Self {
        match error {
            AnswerError::CorruptStorage { .. } => ExitCode::BlockingError,
            AnswerError::NotReady => ExitCode::NotReady,
            AnswerError::EmbeddingFailure(_) => ExitCode::EmbeddingError,
            AnswerError::Io { .. } => ExitCode::IoError,
            AnswerError::Configuration { .. } => ExitCode::ConfigError,
        }
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Blocking error - automation should halt",
            ExitCode::NotReady => "No answers indexed",
            ExitCode::EmbeddingError => "Embedding error",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::LowConfidence => "Low confidence answer",
        }
    }
}
