//! Error types for the answer engine
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use crate::vector::{VectorError, VectorStorageError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for answer store operations
#[derive(Error, Debug)]
pub enum AnswerError {
    /// Invalid construction arguments or settings
    #[error("Invalid configuration: {reason}")]
    Configuration {
        reason: String,
        suggestion: Option<String>,
    },

    /// Query against a store with no indexed entries
    #[error("The answer store has no entries yet. Add answers before asking questions.")]
    NotReady,

    /// Persisted artifacts disagree with each other or with the embedder
    #[error("Snapshot at '{path}' is corrupted: {reason}")]
    CorruptStorage { path: PathBuf, reason: String },

    /// The embedder failed or produced malformed output
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(#[from] VectorError),

    /// File system errors
    #[error("Failed to {operation} '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AnswerError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
            suggestion: None,
        }
    }

    pub fn configuration_with(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptStorage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotReady => "NOT_READY",
            Self::CorruptStorage { .. } => "CORRUPT_STORAGE",
            Self::EmbeddingFailure(_) => "EMBEDDING_FAILURE",
            Self::Io { .. } => "IO_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            Self::Configuration {
                suggestion: Some(suggestion),
                ..
            } => vec![suggestion.clone()],
            Self::Configuration { .. } => vec![
                "Check .autoguru/settings.toml or run 'autoguru config' to see effective settings"
                    .to_string(),
            ],
            Self::NotReady => vec![
                "Run 'autoguru ingest <CORPUS>' to add question/answer pairs".to_string(),
            ],
            Self::CorruptStorage { .. } => vec![
                "Run 'autoguru ingest <CORPUS> --fresh' to rebuild the snapshot".to_string(),
                "Make sure the configured embedding model matches the one used to build it"
                    .to_string(),
            ],
            Self::EmbeddingFailure(_) => vec![
                "Check that the embedding model loads and covers the words in your text"
                    .to_string(),
            ],
            Self::Io { .. } => vec![
                "Check that the path exists and you have the needed permissions".to_string(),
            ],
        }
    }
}

impl From<VectorStorageError> for AnswerError {
    fn from(error: VectorStorageError) -> Self {
        match error {
            VectorStorageError::Io { path, source } => Self::io("access vector file", path, source),
            VectorStorageError::InvalidFormat { path, reason } => Self::corrupt(path, reason),
            VectorStorageError::Vector {
                path,
                source: VectorError::VersionMismatch { expected, actual },
            } => Self::corrupt(
                path,
                format!("Vector file format version {actual} is not supported (expected {expected})"),
            ),
            VectorStorageError::Vector { path, source } => Self::corrupt(path, source.to_string()),
        }
    }
}

/// Result type alias for answer store operations
pub type AnswerResult<T> = Result<T, AnswerError>;
