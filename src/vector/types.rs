//! Type-safe wrappers and core types for embedding vectors.
//!
//! Every vector held by an answer store shares one width. The width is
//! carried as a [`VectorDimension`] so that a zero-width or mismatched
//! vector is caught at the boundary instead of deep inside a search.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A dense embedding vector.
pub type EmbeddingVector = Vec<f32>;

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector widths to prevent dimension
/// mismatches between the embedder, the stored vectors and the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|value| !value.is_finite()) {
            return Err(VectorError::NonFinite);
        }
        Ok(())
    }
}

impl TryFrom<usize> for VectorDimension {
    type Error = VectorError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VectorDimension> for usize {
    fn from(dim: VectorDimension) -> usize {
        dim.0
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The pair of vectors stored for one corpus entry.
///
/// Only `question` participates in nearest-neighbor search. `answer` is
/// kept so snapshots stay compatible with answer-side similarity work.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPair {
    pub question: EmbeddingVector,
    pub answer: EmbeddingVector,
}

impl VectorPair {
    pub fn new(question: EmbeddingVector, answer: EmbeddingVector) -> Self {
        Self { question, answer }
    }

    /// Checks both halves against `dimension`.
    pub fn validate(&self, dimension: VectorDimension) -> Result<(), VectorError> {
        dimension.validate_vector(&self.question)?;
        dimension.validate_vector(&self.answer)
    }
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error(
        "Vector contains NaN or infinite values\nSuggestion: Check the embedding model output"
    )]
    NonFinite,

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    EmbeddingFailed(String),

    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Storage(#[from] std::io::Error),

    #[error(
        "Serialization error: {0}\nSuggestion: Check that vector data is valid and not corrupted"
    )]
    Serialization(String),

    #[error(
        "Invalid storage version: expected {expected}, got {actual}\nSuggestion: Rebuild the snapshot with this version of autoguru"
    )]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),
}
