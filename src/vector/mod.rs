//! Vector primitives for answer retrieval.
//!
//! This module provides the fixed-width vector types, the exact k-d tree
//! used for nearest-question lookup, and the binary file that persists
//! question/answer vector pairs.
//!
//! # Architecture
//! Question vectors are indexed by a bucketed k-d tree that is rebuilt
//! wholesale on every corpus change. Distances are Euclidean; confidence
//! normalization lives with the answer store.

mod kdtree;
mod storage;
mod types;

// Re-export core types for public API
pub use kdtree::{DEFAULT_LEAF_SIZE, KdTree, Neighbor, euclidean_distance, max_pairwise_distance};
pub use storage::{VectorFileHeader, VectorPairFile, VectorStorageError};
pub use types::{EmbeddingVector, VectorDimension, VectorError, VectorPair};
