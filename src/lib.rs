//! The main library module for autoguru
//!
//! Answers free-text questions by retrieving the closest recorded
//! question/answer pair from a corpus.

pub mod answers;
pub mod config;
pub mod embedding;
pub mod error;
pub mod exit_code;
pub mod logging;
pub mod storage;
pub mod vector;

// Explicit exports for better API clarity
pub use answers::{Answer, AnswerPolicy, AnswerStore, CorpusEntry, IndexState, StoreOptions};
pub use config::Settings;
pub use embedding::{Embedder, EmbedderDescriptor, EmbeddingBackend, create_embedder};
pub use error::{AnswerError, AnswerResult};
pub use exit_code::ExitCode;
pub use storage::SnapshotPaths;
pub use vector::{EmbeddingVector, VectorDimension, VectorError, VectorPair};
