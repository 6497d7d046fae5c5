//! Metadata tracking for answer snapshots.
//!
//! Records which embedder produced the stored vectors, how many entries the
//! snapshot holds, and when it was written, so that a snapshot is never
//! loaded with an incompatible model.

use crate::embedding::EmbedderDescriptor;
use crate::error::{AnswerError, AnswerResult};
use crate::storage::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata stored next to the entries and vectors of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Version of the snapshot format
    pub version: u32,

    /// Embedder that produced the vectors
    pub embedder: EmbedderDescriptor,

    /// Number of corpus entries (and vector pairs)
    pub entry_count: usize,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl SnapshotMetadata {
    /// Current snapshot format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create new metadata with current timestamp
    pub fn new(embedder: EmbedderDescriptor, entry_count: usize) -> Self {
        let now = Utc::now();
        Self {
            version: Self::CURRENT_VERSION,
            embedder,
            entry_count,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the entry count and timestamp, keeping the creation time
    pub fn update(&mut self, entry_count: usize) {
        self.entry_count = entry_count;
        self.updated_at = Utc::now();
    }

    pub fn save(&self, path: &Path) -> AnswerResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AnswerError::corrupt(path, format!("Failed to serialize metadata: {e}"))
        })?;
        write_atomic(path, json.as_bytes())
    }

    /// Load metadata, rejecting formats newer than this build understands
    pub fn load(path: &Path) -> AnswerResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AnswerError::io("read snapshot metadata", path, e))?;

        let metadata: Self = serde_json::from_str(&json)
            .map_err(|e| AnswerError::corrupt(path, format!("Failed to parse metadata: {e}")))?;

        if metadata.version > Self::CURRENT_VERSION {
            return Err(AnswerError::corrupt(
                path,
                format!(
                    "Metadata version {} is newer than supported version {}",
                    metadata.version,
                    Self::CURRENT_VERSION
                ),
            ));
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingBackend;
    use crate::vector::VectorDimension;
    use tempfile::TempDir;

    fn descriptor() -> EmbedderDescriptor {
        EmbedderDescriptor::new(
            EmbeddingBackend::WordVectors,
            "glove-twitter-25",
            VectorDimension::new(25).unwrap(),
        )
    }

    #[test]
    fn test_metadata_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.json");

        let metadata = SnapshotMetadata::new(descriptor(), 1000);
        metadata.save(&path).unwrap();

        let loaded = SnapshotMetadata::load(&path).unwrap();
        assert_eq!(loaded, metadata);
        assert_eq!(loaded.version, SnapshotMetadata::CURRENT_VERSION);
    }

    #[test]
    fn test_metadata_update() {
        let mut metadata = SnapshotMetadata::new(descriptor(), 100);
        let created = metadata.created_at;

        metadata.update(200);

        assert_eq!(metadata.entry_count, 200);
        assert!(metadata.updated_at >= created);
        assert_eq!(metadata.created_at, created);
    }

    #[test]
    fn test_version_compatibility() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.json");

        let future_metadata = r#"{
            "version": 999,
            "embedder": {"backend": "fixed", "model": "future", "dimension": 2},
            "entry_count": 0,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        std::fs::write(&path, future_metadata).unwrap();

        match SnapshotMetadata::load(&path) {
            Err(AnswerError::CorruptStorage { reason, .. }) => {
                assert!(reason.contains("version"));
            }
            other => panic!("Expected version error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_garbled_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.json");

        assert!(matches!(
            SnapshotMetadata::load(&path),
            Err(AnswerError::Io { .. })
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SnapshotMetadata::load(&path),
            Err(AnswerError::CorruptStorage { .. })
        ));
    }
}
