//! Saving and loading complete snapshots.

use crate::answers::CorpusEntry;
use crate::config::StorageConfig;
use crate::embedding::{Embedder, EmbedderDescriptor};
use crate::error::{AnswerError, AnswerResult};
use crate::storage::{SnapshotMetadata, read_entries, write_entries};
use crate::vector::{VectorPair, VectorPairFile};
use std::path::{Path, PathBuf};

/// Locations of every snapshot artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub dir: PathBuf,
    pub entries: PathBuf,
    pub vectors: PathBuf,
    pub metadata: PathBuf,
    pub model: PathBuf,
}

impl SnapshotPaths {
    /// Resolves the configured file names inside `dir`.
    pub fn from_config(dir: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        let dir = dir.into();
        Self {
            entries: dir.join(&config.entries_file),
            vectors: dir.join(&config.vectors_file),
            metadata: dir.join(&config.metadata_file),
            model: dir.join(&config.model_file),
            dir,
        }
    }

    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::from_config(dir, &StorageConfig::default())
    }

    /// A snapshot exists once its metadata has been written.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.metadata.exists()
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model
    }
}

/// Everything read back from disk.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub entries: Vec<CorpusEntry>,
    pub vectors: Vec<VectorPair>,
}

/// Writes entries, vectors, the embedder's model data and metadata.
///
/// Metadata is written last so an interrupted save never leaves a snapshot
/// that looks complete. An existing snapshot from the same embedder keeps
/// its creation time.
pub fn save_snapshot(
    paths: &SnapshotPaths,
    embedder: &dyn Embedder,
    entries: &[CorpusEntry],
    vectors: &[VectorPair],
) -> AnswerResult<SnapshotMetadata> {
    if entries.len() != vectors.len() {
        return Err(AnswerError::corrupt(
            &paths.dir,
            format!(
                "Refusing to save {} entries with {} vector pairs",
                entries.len(),
                vectors.len()
            ),
        ));
    }

    std::fs::create_dir_all(&paths.dir)
        .map_err(|e| AnswerError::io("create snapshot directory", &paths.dir, e))?;

    let descriptor = embedder.descriptor();
    VectorPairFile::new(&paths.vectors).write_all(descriptor.dimension, vectors)?;
    write_entries(&paths.entries, entries)?;

    if descriptor.backend.owns_model_file() {
        embedder.save(&paths.model)?;
    }

    let metadata = match SnapshotMetadata::load(&paths.metadata) {
        Ok(mut existing) if existing.embedder == descriptor => {
            existing.update(entries.len());
            existing
        }
        _ => SnapshotMetadata::new(descriptor, entries.len()),
    };
    metadata.save(&paths.metadata)?;

    tracing::info!(
        entries = entries.len(),
        dimension = metadata.embedder.dimension.get(),
        "saved answer snapshot to {}",
        paths.dir.display()
    );
    Ok(metadata)
}

/// Reads only the metadata of a snapshot.
pub fn read_metadata(paths: &SnapshotPaths) -> AnswerResult<SnapshotMetadata> {
    SnapshotMetadata::load(&paths.metadata)
}

/// Loads a snapshot that must have been produced by an embedder matching `expected`.
///
/// Checks, in order: metadata format version; vector width against
/// `expected` (`CorruptStorage`); backend, model name and stoplist
/// (`Configuration`); vector file contents, its width and the three counts
/// against each other (`CorruptStorage`).
pub fn load_snapshot(paths: &SnapshotPaths, expected: &EmbedderDescriptor) -> AnswerResult<Snapshot> {
    let metadata = SnapshotMetadata::load(&paths.metadata)?;
    let stored = &metadata.embedder;

    if stored.dimension != expected.dimension {
        return Err(AnswerError::corrupt(
            &paths.dir,
            format!(
                "Snapshot vectors have width {} but the {} model '{}' produces width {}",
                stored.dimension, expected.backend, expected.model, expected.dimension
            ),
        ));
    }

    if stored.backend != expected.backend || stored.model != expected.model {
        return Err(AnswerError::configuration_with(
            format!(
                "Snapshot was built with {} model '{}' but {} model '{}' is configured",
                stored.backend, stored.model, expected.backend, expected.model
            ),
            "Configure the original embedding model, or re-ingest the corpus with --fresh",
        ));
    }

    if stored.stopwords != expected.stopwords {
        return Err(AnswerError::configuration_with(
            format!(
                "Snapshot was built with stopwords [{}] but [{}] are configured",
                stored.stopwords.join(", "),
                expected.stopwords.join(", ")
            ),
            "Restore `embedding.stopwords`, or re-ingest the corpus with --fresh",
        ));
    }

    let (header, vectors) = VectorPairFile::new(&paths.vectors).read_all()?;
    if header.dimension != stored.dimension {
        return Err(AnswerError::corrupt(
            &paths.vectors,
            format!(
                "Vector file width {} disagrees with metadata width {}",
                header.dimension, stored.dimension
            ),
        ));
    }

    let entries = read_entries(&paths.entries)?;
    if entries.len() != vectors.len() || entries.len() != metadata.entry_count {
        return Err(AnswerError::corrupt(
            &paths.dir,
            format!(
                "Count mismatch: {} entries, {} vector pairs, metadata says {}",
                entries.len(),
                vectors.len(),
                metadata.entry_count
            ),
        ));
    }

    tracing::info!(
        entries = entries.len(),
        dimension = stored.dimension.get(),
        "loaded answer snapshot from {}",
        paths.dir.display()
    );
    Ok(Snapshot {
        metadata,
        entries,
        vectors,
    })
}
