//! Text embedding backends.
//!
//! The answer store only needs `embed(text) -> fixed-width vector`. Concrete
//! backends are chosen by configuration:
//!
//! - [`FastEmbedEmbedder`]: sentence models run locally through fastembed
//! - [`WordVectorEmbedder`]: averaged pre-trained word vectors (GloVe text format)
//! - [`FixedEmbedder`]: a lookup table, for tests and demos

mod fixed;
mod sentence;
mod word_vectors;

pub use fixed::FixedEmbedder;
pub use sentence::{FastEmbedEmbedder, model_to_string, parse_embedding_model};
pub use word_vectors::{DEFAULT_STOPWORDS, WordVectorEmbedder};

use crate::config::EmbeddingConfig;
use crate::vector::{EmbeddingVector, VectorDimension, VectorError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Which embedding implementation produced a set of vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    FastEmbed,
    WordVectors,
    Fixed,
}

impl EmbeddingBackend {
    /// Whether the backend's model data lives in the snapshot directory.
    #[must_use]
    pub fn owns_model_file(&self) -> bool {
        matches!(self, Self::WordVectors | Self::Fixed)
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FastEmbed => "fastembed",
            Self::WordVectors => "word_vectors",
            Self::Fixed => "fixed",
        };
        f.write_str(name)
    }
}

/// Identity of an embedding model, recorded with every snapshot.
///
/// Two descriptors with the same backend and model but different
/// dimensions indicate a corrupted or mismatched snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderDescriptor {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub dimension: VectorDimension,
    /// Words dropped before embedding, sorted. Empty for backends without a stoplist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stopwords: Vec<String>,
}

impl EmbedderDescriptor {
    pub fn new(backend: EmbeddingBackend, model: impl Into<String>, dimension: VectorDimension) -> Self {
        Self {
            backend,
            model: model.into(),
            dimension,
            stopwords: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_stopwords<I, S>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stopwords: Vec<String> = stopwords.into_iter().map(Into::into).collect();
        stopwords.sort();
        stopwords.dedup();
        self.stopwords = stopwords;
        self
    }
}

/// Trait for turning text into fixed-width vectors.
///
/// Implementations must be deterministic for a loaded model and safe to
/// share between threads.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<EmbeddingVector, VectorError>;

    /// Embed several texts, one vector per input in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>, VectorError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Width of every vector this embedder produces.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Backend, model name and width.
    fn descriptor(&self) -> EmbedderDescriptor;

    /// Persist whatever the backend needs to be reloaded from `path`.
    ///
    /// Backends whose models live elsewhere (a download cache) write nothing.
    fn save(&self, _path: &Path) -> Result<(), VectorError> {
        Ok(())
    }
}

/// Builds the embedder selected by `config`.
///
/// `snapshot_model` is the model file saved alongside a snapshot; it is
/// used when the configuration does not name a model path explicitly.
pub fn create_embedder(
    config: &EmbeddingConfig,
    snapshot_model: Option<&Path>,
) -> Result<Arc<dyn Embedder>, VectorError> {
    let model_path = || {
        config
            .model_path
            .as_deref()
            .or(snapshot_model.filter(|path| path.exists()))
            .ok_or_else(|| {
                VectorError::EmbeddingFailed(format!(
                    "The {} backend needs `embedding.model_path` or a saved model in the data directory",
                    config.backend
                ))
            })
    };

    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::FastEmbed => Arc::new(FastEmbedEmbedder::from_config(config)?),
        EmbeddingBackend::WordVectors => Arc::new(
            WordVectorEmbedder::load(model_path()?, &config.model)?
                .with_stopwords(config.stopwords.iter().cloned()),
        ),
        EmbeddingBackend::Fixed => Arc::new(FixedEmbedder::load(model_path()?, &config.model)?),
    };

    tracing::debug!(
        backend = %config.backend,
        model = %config.model,
        dimension = embedder.dimension().get(),
        "embedder ready"
    );
    Ok(embedder)
}
