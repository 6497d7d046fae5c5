//! Sentence embeddings through fastembed.
//!
//! Models are downloaded on first use into the configured cache directory
//! and run locally through ONNX Runtime.

use crate::config::EmbeddingConfig;
use crate::embedding::{Embedder, EmbedderDescriptor, EmbeddingBackend};
use crate::vector::{EmbeddingVector, VectorDimension, VectorError};
use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;

/// Models accepted in `embedding.model` for the fastembed backend.
const SUPPORTED_MODELS: &[EmbeddingModel] = &[
    EmbeddingModel::AllMiniLML6V2,
    EmbeddingModel::AllMiniLML12V2,
    EmbeddingModel::BGESmallENV15,
    EmbeddingModel::BGEBaseENV15,
    EmbeddingModel::BGELargeENV15,
    EmbeddingModel::MultilingualE5Small,
    EmbeddingModel::ParaphraseMLMiniLML12V2,
];

/// Canonical configuration name of a fastembed model.
#[must_use]
pub fn model_to_string(model: &EmbeddingModel) -> String {
    format!("{model:?}")
}

/// Parses a model name as written in settings (case-insensitive).
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, VectorError> {
    SUPPORTED_MODELS
        .iter()
        .find(|model| model_to_string(model).eq_ignore_ascii_case(name.trim()))
        .cloned()
        .ok_or_else(|| {
            let known: Vec<String> = SUPPORTED_MODELS.iter().map(model_to_string).collect();
            VectorError::EmbeddingFailed(format!(
                "Unknown fastembed model '{name}'. Supported models: {}",
                known.join(", ")
            ))
        })
}

/// FastEmbed implementation of [`Embedder`].
///
/// The model is wrapped in a `Mutex` because inference needs exclusive
/// access to the ONNX session.
pub struct FastEmbedEmbedder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: VectorDimension,
}

impl std::fmt::Debug for FastEmbedEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedEmbedder")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedEmbedder {
    /// Loads the model named in `config`, downloading it if needed.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, VectorError> {
        let model = parse_embedding_model(&config.model)?;
        Self::with_model(model, config.resolved_cache_dir(), config.show_download_progress)
    }

    /// Create with a specific model.
    ///
    /// # Errors
    /// Returns an error if the model fails to initialize or download.
    pub fn with_model(
        model: EmbeddingModel,
        cache_dir: PathBuf,
        show_download_progress: bool,
    ) -> Result<Self, VectorError> {
        let has_cached_models = cache_dir.exists()
            && cache_dir
                .read_dir()
                .is_ok_and(|mut entries| entries.any(|_| true));
        if has_cached_models {
            tracing::info!("loading embedding model from {}", cache_dir.display());
        } else {
            tracing::info!("downloading embedding model (first time only)");
        }

        let model_name = model_to_string(&model);
        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| VectorError::EmbeddingFailed(
            format!("Failed to initialize embedding model: {e}. Ensure you have internet connection for first-time model download")
        ))?;

        // Embed once to learn the output width once instead of hardcoding it per model
        let sample = text_model
            .embed(vec!["test"], None)
            .map_err(|e| VectorError::EmbeddingFailed(e.to_string()))?;
        let width = sample.first().map(Vec::len).unwrap_or(0);
        let dimension = VectorDimension::new(width)?;

        Ok(Self {
            model: Mutex::new(text_model),
            model_name,
            dimension,
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, VectorError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| VectorError::EmbeddingFailed("Model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>, VectorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                VectorError::EmbeddingFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(text_strings, None)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to generate embeddings: {e}"))
            })?;

        if embeddings.len() != texts.len() {
            return Err(VectorError::EmbeddingFailed(format!(
                "Model returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        for embedding in &embeddings {
            self.dimension.validate_vector(embedding)?;
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn descriptor(&self) -> EmbedderDescriptor {
        EmbedderDescriptor::new(EmbeddingBackend::FastEmbed, &self.model_name, self.dimension)
    }
}
