//! Table-driven embedder.
//!
//! Maps exact texts to preset vectors. Useful for tests, demos and
//! reproducing a corpus whose embeddings were computed elsewhere.

use crate::embedding::{Embedder, EmbedderDescriptor, EmbeddingBackend};
use crate::storage::replace_file;
use crate::vector::{EmbeddingVector, VectorDimension, VectorError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk form: `{"dimension": 2, "vectors": {"hi": [0.0, 0.0]}, "default": null}`.
#[derive(Debug, Serialize, Deserialize)]
struct FixedTable {
    dimension: usize,
    vectors: BTreeMap<String, Vec<f32>>,
    #[serde(default)]
    default: Option<Vec<f32>>,
}

/// Embedder backed by an explicit text-to-vector table.
#[derive(Debug, Clone)]
pub struct FixedEmbedder {
    table: BTreeMap<String, EmbeddingVector>,
    default: Option<EmbeddingVector>,
    label: String,
    dimension: VectorDimension,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Result<Self, VectorError> {
        Ok(Self {
            table: BTreeMap::new(),
            default: None,
            label: "fixed".to_string(),
            dimension: VectorDimension::new(dimension)?,
        })
    }

    /// Adds or replaces the vector for `text`.
    pub fn insert(
        &mut self,
        text: impl Into<String>,
        vector: EmbeddingVector,
    ) -> Result<(), VectorError> {
        self.dimension.validate_vector(&vector)?;
        self.table.insert(text.into(), vector);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_entry(
        mut self,
        text: impl Into<String>,
        vector: EmbeddingVector,
    ) -> Result<Self, VectorError> {
        self.insert(text, vector)?;
        Ok(self)
    }

    /// Vector returned for texts missing from the table.
    pub fn with_default(mut self, vector: EmbeddingVector) -> Result<Self, VectorError> {
        self.dimension.validate_vector(&vector)?;
        self.default = Some(vector);
        Ok(self)
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Loads a table written by [`Embedder::save`].
    pub fn load(path: impl AsRef<Path>, label: &str) -> Result<Self, VectorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VectorError::EmbeddingFailed(format!(
                "Failed to read embedding table '{}': {e}",
                path.display()
            ))
        })?;
        let table: FixedTable = serde_json::from_str(&content)
            .map_err(|e| VectorError::Serialization(format!("{}: {e}", path.display())))?;

        let mut embedder = Self::new(table.dimension)?.with_label(label);
        for (text, vector) in table.vectors {
            embedder.insert(text, vector)?;
        }
        if let Some(default) = table.default {
            embedder = embedder.with_default(default)?;
        }
        Ok(embedder)
    }
}

impl Embedder for FixedEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, VectorError> {
        self.table
            .get(text)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| VectorError::EmbeddingFailed(format!("No vector for '{text}'")))
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn descriptor(&self) -> EmbedderDescriptor {
        EmbedderDescriptor::new(EmbeddingBackend::Fixed, &self.label, self.dimension)
    }

    fn save(&self, path: &Path) -> Result<(), VectorError> {
        let table = FixedTable {
            dimension: self.dimension.get(),
            vectors: self.table.clone(),
            default: self.default.clone(),
        };
        let json = serde_json::to_string_pretty(&table)
            .map_err(|e| VectorError::Serialization(e.to_string()))?;
        replace_file(path, json.as_bytes())?;
        Ok(())
    }
}
