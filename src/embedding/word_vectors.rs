//! Averaged word-vector embeddings.
//!
//! Text is lowercased, split on whitespace, stripped of surrounding
//! punctuation and filtered against a stoplist; the remaining words are
//! looked up in a pre-trained vocabulary and their vectors averaged.
//! Words outside the vocabulary are skipped. A text with no known words
//! cannot be embedded and is reported as a failure.
//!
//! Vocabularies use the GloVe text format: one word per line followed by
//! its whitespace-separated components.

use crate::embedding::{Embedder, EmbedderDescriptor, EmbeddingBackend};
use crate::storage::replace_file;
use crate::vector::{EmbeddingVector, VectorDimension, VectorError};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Words ignored when averaging.
pub const DEFAULT_STOPWORDS: &[&str] = &["for", "a", "of", "the", "and", "to", "in"];

/// Embedder that averages pre-trained word vectors.
#[derive(Debug, Clone)]
pub struct WordVectorEmbedder {
    vocabulary: HashMap<String, Vec<f32>>,
    stopwords: HashSet<String>,
    label: String,
    dimension: VectorDimension,
}

impl WordVectorEmbedder {
    /// Builds an embedder from an in-memory vocabulary.
    ///
    /// # Errors
    /// Returns an error if the vocabulary is empty or its vectors disagree in width.
    pub fn from_vocabulary(
        vocabulary: HashMap<String, Vec<f32>>,
        label: impl Into<String>,
    ) -> Result<Self, VectorError> {
        let width = vocabulary.values().next().map(Vec::len).unwrap_or(0);
        let dimension = VectorDimension::new(width)?;
        for vector in vocabulary.values() {
            dimension.validate_vector(vector)?;
        }

        Ok(Self {
            vocabulary,
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            label: label.into(),
            dimension,
        })
    }

    /// Loads a GloVe-format text vocabulary.
    ///
    /// A leading `<count> <width>` header line (word2vec text format) is
    /// accepted and skipped.
    pub fn load(path: impl AsRef<Path>, label: &str) -> Result<Self, VectorError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            VectorError::EmbeddingFailed(format!(
                "Failed to open word vectors '{}': {e}",
                path.display()
            ))
        })?;

        let mut vocabulary = HashMap::new();
        let mut width: Option<usize> = None;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: Result<Vec<f32>, _> = parts.map(str::parse::<f32>).collect();
            let values = values.map_err(|e| {
                VectorError::Serialization(format!(
                    "{}:{}: invalid vector component: {e}",
                    path.display(),
                    line_no + 1
                ))
            })?;

            if line_no == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }

            match width {
                None => width = Some(values.len()),
                Some(w) if w != values.len() => {
                    return Err(VectorError::Serialization(format!(
                        "{}:{}: expected {w} components, found {}",
                        path.display(),
                        line_no + 1,
                        values.len()
                    )));
                }
                Some(_) => {}
            }
            vocabulary.insert(word.to_string(), values);
        }

        let embedder = Self::from_vocabulary(vocabulary, label)?;
        tracing::info!(
            words = embedder.vocabulary.len(),
            dimension = embedder.dimension.get(),
            "loaded word vectors from {}",
            path.display()
        );
        Ok(embedder)
    }

    /// Replaces the stoplist.
    #[must_use]
    pub fn with_stopwords<I, S>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = stopwords
            .into_iter()
            .map(|w| w.into().to_lowercase())
            .collect();
        self
    }

    /// Number of words in the vocabulary.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Words of `text` that contribute to its embedding, in order.
    pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split_whitespace()
            .map(|raw| {
                raw.trim_matches(|c: char| c.is_ascii_punctuation())
                    .to_lowercase()
            })
            .filter(|word| !word.is_empty() && !self.stopwords.contains(word))
    }
}

impl Embedder for WordVectorEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, VectorError> {
        let dim = self.dimension.get();
        let mut sum = vec![0.0f32; dim];
        let mut known = 0usize;

        for word in self.tokens(text) {
            if let Some(vector) = self.vocabulary.get(&word) {
                for (acc, value) in sum.iter_mut().zip(vector) {
                    *acc += value;
                }
                known += 1;
            }
        }

        if known == 0 {
            return Err(VectorError::EmbeddingFailed(format!(
                "No known words in '{text}' for vocabulary '{}'",
                self.label
            )));
        }

        for value in &mut sum {
            *value /= known as f32;
        }
        Ok(sum)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn descriptor(&self) -> EmbedderDescriptor {
        EmbedderDescriptor::new(EmbeddingBackend::WordVectors, &self.label, self.dimension)
            .with_stopwords(self.stopwords.iter().cloned())
    }

    /// Writes the vocabulary in GloVe text format, sorted by word.
    ///
    /// The stoplist is not part of the file; it is recorded in the
    /// descriptor and checked when the snapshot is loaded.
    fn save(&self, path: &Path) -> Result<(), VectorError> {
        let words: BTreeSet<&String> = self.vocabulary.keys().collect();

        let mut content = String::new();
        for word in words {
            content.push_str(word);
            for value in &self.vocabulary[word] {
                let _ = write!(content, " {value}");
            }
            content.push('\n');
        }
        replace_file(path, content.as_bytes())?;
        Ok(())
    }
}
