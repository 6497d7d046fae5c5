//! Configuration for the answer engine and its CLI.
//!
//! Settings are layered:
//! - Default values
//! - TOML configuration file (`.autoguru/settings.toml`, searched upward
//!   from the current directory)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `AG_` and use double underscores
//! to separate nested levels:
//! - `AG_ANSWERS__CONFIDENCE_THRESHOLD=0.7` sets `answers.confidence_threshold`
//! - `AG_EMBEDDING__BACKEND=word_vectors` sets `embedding.backend`
//! - `AG_DATA_DIR=/srv/faq` sets `data_dir`
//!
//! The library itself never reads configuration implicitly: the CLI turns
//! these settings into an embedder, an [`AnswerPolicy`](crate::answers::AnswerPolicy)
//! and [`SnapshotPaths`](crate::storage::SnapshotPaths).

use crate::embedding::{DEFAULT_STOPWORDS, EmbeddingBackend};
use crate::vector::DEFAULT_LEAF_SIZE;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the settings file and, by default, the snapshot.
pub const CONFIG_DIR: &str = ".autoguru";

const SETTINGS_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "AG_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the persisted answer snapshot
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Embedding backend settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retrieval and answer policy settings
    #[serde(default)]
    pub answers: AnswersConfig,

    /// Snapshot file names inside `data_dir`
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Which embedder to build
    #[serde(default = "default_backend")]
    pub backend: EmbeddingBackend,

    /// fastembed model name, or a free-form label for other backends
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Model data for the `word_vectors` and `fixed` backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// Download cache for fastembed models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Show a progress bar while fastembed downloads a model
    #[serde(default = "default_true")]
    pub show_download_progress: bool,

    /// Words ignored by the `word_vectors` backend
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnswersConfig {
    /// Answers below this confidence are replaced by `fallback_message`
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Reply used when no stored answer is trustworthy
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Maximum number of points per k-d tree leaf
    #[serde(default = "default_leaf_size")]
    pub leaf_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default = "default_entries_file")]
    pub entries_file: String,

    #[serde(default = "default_vectors_file")]
    pub vectors_file: String,

    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,

    /// Saved embedder model, for backends that own their model data
    #[serde(default = "default_model_file")]
    pub model_file: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("data")
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_backend() -> EmbeddingBackend {
    EmbeddingBackend::FastEmbed
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_stopwords() -> Vec<String> {
    DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect()
}
fn default_confidence_threshold() -> f32 {
    0.5
}
fn default_fallback_message() -> String {
    "Sorry, I don't have a good answer for that yet.".to_string()
}
fn default_leaf_size() -> usize {
    DEFAULT_LEAF_SIZE
}
fn default_entries_file() -> String {
    "entries.jsonl".to_string()
}
fn default_vectors_file() -> String {
    "vectors.bin".to_string()
}
fn default_metadata_file() -> String {
    "metadata.json".to_string()
}
fn default_model_file() -> String {
    "embedder.model".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            debug: false,
            embedding: EmbeddingConfig::default(),
            answers: AnswersConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_embedding_model(),
            model_path: None,
            cache_dir: None,
            show_download_progress: true,
            stopwords: default_stopwords(),
        }
    }
}

impl Default for AnswersConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            fallback_message: default_fallback_message(),
            leaf_size: default_leaf_size(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            entries_file: default_entries_file(),
            vectors_file: default_vectors_file(),
            metadata_file: default_metadata_file(),
            model_file: default_model_file(),
        }
    }
}

impl EmbeddingConfig {
    /// Cache directory for fastembed models.
    ///
    /// Falls back to `<user cache dir>/autoguru/models`, then to a local
    /// `.fastembed_cache` when the platform has no cache directory.
    #[must_use]
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|dir| dir.join("autoguru").join("models"))
                .unwrap_or_else(|| PathBuf::from(".fastembed_cache"))
        })
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring `AG_` overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.autoguru/settings.toml` by searching from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Get the workspace root directory (where `.autoguru` is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'autoguru init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Snapshot directory, resolved against the workspace root when relative.
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        if self.data_dir.is_absolute() {
            return self.data_dir.clone();
        }
        match Self::workspace_root() {
            Some(root) => root.join(&self.data_dir),
            None => self.data_dir.clone(),
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, Self::template())?;

        if force {
            println!("Overwrote configuration at: {}", config_path.display());
        } else {
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
        }

        Ok(config_path)
    }

    fn template() -> String {
        let defaults = Self::default();
        let stopwords: Vec<String> = defaults
            .embedding
            .stopwords
            .iter()
            .map(|w| format!("\"{w}\""))
            .collect();

        format!(
            r#"# Autoguru Configuration File

# Version of the configuration schema
version = {version}

# Directory holding the answer snapshot (relative to the workspace root)
data_dir = "{data_dir}"

# Global debug mode
debug = false

[embedding]
# Embedding backend: "fastembed", "word_vectors" or "fixed"
backend = "fastembed"

# fastembed model name, or a label recorded with the snapshot for other backends
model = "{model}"

# Model data for word_vectors (GloVe text format) and fixed (JSON table)
# model_path = "glove.twitter.27B.25d.txt"

# Where fastembed caches downloaded models (defaults to the user cache dir)
# cache_dir = "~/.cache/autoguru/models"

show_download_progress = true

# Words ignored by the word_vectors backend
stopwords = [{stopwords}]

[answers]
# Answers below this confidence are replaced by the fallback message
confidence_threshold = {threshold}

fallback_message = "{fallback}"

# Maximum number of points per k-d tree leaf
leaf_size = {leaf_size}

[storage]
# File names inside data_dir
entries_file = "{entries}"
vectors_file = "{vectors}"
metadata_file = "{metadata}"
model_file = "{model_file}"
"#,
            version = defaults.version,
            data_dir = defaults.data_dir.display(),
            model = defaults.embedding.model,
            stopwords = stopwords.join(", "),
            threshold = defaults.answers.confidence_threshold,
            fallback = defaults.answers.fallback_message,
            leaf_size = defaults.answers.leaf_size,
            entries = defaults.storage.entries_file,
            vectors = defaults.storage.vectors_file,
            metadata = defaults.storage.metadata_file,
            model_file = defaults.storage.model_file,
        )
    }
}
