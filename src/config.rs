//! Application configuration.
//!
//! Loaded from a JSON file; every field has a default, so an empty object
//! `{}` is a valid configuration.
//!
//! ```json
//! {
//!   "embedding_model": "hashing",
//!   "dimension": 384,
//!   "index": { "dimension": 384, "kind": "hnsw", "hnsw": { "m": 16 } },
//!   "store_path": "./storage/index.bin",
//!   "top_k": 4,
//!   "use_web": false
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::{HashingTextEmbedder, TextEmbedder};
use crate::error::{Result, SemsearchError};
use crate::vector::index::VectorIndexConfig;

/// Model identifier selecting the built-in [`HashingTextEmbedder`].
pub const HASHING_MODEL: &str = "hashing";

pub const DEFAULT_DIMENSION: usize = 384;
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_STORE_PATH: &str = "./storage/index.bin";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemsearchConfig {
    /// `"hashing"`, or a model directory / Hub identifier when built with
    /// the `embeddings-candle` feature.
    pub embedding_model: String,
    /// Embedding dimension. Must equal `index.dimension`.
    pub dimension: usize,
    pub index: VectorIndexConfig,
    /// Where the CLI keeps its snapshot.
    pub store_path: PathBuf,
    /// Default number of passages to retrieve.
    pub top_k: usize,
    /// Whether retrieval also queries the web provider.
    pub use_web: bool,
}

impl Default for SemsearchConfig {
    fn default() -> Self {
        Self {
            embedding_model: HASHING_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            index: VectorIndexConfig::flat(DEFAULT_DIMENSION),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            top_k: DEFAULT_TOP_K,
            use_web: false,
        }
    }
}

impl SemsearchConfig {
    /// Read and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(SemsearchError::invalid_config("embedding_model must not be empty"));
        }
        if self.top_k == 0 {
            return Err(SemsearchError::invalid_config("top_k must be > 0"));
        }
        if self.dimension != self.index.dimension {
            return Err(SemsearchError::invalid_config(format!(
                "dimension {} does not match index dimension {}",
                self.dimension, self.index.dimension
            )));
        }
        self.index.validate()
    }

    /// Construct the configured embedder.
    ///
    /// Fails with `ModelUnavailable` when the model cannot be loaded or
    /// produces vectors of a different dimension than configured.
    pub fn build_embedder(&self) -> Result<Arc<dyn TextEmbedder>> {
        let embedder: Arc<dyn TextEmbedder> = if self.embedding_model == HASHING_MODEL {
            Arc::new(HashingTextEmbedder::new(self.dimension)?)
        } else {
            load_model(&self.embedding_model)?
        };

        if embedder.dimension() != self.dimension {
            return Err(SemsearchError::model_unavailable(format!(
                "model {} produces {}-dimensional vectors, configured {}",
                self.embedding_model,
                embedder.dimension(),
                self.dimension
            )));
        }
        Ok(embedder)
    }
}

#[cfg(feature = "embeddings-candle")]
fn load_model(model: &str) -> Result<Arc<dyn TextEmbedder>> {
    Ok(Arc::new(
        crate::embedding::candle_text_embedder::CandleTextEmbedder::new(model)?,
    ))
}

#[cfg(not(feature = "embeddings-candle"))]
fn load_model(model: &str) -> Result<Arc<dyn TextEmbedder>> {
    Err(SemsearchError::model_unavailable(format!(
        "model {model} requires the embeddings-candle feature"
    )))
}
