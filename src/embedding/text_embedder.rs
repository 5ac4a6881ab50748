//! Text embedding trait for the semantic search pipeline.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::{Result, SemsearchError};
use crate::vector::Vector;

/// Trait for converting text to vector embeddings.
///
/// Implementations acquire their model once at construction and are pure
/// afterwards: the same input always yields the same vector. Every returned
/// vector has [`dimension`](Self::dimension) components and unit L2 norm.
#[async_trait]
pub trait TextEmbedder: Send + Sync + Debug {
    /// Generate embeddings for multiple texts in batch.
    ///
    /// # Arguments
    ///
    /// * `texts` - A slice of text strings to embed
    ///
    /// # Returns
    ///
    /// One vector per input, in input order. An empty batch yields an empty
    /// result. Fails with `Encoding` if any text is blank after trimming or
    /// cannot be tokenized.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>>;

    /// Generate an embedding vector for a single text.
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| SemsearchError::encoding("embedder returned no vector"))
    }

    /// Get the dimension of generated embeddings.
    fn dimension(&self) -> usize;

    /// Get the name/identifier of this embedder (e.g. a model name).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Reject blank inputs before any model work happens.
pub fn validate_texts(texts: &[&str]) -> Result<()> {
    if let Some(position) = texts.iter().position(|text| text.trim().is_empty()) {
        return Err(SemsearchError::encoding(format!(
            "input {position} is empty after trimming"
        )));
    }
    Ok(())
}
