//! Lookup-table embedder.
//!
//! Maps known texts to fixed vectors. Useful wherever a test needs exact
//! control over scores, e.g. to force ties.

use ahash::AHashMap;
use async_trait::async_trait;

use crate::embedding::text_embedder::{TextEmbedder, validate_texts};
use crate::error::{Result, SemsearchError};
use crate::vector::Vector;

/// Embedder backed by an in-memory text-to-vector table.
#[derive(Debug, Clone)]
pub struct LookupTextEmbedder {
    dimension: usize,
    table: AHashMap<String, Vector>,
}

impl LookupTextEmbedder {
    /// Build the table. Every entry is L2-normalized on the way in.
    ///
    /// Fails with `ModelUnavailable` if `dimension` is 0 or an entry has a
    /// different dimension or is a zero vector.
    pub fn new<I, S>(dimension: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        if dimension == 0 {
            return Err(SemsearchError::model_unavailable(
                "lookup embedder needs a positive dimension",
            ));
        }

        let mut table = AHashMap::new();
        for (text, data) in entries {
            let text = text.into();
            let vector = Vector::new(data);
            if vector.dimension() != dimension {
                return Err(SemsearchError::model_unavailable(format!(
                    "entry {text:?} has dimension {}, expected {dimension}",
                    vector.dimension()
                )));
            }
            if vector.norm() == 0.0 || !vector.is_valid() {
                return Err(SemsearchError::model_unavailable(format!(
                    "entry {text:?} cannot be normalized"
                )));
            }
            table.insert(text, vector.normalized());
        }

        Ok(Self { dimension, table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl TextEmbedder for LookupTextEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        validate_texts(texts)?;
        texts
            .iter()
            .map(|text| {
                self.table
                    .get(*text)
                    .cloned()
                    .ok_or_else(|| SemsearchError::encoding(format!("no entry for {text:?}")))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "lookup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_returns_normalized_entries() {
        let embedder =
            LookupTextEmbedder::new(2, [("east", vec![2.0, 0.0]), ("north", vec![0.0, 5.0])])
                .unwrap();
        assert_eq!(embedder.len(), 2);

        let vectors = embedder.embed_batch(&["north", "east"]).await.unwrap();
        assert_eq!(vectors[0].data, vec![0.0, 1.0]);
        assert_eq!(vectors[1].data, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_unknown_text_is_encoding_error() {
        let embedder = LookupTextEmbedder::new(2, [("east", vec![1.0, 0.0])]).unwrap();
        assert!(matches!(
            embedder.embed("west").await,
            Err(SemsearchError::Encoding(_))
        ));
    }

    #[test]
    fn test_bad_entries_are_rejected() {
        assert!(matches!(
            LookupTextEmbedder::new(3, [("short", vec![1.0, 0.0])]),
            Err(SemsearchError::ModelUnavailable(_))
        ));
        assert!(LookupTextEmbedder::new(2, [("zero", vec![0.0, 0.0])]).is_err());
        assert!(LookupTextEmbedder::new(0, Vec::<(String, Vec<f32>)>::new()).is_err());
    }
}
