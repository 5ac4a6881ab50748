//! Semantic search service.
//!
//! [`SemanticSearchService`] owns a vector index and a document store and
//! keeps them in lockstep: the slot an index assigns on insert is the slot the
//! document store records. Both live behind one `parking_lot::RwLock`, so
//! concurrent writers are serialized and readers see either the state before
//! or after an insertion, never a half-applied one.
//!
//! Text is embedded before any guard is taken, so a slow model never blocks
//! searches.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::document::DocumentStore;
use crate::embedding::text_embedder::{TextEmbedder, validate_texts};
use crate::error::{Result, SemsearchError};
use crate::vector::index::{VectorIndex, VectorIndexConfig, VectorIndexKind};
use crate::vector::core::vector::UNIT_NORM_TOLERANCE;
use crate::vector::{Slot, Vector};

/// A ranked hit: the original text and its inner-product score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub slot: Slot,
    pub text: String,
    pub score: f32,
}

/// Point-in-time counters of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub document_count: usize,
    pub dimension: usize,
    pub index_kind: VectorIndexKind,
    pub embedder: String,
}

/// Everything needed to rebuild an identical service.
///
/// Vectors and texts are both in slot order, so `vectors[i]` belongs to
/// `documents[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub created_at: DateTime<Utc>,
    pub embedder: String,
    pub index: VectorIndexConfig,
    pub vectors: Vec<Vector>,
    pub documents: Vec<String>,
}

impl ServiceSnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Check the snapshot is internally consistent.
    pub fn validate(&self) -> Result<()> {
        self.index.validate()?;
        if self.vectors.len() != self.documents.len() {
            return Err(SemsearchError::serialization(format!(
                "snapshot holds {} vectors but {} documents",
                self.vectors.len(),
                self.documents.len()
            )));
        }
        Ok(())
    }
}

struct State {
    index: Box<dyn VectorIndex>,
    documents: DocumentStore,
}

impl State {
    /// Insert a vector and record its text under the caller's write guard.
    fn append(&mut self, vector: &Vector, text: &str) -> Result<Slot> {
        let expected = self.documents.next_slot();
        if self.index.len() as Slot != expected {
            return Err(SemsearchError::slot_out_of_order(
                expected,
                self.index.len() as Slot,
            ));
        }
        let slot = self.index.insert(vector)?;
        self.documents.record(slot, text)?;
        Ok(slot)
    }
}

/// Incrementally updated semantic index over a document collection.
pub struct SemanticSearchService {
    embedder: Arc<dyn TextEmbedder>,
    index_config: VectorIndexConfig,
    state: RwLock<State>,
}

impl fmt::Debug for SemanticSearchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticSearchService")
            .field("embedder", &self.embedder.name())
            .field("index", &self.index_config)
            .field("document_count", &self.len())
            .finish()
    }
}

impl SemanticSearchService {
    /// Create an empty service.
    ///
    /// Fails with `DimensionMismatch` when the embedder and the index disagree
    /// on the vector dimension.
    pub fn new(embedder: Arc<dyn TextEmbedder>, index_config: VectorIndexConfig) -> Result<Self> {
        if embedder.dimension() != index_config.dimension {
            return Err(SemsearchError::dimension_mismatch(
                index_config.dimension,
                embedder.dimension(),
            ));
        }
        let index = index_config.build()?;
        debug!(
            "created service: embedder={} index={} dimension={}",
            embedder.name(),
            index.kind().name(),
            index.dimension()
        );

        Ok(Self {
            embedder,
            index_config,
            state: RwLock::new(State {
                index,
                documents: DocumentStore::new(),
            }),
        })
    }

    /// Rebuild a service from a snapshot, re-inserting vectors in slot order.
    ///
    /// The embedder is not re-run; it only has to produce vectors of the
    /// snapshot's dimension for future adds and queries.
    pub fn from_snapshot(embedder: Arc<dyn TextEmbedder>, snapshot: ServiceSnapshot) -> Result<Self> {
        snapshot.validate()?;
        if snapshot.embedder != embedder.name() {
            warn!(
                "snapshot was built with embedder {}, restoring with {}",
                snapshot.embedder,
                embedder.name()
            );
        }

        let service = Self::new(embedder, snapshot.index)?;
        {
            let mut state = service.state.write();
            for (vector, text) in snapshot.vectors.iter().zip(&snapshot.documents) {
                vector.validate(state.index.dimension())?;
                state.append(vector, text)?;
            }
        }
        debug!("restored {} documents from snapshot", service.len());
        Ok(service)
    }

    /// Embed `text` and append it, returning its slot.
    ///
    /// Blank text is rejected with `Encoding` before the embedder or index is
    /// touched.
    pub async fn add_document(&self, text: &str) -> Result<Slot> {
        validate_texts(&[text])?;
        let vector = self.embedder.embed(text).await?;
        let vector = self.checked(vector)?;

        let slot = self.state.write().append(&vector, text)?;
        debug!("added document at slot {slot}");
        Ok(slot)
    }

    /// Embed all `texts` in one batch and append them in order.
    ///
    /// Nothing is inserted unless every text embeds successfully. The returned
    /// slots are contiguous.
    pub async fn add_documents(&self, texts: &[&str]) -> Result<Vec<Slot>> {
        validate_texts(texts)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(SemsearchError::encoding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        let vectors = vectors
            .into_iter()
            .map(|vector| self.checked(vector))
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.state.write();
        let mut slots = Vec::with_capacity(texts.len());
        for (vector, text) in vectors.iter().zip(texts) {
            slots.push(state.append(vector, text)?);
        }
        drop(state);

        debug!("added {} documents", slots.len());
        Ok(slots)
    }

    /// Return at most `k` documents ranked by similarity to `query`.
    ///
    /// Fails with `InvalidArgument` when `k` is 0. Ties keep insertion order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(SemsearchError::invalid_argument("k must be positive"));
        }
        validate_texts(&[query])?;
        let vector = self.checked(self.embedder.embed(query).await?)?;

        let state = self.state.read();
        let hits = state.index.search(&vector, k)?;
        let slots: Vec<Slot> = hits.iter().map(|hit| hit.slot).collect();
        let texts = state.documents.resolve(&slots);
        drop(state);

        let mut results = Vec::with_capacity(hits.len());
        for (hit, text) in hits.into_iter().zip(texts) {
            match text {
                Some(text) => results.push(SearchResult {
                    slot: hit.slot,
                    text,
                    score: hit.score,
                }),
                None => warn!("index returned slot {} with no document", hit.slot),
            }
        }

        debug!("search returned {} of k={k} results", results.len());
        Ok(results)
    }

    /// Number of documents added so far.
    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.index_config.dimension
    }

    pub fn embedder(&self) -> &Arc<dyn TextEmbedder> {
        &self.embedder
    }

    pub fn stats(&self) -> ServiceStats {
        let state = self.state.read();
        ServiceStats {
            document_count: state.documents.len(),
            dimension: state.index.dimension(),
            index_kind: state.index.kind(),
            embedder: self.embedder.name().to_string(),
        }
    }

    /// Export every vector and text in slot order.
    pub fn snapshot(&self) -> ServiceSnapshot {
        let state = self.state.read();
        ServiceSnapshot {
            created_at: Utc::now(),
            embedder: self.embedder.name().to_string(),
            index: self.index_config.clone(),
            vectors: state.index.vectors(),
            documents: state.documents.texts().to_vec(),
        }
    }

    fn checked(&self, vector: Vector) -> Result<Vector> {
        vector.validate(self.index_config.dimension)?;
        if !vector.is_unit(UNIT_NORM_TOLERANCE) {
            return Err(SemsearchError::encoding(format!(
                "embedder returned a vector with norm {}",
                vector.norm()
            )));
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{HashingTextEmbedder, LookupTextEmbedder};
    use crate::vector::index::HnswParams;
    use async_trait::async_trait;

    /// Returns the same unnormalized vector for every text.
    #[derive(Debug)]
    struct ScaledEmbedder;

    #[async_trait]
    impl TextEmbedder for ScaledEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
            Ok(texts.iter().map(|_| Vector::new(vec![2.0, 0.0])).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn hashing_service(dimension: usize) -> SemanticSearchService {
        let embedder = Arc::new(HashingTextEmbedder::new(dimension).unwrap());
        SemanticSearchService::new(embedder, VectorIndexConfig::flat(dimension)).unwrap()
    }

    #[test]
    fn test_dimension_mismatch_at_construction() {
        let embedder = Arc::new(HashingTextEmbedder::new(8).unwrap());
        match SemanticSearchService::new(embedder, VectorIndexConfig::flat(16)) {
            Err(SemsearchError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 8);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slots_follow_insertion_order() {
        let service = hashing_service(32);
        assert!(service.is_empty());
        assert_eq!(service.add_document("alpha").await.unwrap(), 0);
        assert_eq!(service.add_document("beta").await.unwrap(), 1);
        assert_eq!(
            service.add_documents(&["gamma", "delta"]).await.unwrap(),
            vec![2, 3]
        );
        assert_eq!(service.len(), 4);
    }

    #[tokio::test]
    async fn test_blank_text_leaves_state_untouched() {
        let service = hashing_service(16);
        service.add_document("kept").await.unwrap();

        assert!(matches!(
            service.add_document(" \t").await,
            Err(SemsearchError::Encoding(_))
        ));
        assert!(service.add_documents(&["fine", ""]).await.is_err());
        assert_eq!(service.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_k_is_invalid() {
        let service = hashing_service(16);
        service.add_document("anything").await.unwrap();
        assert!(matches!(
            service.search("anything", 0).await,
            Err(SemsearchError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_non_unit_embedding_is_rejected() {
        let service =
            SemanticSearchService::new(Arc::new(ScaledEmbedder), VectorIndexConfig::flat(2))
                .unwrap();

        match service.add_document("loud").await {
            Err(SemsearchError::Encoding(msg)) => assert!(msg.contains("norm")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(service.add_documents(&["a", "b"]).await.is_err());
        assert!(matches!(
            service.search("loud", 1).await,
            Err(SemsearchError::Encoding(_))
        ));
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn test_slot_without_document_is_dropped() {
        let service = hashing_service(32);
        service.add_document("kept").await.unwrap();

        // An index entry past the document store has no text to report.
        let orphan = service.embedder().embed("orphan").await.unwrap();
        service.state.write().index.insert(&orphan).unwrap();

        let results = service.search("orphan", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].slot, 0);
        assert_eq!(results[0].text, "kept");
    }

    #[tokio::test]
    async fn test_ties_break_by_slot() {
        let embedder = Arc::new(
            LookupTextEmbedder::new(
                2,
                [
                    ("a", vec![1.0, 0.0]),
                    ("b", vec![1.0, 0.0]),
                    ("c", vec![0.0, 1.0]),
                    ("q", vec![1.0, 0.0]),
                ],
            )
            .unwrap(),
        );
        let service = SemanticSearchService::new(embedder, VectorIndexConfig::flat(2)).unwrap();
        service.add_documents(&["c", "b", "a"]).await.unwrap();

        let results = service.search("q", 3).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "a", "c"]);
        assert_eq!(results[0].score, results[1].score);
    }

    #[tokio::test]
    async fn test_snapshot_restores_same_results() {
        let embedder = Arc::new(HashingTextEmbedder::new(24).unwrap());
        let service = SemanticSearchService::new(
            embedder.clone(),
            VectorIndexConfig::hnsw(24, HnswParams::default().with_m(4)),
        )
        .unwrap();
        service
            .add_documents(&["red apple", "green pear", "blue sky", "apple pie"])
            .await
            .unwrap();

        let snapshot = service.snapshot();
        assert_eq!(snapshot.len(), 4);
        let restored = SemanticSearchService::from_snapshot(embedder, snapshot).unwrap();

        assert_eq!(restored.stats(), service.stats());
        assert_eq!(
            restored.search("apple", 4).await.unwrap(),
            service.search("apple", 4).await.unwrap()
        );
    }

    #[test]
    fn test_inconsistent_snapshot_is_rejected() {
        let embedder = Arc::new(HashingTextEmbedder::new(4).unwrap());
        let snapshot = ServiceSnapshot {
            created_at: Utc::now(),
            embedder: embedder.name().to_string(),
            index: VectorIndexConfig::flat(4),
            vectors: vec![],
            documents: vec!["orphan".to_string()],
        };
        assert!(matches!(
            SemanticSearchService::from_snapshot(embedder, snapshot),
            Err(SemsearchError::Serialization(_))
        ));
    }
}
