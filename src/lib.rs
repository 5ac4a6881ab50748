//! # semsearch
//!
//! Semantic search core for retrieval-augmented question answering.
//!
//! ## Features
//!
//! - Pluggable text embedders producing L2-normalized sentence vectors
//! - Exact flat and approximate HNSW inner-product indexes
//! - Slot-consistent mapping from index positions back to source text
//! - Concurrent-safe incremental insertion and search
//! - Checksummed snapshot files
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use semsearch::embedding::HashingTextEmbedder;
//! use semsearch::service::SemanticSearchService;
//! use semsearch::vector::index::VectorIndexConfig;
//!
//! # tokio_test::block_on(async {
//! let embedder = Arc::new(HashingTextEmbedder::new(384)?);
//! let service = SemanticSearchService::new(embedder, VectorIndexConfig::flat(384))?;
//!
//! service.add_document("个人电脑").await?;
//! service.add_document("医生的办公室").await?;
//!
//! let results = service.search("笔记本电脑", 1).await?;
//! assert_eq!(results[0].text, "个人电脑");
//! # Ok::<(), semsearch::error::SemsearchError>(())
//! # }).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod persistence;
pub mod retrieval;
pub mod service;
pub mod vector;

pub mod prelude {
    pub use crate::config::SemsearchConfig;
    pub use crate::embedding::{HashingTextEmbedder, LookupTextEmbedder, TextEmbedder};
    pub use crate::error::{Result, SemsearchError};
    pub use crate::retrieval::{RetrievalContext, Retriever, WebSearchProvider};
    pub use crate::service::{SearchResult, SemanticSearchService, ServiceSnapshot};
    pub use crate::vector::index::{HnswParams, VectorIndex, VectorIndexConfig, VectorIndexKind};
    pub use crate::vector::{ScoredSlot, Slot, Vector};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
