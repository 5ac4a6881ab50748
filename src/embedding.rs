//! Text embedding support for semantic search.
//!
//! This module provides the [`TextEmbedder`](text_embedder::TextEmbedder) trait,
//! which turns text into L2-normalized fixed-dimension vectors, plus a few
//! implementations:
//!
//! - [`HashingTextEmbedder`](hashing_text_embedder::HashingTextEmbedder) - a
//!   deterministic, model-free embedder built on token hashing
//! - [`LookupTextEmbedder`](lookup_text_embedder::LookupTextEmbedder) - a fixed
//!   text-to-vector table, handy for tests
//! - `CandleTextEmbedder` - BERT sentence-transformers run locally with
//!   HuggingFace Candle (requires the `embeddings-candle` feature)
//!
//! # Feature Flags
//!
//! - `embeddings-candle` - HuggingFace Candle implementation (local inference)
//!
//! # Custom Implementation
//!
//! ```
//! use async_trait::async_trait;
//! use semsearch::embedding::text_embedder::TextEmbedder;
//! use semsearch::error::Result;
//! use semsearch::vector::Vector;
//!
//! #[derive(Debug)]
//! struct MyEmbedder {
//!     dimension: usize,
//! }
//!
//! #[async_trait]
//! impl TextEmbedder for MyEmbedder {
//!     async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
//!         let mut unit = vec![0.0; self.dimension];
//!         unit[0] = 1.0;
//!         Ok(texts.iter().map(|_| Vector::new(unit.clone())).collect())
//!     }
//!
//!     fn dimension(&self) -> usize {
//!         self.dimension
//!     }
//! }
//! ```

pub mod hashing_text_embedder;
pub mod lookup_text_embedder;
pub mod pooling;
pub mod text_embedder;

// Candle implementation (requires feature flag)
#[cfg(feature = "embeddings-candle")]
pub mod candle_text_embedder;

pub use hashing_text_embedder::HashingTextEmbedder;
pub use lookup_text_embedder::LookupTextEmbedder;
pub use text_embedder::TextEmbedder;

#[cfg(feature = "embeddings-candle")]
pub use candle_text_embedder::CandleTextEmbedder;
