//! Vector index implementations.
//!
//! An index stores unit vectors in insertion order and answers top-k
//! inner-product queries. Slots are assigned by the index on insert, starting
//! at 0, and are never reused or reordered.
//!
//! - [`flat::FlatVectorIndex`]: exact brute-force scan
//! - [`hnsw::HnswVectorIndex`]: approximate graph search

pub mod config;
pub mod flat;
pub mod hnsw;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vector::{ScoredSlot, Slot, Vector};

pub use config::{HnswParams, VectorIndexConfig};
pub use flat::FlatVectorIndex;
pub use hnsw::HnswVectorIndex;

/// Kind of backing search structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorIndexKind {
    /// Exact search over every stored vector.
    #[default]
    Flat,
    /// Hierarchical navigable small world graph.
    Hnsw,
}

impl VectorIndexKind {
    pub fn name(&self) -> &'static str {
        match self {
            VectorIndexKind::Flat => "flat",
            VectorIndexKind::Hnsw => "hnsw",
        }
    }
}

/// Common interface of every vector index.
pub trait VectorIndex: Send + Sync + Debug {
    /// Append a vector and return the slot it was assigned.
    ///
    /// Fails with `DimensionMismatch` if the vector's dimension differs from
    /// [`dimension`](Self::dimension).
    fn insert(&mut self, vector: &Vector) -> Result<Slot>;

    /// Return at most `k` slots ranked by inner product with `query`,
    /// descending by score and ascending by slot on ties.
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<ScoredSlot>>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Whether no vector has been inserted yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension fixed at construction.
    fn dimension(&self) -> usize;

    /// Backing structure kind.
    fn kind(&self) -> VectorIndexKind;

    /// Copy of the vector stored at `slot`.
    fn vector(&self, slot: Slot) -> Option<Vector>;

    /// Every stored vector in slot order.
    fn vectors(&self) -> Vec<Vector> {
        (0..self.len() as Slot)
            .filter_map(|slot| self.vector(slot))
            .collect()
    }
}
