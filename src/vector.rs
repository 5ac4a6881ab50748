//! Vector storage and nearest-neighbor search.
//!
//! # Module Structure
//!
//! - `core`: the [`Vector`] type
//! - `index`: the [`VectorIndex`](index::VectorIndex) trait plus flat and HNSW indexes
//! - `search`: inner-product similarity and result ranking

pub mod core;
pub mod index;
pub mod search;

pub use self::core::vector::Vector;
pub use self::search::ranking::ScoredSlot;

/// Position of a vector in an index, assigned in insertion order starting at 0.
pub type Slot = u64;
