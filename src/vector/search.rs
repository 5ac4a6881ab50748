//! Similarity computation and ranking of index candidates.

pub mod ranking;
pub mod similarity;
