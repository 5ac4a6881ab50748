//! Flat vector index for exact search.
//!
//! Vectors are kept in one contiguous buffer in slot order. Insertion appends
//! `d` floats; search scores every stored vector and keeps the top `k`.

use log::trace;
use rayon::prelude::*;

use crate::error::{Result, SemsearchError};
use crate::vector::index::{VectorIndex, VectorIndexKind};
use crate::vector::search::ranking::top_k;
use crate::vector::search::similarity::inner_product;
use crate::vector::{ScoredSlot, Slot, Vector};

/// Collections at least this large are scored on the rayon pool.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// Exact (brute force) inner-product index.
#[derive(Debug, Clone)]
pub struct FlatVectorIndex {
    dimension: usize,
    /// `[v0_d0, .., v0_dn, v1_d0, ..]`
    data: Vec<f32>,
}

impl FlatVectorIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(SemsearchError::invalid_config("dimension must be > 0"));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Create an empty index with room for `capacity` vectors.
    pub fn with_capacity(dimension: usize, capacity: usize) -> Result<Self> {
        let mut index = Self::new(dimension)?;
        index.data.reserve(capacity * dimension);
        Ok(index)
    }

    fn slice(&self, slot: usize) -> &[f32] {
        let start = slot * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn score_all(&self, query: &[f32]) -> Vec<ScoredSlot> {
        let score = |(slot, stored): (usize, &[f32])| {
            ScoredSlot::new(slot as Slot, inner_product(query, stored))
        };

        if self.len() >= PARALLEL_SCAN_THRESHOLD {
            self.data
                .par_chunks_exact(self.dimension)
                .enumerate()
                .map(score)
                .collect()
        } else {
            self.data
                .chunks_exact(self.dimension)
                .enumerate()
                .map(score)
                .collect()
        }
    }
}

impl VectorIndex for FlatVectorIndex {
    fn insert(&mut self, vector: &Vector) -> Result<Slot> {
        vector.validate(self.dimension)?;

        let slot = self.len() as Slot;
        self.data.extend_from_slice(vector.as_slice());
        trace!("flat index: stored vector at slot {slot}");
        Ok(slot)
    }

    fn search(&self, query: &Vector, k: usize) -> Result<Vec<ScoredSlot>> {
        query.validate(self.dimension)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        Ok(top_k(self.score_all(query.as_slice()), k))
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> VectorIndexKind {
        VectorIndexKind::Flat
    }

    fn vector(&self, slot: Slot) -> Option<Vector> {
        let slot = usize::try_from(slot).ok()?;
        if slot >= self.len() {
            return None;
        }
        Some(Vector::new(self.slice(slot).to_vec()))
    }
}
