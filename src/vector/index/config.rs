//! Vector index configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SemsearchError};
use crate::vector::index::{FlatVectorIndex, HnswVectorIndex, VectorIndex, VectorIndexKind};

/// Graph parameters for the HNSW index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswParams {
    /// Neighbors selected per node on upper layers; layer 0 keeps up to `2 * m`.
    pub m: usize,
    /// Beam width while inserting.
    pub ef_construction: usize,
    /// Beam width while searching (raised to `k` when `k` is larger).
    pub ef_search: usize,
    /// Seed for layer assignment, so rebuilding from the same inserts yields the same graph.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            seed: 42,
        }
    }
}

impl HnswParams {
    /// Set the M parameter (connections per node).
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set the ef_construction parameter.
    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    /// Set the ef_search parameter.
    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    /// Maximum connections kept on layer 0.
    pub fn m0(&self) -> usize {
        self.m * 2
    }

    /// Level multiplier `1 / ln(m)`.
    pub fn level_multiplier(&self) -> f64 {
        1.0 / (self.m.max(2) as f64).ln()
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(SemsearchError::invalid_config("M must be > 0"));
        }
        if self.ef_construction < self.m {
            return Err(SemsearchError::invalid_config("ef_construction must be >= M"));
        }
        if self.ef_search == 0 {
            return Err(SemsearchError::invalid_config("ef_search must be > 0"));
        }
        Ok(())
    }
}

/// Configuration for building a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Vector dimension; every inserted and queried vector must match it.
    pub dimension: usize,
    /// Backing structure.
    #[serde(default)]
    pub kind: VectorIndexKind,
    /// Used when `kind` is `hnsw`.
    #[serde(default)]
    pub hnsw: HnswParams,
}

impl VectorIndexConfig {
    /// Exact flat index of the given dimension.
    pub fn flat(dimension: usize) -> Self {
        Self {
            dimension,
            kind: VectorIndexKind::Flat,
            hnsw: HnswParams::default(),
        }
    }

    /// HNSW index of the given dimension.
    pub fn hnsw(dimension: usize, params: HnswParams) -> Self {
        Self {
            dimension,
            kind: VectorIndexKind::Hnsw,
            hnsw: params,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(SemsearchError::invalid_config("dimension must be > 0"));
        }
        if self.kind == VectorIndexKind::Hnsw {
            self.hnsw.validate()?;
        }
        Ok(())
    }

    /// Build an empty index.
    pub fn build(&self) -> Result<Box<dyn VectorIndex>> {
        self.validate()?;
        Ok(match self.kind {
            VectorIndexKind::Flat => Box::new(FlatVectorIndex::new(self.dimension)?),
            VectorIndexKind::Hnsw => {
                Box::new(HnswVectorIndex::new(self.dimension, self.hnsw.clone())?)
            }
        })
    }
}
