//! HNSW (Hierarchical Navigable Small World) index for approximate search.
//!
//! The graph has one layer per level; every node lives on layer 0 and on a
//! random number of layers above it. Search descends greedily through the
//! upper layers and then runs a beam search of width `max(ef_search, k)` on
//! layer 0.
//!
//! Layer assignment is driven by a seeded RNG, so replaying the same inserts
//! rebuilds the same graph. While the index holds no more vectors than the
//! beam width, search scans every vector exhaustively.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use bit_vec::BitVec;
use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::vector::index::{HnswParams, VectorIndex, VectorIndexKind};
use crate::vector::search::ranking::top_k;
use crate::vector::search::similarity::inner_product;
use crate::vector::{ScoredSlot, Slot, Vector};

/// Upper bound on node levels; reached with negligible probability.
const MAX_LEVEL: usize = 16;

/// A node's adjacency lists, one per layer it lives on.
#[derive(Debug, Clone)]
struct HnswNode {
    neighbors: Vec<Vec<usize>>,
}

impl HnswNode {
    fn new(level: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); level + 1],
        }
    }

    fn level(&self) -> usize {
        self.neighbors.len() - 1
    }
}

/// Search candidate. Ordered so that the better hit is the greater value:
/// higher score first, then lower id.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    id: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Approximate inner-product index.
#[derive(Debug)]
pub struct HnswVectorIndex {
    params: HnswParams,
    dimension: usize,
    data: Vec<f32>,
    nodes: Vec<HnswNode>,
    entry_point: Option<usize>,
    max_level: usize,
    rng: StdRng,
}

impl HnswVectorIndex {
    /// Create an empty graph for vectors of `dimension` components.
    pub fn new(dimension: usize, params: HnswParams) -> Result<Self> {
        crate::vector::index::VectorIndexConfig::hnsw(dimension, params.clone()).validate()?;
        let rng = StdRng::seed_from_u64(params.seed);
        Ok(Self {
            params,
            dimension,
            data: Vec::new(),
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            rng,
        })
    }

    /// Graph parameters.
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    fn slice(&self, id: usize) -> &[f32] {
        let start = id * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn score(&self, query: &[f32], id: usize) -> Candidate {
        Candidate {
            score: inner_product(query, self.slice(id)),
            id,
        }
    }

    /// Draw a level from the geometric distribution `floor(-ln(U) * mL)`.
    fn select_level(&mut self) -> usize {
        // 1 - U lies in (0, 1], keeping ln finite.
        let uniform: f64 = 1.0 - self.rng.random::<f64>();
        let level = (-uniform.ln() * self.params.level_multiplier()).floor() as usize;
        level.min(MAX_LEVEL)
    }

    /// Beam search on one layer. Returns up to `ef` candidates, best first.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[usize],
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let mut visited = BitVec::from_elem(self.nodes.len(), false);
        let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut found: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();

        for &entry in entry_points {
            if visited.get(entry).unwrap_or(true) {
                continue;
            }
            visited.set(entry, true);
            let candidate = self.score(query, entry);
            frontier.push(candidate);
            found.push(Reverse(candidate));
        }
        while found.len() > ef {
            found.pop();
        }

        while let Some(current) = frontier.pop() {
            if let Some(Reverse(worst)) = found.peek()
                && found.len() >= ef
                && current < *worst
            {
                break;
            }

            let Some(neighbors) = self.nodes[current.id].neighbors.get(layer) else {
                continue;
            };
            for &neighbor in neighbors {
                if visited.get(neighbor).unwrap_or(true) {
                    continue;
                }
                visited.set(neighbor, true);

                let candidate = self.score(query, neighbor);
                let admit = match found.peek() {
                    Some(Reverse(worst)) => found.len() < ef || candidate > *worst,
                    None => true,
                };
                if admit {
                    frontier.push(candidate);
                    found.push(Reverse(candidate));
                    if found.len() > ef {
                        found.pop();
                    }
                }
            }
        }

        let mut result: Vec<Candidate> = found.into_iter().map(|Reverse(c)| c).collect();
        result.sort_unstable_by(|a, b| b.cmp(a));
        result
    }

    /// Greedy descent from the entry point down to `target_layer + 1`.
    fn descend(&self, query: &[f32], entry: usize, from_layer: usize, target_layer: usize) -> usize {
        let mut current = entry;
        let mut layer = from_layer;
        while layer > target_layer {
            if let Some(best) = self.search_layer(query, &[current], 1, layer).first() {
                current = best.id;
            }
            layer -= 1;
        }
        current
    }

    /// Keep only the `max_connections` closest neighbors of `id` on `layer`.
    fn prune(&mut self, id: usize, layer: usize, max_connections: usize) {
        let base = self.slice(id);
        let mut scored: Vec<Candidate> = self.nodes[id].neighbors[layer]
            .iter()
            .map(|&neighbor| Candidate {
                score: inner_product(base, self.slice(neighbor)),
                id: neighbor,
            })
            .collect();
        scored.sort_unstable_by(|a, b| b.cmp(a));
        scored.truncate(max_connections);
        self.nodes[id].neighbors[layer] = scored.into_iter().map(|c| c.id).collect();
    }

    fn exhaustive(&self, query: &[f32], k: usize) -> Vec<ScoredSlot> {
        let hits = (0..self.nodes.len())
            .map(|id| ScoredSlot::new(id as Slot, inner_product(query, self.slice(id))))
            .collect();
        top_k(hits, k)
    }
}

impl VectorIndex for HnswVectorIndex {
    fn insert(&mut self, vector: &Vector) -> Result<Slot> {
        vector.validate(self.dimension)?;
        let query = vector.as_slice();

        let id = self.nodes.len();
        let level = self.select_level();
        self.data.extend_from_slice(query);
        self.nodes.push(HnswNode::new(level));

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return Ok(id as Slot);
        };

        let top_layer = level.min(self.max_level);
        let start = self.descend(query, entry, self.max_level, top_layer);
        let mut entry_points = vec![start];

        for layer in (0..=top_layer).rev() {
            let candidates =
                self.search_layer(query, &entry_points, self.params.ef_construction, layer);
            let max_connections = if layer == 0 {
                self.params.m0()
            } else {
                self.params.m
            };

            let selected: Vec<usize> = candidates
                .iter()
                .filter(|c| c.id != id)
                .take(self.params.m)
                .map(|c| c.id)
                .collect();
            self.nodes[id].neighbors[layer] = selected.clone();

            for &neighbor in &selected {
                self.nodes[neighbor].neighbors[layer].push(id);
                if self.nodes[neighbor].neighbors[layer].len() > max_connections {
                    self.prune(neighbor, layer, max_connections);
                }
            }

            entry_points = candidates.into_iter().map(|c| c.id).collect();
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }

        trace!("hnsw index: stored vector at slot {id} on level {level}");
        Ok(id as Slot)
    }

    fn search(&self, query: &Vector, k: usize) -> Result<Vec<ScoredSlot>> {
        query.validate(self.dimension)?;
        let Some(entry) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = query.as_slice();
        let ef = self.params.ef_search.max(k);
        if self.nodes.len() <= ef {
            return Ok(self.exhaustive(query, k));
        }

        let start = self.descend(query, entry, self.max_level, 0);
        let hits = self
            .search_layer(query, &[start], ef, 0)
            .into_iter()
            .map(|c| ScoredSlot::new(c.id as Slot, c.score))
            .collect();
        Ok(top_k(hits, k))
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> VectorIndexKind {
        VectorIndexKind::Hnsw
    }

    fn vector(&self, slot: Slot) -> Option<Vector> {
        let id = usize::try_from(slot).ok()?;
        if id >= self.nodes.len() {
            return None;
        }
        Some(Vector::new(self.slice(id).to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::SemsearchError;
    use crate::vector::index::FlatVectorIndex;

    fn random_unit_vectors(count: usize, dimension: usize, seed: u64) -> Vec<Vector> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let data = (0..dimension).map(|_| rng.random::<f32>() - 0.5).collect();
                Vector::new(data).normalized()
            })
            .collect()
    }

    #[test]
    fn test_insert_assigns_sequential_slots() {
        let mut index = HnswVectorIndex::new(8, HnswParams::default()).unwrap();
        for (expected, vector) in random_unit_vectors(50, 8, 1).iter().enumerate() {
            assert_eq!(index.insert(vector).unwrap(), expected as Slot);
        }
        assert_eq!(index.len(), 50);
    }

    #[test]
    fn test_small_index_returns_everything() {
        let mut index = HnswVectorIndex::new(4, HnswParams::default()).unwrap();
        for vector in random_unit_vectors(5, 4, 2) {
            index.insert(&vector).unwrap();
        }
        let query = random_unit_vectors(1, 4, 3).remove(0);
        let hits = index.search(&query, 10).unwrap();
        assert_eq!(hits.len(), 5);
        let slots: HashSet<_> = hits.iter().map(|h| h.slot).collect();
        assert_eq!(slots.len(), 5);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_recall_against_flat() {
        let params = HnswParams::default()
            .with_m(16)
            .with_ef_construction(100)
            .with_ef_search(50);
        let mut hnsw = HnswVectorIndex::new(32, params).unwrap();
        let mut flat = FlatVectorIndex::new(32).unwrap();
        for vector in random_unit_vectors(600, 32, 7) {
            hnsw.insert(&vector).unwrap();
            flat.insert(&vector).unwrap();
        }

        let k = 10;
        let queries = random_unit_vectors(20, 32, 8);
        let mut found = 0usize;
        for query in &queries {
            let truth: HashSet<_> = flat.search(query, k).unwrap().iter().map(|h| h.slot).collect();
            let approx = hnsw.search(query, k).unwrap();
            assert_eq!(approx.len(), k);
            assert!(approx.windows(2).all(|w| w[0].score >= w[1].score));
            found += approx.iter().filter(|h| truth.contains(&h.slot)).count();
        }
        let recall = found as f64 / (k * queries.len()) as f64;
        assert!(recall >= 0.8, "recall too low: {recall}");
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let vectors = random_unit_vectors(300, 16, 11);
        let build = || {
            let params = HnswParams::default().with_ef_search(10);
            let mut index = HnswVectorIndex::new(16, params).unwrap();
            for vector in &vectors {
                index.insert(vector).unwrap();
            }
            index
        };
        let (a, b) = (build(), build());
        let query = random_unit_vectors(1, 16, 12).remove(0);
        assert_eq!(a.search(&query, 5).unwrap(), b.search(&query, 5).unwrap());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = HnswVectorIndex::new(4, HnswParams::default()).unwrap();
        assert!(matches!(
            index.insert(&Vector::new(vec![1.0, 0.0])),
            Err(SemsearchError::DimensionMismatch { expected: 4, actual: 2 })
        ));
        assert!(index.is_empty());
        assert!(index.search(&Vector::new(vec![1.0; 3]), 1).is_err());
    }
}
