//! Ordering of index candidates.
//!
//! Every index returns hits in the same order: descending score, and for equal
//! scores ascending slot, so the earlier-inserted document wins ties and the
//! output is reproducible.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::vector::Slot;

/// A slot paired with its similarity to a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredSlot {
    pub slot: Slot,
    pub score: f32,
}

impl ScoredSlot {
    pub fn new(slot: Slot, score: f32) -> Self {
        Self { slot, score }
    }
}

/// Total ranking order: better hits compare as `Less`.
#[inline]
pub fn rank_order(a: &ScoredSlot, b: &ScoredSlot) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.slot.cmp(&b.slot))
}

/// Sort hits into ranking order.
pub fn sort_ranked(hits: &mut [ScoredSlot]) {
    hits.sort_unstable_by(rank_order);
}

/// Keep the `k` best hits, in ranking order.
pub fn top_k(mut candidates: Vec<ScoredSlot>, k: usize) -> Vec<ScoredSlot> {
    if k == 0 {
        return Vec::new();
    }
    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, rank_order);
        candidates.truncate(k);
    }
    sort_ranked(&mut candidates);
    candidates
}
