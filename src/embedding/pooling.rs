//! Sentence pooling over token-level representations.
//!
//! A padded batch holds `batch * seq_len` token vectors of `dimension`
//! components, laid out row-major, plus an attention mask with one weight per
//! token (1 for real tokens, 0 for padding). Each sentence vector is the
//! mask-weighted mean of its token vectors, divided by the mask sum clamped
//! to [`MASK_SUM_EPSILON`] so degenerate all-padding rows never divide by zero.

use crate::error::{Result, SemsearchError};
use crate::vector::Vector;

/// Lower bound of the mean-pooling denominator.
pub const MASK_SUM_EPSILON: f32 = 1e-9;

/// Shape of a padded token batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchShape {
    pub batch: usize,
    pub seq_len: usize,
    pub dimension: usize,
}

impl BatchShape {
    pub fn new(batch: usize, seq_len: usize, dimension: usize) -> Self {
        Self {
            batch,
            seq_len,
            dimension,
        }
    }

    fn check(&self, embeddings: &[f32], attention_mask: &[f32]) -> Result<()> {
        let tokens = self.batch * self.seq_len;
        if embeddings.len() != tokens * self.dimension || attention_mask.len() != tokens {
            return Err(SemsearchError::encoding(format!(
                "token batch shape mismatch: expected {tokens} tokens of {} components, got {} values and {} mask weights",
                self.dimension,
                embeddings.len(),
                attention_mask.len()
            )));
        }
        Ok(())
    }
}

/// Mask-weighted mean of token vectors, one vector per sentence.
pub fn mean_pool(
    embeddings: &[f32],
    attention_mask: &[f32],
    shape: BatchShape,
) -> Result<Vec<Vector>> {
    shape.check(embeddings, attention_mask)?;
    let BatchShape {
        batch,
        seq_len,
        dimension,
    } = shape;

    let mut pooled = Vec::with_capacity(batch);
    for row in 0..batch {
        let mut sum = vec![0.0f32; dimension];
        let mut weight_sum = 0.0f32;
        for position in 0..seq_len {
            let token = row * seq_len + position;
            let weight = attention_mask[token];
            if weight == 0.0 {
                continue;
            }
            weight_sum += weight;
            let start = token * dimension;
            for (acc, value) in sum.iter_mut().zip(&embeddings[start..start + dimension]) {
                *acc += value * weight;
            }
        }

        let denominator = weight_sum.max(MASK_SUM_EPSILON);
        for value in &mut sum {
            *value /= denominator;
        }
        pooled.push(Vector::new(sum));
    }
    Ok(pooled)
}

/// Scale every vector to unit L2 norm. Zero vectors stay zero.
pub fn l2_normalize(vectors: &mut [Vector]) {
    Vector::normalize_batch(vectors);
}

/// Mean-pool and L2-normalize in one step.
pub fn mean_pool_normalized(
    embeddings: &[f32],
    attention_mask: &[f32],
    shape: BatchShape,
) -> Result<Vec<Vector>> {
    let mut vectors = mean_pool(embeddings, attention_mask, shape)?;
    l2_normalize(&mut vectors);
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_tokens_are_ignored() {
        // Two sentences, three positions, two components. The second sentence
        // has one real token followed by padding that carries garbage values.
        let embeddings = vec![
            1.0, 0.0, //
            3.0, 2.0, //
            2.0, 4.0, //
            5.0, 5.0, //
            100.0, 100.0, //
            -100.0, 7.0,
        ];
        let mask = vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0];
        let pooled = mean_pool(&embeddings, &mask, BatchShape::new(2, 3, 2)).unwrap();

        assert_eq!(pooled[0].data, vec![2.0, 2.0]);
        assert_eq!(pooled[1].data, vec![5.0, 5.0]);
    }

    #[test]
    fn test_all_padding_row_does_not_divide_by_zero() {
        let embeddings = vec![1.0, 1.0, 2.0, 2.0];
        let mask = vec![0.0, 0.0];
        let pooled = mean_pool(&embeddings, &mask, BatchShape::new(1, 2, 2)).unwrap();
        assert!(pooled[0].is_valid());
        assert_eq!(pooled[0].data, vec![0.0, 0.0]);
    }

    #[test]
    fn test_normalized_output_has_unit_norm() {
        let embeddings = vec![3.0, 4.0, 0.0, 0.0];
        let mask = vec![1.0, 0.0];
        let pooled = mean_pool_normalized(&embeddings, &mask, BatchShape::new(1, 2, 2)).unwrap();
        assert!(pooled[0].is_unit(1e-6));
    }

    #[test]
    fn test_shape_mismatch() {
        let result = mean_pool(&[1.0, 2.0], &[1.0], BatchShape::new(1, 1, 3));
        assert!(matches!(result, Err(SemsearchError::Encoding(_))));
    }
}
