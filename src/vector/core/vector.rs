//! Core vector data structure.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SemsearchError};

/// Tolerance used when checking that a vector has unit length.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-4;

/// A dense vector representation for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// The vector dimensions as floating point values.
    pub data: Vec<f32>,
}

impl Vector {
    /// Create a new vector with the given dimensions.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensionality of this vector.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Borrow the raw components.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Calculate the L2 norm (magnitude) of this vector.
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Normalize this vector to unit length. Zero vectors are left untouched.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for value in &mut self.data {
                *value /= norm;
            }
        }
    }

    /// Get a normalized copy of this vector.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.normalize();
        normalized
    }

    /// Whether the L2 norm is 1 within `tolerance`.
    pub fn is_unit(&self, tolerance: f32) -> bool {
        (self.norm() - 1.0).abs() <= tolerance
    }

    /// Validate that this vector has the expected dimension.
    pub fn validate_dimension(&self, expected_dim: usize) -> Result<()> {
        if self.data.len() != expected_dim {
            return Err(SemsearchError::dimension_mismatch(
                expected_dim,
                self.data.len(),
            ));
        }
        Ok(())
    }

    /// Check if this vector contains any NaN or infinite values.
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Validate dimension and finiteness in one step.
    pub fn validate(&self, expected_dim: usize) -> Result<()> {
        self.validate_dimension(expected_dim)?;
        if !self.is_valid() {
            return Err(SemsearchError::invalid_argument(
                "vector contains NaN or infinite values",
            ));
        }
        Ok(())
    }

    /// Normalize multiple vectors, in parallel for larger batches.
    pub fn normalize_batch(vectors: &mut [Vector]) {
        if vectors.len() > 10 {
            vectors.par_iter_mut().for_each(|vector| vector.normalize());
        } else {
            for vector in vectors {
                vector.normalize();
            }
        }
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_produces_unit_vector() {
        let mut vector = Vector::new(vec![3.0, 4.0]);
        assert_eq!(vector.norm(), 5.0);

        vector.normalize();
        assert!(vector.is_unit(1e-6));
        assert!((vector.data[0] - 0.6).abs() < 1e-6);
        assert!((vector.data[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_is_noop() {
        let mut vector = Vector::new(vec![0.0; 4]);
        vector.normalize();
        assert_eq!(vector.data, vec![0.0; 4]);
        assert!(!vector.is_unit(UNIT_NORM_TOLERANCE));
    }

    #[test]
    fn test_validate() {
        let vector = Vector::new(vec![1.0, 0.0, 0.0]);
        assert!(vector.validate(3).is_ok());

        match vector.validate(4) {
            Err(SemsearchError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let invalid = Vector::new(vec![f32::NAN, 0.0, 0.0]);
        assert!(matches!(
            invalid.validate(3),
            Err(SemsearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_normalize_batch() {
        let mut vectors: Vec<Vector> = (1..=20)
            .map(|i| Vector::new(vec![i as f32, 1.0, 2.0]))
            .collect();
        Vector::normalize_batch(&mut vectors);
        assert!(vectors.iter().all(|v| v.is_unit(1e-6)));
    }
}
