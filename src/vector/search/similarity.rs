//! Inner-product similarity.
//!
//! Scores are the plain dot product of two vectors. For unit-norm inputs this
//! equals cosine similarity and lies in `[-1, 1]`; no further transform is applied.

use wide::f32x8;

const LANES: usize = 8;

/// Dot product of two equally sized slices, vectorized over 8 lanes.
///
/// Callers are responsible for checking dimensions; extra trailing
/// components of the longer slice are ignored.
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let a_rem = a_chunks.remainder();
    let b_rem = b_chunks.remainder();

    let mut acc = f32x8::ZERO;
    for (ca, cb) in a_chunks.zip(b_chunks) {
        let va = f32x8::new(std::array::from_fn(|i| ca[i]));
        let vb = f32x8::new(std::array::from_fn(|i| cb[i]));
        acc = va.mul_add(vb, acc);
    }

    let mut sum = acc.reduce_add();
    for (x, y) in a_rem.iter().zip(b_rem.iter()) {
        sum += x * y;
    }
    sum
}

/// Scalar reference implementation, used to cross-check the SIMD path.
#[inline]
pub fn inner_product_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
