use ndarray::ArrayView1;

use crate::error::{Result, RetrievalError};

/// Cosine similarity of two equal-length vectors.
///
/// A zero vector has no direction, so any comparison involving one scores `0`.
/// Both vectors are rescaled by their largest component first, so very large
/// or very small magnitudes neither overflow nor underflow the norms.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(RetrievalError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.iter().chain(b).any(|value| !value.is_finite()) {
        return Err(RetrievalError::decode(None, "vector has a non-finite component"));
    }

    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    if scale_a == 0.0 || scale_b == 0.0 {
        return Ok(0.0);
    }

    let a = ArrayView1::from(a).mapv(|value| value / scale_a);
    let b = ArrayView1::from(b).mapv(|value| value / scale_b);

    // Each rescaled vector has a component of magnitude 1, so both norms are >= 1.
    let dot_product = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |max, value| max.max(value.abs()))
}
