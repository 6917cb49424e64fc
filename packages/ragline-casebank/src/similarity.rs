//! Similarity Metrics for Case Retrieval
//!
//! Both measures map into [0.0, 1.0] and return 0.0 on any degenerate
//! input (zero-norm vectors, length mismatch, non-finite intermediate).
//! One bad vector must never abort a batch, so nothing here panics or
//! returns an error.

/// Cosine similarity mapped into [0.0, 1.0] via `(cos + 1) / 2`.
///
/// Raw cosine lives in [-1, 1]; the affine map keeps anti-parallel
/// vectors distinguishable from the 0.0 degenerate-input sentinel only
/// by convention, which is acceptable for ranking prior cases.
pub fn cosine(vec_a: &[f32], vec_b: &[f32]) -> f64 {
    if vec_a.len() != vec_b.len() || vec_a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (a, b) in vec_a.iter().zip(vec_b.iter()) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        norm_a += a * a;
        norm_b += b * b;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let raw = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !raw.is_finite() {
        return 0.0;
    }

    ((raw + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Euclidean-distance similarity: `1 / (1 + distance)`, clipped to [0, 1].
///
/// Identical vectors score 1.0; similarity decays toward 0.0 with distance.
pub fn euclidean(vec_a: &[f32], vec_b: &[f32]) -> f64 {
    if vec_a.len() != vec_b.len() || vec_a.is_empty() {
        return 0.0;
    }

    let squared: f64 = vec_a
        .iter()
        .zip(vec_b.iter())
        .map(|(a, b)| {
            let d = f64::from(*a) - f64::from(*b);
            d * d
        })
        .sum();

    let distance = squared.sqrt();
    if !distance.is_finite() {
        return 0.0;
    }

    (1.0 / (1.0 + distance)).clamp(0.0, 1.0)
}
