//! Small numeric helpers shared by the catalogue, ANN index, search
//! service, and era estimator. Kept dependency-free and allocation-light;
//! every consumer already has the vectors in memory.

/// Cosine distance = 1 − cosine similarity, assuming both inputs are
/// already L2-normalised. Returns values in `[0, 2]`.
///
/// # Panics
/// Panics if `a.len() != b.len()` — callers validate dimension at the
/// catalogue boundary before vectors ever reach here.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimension mismatch");
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scales `v` to unit L2 norm in place. A zero vector is left unchanged
/// (there is no direction to normalise to).
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Element-wise mean of a non-empty slice of equal-length vectors.
///
/// # Panics
/// Panics if `vectors` is empty or the vectors disagree in length.
#[must_use]
pub fn mean(vectors: &[Vec<f32>]) -> Vec<f32> {
    assert!(!vectors.is_empty(), "mean of zero vectors is undefined");
    let dim = vectors[0].len();
    let mut acc = vec![0.0f32; dim];
    for v in vectors {
        assert_eq!(v.len(), dim, "vector dimension mismatch");
        for (a, x) in acc.iter_mut().zip(v) {
            *a += x;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let n = vectors.len() as f32;
    for a in &mut acc {
        *a /= n;
    }
    acc
}

/// Converts a "minimum similarity percent" `P ∈ [0, 100]` into a maximum
/// cosine-distance threshold.
#[must_use]
pub fn percent_to_max_distance(min_similarity_percent: f32) -> f32 {
    1.0 - (min_similarity_percent / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_symmetry_and_self_distance() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!((cosine_distance(&a, &b) - cosine_distance(&b, &a)).abs() < 1e-6);
        assert!(cosine_distance(&a, &a) < 1e-6);
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn mean_of_unit_vectors_then_normalized_is_unit() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let mut m = mean(&vectors);
        l2_normalize(&mut m);
        assert!((l2_norm(&m) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn percent_conversion() {
        assert!((percent_to_max_distance(100.0) - 0.0).abs() < 1e-6);
        assert!((percent_to_max_distance(0.0) - 1.0).abs() < 1e-6);
        assert!((percent_to_max_distance(70.0) - 0.3).abs() < 1e-6);
    }
}
