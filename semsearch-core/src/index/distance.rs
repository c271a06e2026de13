//! Cosine distance helpers
//!
//! Sums run in f64 so that very large or very small (but finite) f32
//! components neither overflow nor underflow when squared.

fn dot64(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

fn norm64(v: &[f32]) -> f64 {
    dot64(v, v).sqrt()
}

/// Compute L2 norm of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    norm64(v) as f32
}

/// Scale to unit length; only an exactly-zero vector stays all zeros
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = norm64(v);
    if norm == 0.0 || !norm.is_finite() {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| (f64::from(*x) / norm) as f32).collect()
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = norm64(a);
    let norm_b = norm64(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot64(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
    }
}

/// Cosine distance = 1 - similarity, in [0, 2]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}

/// Cosine distance for vectors already passed through [`normalize`]
pub(crate) fn unit_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - dot64(a, b) as f32).clamp(0.0, 2.0)
}
