//! Cosine similarity over fixed-length embedding vectors

/// Cosine similarity of two vectors, in [-1, 1]
///
/// Length mismatches are tolerated by comparing the shared prefix, so mixed
/// embedding generations in one corpus degrade instead of aborting. They are
/// logged, since they usually point at a data-integrity problem.
/// Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() && !a.is_empty() && !b.is_empty() {
        tracing::warn!(
            len_a = a.len(),
            len_b = b.len(),
            "Embedding length mismatch, comparing shared prefix"
        );
    }

    let n = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;

    for i in 0..n {
        dot += a[i] * b[i];
        mag_a += a[i] * a[i];
        mag_b += b[i] * b[i];
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a.sqrt() * mag_b.sqrt())
}
