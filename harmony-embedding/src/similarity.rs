//! Cosine similarity calculations

use harmony_core::{FieldKind, HarmonyError, Participant};
use ndarray::{Array1, ArrayView1};

/// Calculate cosine similarity between two embeddings
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
///
/// Never fails: empty vectors, mismatched lengths, zero norms and non-finite
/// elements all score exactly 0.0, so one corrupt field cannot poison a
/// ranking with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    try_cosine_similarity(a, b).unwrap_or(0.0)
}

/// Cosine similarity that reports why a pair of vectors was degenerate
pub fn try_cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, HarmonyError> {
    if a.is_empty() || b.is_empty() {
        return Err(HarmonyError::degenerate_vector("empty vector"));
    }
    if a.len() != b.len() {
        return Err(HarmonyError::degenerate_vector(format!(
            "dimension mismatch ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(HarmonyError::degenerate_vector("non-finite element"));
    }

    // Accumulate in f64 so large f32 magnitudes cannot overflow the norms
    let a_view: Array1<f64> = ArrayView1::from(a).mapv(f64::from);
    let b_view: Array1<f64> = ArrayView1::from(b).mapv(f64::from);

    let dot_product = a_view.dot(&b_view);
    let norm_a = a_view.dot(&a_view).sqrt();
    let norm_b = b_view.dot(&b_view).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(HarmonyError::degenerate_vector("zero norm"));
    }

    let score = dot_product / (norm_a * norm_b);
    if !score.is_finite() {
        return Err(HarmonyError::degenerate_vector("non-finite ratio"));
    }

    Ok(score)
}

/// Similarity of two optional vectors; a missing side scores 0.0
pub fn optional_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}

/// Same-field similarity between two participants
pub fn field_similarity(a: &Participant, b: &Participant, field: FieldKind) -> f64 {
    optional_similarity(a.field_vector(field), b.field_vector(field))
}

/// Whole-profile similarity between two participants
pub fn global_similarity(a: &Participant, b: &Participant) -> f64 {
    optional_similarity(a.global_vector(), b.global_vector())
}
