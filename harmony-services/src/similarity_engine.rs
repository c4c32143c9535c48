//! Weighted multi-field ranking of candidate participants

use harmony_core::{
    FieldBreakdown, FieldKind, HarmonyError, HarmonyResult, MatchBreakdown, MatchResult,
    Participant, ParticipantId,
};
use harmony_embedding::{field_similarity, global_similarity, FieldStore, SharedFieldStore};
use tracing::{debug, instrument};

/// Per-field weights of the aggregate match score
///
/// The whole-profile similarity is reported but never weighted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    job: f64,
    professional: f64,
    academic: f64,
    personal: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            job: 0.05,
            professional: 0.35,
            academic: 0.40,
            personal: 0.20,
        }
    }
}

impl MatchWeights {
    /// Validated weights: finite, non-negative, with a positive sum
    pub fn new(job: f64, professional: f64, academic: f64, personal: f64) -> HarmonyResult<Self> {
        let weights = [job, professional, academic, personal];

        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(HarmonyError::config(format!(
                "Match weights must be finite and non-negative: {:?}",
                weights
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(HarmonyError::config("Match weights must not all be zero"));
        }

        Ok(Self {
            job,
            professional,
            academic,
            personal,
        })
    }

    /// Load from MATCH_WEIGHT_{JOB,PROFESSIONAL,ACADEMIC,PERSONAL}, keeping
    /// the default for any variable that is unset
    pub fn from_env() -> HarmonyResult<Self> {
        let defaults = Self::default();

        fn read(name: &str, default: f64) -> HarmonyResult<f64> {
            match std::env::var(name) {
                Ok(value) => value.trim().parse::<f64>().map_err(|e| {
                    HarmonyError::config(format!("Invalid {}={}: {}", name, value, e))
                }),
                Err(_) => Ok(default),
            }
        }

        Self::new(
            read("MATCH_WEIGHT_JOB", defaults.job)?,
            read("MATCH_WEIGHT_PROFESSIONAL", defaults.professional)?,
            read("MATCH_WEIGHT_ACADEMIC", defaults.academic)?,
            read("MATCH_WEIGHT_PERSONAL", defaults.personal)?,
        )
    }

    pub fn weight(&self, field: FieldKind) -> f64 {
        match field {
            FieldKind::JobTitle => self.job,
            FieldKind::Academic => self.academic,
            FieldKind::Professional => self.professional,
            FieldKind::Personal => self.personal,
        }
    }

    /// Weighted sum over the four scoring fields
    pub fn score(&self, fields: &FieldBreakdown) -> f64 {
        FieldKind::ALL
            .iter()
            .map(|&field| self.weight(field) * fields.get(field))
            .sum()
    }
}

/// Ranks every other participant against a target
#[derive(Debug, Clone, Default)]
pub struct SimilarityEngine {
    store: SharedFieldStore,
    weights: MatchWeights,
}

impl SimilarityEngine {
    pub fn new(store: SharedFieldStore, weights: MatchWeights) -> Self {
        Self { store, weights }
    }

    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    /// Top `k` candidates for `target_id`, best first
    ///
    /// Ties keep ascending id order. The target never appears in its own
    /// results.
    #[instrument(skip(self))]
    pub fn get_top_matches(
        &self,
        target_id: ParticipantId,
        k: usize,
    ) -> HarmonyResult<Vec<MatchResult>> {
        let snapshot = self.store.snapshot();
        rank_candidates(&snapshot, &self.weights, target_id, k)
    }
}

/// Score one candidate against a target
pub fn score_candidate(
    target: &Participant,
    candidate: &Participant,
    weights: &MatchWeights,
) -> MatchResult {
    let mut fields = FieldBreakdown::default();
    for field in FieldKind::ALL {
        fields.set(field, field_similarity(target, candidate, field));
    }

    MatchResult {
        id: candidate.id,
        name: candidate.name.clone(),
        image_url: candidate.image_url.clone(),
        score: weights.score(&fields),
        breakdown: MatchBreakdown {
            global: global_similarity(target, candidate),
            fields,
        },
    }
}

/// Rank all candidates of a store snapshot
pub fn rank_candidates(
    store: &FieldStore,
    weights: &MatchWeights,
    target_id: ParticipantId,
    k: usize,
) -> HarmonyResult<Vec<MatchResult>> {
    let target = store
        .find_by_id(target_id)
        .ok_or_else(|| HarmonyError::not_found(format!("Participant {} not found", target_id)))?;

    let mut results: Vec<MatchResult> = store
        .participants()
        .iter()
        .filter(|candidate| candidate.id != target_id)
        .map(|candidate| score_candidate(target, candidate, weights))
        .collect();

    // sort_by is stable: equal scores keep participant order
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(k);

    debug!(
        "Ranked {} of {} candidates for participant {}",
        results.len(),
        store.len().saturating_sub(1),
        target_id
    );

    Ok(results)
}
