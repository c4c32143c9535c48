//! Explanation generator
//!
//! Scores a participant pair field by field, asks the text-generation
//! capability for a short Arabic explanation, translates it, and writes the
//! assembled record through the explanation cache. Generation failures never
//! fail the request; they leave the affected text absent.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use harmony_core::{
    CrossFieldScore, ExplanationRecord, FieldKind, FieldScores, FieldTextSet, HarmonyError,
    HarmonyResult, LocalizedText, MatchName, MatchReason, Participant, ParticipantId,
    ParticipantRef, PairKey,
};
use harmony_embedding::{cosine_similarity, field_similarity, SharedFieldStore};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cache::ExplanationCache;
use crate::capability::{GenerationRequest, TextGenerationCapability};
use crate::error::ExplainError;
use crate::prompts::{self, collapse_whitespace, ExplanationPrompt, CROSS_FIELD_PAIRS};

/// Number of top-ranked fields kept as reasons
const REASON_COUNT: usize = 2;

/// Which records are written to the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Cache every record, including ones whose generation failed
    #[default]
    CacheAll,
    /// Cache only records with a primary explanation, so failures are retried
    CacheComplete,
}

impl CachePolicy {
    pub fn should_cache(&self, record: &ExplanationRecord) -> bool {
        match self {
            CachePolicy::CacheAll => true,
            CachePolicy::CacheComplete => record.is_complete(),
        }
    }
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "cache_all" => Ok(CachePolicy::CacheAll),
            "complete" | "cache_complete" => Ok(CachePolicy::CacheComplete),
            other => Err(format!("Unknown cache policy: {}", other)),
        }
    }
}

/// Generator settings
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Ceiling for each individual generation call
    pub call_timeout: Duration,
    /// Translate the explanation to English and Hebrew
    pub translate: bool,
    /// Translate the match's display name
    pub translate_names: bool,
    pub cache_policy: CachePolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            translate: true,
            translate_names: true,
            cache_policy: CachePolicy::default(),
        }
    }
}

impl GenerationConfig {
    /// Load from environment variables, keeping defaults for anything unset
    ///
    /// - GENERATION_TIMEOUT_SECS
    /// - EXPLANATION_CACHE_POLICY (`all` or `complete`)
    /// - GENERATION_TRANSLATE, GENERATION_TRANSLATE_NAMES (`true`/`false`)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let call_timeout = std::env::var("GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.call_timeout);

        let cache_policy = match std::env::var("EXPLANATION_CACHE_POLICY") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}, using default", e);
                defaults.cache_policy
            }),
            Err(_) => defaults.cache_policy,
        };

        Self {
            call_timeout,
            translate: env_flag("GENERATION_TRANSLATE", defaults.translate),
            translate_names: env_flag("GENERATION_TRANSLATE_NAMES", defaults.translate_names),
            cache_policy,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

/// Scores derived from the two participants' vectors and texts
struct PairAnalysis {
    field_scores: FieldScores,
    reasons: Vec<MatchReason>,
    cross_field: Vec<CrossFieldScore>,
    best_field: FieldKind,
}

impl PairAnalysis {
    fn compute(
        target: &Participant,
        target_texts: &FieldTextSet,
        matched: &Participant,
        match_texts: &FieldTextSet,
    ) -> Self {
        let mut field_scores = FieldScores::default();
        for field in FieldKind::ALL {
            field_scores.set(field, field_similarity(target, matched, field));
        }

        let ranked = field_scores.ranked();
        let best_field = ranked.first().map(|r| r.field).unwrap_or(FieldKind::Academic);

        let reasons = ranked
            .iter()
            .take(REASON_COUNT)
            .map(|r| MatchReason {
                field: r.field,
                field_label: r.field.label().to_string(),
                score: r.score,
                a_text: target_texts.field(r.field).trim().to_string(),
                b_text: match_texts.field(r.field).trim().to_string(),
            })
            .collect();

        let mut cross_field: Vec<CrossFieldScore> = CROSS_FIELD_PAIRS
            .iter()
            .filter_map(|&(from, to)| {
                let a = target.field_vector(from)?;
                let b = matched.field_vector(to)?;
                Some(CrossFieldScore {
                    from,
                    to,
                    score: cosine_similarity(a, b),
                })
            })
            .collect();
        cross_field.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Self {
            field_scores,
            reasons,
            cross_field,
            best_field,
        }
    }
}

/// Registration of one caller in the per-pair gate map
///
/// The map entry is removed once the last caller for the pair is gone, even
/// when a caller's future is dropped mid-generation.
struct InFlight<'a> {
    map: &'a DashMap<PairKey, Arc<Mutex<()>>>,
    key: PairKey,
    gate: Arc<Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn enter(map: &'a DashMap<PairKey, Arc<Mutex<()>>>, key: PairKey) -> Self {
        let gate = Arc::clone(
            &*map
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        Self { map, key, gate }
    }

    fn gate(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.gate)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // The map and this guard are the only holders once every other caller left
        self.map
            .remove_if(&self.key, |_, gate| Arc::strong_count(gate) == 2);
    }
}

pub struct ExplanationGenerator {
    store: SharedFieldStore,
    llm: Arc<dyn TextGenerationCapability>,
    cache: Arc<ExplanationCache>,
    config: GenerationConfig,
    /// Per-pair gates collapsing concurrent generations of the same pair
    in_flight: DashMap<PairKey, Arc<Mutex<()>>>,
}

impl ExplanationGenerator {
    pub fn new(
        store: SharedFieldStore,
        llm: Arc<dyn TextGenerationCapability>,
        cache: Arc<ExplanationCache>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            store,
            llm,
            cache,
            config,
            in_flight: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<ExplanationCache> {
        &self.cache
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Explain why two participants match
    ///
    /// Cached records are returned as stored, whichever order the ids come
    /// in. Concurrent calls for the same pair wait for one generation.
    #[instrument(skip(self))]
    pub async fn explain_pair(
        &self,
        target_id: ParticipantId,
        match_id: ParticipantId,
    ) -> HarmonyResult<ExplanationRecord> {
        let key = PairKey::new(target_id, match_id);

        if let Some(record) = self.cache.get(&key) {
            return Ok(record);
        }

        let in_flight = InFlight::enter(&self.in_flight, key);
        let _permit = in_flight.gate().lock_owned().await;

        match self.cache.get(&key) {
            Some(record) => {
                debug!("Pair {} generated by a concurrent request", key);
                Ok(record)
            }
            None => self.generate(key, target_id, match_id).await,
        }
    }

    async fn generate(
        &self,
        key: PairKey,
        target_id: ParticipantId,
        match_id: ParticipantId,
    ) -> HarmonyResult<ExplanationRecord> {
        // Read before the snapshot so a dataset swap during generation is seen
        let cache_generation = self.cache.generation();
        let snapshot = self.store.snapshot();
        let target = snapshot.require_complete(target_id)?;
        let matched = snapshot.require_complete(match_id)?;

        let target_texts = target.texts.clone().unwrap_or_default();
        let match_texts = matched.texts.clone().unwrap_or_default();

        let analysis = PairAnalysis::compute(target, &target_texts, matched, &match_texts);

        let request = ExplanationPrompt {
            match_name: &matched.name,
            best_field: analysis.best_field,
            target_text: target_texts.field(analysis.best_field),
            match_text: match_texts.field(analysis.best_field),
            cross_field: analysis.cross_field.first(),
        }
        .to_request();

        let (explanation, match_name) = tokio::join!(
            self.explanation_chain(&request),
            self.name_chain(&matched.name)
        );

        let record = ExplanationRecord {
            target: ParticipantRef {
                id: target.id,
                name: target.name.clone(),
            },
            matched: ParticipantRef {
                id: matched.id,
                name: matched.name.clone(),
            },
            ranked_fields: analysis.field_scores.ranked(),
            field_scores: analysis.field_scores,
            reasons: analysis.reasons,
            cross_field: analysis.cross_field,
            explanation,
            match_name,
            created_at: Utc::now(),
        };

        if self.config.cache_policy.should_cache(&record) {
            match self
                .cache
                .put_if_generation(key, record.clone(), cache_generation)
                .await
            {
                Ok(true) => {}
                Ok(false) => info!("Dataset changed while explaining {}, not caching", key),
                Err(e) => warn!("Failed to cache explanation for {}: {}", key, e),
            }
        } else {
            info!("Explanation for {} incomplete, not caching", key);
        }

        Ok(record)
    }

    /// Primary explanation, then English from Arabic, then Hebrew from English
    async fn explanation_chain(&self, request: &GenerationRequest) -> LocalizedText {
        let ar = self.call("explanation", request).await;
        let Some(arabic) = ar.as_deref() else {
            return LocalizedText::default();
        };

        if !self.config.translate {
            return LocalizedText {
                ar,
                en: None,
                he: None,
            };
        }

        let en = self
            .call("translate_en", &prompts::translate_to_english(arabic))
            .await;
        let he = match en.as_deref() {
            Some(english) => {
                self.call("translate_he", &prompts::translate_to_hebrew(english))
                    .await
            }
            None => None,
        };

        LocalizedText { ar, en, he }
    }

    async fn name_chain(&self, name: &str) -> MatchName {
        let name = name.trim();
        if name.is_empty() {
            return MatchName::default();
        }

        let original = Some(name.to_string());
        if !self.config.translate_names {
            return MatchName {
                original,
                en: None,
                he: None,
            };
        }

        let en_request = prompts::name_to_english(name);
        let he_request = prompts::name_to_hebrew(name);
        let (en, he) = tokio::join!(
            self.call("name_en", &en_request),
            self.call("name_he", &he_request)
        );

        MatchName { original, en, he }
    }

    /// One generation call under the stage timeout; any failure becomes `None`
    async fn call(&self, stage: &'static str, request: &GenerationRequest) -> Option<String> {
        let outcome =
            match tokio::time::timeout(self.config.call_timeout, self.llm.generate(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(ExplainError::Timeout(self.config.call_timeout.as_secs())),
            };

        match outcome {
            Ok(Some(text)) => collapse_whitespace(&text),
            Ok(None) => {
                debug!("Generation stage {} returned no content", stage);
                None
            }
            Err(e) => {
                let e = HarmonyError::from(e);
                warn!("Generation stage {} failed: {}", stage, e);
                None
            }
        }
    }
}
