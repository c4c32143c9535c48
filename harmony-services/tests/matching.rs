//! End-to-end matching scenarios over in-memory fixtures

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use harmony_core::{FieldEmbeddingSet, FieldTextSet, HarmonyError, Participant, ParticipantId};
use harmony_embedding::{
    EmbeddingCapability, EmbeddingStore, EmbeddingVector, FieldStore, IngestionConfig,
    IngestionPipeline, RawParticipant, SharedFieldStore,
};
use harmony_explain::{
    ExplainError, ExplanationCache, ExplanationGenerator, GenerationConfig, GenerationRequest,
    TextGenerationCapability,
};
use harmony_services::{DataSources, MatchService, MatchWeights, SimilarityEngine};

/// Answers every request with a fixed reply and counts explanation prompts
struct ScriptedLlm {
    reply: Option<&'static str>,
    delay: Option<Duration>,
    prompts: parking_lot::Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(reply: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay: None,
            prompts: parking_lot::Mutex::new(Vec::new()),
        })
    }

    fn slow(reply: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply),
            delay: Some(delay),
            prompts: parking_lot::Mutex::new(Vec::new()),
        })
    }

    fn explanation_calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl TextGenerationCapability for ScriptedLlm {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> harmony_explain::Result<Option<String>> {
        if request.max_tokens == harmony_explain::prompts::EXPLANATION_MAX_TOKENS {
            self.prompts.lock().push(request.prompt.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.map(String::from))
    }
}

/// Always fails, as an unreachable provider would
struct DownLlm;

#[async_trait]
impl TextGenerationCapability for DownLlm {
    async fn generate(&self, _: &GenerationRequest) -> harmony_explain::Result<Option<String>> {
        Err(ExplainError::Api("connection refused".to_string()))
    }
}

/// Deterministic embedder: identical texts give identical vectors, and texts
/// of different length are never collinear
struct ShapeEmbedder;

#[async_trait]
impl EmbeddingCapability for ShapeEmbedder {
    async fn embed(&self, texts: &[String]) -> harmony_embedding::Result<Vec<EmbeddingVector>> {
        Ok(texts
            .iter()
            .map(|t| {
                let bytes: u32 = t.bytes().map(u32::from).sum();
                vec![1.0, t.chars().count() as f32, bytes as f32 / 100.0]
            })
            .collect())
    }

    fn model(&self) -> &str {
        "shape-test"
    }
}

fn texts(tag: &str) -> FieldTextSet {
    FieldTextSet {
        job_title: format!("{} job", tag),
        academic: format!("{} academic", tag),
        professional: format!("{} professional", tag),
        personal: format!("{} personal", tag),
    }
}

fn vectors(v: [f32; 3]) -> FieldEmbeddingSet {
    FieldEmbeddingSet {
        job: Some(v.to_vec()),
        academic: Some(v.to_vec()),
        professional: Some(v.to_vec()),
        personal: Some(v.to_vec()),
        global: Some(v.to_vec()),
    }
}

fn participant(id: ParticipantId, v: [f32; 3]) -> Participant {
    Participant::new(id, format!("Person {}", id))
        .with_embeddings(vectors(v))
        .with_texts(texts(&format!("p{}", id)))
}

fn service_with(
    participants: Vec<Participant>,
    llm: Arc<dyn TextGenerationCapability>,
    cache: Arc<ExplanationCache>,
) -> MatchService {
    let store = SharedFieldStore::new(FieldStore::from_participants(participants));
    let engine = SimilarityEngine::new(store.clone(), MatchWeights::default());
    let generator = Arc::new(ExplanationGenerator::new(
        store.clone(),
        llm,
        cache,
        GenerationConfig::default(),
    ));
    MatchService::new(store, engine, generator)
}

fn service(participants: Vec<Participant>, llm: Arc<dyn TextGenerationCapability>) -> MatchService {
    service_with(participants, llm, Arc::new(ExplanationCache::in_memory()))
}

#[test]
fn identical_participants_score_one() {
    let svc = service(
        (0..3).map(|id| participant(id, [1.0, 2.0, 3.0])).collect(),
        ScriptedLlm::new(None),
    );

    for target in 0..3 {
        let results = svc.rank_matches(target, 5).unwrap();
        assert_eq!(results.len(), 2);
        for result in &results {
            assert_ne!(result.id, target);
            assert!((result.score - 1.0).abs() < 1e-6);
            assert!((result.breakdown.global - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn injected_weights_change_ranking() {
    let on = [1.0, 0.0, 0.0];
    let off = [0.0, 1.0, 0.0];
    let with_fields = |id: ParticipantId, academic: [f32; 3], personal: [f32; 3]| {
        Participant::new(id, format!("Person {}", id)).with_embeddings(FieldEmbeddingSet {
            job: Some(off.to_vec()),
            academic: Some(academic.to_vec()),
            professional: Some(off.to_vec()),
            personal: Some(personal.to_vec()),
            global: Some(on.to_vec()),
        })
    };
    let target = Participant::new(0, "Target").with_embeddings(vectors(on));
    let fixture = || {
        vec![
            target.clone(),
            with_fields(1, on, off),
            with_fields(2, off, on),
        ]
    };

    let default_svc = service(fixture(), ScriptedLlm::new(None));
    let ids: Vec<_> = default_svc.rank_matches(0, 2).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let store = SharedFieldStore::new(FieldStore::from_participants(fixture()));
    let personal_first = MatchWeights::new(0.0, 0.1, 0.1, 0.8).unwrap();
    let engine = SimilarityEngine::new(store, personal_first);
    let results = engine.get_top_matches(0, 2).unwrap();
    assert_eq!(results[0].id, 2);
    assert!((results[0].score - 0.8).abs() < 1e-6);
    assert!((results[1].score - 0.1).abs() < 1e-6);
}

#[test]
fn missing_personal_embedding_still_ranked() {
    let mut partial = participant(1, [1.0, 0.0, 0.0]);
    if let Some(embeddings) = partial.embeddings.as_mut() {
        embeddings.personal = None;
    }

    let svc = service(
        vec![participant(0, [1.0, 0.0, 0.0]), partial, participant(2, [0.0, 1.0, 0.0])],
        ScriptedLlm::new(None),
    );

    let results = svc.rank_matches(0, 5).unwrap();
    assert_eq!(results[0].id, 1);
    assert_eq!(results[0].breakdown.fields.personal, 0.0);
    // job + professional + academic weights
    assert!((results[0].score - 0.80).abs() < 1e-6);
    assert_eq!(results[1].id, 2);
    assert_eq!(results[1].score, 0.0);
}

#[test]
fn ranking_properties_hold() {
    let participants: Vec<Participant> = (0..6)
        .map(|i| participant(i, [1.0, i as f32, (i * i) as f32]))
        .collect();
    let svc = service(participants, ScriptedLlm::new(None));

    for target in 0..6 {
        for k in [0, 1, 3, 5, 10] {
            let results = svc.rank_matches(target, k).unwrap();
            assert_eq!(results.len(), k.min(5));
            assert!(results.iter().all(|r| r.id != target));
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    let single = service(vec![participant(0, [1.0, 0.0, 0.0])], ScriptedLlm::new(None));
    assert!(single.rank_matches(0, 3).unwrap().is_empty());
}

#[tokio::test]
async fn empty_generation_keeps_scores_and_caches() {
    let llm = ScriptedLlm::new(None);
    let svc = service(
        vec![participant(0, [1.0, 2.0, 3.0]), participant(1, [1.0, 2.0, 2.5])],
        llm.clone(),
    );

    let record = svc.explain(0, 1).await.unwrap();
    assert!(record.explanation.ar.is_none());
    assert!(record.explanation.en.is_none());
    assert!(record.explanation.he.is_none());
    assert!(record.field_scores.academic > 0.9);
    assert_eq!(record.reasons.len(), 2);

    let again = svc.explain(1, 0).await.unwrap();
    assert_eq!(record, again);
    assert_eq!(llm.explanation_calls(), 1);
}

#[tokio::test]
async fn explained_matches_follow_ranking_order() {
    let llm = ScriptedLlm::new(Some("شرح قصير"));
    let svc = service(
        vec![
            participant(0, [1.0, 0.0, 0.0]),
            participant(1, [0.0, 1.0, 0.0]),
            participant(2, [1.0, 0.5, 0.0]),
            participant(3, [1.0, 0.0, 0.1]),
        ],
        llm.clone(),
    )
    .with_concurrency(2);

    let explained = svc.top_matches_with_explanations(0, 3).await.unwrap();
    let ids: Vec<_> = explained.iter().map(|m| m.result.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);

    for m in &explained {
        let record = m.explanation.as_ref().unwrap();
        assert_eq!(record.matched.id, m.result.id);
        assert_eq!(record.explanation.ar.as_deref(), Some("شرح قصير"));
    }
    assert_eq!(llm.explanation_calls(), 3);

    // Second request is served entirely from the cache
    svc.top_matches_with_explanations(0, 3).await.unwrap();
    assert_eq!(llm.explanation_calls(), 3);

    let json = serde_json::to_value(&explained[1]).unwrap();
    assert_eq!(json["id"], 2);
    assert!(json["breakdown"]["fields"]["academic"].is_number());
    assert!(json["explanation"]["fieldScores"].is_object());
}

#[tokio::test]
async fn inconsistent_candidate_fails_request() {
    let mut texts_missing = participant(2, [1.0, 0.0, 0.1]);
    texts_missing.texts = None;

    let svc = service(
        vec![
            participant(0, [1.0, 0.0, 0.0]),
            participant(1, [0.0, 1.0, 0.0]),
            texts_missing,
        ],
        ScriptedLlm::new(Some("شرح")),
    );

    // Ranking alone tolerates the missing texts
    assert_eq!(svc.rank_matches(0, 2).unwrap()[0].id, 2);

    assert!(matches!(
        svc.top_matches_with_explanations(0, 2).await,
        Err(HarmonyError::DataInconsistency(_))
    ));

    // Pairs that do not involve the inconsistent participant still explain
    assert!(svc.explain(1, 0).await.is_ok());
}

#[tokio::test]
async fn unknown_target_is_not_found() {
    let svc = service(vec![participant(0, [1.0, 0.0, 0.0])], ScriptedLlm::new(None));

    assert!(matches!(
        svc.top_matches_with_explanations(42, 3).await,
        Err(HarmonyError::NotFound(_))
    ));
    assert!(matches!(svc.explain(0, 42).await, Err(HarmonyError::NotFound(_))));
}

#[tokio::test]
async fn provider_outage_is_absorbed() {
    let svc = service(
        vec![participant(0, [1.0, 0.0, 0.0]), participant(1, [1.0, 1.0, 0.0])],
        Arc::new(DownLlm),
    );

    let explained = svc.top_matches_with_explanations(0, 1).await.unwrap();
    let record = explained[0].explanation.as_ref().unwrap();
    assert!(!record.is_complete());
    assert!(record.match_name.en.is_none());
    assert_eq!(record.match_name.original.as_deref(), Some("Person 1"));
}

#[tokio::test]
async fn cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("explanations.json");
    let fixture = || vec![participant(0, [1.0, 0.0, 0.0]), participant(1, [1.0, 1.0, 0.0])];

    let first_llm = ScriptedLlm::new(Some("أول"));
    let first = {
        let cache = Arc::new(ExplanationCache::open(&path).await.unwrap());
        let svc = service_with(fixture(), first_llm.clone(), cache);
        svc.explain(0, 1).await.unwrap()
    };

    let second_llm = ScriptedLlm::new(Some("ثاني"));
    let cache = Arc::new(ExplanationCache::open(&path).await.unwrap());
    let svc = service_with(fixture(), second_llm.clone(), cache);
    let second = svc.explain(1, 0).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.explanation.ar.as_deref(), Some("أول"));
    assert_eq!(second_llm.explanation_calls(), 0);
}

#[tokio::test]
async fn reload_requires_sources() {
    let svc = service(vec![], ScriptedLlm::new(None));
    assert!(matches!(svc.reload().await, Err(HarmonyError::Config(_))));
    assert!(matches!(svc.ingest(vec![]).await, Err(HarmonyError::Config(_))));
}

fn ingesting_service(llm: Arc<dyn TextGenerationCapability>) -> MatchService {
    let store = Arc::new(EmbeddingStore::new_in_memory().unwrap());
    let shared = SharedFieldStore::default();
    let generator = Arc::new(ExplanationGenerator::new(
        shared.clone(),
        llm,
        Arc::new(ExplanationCache::in_memory()),
        GenerationConfig::default(),
    ));
    let pipeline = IngestionPipeline::new(
        Arc::new(ShapeEmbedder),
        Arc::clone(&store),
        IngestionConfig { batch_size: 4 },
    );

    MatchService::new(
        shared.clone(),
        SimilarityEngine::new(shared, MatchWeights::default()),
        generator,
    )
    .with_sources(DataSources {
        embeddings: store.clone(),
        texts: store,
    })
    .with_ingestion(pipeline)
}

fn raw(name: &str, job: &str, academic: &str, professional: &str, personal: &str) -> RawParticipant {
    RawParticipant {
        name: name.to_string(),
        image_url: None,
        job_title: job.to_string(),
        academic: academic.to_string(),
        professional: professional.to_string(),
        personal: personal.to_string(),
    }
}

#[tokio::test]
async fn ingest_then_match() {
    let llm = ScriptedLlm::new(Some("مناسب لك"));
    let svc = ingesting_service(llm.clone());

    let (report, stats) = svc
        .ingest(vec![
            raw("Rana", "Data Scientist", "Statistics", "Forecasting models", "Hiking"),
            raw(
                "Yousef",
                "Chef",
                "Culinary arts school",
                "Restaurant kitchen lead",
                "Football on weekends",
            ),
            raw("Maya", "Data Scientist", "Statistics", "Forecasting models", "Hiking"),
        ])
        .await
        .unwrap();

    assert_eq!(report.participants, 3);
    assert_eq!(report.texts_embedded, 15);
    assert_eq!(report.batches, 4);
    assert_eq!(stats.participants, 3);
    assert_eq!(svc.participant_count(), 3);

    let results = svc.rank_matches(0, 2).unwrap();
    assert_eq!(results[0].id, 2);
    assert_eq!(results[0].name, "Maya");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!(results[1].score < results[0].score);

    let record = svc.explain(0, 2).await.unwrap();
    assert_eq!(record.reasons[0].a_text, record.reasons[0].b_text);
    assert_eq!(record.explanation.ar.as_deref(), Some("مناسب لك"));
}

#[tokio::test]
async fn reingest_discards_explanations_from_old_dataset() {
    let llm = ScriptedLlm::slow("شرح", Duration::from_millis(100));
    let svc = ingesting_service(llm.clone());

    svc.ingest(vec![
        raw("OldA", "Nurse", "Medicine", "Hospital ward", "Reading"),
        raw("OldB", "Pilot", "Aviation", "Long-haul flights", "Sailing"),
    ])
    .await
    .unwrap();

    // Re-ingest while the first explanation is still generating
    let (stale, reingested) = tokio::join!(svc.explain(0, 1), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        svc.ingest(vec![
            raw("NewX", "Chef", "Culinary arts", "Hotel kitchen", "Football"),
            raw("NewY", "Architect", "Engineering", "Housing projects", "Drawing"),
        ])
        .await
    });
    assert_eq!(stale.unwrap().matched.name, "OldB");
    reingested.unwrap();

    assert!(svc.generator().cache().is_empty());

    let fresh = svc.explain(0, 1).await.unwrap();
    assert_eq!(fresh.target.name, "NewX");
    assert_eq!(fresh.matched.name, "NewY");
    assert_eq!(llm.explanation_calls(), 2);
}
