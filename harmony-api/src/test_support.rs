//! Router fixtures shared by the route tests

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use harmony_core::{FieldEmbeddingSet, FieldTextSet, Participant, ParticipantId};
use harmony_embedding::{
    EmbeddingCapability, EmbeddingStore, EmbeddingVector, FieldStore, IngestionConfig,
    IngestionPipeline, SharedFieldStore,
};
use harmony_explain::{
    ExplanationCache, ExplanationGenerator, GenerationConfig, GenerationRequest,
    TextGenerationCapability,
};
use harmony_services::{DataSources, MatchService, MatchWeights, SimilarityEngine};
use tower::ServiceExt;

use crate::{build_router, AppState};

/// Tags every output with its language so tests can tell stages apart
pub struct EchoLlm;

#[async_trait]
impl TextGenerationCapability for EchoLlm {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> harmony_explain::Result<Option<String>> {
        let reply = match request.max_tokens {
            harmony_explain::prompts::EXPLANATION_MAX_TOKENS => "ar:explanation".to_string(),
            harmony_explain::prompts::TRANSLATION_MAX_TOKENS => {
                if request.prompt.starts_with("ar:") {
                    "en:explanation".to_string()
                } else {
                    "he:explanation".to_string()
                }
            }
            _ if request.system.contains("English") => format!("en:{}", request.prompt),
            _ => format!("he:{}", request.prompt),
        };
        Ok(Some(reply))
    }
}

/// Embeds each text as its length and byte sum
pub struct LengthEmbedder;

#[async_trait]
impl EmbeddingCapability for LengthEmbedder {
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
        "length-test"
    }
}

pub fn participant(id: ParticipantId, name: &str, v: [f32; 3]) -> Participant {
    Participant::new(id, name)
        .with_embeddings(FieldEmbeddingSet {
            job: Some(v.to_vec()),
            academic: Some(v.to_vec()),
            professional: Some(v.to_vec()),
            personal: Some(v.to_vec()),
            global: Some(v.to_vec()),
        })
        .with_texts(FieldTextSet {
            job_title: format!("{} job", name),
            academic: format!("{} studies", name),
            professional: format!("{} work", name),
            personal: format!("{} hobbies", name),
        })
}

fn service(store: SharedFieldStore) -> MatchService {
    let generator = Arc::new(ExplanationGenerator::new(
        store.clone(),
        Arc::new(EchoLlm),
        Arc::new(ExplanationCache::in_memory()),
        GenerationConfig::default(),
    ));
    let engine = SimilarityEngine::new(store.clone(), MatchWeights::default());
    MatchService::new(store, engine, generator)
}

pub fn state_with(participants: Vec<Participant>) -> AppState {
    let store = SharedFieldStore::new(FieldStore::from_participants(participants));
    AppState {
        match_service: Arc::new(service(store)),
    }
}

/// Three participants; Maya is Rana's closest match
pub fn sample_state() -> AppState {
    state_with(vec![
        participant(0, "Rana", [1.0, 0.0, 0.0]),
        participant(1, "Yousef", [0.0, 1.0, 0.0]),
        participant(2, "Maya", [1.0, 0.2, 0.0]).with_image_url("https://img.example/maya.jpg"),
    ])
}

/// Empty dataset backed by an in-memory SQLite store with ingestion enabled
pub fn ingest_state() -> AppState {
    let db = Arc::new(EmbeddingStore::new_in_memory().expect("in-memory store"));
    let store = SharedFieldStore::default();
    let pipeline = IngestionPipeline::new(
        Arc::new(LengthEmbedder),
        Arc::clone(&db),
        IngestionConfig::default(),
    );

    let match_service = service(store)
        .with_sources(DataSources {
            embeddings: db.clone(),
            texts: db,
        })
        .with_ingestion(pipeline);

    AppState {
        match_service: Arc::new(match_service),
    }
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = build_router(state)
        .oneshot(request)
        .await
        .expect("router is infallible");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub async fn get(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    send(state, request).await
}

pub async fn send_json(
    state: AppState,
    method: Method,
    uri: &str,
    json: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .expect("valid request");
    send(state, request).await
}
