//! Harmony Matcher API Server
//!
//! HTTP API server that ranks participants and explains their matches.

mod routes;
#[cfg(test)]
mod test_support;

use axum::{
    http::{header, Method},
    Router,
};
use harmony_embedding::{
    EmbeddingClient, EmbeddingClientConfig, EmbeddingStore, FieldStore, IngestionConfig,
    IngestionPipeline, SharedFieldStore,
};
use harmony_explain::{
    ExplanationCache, ExplanationGenerator, GenerationConfig, OpenAIClient, DEFAULT_CACHE_PATH,
};
use harmony_services::{DataSources, MatchService, MatchWeights, SimilarityEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub match_service: Arc<MatchService>,
}

/// Server settings read from the environment
#[derive(Debug, Clone)]
struct ServerConfig {
    port: u16,
    db_path: String,
    cache_path: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            db_path: std::env::var("HARMONY_DB_PATH")
                .unwrap_or_else(|_| "data/harmony.db".to_string()),
            cache_path: std::env::var("EXPLANATION_CACHE_PATH")
                .unwrap_or_else(|_| DEFAULT_CACHE_PATH.to_string()),
        }
    }
}

/// Build the HTTP router around an application state
pub fn build_router(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,harmony_api=debug")),
        )
        .init();

    info!("Starting Harmony Matcher API");

    let config = ServerConfig::from_env();

    // Participant texts and embeddings (SQLite)
    info!("Opening participant store at: {}", config.db_path);
    let embedding_store = Arc::new(EmbeddingStore::new(&config.db_path)?);

    let field_store = FieldStore::load(embedding_store.as_ref(), embedding_store.as_ref()).await?;
    if field_store.is_empty() {
        warn!("No participants loaded; POST /api/ingest to populate the store");
    }
    let shared_store = SharedFieldStore::new(field_store);

    let weights = MatchWeights::from_env()?;
    info!("Match weights: {:?}", weights);
    let engine = SimilarityEngine::new(shared_store.clone(), weights);

    // Explanation cache (JSON file)
    info!("Opening explanation cache at: {}", config.cache_path);
    let cache = Arc::new(ExplanationCache::open(&config.cache_path).await?);

    if std::env::var("GENERATION_API_KEY").is_err() && std::env::var("OPENAI_API_KEY").is_err() {
        warn!("No generation API key set - explanations will be empty");
    }
    let llm = OpenAIClient::from_env();
    info!("Generation model: {}", llm.model());

    let generator = Arc::new(ExplanationGenerator::new(
        shared_store.clone(),
        Arc::new(llm),
        cache,
        GenerationConfig::from_env(),
    ));

    let embedder = EmbeddingClient::new(EmbeddingClientConfig::from_env());
    let pipeline = IngestionPipeline::new(
        Arc::new(embedder),
        Arc::clone(&embedding_store),
        IngestionConfig::from_env(),
    );

    let match_service = MatchService::new(shared_store, engine, generator)
        .with_sources(DataSources {
            embeddings: embedding_store.clone(),
            texts: embedding_store,
        })
        .with_ingestion(pipeline);

    let state = AppState {
        match_service: Arc::new(match_service),
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
