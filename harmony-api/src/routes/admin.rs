//! Dataset and cache administration endpoints

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use harmony_core::HarmonyError;
use harmony_embedding::{IngestionReport, LoadStats, RawParticipant};
use serde::Serialize;
use tracing::info;

use super::harmony_error_response;
use crate::AppState;

/// Counts from a field store reload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub participants: usize,
    pub embedding_rows: usize,
    pub text_rows: usize,
    pub malformed_rows: usize,
    pub dropped_vectors: usize,
    pub missing_texts: usize,
    pub missing_embeddings: usize,
}

impl From<LoadStats> for ReloadResponse {
    fn from(stats: LoadStats) -> Self {
        Self {
            participants: stats.participants,
            embedding_rows: stats.embedding_rows,
            text_rows: stats.text_rows,
            malformed_rows: stats.malformed_rows,
            dropped_vectors: stats.dropped_vectors,
            missing_texts: stats.missing_texts,
            missing_embeddings: stats.missing_embeddings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub report: IngestionReport,
    pub reload: ReloadResponse,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// Create admin routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reload", post(reload))
        .route("/ingest", post(ingest))
        .route("/explanations", delete(clear_explanations))
}

/// Reload the field store from its data sources
async fn reload(State(state): State<AppState>) -> impl IntoResponse {
    match state.match_service.reload().await {
        Ok(stats) => Json(ReloadResponse::from(stats)).into_response(),
        Err(e) => harmony_error_response(e),
    }
}

/// Replace the whole dataset with the posted participants
async fn ingest(
    State(state): State<AppState>,
    Json(participants): Json<Vec<RawParticipant>>,
) -> impl IntoResponse {
    info!("Ingesting {} participants", participants.len());

    match state.match_service.ingest(participants).await {
        Ok((report, stats)) => Json(IngestResponse {
            report,
            reload: ReloadResponse::from(stats),
        })
        .into_response(),
        Err(e) => harmony_error_response(e),
    }
}

/// Drop every cached explanation
async fn clear_explanations(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.match_service.generator().cache();
    let cleared = cache.len();

    match cache.clear().await {
        Ok(()) => {
            info!("Cleared {} cached explanations", cleared);
            Json(ClearResponse { cleared }).into_response()
        }
        Err(e) => harmony_error_response(HarmonyError::from(e)),
    }
}
