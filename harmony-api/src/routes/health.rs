//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    participants: usize,
    cached_explanations: usize,
}

/// Health check handler
///
/// Degraded while no participants are loaded.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let participants = state.match_service.participant_count();
    let cached_explanations = state.match_service.generator().cache().len();

    let (code, status) = if participants > 0 {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status: status.to_string(),
        participants,
        cached_explanations,
    };

    (code, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{get, sample_state, state_with};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_reports_dataset() {
        let (status, body) = get(sample_state(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["participants"], 3);
        assert_eq!(body["cachedExplanations"], 0);
    }

    #[tokio::test]
    async fn test_empty_dataset_is_degraded() {
        let (status, body) = get(state_with(Vec::new()), "/api/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }
}
