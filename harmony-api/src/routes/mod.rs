//! API route definitions

mod admin;
mod health;
mod matches;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use harmony_core::HarmonyError;
use serde::Serialize;
use tracing::error;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(matches::routes())
        .merge(admin::routes())
        .merge(health::routes())
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a matcher error onto an HTTP status
pub fn harmony_error_response(e: HarmonyError) -> Response {
    let status = match &e {
        HarmonyError::NotFound(_) => StatusCode::NOT_FOUND,
        HarmonyError::Parse(_) => StatusCode::BAD_REQUEST,
        HarmonyError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        HarmonyError::Api(_) | HarmonyError::GenerationUnavailable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", e);
    }

    error_response(status, e.to_string())
}
