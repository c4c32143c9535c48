//! Match and explanation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use harmony_core::{ExplanationRecord, MatchBreakdown, MatchReason, ParticipantId};
use harmony_services::ExplainedMatch;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{error_response, harmony_error_response};
use crate::AppState;

const DEFAULT_K: usize = 5;
const MAX_K: usize = 50;
const LANGUAGES: [&str; 3] = ["ar", "en", "he"];

/// Query parameters for top matches
#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    /// Number of matches (default 5)
    pub k: Option<usize>,
    /// Explanation language: ar, en or he (default ar)
    pub lang: Option<String>,
}

/// One explained match as shown to a participant
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub id: ParticipantId,
    pub name: String,
    pub image_url: Option<String>,
    pub score: f64,
    pub breakdown: MatchBreakdown,
    /// Explanation in the requested language
    pub reason: Option<String>,
    /// Display name in the requested language, falling back to the original
    pub match_name: Option<String>,
    pub reasons: Vec<MatchReason>,
}

impl MatchView {
    fn new(explained: ExplainedMatch, lang: &str) -> Self {
        let ExplainedMatch {
            result,
            explanation,
        } = explained;

        let (reason, match_name, reasons) = match explanation {
            Some(record) => (
                record.explanation.get(lang).map(String::from),
                localized_name(&record, lang),
                record.reasons,
            ),
            None => (None, None, Vec::new()),
        };

        Self {
            id: result.id,
            name: result.name,
            image_url: result.image_url,
            score: result.score,
            breakdown: result.breakdown,
            reason,
            match_name,
            reasons,
        }
    }
}

fn localized_name(record: &ExplanationRecord, lang: &str) -> Option<String> {
    let name = &record.match_name;
    let translated = match lang {
        "en" => name.en.as_ref(),
        "he" => name.he.as_ref(),
        _ => None,
    };
    translated.or(name.original.as_ref()).cloned()
}

/// Response for top matches
#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub target: ParticipantId,
    pub lang: String,
    pub matches: Vec<MatchView>,
    pub count: usize,
}

/// Create match routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/match/{id}", get(get_matches))
        .route("/explain/{target}/{match_id}", get(get_explanation))
}

fn parse_id(raw: &str) -> Option<ParticipantId> {
    raw.trim().parse().ok()
}

/// Top matches for a participant, each with its explanation
async fn get_matches(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(params): Query<MatchQuery>,
) -> impl IntoResponse {
    let Some(id) = parse_id(&raw_id) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid participant id: {}", raw_id),
        );
    };

    let lang = params.lang.unwrap_or_else(|| "ar".to_string()).to_lowercase();
    if !LANGUAGES.contains(&lang.as_str()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Unsupported language: {}", lang),
        );
    }

    let k = params.k.unwrap_or(DEFAULT_K).min(MAX_K);
    info!("Top {} matches for participant {} ({})", k, id, lang);

    match state
        .match_service
        .top_matches_with_explanations(id, k)
        .await
    {
        Ok(explained) => {
            let matches: Vec<MatchView> = explained
                .into_iter()
                .map(|m| MatchView::new(m, &lang))
                .collect();
            let count = matches.len();
            Json(MatchesResponse {
                target: id,
                lang,
                matches,
                count,
            })
            .into_response()
        }
        Err(e) => harmony_error_response(e),
    }
}

/// Full explanation record for one pair
async fn get_explanation(
    State(state): State<AppState>,
    Path((raw_target, raw_match)): Path<(String, String)>,
) -> impl IntoResponse {
    let (Some(target), Some(matched)) = (parse_id(&raw_target), parse_id(&raw_match)) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid participant ids: {}/{}", raw_target, raw_match),
        );
    };

    if target == matched {
        return error_response(
            StatusCode::BAD_REQUEST,
            "A participant cannot be matched with themselves",
        );
    }

    match state.match_service.explain(target, matched).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => harmony_error_response(e),
    }
}
