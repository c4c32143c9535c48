//! Service layer for the Harmony matcher
//!
//! Ranks candidates with the weighted similarity engine and attaches cached
//! explanations, over a field store that can be reloaded or re-ingested.

pub mod match_service;
pub mod similarity_engine;

pub use match_service::{DataSources, ExplainedMatch, MatchService, DEFAULT_EXPLAIN_CONCURRENCY};
pub use similarity_engine::{rank_candidates, score_candidate, MatchWeights, SimilarityEngine};
