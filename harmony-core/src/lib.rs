//! Core types for the Harmony participant matcher
//!
//! This crate defines the shared data structures used across the workspace:
//! participants and their per-field embeddings/texts, ranked match results,
//! explanation records and the error taxonomy.

pub mod error;
pub mod explanation;
pub mod field;
pub mod matching;
pub mod participant;

pub use error::{HarmonyError, HarmonyResult};
pub use explanation::{
    CrossFieldScore, ExplanationRecord, FieldScores, LocalizedText, MatchName, MatchReason, PairKey,
    ParticipantRef, RankedField,
};
pub use field::FieldKind;
pub use matching::{FieldBreakdown, MatchBreakdown, MatchResult};
pub use participant::{EmbeddingVector, FieldEmbeddingSet, FieldTextSet, Participant, ParticipantId};
