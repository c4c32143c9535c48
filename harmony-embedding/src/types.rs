//! Row types exchanged with the data sources

use harmony_core::{FieldTextSet, ParticipantId};
use serde::{Deserialize, Serialize};

pub use harmony_core::EmbeddingVector;

/// Participant text record as yielded by a participant data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantTextRow {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub job_title: String,
    pub academic: String,
    pub professional: String,
    pub personal: String,
}

impl ParticipantTextRow {
    pub fn texts(&self) -> FieldTextSet {
        FieldTextSet {
            job_title: self.job_title.clone(),
            academic: self.academic.clone(),
            professional: self.professional.clone(),
            personal: self.personal.clone(),
        }
    }
}

/// Participant embedding record as yielded by an embedding data source
///
/// Vector payloads are kept as raw JSON arrays; parsing happens when the
/// field store loads them so a corrupt payload only drops its own row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEmbeddingRow {
    pub id: ParticipantId,
    pub name: String,
    pub job_title_embedding: Option<String>,
    pub academic_embedding: Option<String>,
    pub professional_embedding: Option<String>,
    pub personal_embedding: Option<String>,
    pub profile_embedding: Option<String>,
}

/// Raw participant profile fed into ingestion
///
/// Ids are assigned by ingestion order, so the caller only supplies content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParticipant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub academic: String,
    #[serde(default)]
    pub professional: String,
    #[serde(default)]
    pub personal: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub participants: usize,
    pub texts_embedded: usize,
    pub batches: usize,
    pub dimension: Option<usize>,
    pub model: String,
}
