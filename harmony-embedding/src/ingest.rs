//! Participant ingestion: clean, embed and persist a full dataset
//!
//! Ids are assigned by ingestion order. Every run re-embeds the whole
//! dataset and replaces what the store held before.

use std::sync::Arc;

use harmony_core::{FieldEmbeddingSet, ParticipantId};
use tracing::{info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    source::EmbeddingCapability,
    store::{EmbeddingStore, StoredEmbeddings},
    text::{clean_field, embeddable, profile_text},
    types::{IngestionReport, ParticipantTextRow, RawParticipant},
};

/// Default number of texts per embedding request
pub const DEFAULT_BATCH_SIZE: usize = 40;

/// Ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Texts per embedding request; one request in flight at a time
    pub batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl IngestionConfig {
    /// Load from environment variables (EMBEDDING_BATCH_SIZE)
    pub fn from_env() -> Self {
        Self {
            batch_size: std::env::var("EMBEDDING_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
        }
    }
}

/// Cleans raw profiles, embeds every field plus the whole profile, and
/// writes the result to the store
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingCapability>,
    store: Arc<EmbeddingStore>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingCapability>,
        store: Arc<EmbeddingStore>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Run a full ingestion
    #[instrument(skip(self, participants), fields(count = participants.len()))]
    pub async fn ingest(&self, participants: Vec<RawParticipant>) -> Result<IngestionReport> {
        let rows = clean_participants(&participants);
        let n = rows.len();

        // Field-major layout: all job titles, then academic, professional,
        // personal, then whole-profile texts
        let mut texts = Vec::with_capacity(n * 5);
        texts.extend(rows.iter().map(|r| embeddable(&r.job_title)));
        texts.extend(rows.iter().map(|r| embeddable(&r.academic)));
        texts.extend(rows.iter().map(|r| embeddable(&r.professional)));
        texts.extend(rows.iter().map(|r| embeddable(&r.personal)));
        texts.extend(
            rows.iter()
                .map(|r| embeddable(&profile_text(&r.academic, &r.professional, &r.personal))),
        );

        info!("Embedding {} field texts for {} participants", texts.len(), n);
        let vectors = self
            .embedder
            .embed_batched(&texts, self.config.batch_size)
            .await?;

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::BatchMismatch {
                sent: texts.len(),
                received: vectors.len(),
            });
        }

        let dimension = vectors.first().map(|v| v.len());
        let stored = split_field_major(&rows, vectors);

        self.store
            .replace_dataset(&rows, &stored, self.embedder.model())?;

        let batch_size = self.config.batch_size.max(1);
        let report = IngestionReport {
            participants: n,
            texts_embedded: texts.len(),
            batches: texts.len().div_ceil(batch_size),
            dimension,
            model: self.embedder.model().to_string(),
        };

        info!(
            "Ingestion complete: {} participants, {} batches",
            report.participants, report.batches
        );
        Ok(report)
    }
}

/// Assign ids by order and clean every field
pub fn clean_participants(participants: &[RawParticipant]) -> Vec<ParticipantTextRow> {
    participants
        .iter()
        .enumerate()
        .map(|(i, p)| ParticipantTextRow {
            id: i as ParticipantId,
            name: p.name.trim().to_string(),
            image_url: p
                .image_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from),
            job_title: clean_field(&p.job_title),
            academic: clean_field(&p.academic),
            professional: clean_field(&p.professional),
            personal: clean_field(&p.personal),
        })
        .collect()
}

/// Slice a field-major vector list back into per-participant sets
fn split_field_major(
    rows: &[ParticipantTextRow],
    vectors: Vec<Vec<f32>>,
) -> Vec<StoredEmbeddings> {
    let n = rows.len();
    let mut chunks: Vec<Vec<Vec<f32>>> = Vec::with_capacity(5);
    let mut iter = vectors.into_iter();
    for _ in 0..5 {
        chunks.push(iter.by_ref().take(n).collect());
    }

    let mut globals = chunks.pop().unwrap_or_default().into_iter();
    let mut personals = chunks.pop().unwrap_or_default().into_iter();
    let mut professionals = chunks.pop().unwrap_or_default().into_iter();
    let mut academics = chunks.pop().unwrap_or_default().into_iter();
    let mut jobs = chunks.pop().unwrap_or_default().into_iter();

    rows.iter()
        .map(|row| StoredEmbeddings {
            id: row.id,
            name: row.name.clone(),
            embeddings: FieldEmbeddingSet {
                job: jobs.next(),
                academic: academics.next(),
                professional: professionals.next(),
                personal: personals.next(),
                global: globals.next(),
            },
        })
        .collect()
}
