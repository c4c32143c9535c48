//! In-memory field store
//!
//! Holds every participant's per-field embeddings and cleaned texts for the
//! lifetime of one load. Loading is a one-shot bulk operation over two
//! independent data sources that share an id space; malformed rows are
//! skipped, and vectors whose dimension disagrees with the rest of their field
//! are dropped to absent.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use harmony_core::{
    EmbeddingVector, FieldEmbeddingSet, FieldKind, FieldTextSet, HarmonyError, HarmonyResult,
    Participant, ParticipantId,
};
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::Result,
    source::{EmbeddingDataSource, ParticipantDataSource},
    types::{ParticipantEmbeddingRow, ParticipantTextRow},
};

/// Vector slot in a [`FieldEmbeddingSet`], including the global profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Field(FieldKind),
    Global,
}

const SLOTS: [Slot; 5] = [
    Slot::Field(FieldKind::JobTitle),
    Slot::Field(FieldKind::Academic),
    Slot::Field(FieldKind::Professional),
    Slot::Field(FieldKind::Personal),
    Slot::Global,
];

fn slot_mut(set: &mut FieldEmbeddingSet, slot: Slot) -> &mut Option<EmbeddingVector> {
    match slot {
        Slot::Field(kind) => set.field_mut(kind),
        Slot::Global => &mut set.global,
    }
}

/// Counts from one bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub participants: usize,
    pub embedding_rows: usize,
    pub text_rows: usize,
    pub malformed_rows: usize,
    pub dropped_vectors: usize,
    pub missing_texts: usize,
    pub missing_embeddings: usize,
}

/// All participants of one dataset, indexed by id
#[derive(Debug, Default)]
pub struct FieldStore {
    participants: Vec<Participant>,
    index: HashMap<ParticipantId, usize>,
    dimensions: HashMap<FieldKind, usize>,
    stats: LoadStats,
}

impl FieldStore {
    /// Bulk-load both sources and build the store
    ///
    /// Only source-level failures are returned; bad rows never fail a load.
    #[instrument(skip_all)]
    pub async fn load(
        embeddings: &dyn EmbeddingDataSource,
        texts: &dyn ParticipantDataSource,
    ) -> Result<Self> {
        let (embedding_rows, text_rows) =
            futures::try_join!(embeddings.load_embeddings(), texts.load_texts())?;

        let store = Self::from_rows(embedding_rows, text_rows);
        info!(
            "Field store loaded: {} participants ({} malformed rows skipped, {} vectors dropped)",
            store.stats.participants, store.stats.malformed_rows, store.stats.dropped_vectors
        );
        Ok(store)
    }

    /// Build a store from already-fetched rows
    pub fn from_rows(
        embedding_rows: Vec<ParticipantEmbeddingRow>,
        text_rows: Vec<ParticipantTextRow>,
    ) -> Self {
        let mut stats = LoadStats {
            embedding_rows: embedding_rows.len(),
            text_rows: text_rows.len(),
            ..LoadStats::default()
        };

        let mut merged: BTreeMap<ParticipantId, Participant> = BTreeMap::new();

        for row in embedding_rows {
            let id = row.id;
            match parse_embedding_row(&row) {
                Ok(set) => {
                    if merged.contains_key(&id) {
                        warn!("Duplicate embedding row for participant {}, keeping first", id);
                        continue;
                    }
                    merged.insert(id, Participant::new(id, row.name).with_embeddings(set));
                }
                Err(e) => {
                    debug!("Skipping embedding row {}: {}", id, e);
                    stats.malformed_rows += 1;
                }
            }
        }

        for row in text_rows {
            let texts = row.texts();
            let entry = merged
                .entry(row.id)
                .or_insert_with(|| Participant::new(row.id, row.name.clone()));

            if entry.texts.is_some() {
                warn!("Duplicate text row for participant {}, keeping first", row.id);
                continue;
            }
            if entry.name.is_empty() {
                entry.name = row.name;
            }
            entry.image_url = row.image_url;
            entry.texts = Some(texts);
        }

        let mut participants: Vec<Participant> = merged.into_values().collect();
        let (dimensions, dropped) = normalize_dimensions(&mut participants);
        stats.dropped_vectors = dropped;
        stats.participants = participants.len();
        stats.missing_texts = participants.iter().filter(|p| p.texts.is_none()).count();
        stats.missing_embeddings = participants
            .iter()
            .filter(|p| p.embeddings.is_none())
            .count();

        if stats.missing_texts > 0 || stats.missing_embeddings > 0 {
            warn!(
                "Data sources disagree: {} participants without texts, {} without embeddings",
                stats.missing_texts, stats.missing_embeddings
            );
        }

        let contiguous = participants
            .iter()
            .enumerate()
            .all(|(i, p)| p.id as usize == i);
        if !contiguous {
            warn!("Participant ids are not contiguous from zero");
        }

        let index = participants
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        Self {
            participants,
            index,
            dimensions,
            stats,
        }
    }

    /// Build a store directly from participants (for tests and fixtures)
    pub fn from_participants(participants: Vec<Participant>) -> Self {
        let mut participants = participants;
        participants.sort_by_key(|p| p.id);
        participants.dedup_by_key(|p| p.id);
        let (dimensions, dropped) = normalize_dimensions(&mut participants);
        let index = participants
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        Self {
            stats: LoadStats {
                participants: participants.len(),
                dropped_vectors: dropped,
                ..LoadStats::default()
            },
            participants,
            index,
            dimensions,
        }
    }

    pub fn find_by_id(&self, id: ParticipantId) -> Option<&Participant> {
        self.index.get(&id).map(|&i| &self.participants[i])
    }

    /// Texts of a participant; `None` when the id or its text row is missing
    pub fn find_texts(&self, id: ParticipantId) -> Option<&FieldTextSet> {
        self.find_by_id(id).and_then(|p| p.texts.as_ref())
    }

    /// Embeddings of a participant; `None` when the id or its vectors are missing
    pub fn find_embeddings(&self, id: ParticipantId) -> Option<&FieldEmbeddingSet> {
        self.find_by_id(id).and_then(|p| p.embeddings.as_ref())
    }

    /// Resolve a participant that must be present in both data sources
    pub fn require_complete(&self, id: ParticipantId) -> HarmonyResult<&Participant> {
        let participant = self
            .find_by_id(id)
            .ok_or_else(|| HarmonyError::not_found(format!("Participant {} not found", id)))?;

        match (&participant.embeddings, &participant.texts) {
            (Some(_), Some(_)) => Ok(participant),
            (None, _) => Err(HarmonyError::data_inconsistency(format!(
                "Participant {} has texts but no embeddings",
                id
            ))),
            (_, None) => Err(HarmonyError::data_inconsistency(format!(
                "Participant {} has embeddings but no texts",
                id
            ))),
        }
    }

    /// Participants in ascending id order
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Dominant dimension of a field, if any vector is present
    pub fn dimension(&self, field: FieldKind) -> Option<usize> {
        self.dimensions.get(&field).copied()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }
}

/// Parse every payload of a row; any unparseable payload rejects the row
fn parse_embedding_row(row: &ParticipantEmbeddingRow) -> HarmonyResult<FieldEmbeddingSet> {
    Ok(FieldEmbeddingSet {
        job: parse_vector(row.job_title_embedding.as_deref())?,
        academic: parse_vector(row.academic_embedding.as_deref())?,
        professional: parse_vector(row.professional_embedding.as_deref())?,
        personal: parse_vector(row.personal_embedding.as_deref())?,
        global: parse_vector(row.profile_embedding.as_deref())?,
    })
}

fn parse_vector(payload: Option<&str>) -> HarmonyResult<Option<EmbeddingVector>> {
    let payload = match payload.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(p) => p,
    };

    let vector: EmbeddingVector = serde_json::from_str(payload)
        .map_err(|e| HarmonyError::malformed_row(format!("unparseable embedding: {}", e)))?;

    Ok(if vector.is_empty() { None } else { Some(vector) })
}

/// Drop vectors whose length differs from their slot's most common length
///
/// Returns the dominant dimension per scoring field and the number of
/// vectors dropped.
fn normalize_dimensions(
    participants: &mut [Participant],
) -> (HashMap<FieldKind, usize>, usize) {
    let mut dimensions = HashMap::new();
    let mut dropped = 0;

    for slot in SLOTS {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for p in participants.iter_mut() {
            if let Some(set) = p.embeddings.as_mut() {
                if let Some(v) = slot_mut(set, slot).as_ref() {
                    *counts.entry(v.len()).or_default() += 1;
                }
            }
        }

        // Most frequent length; ties resolve to the smaller dimension
        let Some(dominant) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(len, _)| *len)
        else {
            continue;
        };

        for p in participants.iter_mut() {
            if let Some(set) = p.embeddings.as_mut() {
                let vector = slot_mut(set, slot);
                if vector.as_ref().is_some_and(|v| v.len() != dominant) {
                    debug!(
                        "Dropping {:?} vector of participant {}: dimension differs from {}",
                        slot, p.id, dominant
                    );
                    *vector = None;
                    dropped += 1;
                }
            }
        }

        if let Slot::Field(kind) = slot {
            dimensions.insert(kind, dominant);
        }
    }

    (dimensions, dropped)
}

/// Shared handle to the current field store with an explicit reload lifecycle
///
/// Readers take a cheap snapshot; a reload swaps the whole store atomically,
/// so an in-progress query keeps the dataset it started with.
#[derive(Debug, Clone, Default)]
pub struct SharedFieldStore {
    inner: Arc<RwLock<Arc<FieldStore>>>,
}

impl SharedFieldStore {
    pub fn new(store: FieldStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(store))),
        }
    }

    /// Current dataset
    pub fn snapshot(&self) -> Arc<FieldStore> {
        Arc::clone(&self.inner.read())
    }

    /// Swap in a freshly loaded dataset
    pub fn replace(&self, store: FieldStore) {
        *self.inner.write() = Arc::new(store);
    }

    /// Reload from the data sources and swap on success
    pub async fn reload(
        &self,
        embeddings: &dyn EmbeddingDataSource,
        texts: &dyn ParticipantDataSource,
    ) -> Result<LoadStats> {
        let store = FieldStore::load(embeddings, texts).await?;
        let stats = store.stats().clone();
        self.replace(store);
        Ok(stats)
    }
}
