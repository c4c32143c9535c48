//! Match service combining ranking with explanations

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use harmony_core::{ExplanationRecord, HarmonyError, HarmonyResult, MatchResult, ParticipantId};
use harmony_embedding::{
    EmbeddingDataSource, IngestionPipeline, IngestionReport, LoadStats, ParticipantDataSource,
    RawParticipant, SharedFieldStore,
};
use harmony_explain::ExplanationGenerator;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::similarity_engine::SimilarityEngine;

/// Default number of explanations generated concurrently per request
pub const DEFAULT_EXPLAIN_CONCURRENCY: usize = 4;

/// A ranked candidate with its explanation, if one could be produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainedMatch {
    #[serde(flatten)]
    pub result: MatchResult,
    pub explanation: Option<ExplanationRecord>,
}

/// Both data sources a [`harmony_embedding::FieldStore`] is reloaded from
#[derive(Clone)]
pub struct DataSources {
    pub embeddings: Arc<dyn EmbeddingDataSource>,
    pub texts: Arc<dyn ParticipantDataSource>,
}

/// Service exposing the matcher's operations
pub struct MatchService {
    store: SharedFieldStore,
    engine: SimilarityEngine,
    generator: Arc<ExplanationGenerator>,
    sources: Option<DataSources>,
    ingestion: Option<IngestionPipeline>,
    concurrency: usize,
}

impl MatchService {
    /// Create a new match service
    ///
    /// `engine` and `generator` must read from the same `store`.
    pub fn new(
        store: SharedFieldStore,
        engine: SimilarityEngine,
        generator: Arc<ExplanationGenerator>,
    ) -> Self {
        Self {
            store,
            engine,
            generator,
            sources: None,
            ingestion: None,
            concurrency: DEFAULT_EXPLAIN_CONCURRENCY,
        }
    }

    /// Data sources used by [`MatchService::reload`]
    pub fn with_sources(mut self, sources: DataSources) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_ingestion(mut self, pipeline: IngestionPipeline) -> Self {
        self.ingestion = Some(pipeline);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &SharedFieldStore {
        &self.store
    }

    pub fn generator(&self) -> &Arc<ExplanationGenerator> {
        &self.generator
    }

    /// Number of participants in the current dataset
    pub fn participant_count(&self) -> usize {
        self.store.snapshot().len()
    }

    /// Rank the top `k` candidates for a participant
    #[instrument(skip(self))]
    pub fn rank_matches(
        &self,
        target_id: ParticipantId,
        k: usize,
    ) -> HarmonyResult<Vec<MatchResult>> {
        self.engine.get_top_matches(target_id, k)
    }

    /// Explain a single pair
    #[instrument(skip(self))]
    pub async fn explain(
        &self,
        target_id: ParticipantId,
        match_id: ParticipantId,
    ) -> HarmonyResult<ExplanationRecord> {
        self.generator.explain_pair(target_id, match_id).await
    }

    /// Rank the top `k` candidates and explain each of them
    ///
    /// Explanations run concurrently up to the configured limit and come back
    /// in ranking order. A missing or inconsistent candidate fails the whole
    /// request; any other explanation failure leaves that candidate with its
    /// score and no explanation.
    #[instrument(skip(self))]
    pub async fn top_matches_with_explanations(
        &self,
        target_id: ParticipantId,
        k: usize,
    ) -> HarmonyResult<Vec<ExplainedMatch>> {
        let ranked = self.rank_matches(target_id, k)?;
        let generator = &self.generator;

        let explained: Vec<ExplainedMatch> = stream::iter(ranked)
            .map(move |result| async move {
                let explanation = match generator.explain_pair(target_id, result.id).await {
                    Ok(record) => Some(record),
                    Err(e) if e.is_request_fatal() => return Err(e),
                    Err(e) => {
                        warn!("No explanation for pair {}-{}: {}", target_id, result.id, e);
                        None
                    }
                };
                Ok(ExplainedMatch {
                    result,
                    explanation,
                })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        info!(
            "Returning {} explained matches for participant {}",
            explained.len(),
            target_id
        );
        Ok(explained)
    }

    /// Reload the field store from the configured data sources
    ///
    /// On failure the previous dataset stays in place.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> HarmonyResult<LoadStats> {
        let sources = self
            .sources
            .as_ref()
            .ok_or_else(|| HarmonyError::config("No data sources configured for reload"))?;

        let stats = self
            .store
            .reload(sources.embeddings.as_ref(), sources.texts.as_ref())
            .await?;

        info!("Reloaded {} participants", stats.participants);
        Ok(stats)
    }

    /// Replace the dataset with freshly embedded participants, then reload
    ///
    /// Ids are reassigned by ingestion, so cached explanations are dropped.
    /// The new dataset is swapped in before the cache is cleared; explanations
    /// still generating from the old dataset are then discarded by the cache.
    #[instrument(skip(self, participants), fields(count = participants.len()))]
    pub async fn ingest(
        &self,
        participants: Vec<RawParticipant>,
    ) -> HarmonyResult<(IngestionReport, LoadStats)> {
        let pipeline = self
            .ingestion
            .as_ref()
            .ok_or_else(|| HarmonyError::config("Ingestion is not configured"))?;

        let report = pipeline.ingest(participants).await?;
        let stats = self.reload().await?;
        self.generator.cache().clear().await?;
        Ok((report, stats))
    }
}
