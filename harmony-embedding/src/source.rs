//! Capability seams consumed by the matcher
//!
//! The embedding vendor and the two participant data sources are abstract;
//! concrete adapters live in [`crate::client`] and [`crate::store`].

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{EmbeddingError, Result},
    types::{EmbeddingVector, ParticipantEmbeddingRow, ParticipantTextRow},
};

/// Turns texts into embedding vectors
#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    /// Embed a batch of texts, one vector per input, order preserved
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    /// Model identifier recorded alongside stored vectors
    fn model(&self) -> &str;

    /// Embed any number of texts in fixed-size chunks
    ///
    /// Exactly one batch is in flight at a time.
    async fn embed_batched(
        &self,
        texts: &[String],
        batch_size: usize,
    ) -> Result<Vec<EmbeddingVector>> {
        let batch_size = batch_size.max(1);
        let mut all = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(batch_size).enumerate() {
            let start = i * batch_size;
            debug!("Embedding batch {}-{}", start, start + batch.len());

            let vectors = self.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::BatchMismatch {
                    sent: batch.len(),
                    received: vectors.len(),
                });
            }
            all.extend(vectors);
        }

        Ok(all)
    }
}

/// Yields participant records with named text fields
#[async_trait]
pub trait ParticipantDataSource: Send + Sync {
    async fn load_texts(&self) -> Result<Vec<ParticipantTextRow>>;
}

/// Yields participant records with named vector fields
///
/// Must share the id space of the [`ParticipantDataSource`] it is paired with.
#[async_trait]
pub trait EmbeddingDataSource: Send + Sync {
    async fn load_embeddings(&self) -> Result<Vec<ParticipantEmbeddingRow>>;
}
