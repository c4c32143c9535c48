//! Embeddings and field-level similarity for participant matching
//!
//! This crate provides the data side of the matcher:
//! - Cosine similarity with a conservative zero policy for degenerate input
//! - The in-memory field store loaded from two independent data sources
//! - SQLite persistence for participant texts and embeddings
//! - An OpenAI-compatible embedding client with batched requests
//! - Text cleaning and the full-dataset ingestion pipeline

pub mod client;
pub mod error;
pub mod field_store;
pub mod ingest;
pub mod similarity;
pub mod source;
pub mod store;
pub mod text;
pub mod types;

pub use client::{EmbeddingClient, EmbeddingClientConfig};
pub use error::{EmbeddingError, Result};
pub use field_store::{FieldStore, LoadStats, SharedFieldStore};
pub use ingest::{IngestionConfig, IngestionPipeline};
pub use similarity::{cosine_similarity, field_similarity, global_similarity, optional_similarity};
pub use source::{EmbeddingCapability, EmbeddingDataSource, ParticipantDataSource};
pub use store::{EmbeddingStore, StoredEmbeddings};
pub use types::{
    EmbeddingVector, IngestionReport, ParticipantEmbeddingRow, ParticipantTextRow, RawParticipant,
};
