//! OpenAI-compatible embedding client

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    source::EmbeddingCapability,
    types::EmbeddingVector,
};

/// Default model, a multilingual sentence embedding served behind an
/// OpenAI-compatible `/embeddings` endpoint
pub const DEFAULT_EMBEDDING_MODEL: &str = "paraphrase-multilingual-MiniLM-L12-v2";

/// Default per-request timeout
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 60;

/// Embedding client configuration
#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API (None = api.openai.com)
    pub api_base: Option<String>,
    pub model: String,
    /// Expected vector dimension; responses of another size are rejected
    pub dimension: Option<usize>,
    pub timeout: Duration,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: None,
            timeout: Duration::from_secs(DEFAULT_EMBEDDING_TIMEOUT_SECS),
        }
    }
}

impl EmbeddingClientConfig {
    /// Load from environment variables
    ///
    /// - EMBEDDING_API_KEY (falls back to OPENAI_API_KEY)
    /// - EMBEDDING_BASE_URL
    /// - EMBEDDING_MODEL
    /// - EMBEDDING_DIMENSION
    /// - EMBEDDING_TIMEOUT_SECS
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("EMBEDDING_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            api_base: std::env::var("EMBEDDING_BASE_URL").ok(),
            model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.model),
            dimension: std::env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|d| d.parse().ok()),
            timeout: std::env::var("EMBEDDING_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// OpenAI embedding client
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: Option<usize>,
    timeout: Duration,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(config: EmbeddingClientConfig) -> Self {
        let mut openai_config = OpenAIConfig::new();
        if let Some(key) = config.api_key {
            openai_config = openai_config.with_api_key(key);
        }
        if let Some(base) = config.api_base {
            openai_config = openai_config.with_api_base(base);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.model,
            dimension: config.dimension,
            timeout: config.timeout,
        }
    }

    /// Low-level embedding generation for a batch
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn generate_embeddings(&self, texts: Vec<String>) -> Result<Vec<EmbeddingVector>> {
        let sent = texts.len();
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::StringArray(texts),
            encoding_format: None,
            dimensions: None,
            user: None,
        };

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout.as_secs()))??;

        if response.data.len() != sent {
            return Err(EmbeddingError::BatchMismatch {
                sent,
                received: response.data.len(),
            });
        }

        // The API reports each vector's input index; restore input order
        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            if let Some(expected) = self.dimension {
                if item.embedding.len() != expected {
                    return Err(EmbeddingError::InvalidDimension {
                        expected,
                        actual: item.embedding.len(),
                    });
                }
            }
            vectors.push(item.embedding);
        }

        debug!(
            "Generated {} embeddings: dimension={:?}, model={}",
            vectors.len(),
            vectors.first().map(|v| v.len()),
            self.model
        );

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingCapability for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.generate_embeddings(texts.to_vec()).await?;
        info!("Embedded {} texts with {}", vectors.len(), self.model);
        Ok(vectors)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
