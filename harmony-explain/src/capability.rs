//! Text-generation seam

use async_trait::async_trait;

use crate::error::Result;

/// A single-turn generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    /// Output ceiling in tokens
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Stateless single-turn text generation
///
/// `Ok(None)` means the model answered with nothing usable.
#[async_trait]
pub trait TextGenerationCapability: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>>;
}
