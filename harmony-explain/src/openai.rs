use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::capability::{GenerationRequest, TextGenerationCapability};
use crate::error::{ExplainError, Result};

/// Default chat model, served by any OpenAI-compatible endpoint
pub const DEFAULT_GENERATION_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    /// Build a client from environment variables
    ///
    /// - GENERATION_API_KEY (falls back to OPENAI_API_KEY, which async-openai
    ///   reads on its own)
    /// - OPENAI_BASE_URL for OpenAI-compatible providers
    /// - GENERATION_MODEL
    pub fn from_env() -> Self {
        let mut config = OpenAIConfig::default();
        if let Ok(key) = std::env::var("GENERATION_API_KEY") {
            config = config.with_api_key(key);
        }
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            config = config.with_api_base(base);
        }

        let model = std::env::var("GENERATION_MODEL")
            .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string());

        Self {
            client: Client::with_config(config),
            model,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerationCapability for OpenAIClient {
    #[instrument(skip(self, request), fields(model = %self.model, max_tokens = request.max_tokens))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>> {
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system.as_str())
                    .build()
                    .map_err(|e| ExplainError::Request(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(request.prompt.as_str())
                    .build()
                    .map_err(|e| ExplainError::Request(e.to_string()))?
                    .into(),
            ])
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| ExplainError::Request(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| ExplainError::Api(format!("OpenAI API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone());

        debug!("Raw generation output: {:?}", content);

        Ok(content.filter(|text| !text.trim().is_empty()))
    }
}
