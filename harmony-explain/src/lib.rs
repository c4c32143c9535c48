//! Match explanations
//!
//! Turns a scored participant pair into a short explanation in Arabic with
//! English and Hebrew translations, backed by a durable per-pair cache.

pub mod cache;
pub mod capability;
pub mod error;
pub mod generator;
pub mod openai;
pub mod prompts;

pub use cache::{ExplanationCache, DEFAULT_CACHE_PATH};
pub use capability::{GenerationRequest, TextGenerationCapability};
pub use error::{ExplainError, Result};
pub use generator::{CachePolicy, ExplanationGenerator, GenerationConfig};
pub use openai::{OpenAIClient, DEFAULT_GENERATION_MODEL};
