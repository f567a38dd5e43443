//! LLM integration
//!
//! This module provides:
//! - The `CompletionBackend` seam used by the answer generator
//! - An Ollama client (`/api/generate`)
//! - An OpenAI-compatible chat client (OpenRouter by default)

mod client;
mod ollama;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

pub use client::{LlmClient, LlmClientBuilder};
pub use ollama::OllamaClient;
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, GenerateOptions, GenerateRequest,
    GenerateResponse, LlmResponse, Message, MessageRole, Usage,
};

/// A text-completion capability: prompt in, generated text out
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete the prompt, returning the model output unmodified
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier used for completions
    fn model(&self) -> &str;
}

/// Build the backend selected by `llm.provider`
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn CompletionBackend>> {
    match config.provider {
        LlmProvider::Ollama => Ok(Arc::new(OllamaClient::new(config.clone())?)),
        LlmProvider::OpenRouter => {
            let api_key = config
                .resolved_api_key()
                .map_err(|e| Error::ConfigError(e.to_string()))?
                .ok_or_else(|| {
                    Error::ConfigError(
                        "OpenRouter requires INCENTIVO_API_KEY or OPENROUTER_API_KEY".to_string(),
                    )
                })?;
            Ok(Arc::new(LlmClient::new(config.clone(), api_key)?))
        }
    }
}
