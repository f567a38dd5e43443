//! Ollama completion client
//!
//! Calls `/api/generate` with streaming disabled and returns the `response`
//! field verbatim.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::CompletionBackend;
use super::client::handle_error_response;
use super::types::{GenerateOptions, GenerateRequest, GenerateResponse};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http_client: HttpClient,
    config: LlmConfig,
    base_url: String,
}

impl OllamaClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http_client = builder.build().map_err(Error::NetworkError)?;
        let base_url = config.resolved_base_url().trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            config,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn generate(&self, prompt: &str) -> Result<GenerateResponse> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        debug!(
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "Sending generate request to Ollama"
        );

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return handle_error_response(status, response).await;
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse Ollama response: {}", e)))?;

        debug!(
            prompt_tokens = generated.prompt_eval_count.unwrap_or(0),
            completion_tokens = generated.eval_count.unwrap_or(0),
            "Ollama generation received"
        );

        Ok(generated)
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(self.generate(prompt).await?.response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
