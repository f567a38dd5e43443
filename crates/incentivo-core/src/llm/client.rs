//! OpenAI-compatible chat completion client (OpenRouter by default)
//!
//! The composed prompt is sent as a single user message and the first
//! choice's content is returned untouched. Failures are surfaced as-is;
//! there is no retry or model fallback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::CompletionBackend;
use super::types::{ChatRequest, ChatResponse, LlmResponse, Message};

/// Chat completion client
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the LLM configuration
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL (defaults to the configured one, then OpenRouter)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Build the LlmClient
    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_else(|| LlmConfig {
            provider: LlmProvider::OpenRouter,
            model: LlmProvider::OpenRouter.default_model().to_string(),
            ..LlmConfig::default()
        });
        let api_key = self
            .api_key
            .ok_or_else(|| Error::LLMError("API key is required. Set INCENTIVO_API_KEY or OPENROUTER_API_KEY.".to_string()))?;

        let mut builder = HttpClient::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http_client = builder.build().map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.resolved_base_url())
            .trim_end_matches('/')
            .to_string();

        Ok(LlmClient {
            http_client,
            config,
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    /// Create a new LlmClient with the given configuration and API key
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new().config(config).api_key(api_key).build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    /// Make a chat completion request
    pub async fn chat(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatRequest::new(&self.config.model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        self.send_request(&request).await
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Incentivo")
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();

        if !status.is_success() {
            return handle_error_response(status, response).await;
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        let parsed = LlmResponse::from_chat_response(chat_response)
            .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))?;

        debug!(
            model = %parsed.model,
            input_tokens = parsed.input_tokens,
            output_tokens = parsed.output_tokens,
            "Chat completion received"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.chat(vec![Message::user(prompt)]).await?;
        Ok(response.content)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Map an unsuccessful HTTP status to an LLM error
pub(crate) async fn handle_error_response<T>(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> Result<T> {
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 => Err(Error::LLMError(
            "Unauthorized: Invalid API key. Set INCENTIVO_API_KEY or OPENROUTER_API_KEY environment variable.".to_string(),
        )),
        402 => Err(Error::LLMError(
            "Payment required: Insufficient credits on the provider account".to_string(),
        )),
        400 => Err(Error::LLMError(format!("Bad request: {}", body))),
        403 => Err(Error::LLMError(format!("Forbidden: {}", body))),
        404 => Err(Error::LLMError(format!(
            "Model not found or endpoint unavailable: {}",
            body
        ))),
        429 => Err(Error::LLMError(format!("Rate limited: {}", body))),
        500..=599 => Err(Error::LLMError(format!("Server error ({}): {}", status, body))),
        _ => Err(Error::LLMError(format!("HTTP error {}: {}", status, body))),
    }
}
