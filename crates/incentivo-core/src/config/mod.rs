//! Configuration management with file persistence
//!
//! Non-secret settings live in a TOML file; connection secrets are only ever
//! read from the environment (`NEO4J_PASSWORD`, `INCENTIVO_API_KEY`,
//! `OPENROUTER_API_KEY`).

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::evidence::ScanSettings;

/// Incentivo configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    #[serde(skip)]
    pub password: Option<String>,
}

/// Which completion backend answers the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local Ollama server (`/api/generate`)
    #[default]
    Ollama,
    /// OpenRouter or any OpenAI-compatible endpoint (`/chat/completions`)
    OpenRouter,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "llama3",
            LlmProvider::OpenRouter => "openai/gpt-4o-mini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            other => Err(anyhow!(
                "Invalid LLM provider: {}. Valid options: ollama, openrouter",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub provider: LlmProvider,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Request timeout in seconds; 0 waits indefinitely
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub cache_dir: PathBuf,
    pub max_excerpts: usize,
    pub excerpt_chars: usize,
    pub extensions: Vec<String>,
    pub keywords: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://127.0.0.1:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        let provider = LlmProvider::default();
        Self {
            api_key: None,
            provider,
            model: provider.default_model().to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 0,
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        let scan = ScanSettings::default();
        Self {
            cache_dir: PathBuf::from("repos"),
            max_excerpts: scan.max_excerpts,
            excerpt_chars: scan.excerpt_chars,
            extensions: scan.extensions,
            keywords: scan.keywords,
        }
    }
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        "***".to_string()
    } else {
        let suffix: String = secret.chars().skip(count - 4).collect();
        format!("***{}", suffix)
    }
}

impl GraphConfig {
    /// Connection URI, `NEO4J_URI` taking precedence over the file
    pub fn resolved_uri(&self) -> String {
        self.resolved_uri_from(process_env)
    }

    pub fn resolved_uri_from(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        lookup("NEO4J_URI").unwrap_or_else(|| self.uri.clone())
    }

    /// Principal, `NEO4J_USER` taking precedence over the file
    pub fn resolved_user(&self) -> String {
        self.resolved_user_from(process_env)
    }

    pub fn resolved_user_from(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        lookup("NEO4J_USER").unwrap_or_else(|| self.user.clone())
    }

    pub fn resolved_password(&self) -> anyhow::Result<Option<String>> {
        self.resolved_password_from(process_env)
    }

    pub fn resolved_password_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;
        Ok(lookup("NEO4J_PASSWORD"))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.password.is_some() {
            return Err(anyhow!(
                "Graph credentials must be provided via the NEO4J_PASSWORD environment variable, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key_from(process_env)
    }

    pub fn resolved_api_key_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;
        Ok(lookup("INCENTIVO_API_KEY").or_else(|| lookup("OPENROUTER_API_KEY")))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    /// Base URL, falling back to the provider's well-known endpoint
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl RepositoryConfig {
    /// Scan parameters for the evidence extractor
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            extensions: self.extensions.clone(),
            keywords: self.keywords.iter().map(|kw| kw.to_lowercase()).collect(),
            max_excerpts: self.max_excerpts,
            excerpt_chars: self.excerpt_chars,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("INCENTIVO_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("incentivo")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or return defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.graph.enforce_env_only()?;
        self.llm.enforce_env_only()?;
        if self.repository.max_excerpts == 0 {
            return Err(anyhow!("repository.max_excerpts must be greater than zero"));
        }
        if self.repository.excerpt_chars == 0 {
            return Err(anyhow!("repository.excerpt_chars must be greater than zero"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Graph settings
            "graph.uri" => Ok(self.graph.uri.clone()),
            "graph.user" => Ok(self.graph.user.clone()),
            "graph.password" => match self.graph.resolved_password()? {
                Some(password) => Ok(redact(&password)),
                None => Ok("(not set - use NEO4J_PASSWORD env var)".to_string()),
            },

            // LLM settings
            "llm.provider" => Ok(self.llm.provider.to_string()),
            "llm.model" => Ok(self.llm.model.clone()),
            "llm.base_url" => Ok(self.llm.resolved_base_url()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(
                    "(not set - use INCENTIVO_API_KEY or OPENROUTER_API_KEY env var)".to_string(),
                ),
            },

            // Repository settings
            "repository.cache_dir" => Ok(self.repository.cache_dir.display().to_string()),
            "repository.max_excerpts" => Ok(self.repository.max_excerpts.to_string()),
            "repository.excerpt_chars" => Ok(self.repository.excerpt_chars.to_string()),
            "repository.extensions" => Ok(self.repository.extensions.join(", ")),
            "repository.keywords" => Ok(self.repository.keywords.join(", ")),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `incentivo config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "graph.uri" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Graph URI cannot be empty"));
                }
                self.graph.uri = value.trim().to_string();
            }
            "graph.user" => {
                self.graph.user = value.trim().to_string();
            }

            "llm.provider" => {
                let provider: LlmProvider = value.parse()?;
                // Follow the provider's default model unless one was picked explicitly
                if self.llm.model == self.llm.provider.default_model() {
                    self.llm.model = provider.default_model().to_string();
                }
                self.llm.provider = provider;
            }
            "llm.model" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Model name cannot be empty"));
                }
                self.llm.model = value.trim().to_string();
            }
            "llm.base_url" => {
                let trimmed = value.trim().trim_end_matches('/');
                self.llm.base_url = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                };
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            "repository.cache_dir" => {
                self.repository.cache_dir = PathBuf::from(value);
            }
            "repository.max_excerpts" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_excerpts value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_excerpts must be greater than zero"));
                }
                self.repository.max_excerpts = max;
            }
            "repository.excerpt_chars" => {
                let chars: usize = value
                    .parse()
                    .with_context(|| format!("Invalid excerpt_chars value: {}", value))?;
                if chars == 0 {
                    return Err(anyhow!("excerpt_chars must be greater than zero"));
                }
                self.repository.excerpt_chars = chars;
            }
            "repository.extensions" => {
                self.repository.extensions = split_list(value)
                    .into_iter()
                    .map(|ext| ext.trim_start_matches('.').to_string())
                    .collect();
            }
            "repository.keywords" => {
                self.repository.keywords = split_list(value)
                    .into_iter()
                    .map(|kw| kw.to_lowercase())
                    .collect();
            }

            // Secrets cannot be set via config
            "graph.password" | "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "Credentials cannot be stored in configuration for security. \
                     Set NEO4J_PASSWORD, INCENTIVO_API_KEY or OPENROUTER_API_KEY instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `incentivo config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "graph.uri",
            "graph.user",
            "graph.password",
            "llm.provider",
            "llm.model",
            "llm.base_url",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "repository.cache_dir",
            "repository.max_excerpts",
            "repository.excerpt_chars",
            "repository.extensions",
            "repository.keywords",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
