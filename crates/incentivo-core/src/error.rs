//! Error types for Incentivo

use thiserror::Error;

/// Result type alias using Incentivo's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Incentivo error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Network errors (E100-E199)
    #[error("Network error: {0}. Check that the model endpoint is reachable.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    LLMError(String),

    // Repository errors (E300-E399)
    #[error("Repository fetch failed: {0}")]
    RepositoryFetch(#[from] git2::Error),

    // Graph errors (E400-E499)
    #[error("Graph store error: {0}. Check NEO4J_URI, NEO4J_USER and NEO4J_PASSWORD.")]
    Graph(#[from] neo4rs::Error),

    #[error("Graph row could not be decoded: {0}")]
    GraphRow(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Runtime errors (E900-E999)
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RepositoryFetch(_) => "E300",
            Self::Graph(_) => "E400",
            Self::GraphRow(_) => "E401",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::TaskFailed(_) => "E900",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NetworkError(_) => Some("incentivo config get llm.base_url".to_string()),
            Self::LLMError(_) => Some("incentivo config get llm.provider".to_string()),
            Self::Graph(_) => Some("incentivo ping".to_string()),
            Self::RepositoryFetch(_) => Some("Check the repository URL and your network access".to_string()),
            Self::ConfigError(_) => Some("incentivo config list".to_string()),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
