//! Incentivo Core Library
//!
//! This crate answers questions about the Lei do Bem by combining:
//! - A fixed domain-knowledge block
//! - Benefit lookups in a Neo4j graph
//! - Keyword evidence from a cloned source repository
//! - A text completion from Ollama or an OpenAI-compatible API

pub mod answer;
pub mod config;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod llm;
pub mod prompt;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::answer::AnswerGenerator;
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::evidence::RepositoryEvidence;
    pub use crate::graph::{GraphContextLookup, Neo4jGraphStore};
    pub use crate::llm::CompletionBackend;
}
