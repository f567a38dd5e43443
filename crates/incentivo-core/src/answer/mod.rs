//! Answer generation
//!
//! Gathers graph context and optional repository evidence for a question,
//! composes the prompt and returns the model's output verbatim. Steps run one
//! after another; any failure aborts the whole answer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::evidence::{RepositoryEvidence, destination_for};
use crate::graph::GraphContextLookup;
use crate::llm::CompletionBackend;
use crate::prompt::{BASE_CONTEXT, NO_REPOSITORY, compose};

pub struct AnswerGenerator {
    graph: GraphContextLookup,
    evidence: RepositoryEvidence,
    completion: Arc<dyn CompletionBackend>,
    cache_dir: PathBuf,
}

impl AnswerGenerator {
    pub fn new(
        graph: GraphContextLookup,
        evidence: RepositoryEvidence,
        completion: Arc<dyn CompletionBackend>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            graph,
            evidence,
            completion,
            cache_dir: cache_dir.into(),
        }
    }

    /// Directory that holds repository snapshots
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Gather context and build the prompt without calling the model
    pub async fn compose_prompt(&self, question: &str, repo_url: Option<&str>) -> Result<String> {
        if question.trim().is_empty() {
            return Err(Error::InvalidInput("question cannot be empty".to_string()));
        }

        // The raw question is the search term
        let graph_context = self.graph.context(question).await?;

        let repo_context = match repo_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => self.repository_context(url).await?,
            None => NO_REPOSITORY.to_string(),
        };

        Ok(compose(BASE_CONTEXT, &graph_context, &repo_context, question))
    }

    /// Answer `question`, optionally grounding it on the repository at `repo_url`
    pub async fn answer(&self, question: &str, repo_url: Option<&str>) -> Result<String> {
        let prompt = self.compose_prompt(question, repo_url).await?;

        debug!(
            model = %self.completion.model(),
            prompt_chars = prompt.chars().count(),
            "Dispatching composed prompt"
        );
        let answer = self.completion.complete(&prompt).await?;
        info!(model = %self.completion.model(), "Answer generated");

        Ok(answer)
    }

    async fn repository_context(&self, url: &str) -> Result<String> {
        let evidence = self.evidence.clone();
        let url = url.to_string();
        let destination = destination_for(&self.cache_dir, &url);

        tokio::task::spawn_blocking(move || -> Result<String> {
            evidence.ensure_fetched(&url, &destination)?;
            Ok(evidence.extract(&destination))
        })
        .await?
    }
}
