//! Repository evidence extraction
//!
//! Fetches a repository snapshot on first use and scans it for files that
//! mention Lei do Bem terminology.

mod fetch;
mod scan;

use std::path::Path;
use std::sync::Arc;

pub use fetch::{FetchOutcome, GitFetcher, RepositoryFetcher, destination_for, ensure_fetched};
pub use scan::{
    DEFAULT_EXCERPT_CHARS, DEFAULT_EXTENSIONS, DEFAULT_KEYWORDS, DEFAULT_MAX_EXCERPTS, Excerpt,
    NO_EVIDENCE, ScanSettings, render,
};

use crate::error::Result;

/// Fetcher plus scan settings, cheap to clone into blocking tasks
#[derive(Clone)]
pub struct RepositoryEvidence {
    fetcher: Arc<dyn RepositoryFetcher>,
    settings: ScanSettings,
}

impl RepositoryEvidence {
    pub fn new(fetcher: Arc<dyn RepositoryFetcher>, settings: ScanSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Git-backed evidence with default scan settings
    pub fn git() -> Self {
        Self::new(Arc::new(GitFetcher), ScanSettings::default())
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Clone `url` into `destination` if it is not there yet
    pub fn ensure_fetched(&self, url: &str, destination: &Path) -> Result<FetchOutcome> {
        ensure_fetched(self.fetcher.as_ref(), url, destination)
    }

    /// Matching excerpts in traversal order
    pub fn excerpts(&self, destination: &Path) -> Vec<Excerpt> {
        self.settings.scan(destination)
    }

    /// Excerpts rendered for the prompt, or the no-evidence sentinel
    pub fn extract(&self, destination: &Path) -> String {
        render(&self.excerpts(destination))
    }
}
