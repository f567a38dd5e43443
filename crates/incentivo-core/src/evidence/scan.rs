//! Keyword scan over a repository snapshot

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Returned by `extract` when no file qualifies
pub const NO_EVIDENCE: &str = "Nenhuma evidência relevante encontrada no repositório.";

pub const DEFAULT_EXTENSIONS: &[&str] = &["py", "md", "txt", "json", "yaml", "yml"];

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "lei do bem",
    "incentivo fiscal",
    "p&d",
    "irpj",
    "csll",
    "inovação",
    "pesquisa e desenvolvimento",
];

pub const DEFAULT_MAX_EXCERPTS: usize = 5;

pub const DEFAULT_EXCERPT_CHARS: usize = 1000;

/// Which files qualify as evidence and how much of each is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Extensions without the leading dot
    pub extensions: Vec<String>,
    /// Matched case-insensitively; a file needs at least one
    pub keywords: Vec<String>,
    pub max_excerpts: usize,
    pub excerpt_chars: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            max_excerpts: DEFAULT_MAX_EXCERPTS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// A bounded fragment of a file that mentions a keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    pub file_name: String,
    pub text: String,
}

impl fmt::Display for Excerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arquivo: {}\n{}", self.file_name, self.text)
    }
}

impl ScanSettings {
    fn wants_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    fn mentions_keyword(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .any(|kw| lowered.contains(kw.to_lowercase().as_str()))
    }

    /// Walk `root` in file-name order and collect up to `max_excerpts`
    /// excerpts. Unreadable entries are logged and skipped.
    pub fn scan(&self, root: &Path) -> Vec<Excerpt> {
        let mut excerpts = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            if excerpts.len() >= self.max_excerpts {
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable repository entry");
                    continue;
                }
            };

            if entry.file_type().is_dir() || !self.wants_extension(entry.path()) {
                continue;
            }

            let bytes = match fs::read(entry.path()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Failed to read file, skipping");
                    continue;
                }
            };

            let text = decode_lossy(&bytes);
            if !self.mentions_keyword(&text) {
                continue;
            }

            let head: String = text.chars().take(self.excerpt_chars).collect();
            debug!(path = %entry.path().display(), "Evidence file matched");
            excerpts.push(Excerpt {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                text: head.trim().to_string(),
            });
        }

        excerpts
    }
}

/// UTF-8 decode that drops invalid byte sequences
fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Render excerpts as blank-line separated blocks, or the no-evidence sentinel
pub fn render(excerpts: &[Excerpt]) -> String {
    if excerpts.is_empty() {
        return NO_EVIDENCE.to_string();
    }
    excerpts
        .iter()
        .map(Excerpt::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}
