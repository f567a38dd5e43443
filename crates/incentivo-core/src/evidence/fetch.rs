//! Repository snapshots: clone once per destination, never refresh

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;

/// Materializes a working copy of a remote repository at a path
pub trait RepositoryFetcher: Send + Sync {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Clones with libgit2
#[derive(Debug, Clone, Copy, Default)]
pub struct GitFetcher;

impl RepositoryFetcher for GitFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        info!(url = %url, destination = %destination.display(), "Cloning repository");
        git2::Repository::clone(url, destination)?;
        Ok(())
    }
}

/// What `ensure_fetched` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The repository was cloned into the destination
    Fetched,
    /// The destination already existed and was reused as-is
    AlreadyPresent,
}

/// Clone `url` into `destination` unless the destination already exists.
///
/// The clone lands in a hidden sibling staging directory first and is then
/// renamed into place, so a destination is either absent or complete.
/// Existing destinations are never refreshed or checked against `url`.
pub fn ensure_fetched(
    fetcher: &dyn RepositoryFetcher,
    url: &str,
    destination: &Path,
) -> Result<FetchOutcome> {
    if destination.exists() {
        debug!(destination = %destination.display(), "Repository snapshot already present");
        return Ok(FetchOutcome::AlreadyPresent);
    }

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string());
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.fetch-", name))
        .tempdir_in(parent)?;

    fetcher.fetch(url, staging.path())?;

    match fs::rename(staging.path(), destination) {
        Ok(()) => {
            info!(destination = %destination.display(), "Repository snapshot created");
            Ok(FetchOutcome::Fetched)
        }
        Err(_) if destination.exists() => {
            warn!(
                destination = %destination.display(),
                "Another fetch created the snapshot first, discarding staged copy"
            );
            Ok(FetchOutcome::AlreadyPresent)
        }
        Err(e) => Err(e.into()),
    }
}

/// Snapshot directory for `url` under `cache_dir`: `<host>__<owner>__<name>`
pub fn destination_for(cache_dir: &Path, url: &str) -> PathBuf {
    let (host, path) = split_remote(url.trim().trim_end_matches('/'));

    let path_segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();
    let tail = path_segments
        .iter()
        .rev()
        .take(2)
        .rev()
        .map(|s| s.trim_end_matches(".git"));

    let name = host
        .into_iter()
        .chain(tail)
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("__");

    if name.is_empty() {
        cache_dir.join("repo")
    } else {
        cache_dir.join(name)
    }
}

/// Split a remote into host (without user info) and path.
/// Handles `scheme://host/path`, scp-like `user@host:path` and plain paths.
fn split_remote(url: &str) -> (Option<&str>, &str) {
    let (authority, path) = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').unwrap_or((rest, "")),
        None => match url.split_once(':') {
            Some((host, path)) if !host.contains(['/', '\\']) && host.len() > 1 => (host, path),
            _ => return (None, url),
        },
    };
    let host = authority.rsplit('@').next().unwrap_or(authority);
    ((!host.is_empty()).then_some(host), path)
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl RepositoryFetcher for CountingFetcher {
        fn fetch(&self, _url: &str, destination: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(destination.join("README.md"), "Lei do Bem")?;
            Ok(())
        }
    }

    struct FailingFetcher;

    impl RepositoryFetcher for FailingFetcher {
        fn fetch(&self, _url: &str, destination: &Path) -> Result<()> {
            fs::write(destination.join("partial.txt"), "half")?;
            Err(Error::Other("network unreachable".to_string()))
        }
    }

    #[test]
    fn test_second_call_does_not_fetch_again() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("repos").join("org__projeto");
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
        };

        let first = ensure_fetched(&fetcher, "https://example.com/org/projeto.git", &dest).unwrap();
        let second = ensure_fetched(&fetcher, "https://example.com/org/projeto.git", &dest).unwrap();

        assert_eq!(first, FetchOutcome::Fetched);
        assert_eq!(second, FetchOutcome::AlreadyPresent);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(dest.join("README.md").exists());
    }

    #[test]
    fn test_existing_destination_is_never_refreshed() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("snapshot");
        fs::create_dir_all(&dest).unwrap();
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
        };

        let outcome = ensure_fetched(&fetcher, "https://example.com/other/url.git", &dest).unwrap();

        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_fetch_leaves_no_destination_or_staging() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("snapshot");

        let result = ensure_fetched(&FailingFetcher, "https://example.com/x.git", &dest);

        assert!(result.is_err());
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_staging_directory_is_cleaned_up() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("snapshot");
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
        };

        ensure_fetched(&fetcher, "https://example.com/x.git", &dest).unwrap();

        let entries: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["snapshot".to_string()]);
    }

    #[test]
    fn test_git_fetcher_clones_local_repository() {
        let tmp = TempDir::new().unwrap();
        let origin = tmp.path().join("origin");
        let repo = git2::Repository::init(&origin).unwrap();
        fs::write(origin.join("notes.md"), "incentivo fiscal").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("notes.md")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();

        let dest = tmp.path().join("cache").join("origin");
        let url = origin.to_string_lossy().into_owned();
        let outcome = ensure_fetched(&GitFetcher, &url, &dest).unwrap();

        assert_eq!(outcome, FetchOutcome::Fetched);
        assert_eq!(
            fs::read_to_string(dest.join("notes.md")).unwrap(),
            "incentivo fiscal"
        );
    }

    #[test]
    fn test_destination_for_urls() {
        let cache = Path::new("/cache");
        assert_eq!(
            destination_for(cache, "https://github.com/acme/lei-do-bem.git"),
            PathBuf::from("/cache/github.com__acme__lei-do-bem")
        );
        assert_eq!(
            destination_for(cache, "git@github.com:acme/relatorios.git"),
            PathBuf::from("/cache/github.com__acme__relatorios")
        );
        assert_eq!(
            destination_for(cache, "https://example.com/acme/projeto/"),
            PathBuf::from("/cache/example.com__acme__projeto")
        );
        assert_eq!(
            destination_for(cache, "https://token@example.com:8443/acme/projeto"),
            PathBuf::from("/cache/example.com_8443__acme__projeto")
        );
        assert_eq!(
            destination_for(cache, "file:///srv/git/acme/docs.git"),
            PathBuf::from("/cache/acme__docs")
        );
        assert_eq!(destination_for(cache, "   "), PathBuf::from("/cache/repo"));
    }

    #[test]
    fn test_same_repository_name_on_different_hosts_does_not_collide() {
        let cache = Path::new("/cache");
        assert_ne!(
            destination_for(cache, "https://github.com/acme/x"),
            destination_for(cache, "https://gitlab.com/acme/x")
        );
    }
}
