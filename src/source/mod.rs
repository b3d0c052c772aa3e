// ABOUTME: Source fetcher: shallow single-branch git clone into a work directory.
// ABOUTME: Normalizes repository URLs and reports the resolved tip commit.

use chrono::{DateTime, TimeZone, Utc};
use git2::build::RepoBuilder;
use git2::FetchOptions;
use std::fs;
use std::path::Path;

/// Resolved tip commit of a fetched branch.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

/// Errors from source fetching.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("invalid source repository: {0}")]
    InvalidSource(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),
}

/// Normalize a repository reference into a fetchable remote URL.
///
/// Accepted forms:
/// - full `http(s)://` or `git@`/`ssh://` URLs, `.git` appended to
///   `http(s)` URLs when missing
/// - bare `owner/repo`, expanded to `https://github.com/owner/repo.git`
pub fn normalize_repo_url(input: &str) -> Result<String, SourceError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SourceError::InvalidSource(
            "repository URL is empty".to_string(),
        ));
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        let url = trimmed.trim_end_matches('/');
        if url.ends_with(".git") {
            return Ok(url.to_string());
        }
        return Ok(format!("{}.git", url));
    }

    if trimmed.starts_with("git@") || trimmed.starts_with("ssh://") || trimmed.starts_with("file://")
    {
        return Ok(trimmed.to_string());
    }

    // Bare owner/repo shorthand
    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.len() == 2 && parts.iter().all(|p| !p.is_empty() && is_repo_segment(p)) {
        let repo = parts[1].trim_end_matches(".git");
        return Ok(format!("https://github.com/{}/{}.git", parts[0], repo));
    }

    Err(SourceError::InvalidSource(format!(
        "not a recognizable repository URL: {}",
        trimmed
    )))
}

fn is_repo_segment(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Clone one branch of a repository at depth 1 into `target`.
///
/// A preexisting target directory is removed first so re-fetching the same
/// attempt directory is idempotent. Parent directories are created as needed.
pub fn fetch(repo_url: &str, branch: &str, target: &Path) -> Result<CommitInfo, SourceError> {
    let url = normalize_repo_url(repo_url)?;

    if target.exists() {
        fs::remove_dir_all(target)
            .map_err(|e| SourceError::FetchFailed(format!("cannot clear {:?}: {}", target, e)))?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SourceError::FetchFailed(format!("cannot create {:?}: {}", parent, e)))?;
    }

    let mut fetch_opts = FetchOptions::new();
    // The local transport does not support shallow fetches.
    if !url.starts_with("file://") {
        fetch_opts.depth(1);
    }

    let repo = RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch_opts)
        .clone(&url, target)
        .map_err(|e| SourceError::FetchFailed(e.message().to_string()))?;

    let commit = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .map_err(|e| SourceError::FetchFailed(e.message().to_string()))?;

    let author = commit.author();
    let date = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);

    Ok(CommitInfo {
        hash: commit.id().to_string(),
        message: commit.summary().unwrap_or_default().to_string(),
        author: author.name().unwrap_or_default().to_string(),
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_owner_repo() {
        assert_eq!(
            normalize_repo_url("octocat/hello-world").unwrap(),
            "https://github.com/octocat/hello-world.git"
        );
    }

    #[test]
    fn appends_git_suffix_to_https_urls() {
        assert_eq!(
            normalize_repo_url("https://github.com/octocat/hello-world").unwrap(),
            "https://github.com/octocat/hello-world.git"
        );
    }

    #[test]
    fn keeps_existing_git_suffix() {
        assert_eq!(
            normalize_repo_url("https://github.com/octocat/hello-world.git").unwrap(),
            "https://github.com/octocat/hello-world.git"
        );
    }

    #[test]
    fn keeps_ssh_urls_untouched() {
        assert_eq!(
            normalize_repo_url("git@github.com:octocat/hello-world.git").unwrap(),
            "git@github.com:octocat/hello-world.git"
        );
    }

    #[test]
    fn rejects_unrecognizable_input() {
        assert!(matches!(
            normalize_repo_url("not a url at all"),
            Err(SourceError::InvalidSource(_))
        ));
        assert!(matches!(
            normalize_repo_url(""),
            Err(SourceError::InvalidSource(_))
        ));
    }

    #[test]
    fn fetch_from_unreachable_remote_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("checkout");
        let err = fetch(
            "file:///nonexistent/definitely-missing.git",
            "main",
            &target,
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::FetchFailed(_)));
    }

    #[test]
    fn fetch_clears_preexisting_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("checkout");
        fs::create_dir_all(target.join("stale")).unwrap();
        fs::write(target.join("stale/file.txt"), "old").unwrap();

        // Clone fails against the bogus remote, but the stale directory is
        // removed before the network is touched.
        let _ = fetch("file:///nonexistent/missing.git", "main", &target);
        assert!(!target.join("stale").exists());
    }

    #[test]
    fn refetching_the_same_target_succeeds() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("index.html"), "<h1>hi</h1>").unwrap();

        let repo = git2::Repository::init(source.path()).unwrap();
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("tester", "tester@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        let branch = repo.head().unwrap().shorthand().unwrap().to_string();
        let url = format!("file://{}", source.path().display());

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("checkout");

        let first = fetch(&url, &branch, &target).unwrap();
        let second = fetch(&url, &branch, &target).unwrap();

        assert_eq!(second.hash, first.hash);
        assert_eq!(second.message, "initial");
        assert!(target.join("index.html").exists());
    }
}
