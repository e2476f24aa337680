//! Repository context: default branch, current branch and remote presence.

use crate::error::{GoneError, Result};
use crate::git::Git;

use std::path::PathBuf;
use tracing::debug;

/// Local branch names tried, in order, when the remote HEAD is unknown.
pub const DEFAULT_BRANCH_CANDIDATES: &[&str] = &["main", "master", "develop"];

/// Last-resort default branch name.
///
/// This is a guess: a repository without a remote HEAD and without any of
/// the candidate branches gets `main`, which may not exist at all.
pub const FALLBACK_DEFAULT_BRANCH: &str = "main";

/// Remote preferred for default-branch lookup, remote tag listing and remote
/// deletes.
pub const PREFERRED_REMOTE: &str = "origin";

/// Facts about the repository resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryContext {
    pub root: PathBuf,
    pub default_branch: String,
    /// `None` when HEAD is detached.
    pub current_branch: Option<String>,
    /// Remote used for tag comparison and remote deletes.
    pub remote: Option<String>,
}

impl RepositoryContext {
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Current branch name for display (`HEAD` when detached).
    pub fn current_branch_label(&self) -> &str {
        self.current_branch.as_deref().unwrap_or("HEAD")
    }

    /// Resolve the context for the repository `git` points at.
    pub fn resolve(git: &Git) -> Result<Self> {
        if !git.is_inside_repository() {
            return Err(GoneError::NotARepository);
        }

        let root = git
            .toplevel()
            .unwrap_or_else(|_| git.workdir().to_path_buf());
        let remote = pick_remote(&git.remotes().unwrap_or_default());
        let remote_head = remote.as_deref().and_then(|r| git.remote_head(r));
        let default_branch =
            resolve_default_branch(remote_head, |name| git.local_branch_exists(name));
        let current_branch = git.current_branch();

        debug!(
            default_branch = %default_branch,
            current_branch = ?current_branch,
            remote = ?remote,
            "resolved repository context"
        );

        Ok(Self {
            root,
            default_branch,
            current_branch,
            remote,
        })
    }
}

/// `origin` when configured, otherwise the first remote listed.
pub fn pick_remote(remotes: &[String]) -> Option<String> {
    remotes
        .iter()
        .find(|r| r.as_str() == PREFERRED_REMOTE)
        .or_else(|| remotes.first())
        .cloned()
}

/// Remote HEAD, then the first existing candidate, then `main`.
pub fn resolve_default_branch(
    remote_head: Option<String>,
    local_exists: impl Fn(&str) -> bool,
) -> String {
    if let Some(head) = remote_head.filter(|h| !h.is_empty()) {
        return head;
    }

    DEFAULT_BRANCH_CANDIDATES
        .iter()
        .find(|name| local_exists(name))
        .unwrap_or(&FALLBACK_DEFAULT_BRANCH)
        .to_string()
}
