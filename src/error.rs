//! Error taxonomy for repository inspection and ref deletion.

use thiserror::Error;

/// Errors produced while resolving, classifying or deleting refs.
///
/// Only `NotARepository`, the two flag errors and `Selection` are fatal for a
/// run. The others are recovered where they occur and surface as warnings or
/// per-item failures.
#[derive(Debug, Error)]
pub enum GoneError {
    #[error("not a git repository (or any of the parent directories)")]
    NotARepository,

    /// Two run options that cannot be combined.
    #[error("options {first} and {second} are incompatible")]
    IncompatibleFlags {
        first: &'static str,
        second: &'static str,
    },

    /// Select-all and the interactive selector were both requested.
    #[error("options --all and --interactive are incompatible")]
    IncompatibleSelectionMode,

    #[error("failed to update remote refs: {0}")]
    RemoteRefreshFailed(String),

    /// One enumeration source failed; callers substitute an empty result.
    #[error("failed to list {source_name}: {cause}")]
    RefEnumerationFailed { source_name: &'static str, cause: String },

    #[error("selection cancelled")]
    SelectionAborted,

    /// The interactive selector itself failed (no terminal, I/O error).
    #[error("selector failed: {0}")]
    Selection(String),

    #[error("failed to delete {name}: {message}")]
    DeletionFailed { name: String, message: String },

    /// Deleting a remote ref that the remote no longer has.
    #[error("remote ref {remote}/{name} does not exist")]
    RemoteRefAlreadyAbsent { remote: String, name: String },

    /// git ran but exited non-zero.
    #[error("`git {command}` failed: {stderr}")]
    GitCommand { command: String, stderr: String },

    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    /// Writing output (the report) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GoneError {
    /// Diagnostic text suitable for a per-item failure line.
    pub fn diagnostic(&self) -> String {
        match self {
            GoneError::GitCommand { stderr, .. } => stderr.trim().to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GoneError>;
