//! git-gone - clean up merged, gone and stale git refs
//!
//! Local branches are classified against the default branch and their
//! upstream tracking state, local tags against the remote tag set. The
//! resulting candidates are either reported (text, JSON, CSV) or handed to a
//! guarded deletion flow with two confirmation tiers:
//!
//! - safe candidates (merged, gone upstream, local-only, stale tags) need one
//!   yes/no answer, skipped by `--force`
//! - unmerged branches need the literal word `DELETE`, always
//!
//! All repository access goes through the `git` executable with a fixed
//! `LC_ALL=C` locale, see [`git::Git`].

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod orchestrator;
pub mod prompt;
pub mod refs;
pub mod report;
pub mod select;
pub mod time;

// Re-export commonly used items
pub use classify::{
    classify_all, Category, DeleteMethod, DeletionCandidate, RawRef, RefKind, RiskTier,
};
pub use config::{RunConfiguration, SelectionMode, TagMode};
pub use context::RepositoryContext;
pub use error::{GoneError, Result};
pub use git::Git;
pub use orchestrator::{DeletionPlan, DeletionSummary, Orchestrator, RefDeleter, RunOutcome};
pub use report::{AnalysisReport, ReportFormat};
