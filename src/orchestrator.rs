//! Guarded deletion: tiered confirmation followed by per-item deletion.
//!
//! Safe-tier candidates are confirmed with one yes/no prompt, which `force`
//! skips. Dangerous candidates always need the typed confirmation word, even
//! under `force`. Once confirmed, every candidate is processed independently:
//! a failure is recorded and the batch continues.

use crate::classify::{DeleteMethod, DeletionCandidate, RefKind, RiskTier};
use crate::config::RunConfiguration;
use crate::error::{GoneError, Result};
use crate::git::Git;
use crate::prompt::{Prompter, DANGEROUS_CONFIRMATION};

use std::fmt::Write as _;
use tracing::{debug, warn};

/// Ref deletion primitives the orchestrator needs from the repository.
pub trait RefDeleter {
    fn delete_branch(&self, name: &str, force: bool) -> Result<()>;

    /// `name` is the branch name on the remote. Must return
    /// `RemoteRefAlreadyAbsent` when the remote has no such ref.
    fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<()>;

    fn delete_tag(&self, name: &str) -> Result<()>;
}

impl RefDeleter for Git {
    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        Git::delete_branch(self, name, force)
    }

    fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<()> {
        Git::delete_remote_branch(self, remote, name)
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        Git::delete_tag(self, name)
    }
}

/// What happened to the remote counterpart of a force-deleted branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCleanup {
    NotAttempted,
    Deleted,
    AlreadyAbsent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedRef {
    pub kind: RefKind,
    pub name: String,
    /// A non-forced branch delete was refused and `-D` succeeded instead.
    pub forced_fallback: bool,
    pub remote: RemoteCleanup,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Deleted(DeletedRef),
    /// Always `GoneError::DeletionFailed`.
    Failed(GoneError),
}

/// Result of executing a confirmed batch.
#[derive(Debug, Default)]
pub struct DeletionSummary {
    /// One entry per attempted candidate, in processing order.
    pub outcomes: Vec<ItemOutcome>,
    /// Non-fatal problems, such as a remote branch that could not be removed.
    pub warnings: Vec<String>,
    /// Dangerous candidates dropped after a failed typed confirmation.
    pub skipped_dangerous: Vec<String>,
}

impl DeletionSummary {
    pub fn success_count(&self) -> usize {
        self.deleted().count()
    }

    pub fn deleted(&self) -> impl Iterator<Item = &DeletedRef> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Deleted(d) => Some(d),
            ItemOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &GoneError> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Failed(err) => Some(err),
            ItemOutcome::Deleted(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The yes/no prompt for safe candidates was declined.
    SafeDeclined,
    /// The typed confirmation failed and nothing else could proceed.
    DangerousDeclined,
}

#[derive(Debug)]
pub enum RunOutcome {
    Cancelled(CancelReason),
    Completed(DeletionSummary),
}

/// Selected candidates split by risk tier. Protected refs are dropped.
#[derive(Debug, Default)]
pub struct DeletionPlan<'a> {
    pub safe: Vec<&'a DeletionCandidate>,
    pub dangerous: Vec<&'a DeletionCandidate>,
}

impl<'a> DeletionPlan<'a> {
    pub fn partition(selected: impl IntoIterator<Item = &'a DeletionCandidate>) -> Self {
        let mut plan = DeletionPlan::default();
        for candidate in selected {
            if !candidate.is_deletable() {
                debug!(name = candidate.name(), "skipping protected ref");
                continue;
            }
            match candidate.risk_tier() {
                RiskTier::Safe => plan.safe.push(candidate),
                RiskTier::Dangerous => plan.dangerous.push(candidate),
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.safe.is_empty() && self.dangerous.is_empty()
    }
}

pub struct Orchestrator<'a, D, P> {
    deleter: &'a D,
    prompter: &'a mut P,
    config: RunConfiguration,
}

impl<'a, D: RefDeleter, P: Prompter> Orchestrator<'a, D, P> {
    pub fn new(deleter: &'a D, prompter: &'a mut P, config: RunConfiguration) -> Self {
        Self {
            deleter,
            prompter,
            config,
        }
    }

    /// Confirm, then delete. Returns `Cancelled` before any destructive call
    /// when a required confirmation is refused.
    pub fn run(&mut self, mut plan: DeletionPlan<'_>) -> RunOutcome {
        if !plan.safe.is_empty() && !self.config.force {
            let question = format!(
                "Are you sure you want to delete these {}?",
                plural_noun(&plan.safe)
            );
            if !self.prompter.confirm(&question) {
                return RunOutcome::Cancelled(CancelReason::SafeDeclined);
            }
        }

        let mut skipped_dangerous = Vec::new();
        if !plan.dangerous.is_empty() {
            let message = dangerous_warning(&plan.dangerous);
            if !self.prompter.confirm_typed(&message, DANGEROUS_CONFIRMATION) {
                if self.config.force && !plan.safe.is_empty() {
                    skipped_dangerous = plan
                        .dangerous
                        .drain(..)
                        .map(|c| c.name().to_string())
                        .collect();
                } else {
                    return RunOutcome::Cancelled(CancelReason::DangerousDeclined);
                }
            }
        }

        let mut summary = self.execute(&plan);
        summary.skipped_dangerous = skipped_dangerous;
        RunOutcome::Completed(summary)
    }

    /// Delete every candidate in the plan without prompting.
    pub fn execute(&self, plan: &DeletionPlan<'_>) -> DeletionSummary {
        let mut summary = DeletionSummary::default();
        for candidate in plan.safe.iter().chain(plan.dangerous.iter()) {
            let outcome = self.delete_one(candidate, &mut summary.warnings);
            summary.outcomes.push(outcome);
        }
        summary
    }

    fn delete_one(&self, candidate: &DeletionCandidate, warnings: &mut Vec<String>) -> ItemOutcome {
        let name = candidate.name();
        let result = match (candidate.kind(), candidate.method()) {
            (RefKind::Tag, _) => self.deleter.delete_tag(name).map(|()| DeletedRef {
                kind: RefKind::Tag,
                name: name.to_string(),
                forced_fallback: false,
                remote: RemoteCleanup::NotAttempted,
            }),
            (RefKind::Branch, Some(DeleteMethod::GoneRemote | DeleteMethod::Force)) => {
                self.delete_with_remote(candidate, warnings)
            }
            (RefKind::Branch, _) => self.delete_merged(name),
        };

        match result {
            Ok(deleted) => {
                debug!(name, "deleted");
                ItemOutcome::Deleted(deleted)
            }
            Err(err) => {
                warn!(name, error = %err, "deletion failed");
                ItemOutcome::Failed(GoneError::DeletionFailed {
                    name: name.to_string(),
                    message: err.diagnostic(),
                })
            }
        }
    }

    /// `branch -d`, falling back to `-D` when git's own merge check is
    /// stricter than ours (for example merged into the default branch but not
    /// into HEAD).
    fn delete_merged(&self, name: &str) -> Result<DeletedRef> {
        let forced_fallback = match self.deleter.delete_branch(name, false) {
            Ok(()) => false,
            Err(err) => {
                debug!(name, error = %err, "safe delete refused, forcing");
                self.deleter.delete_branch(name, true)?;
                true
            }
        };
        Ok(DeletedRef {
            kind: RefKind::Branch,
            name: name.to_string(),
            forced_fallback,
            remote: RemoteCleanup::NotAttempted,
        })
    }

    fn delete_with_remote(
        &self,
        candidate: &DeletionCandidate,
        warnings: &mut Vec<String>,
    ) -> Result<DeletedRef> {
        let name = candidate.name();
        let remote = match candidate.upstream() {
            None => RemoteCleanup::NotAttempted,
            Some(upstream) => {
                match self
                    .deleter
                    .delete_remote_branch(&upstream.remote, &upstream.branch)
                {
                    Ok(()) => RemoteCleanup::Deleted,
                    Err(GoneError::RemoteRefAlreadyAbsent { .. }) => RemoteCleanup::AlreadyAbsent,
                    Err(err) => {
                        let message = err.diagnostic();
                        warnings.push(format!(
                            "Failed to delete remote branch {upstream}: {message}"
                        ));
                        RemoteCleanup::Failed(message)
                    }
                }
            }
        };

        self.deleter.delete_branch(name, true)?;
        Ok(DeletedRef {
            kind: RefKind::Branch,
            name: name.to_string(),
            forced_fallback: false,
            remote,
        })
    }
}

fn plural_noun(candidates: &[&DeletionCandidate]) -> &'static str {
    let tags = candidates.iter().filter(|c| c.kind() == RefKind::Tag).count();
    match tags {
        0 => "branches",
        n if n == candidates.len() => "tags",
        _ => "refs",
    }
}

fn dangerous_warning(dangerous: &[&DeletionCandidate]) -> String {
    let mut message = format!(
        "\nWARNING: You are about to delete {} UNMERGED branch(es):\n",
        dangerous.len()
    );
    for candidate in dangerous {
        let scope = if candidate.upstream().is_some() {
            "locally AND from remote"
        } else {
            "locally"
        };
        let _ = writeln!(message, "   • {} (will be deleted {scope})", candidate.name());
    }
    let _ = write!(
        message,
        "\nThis action cannot be undone! Type '{DANGEROUS_CONFIRMATION}' to confirm: "
    );
    message
}
