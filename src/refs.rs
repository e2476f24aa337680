//! Enumeration of local branches and tags, plus the best-effort remote refresh.
//!
//! Each git query is independent. A failing query contributes an empty result
//! and a warning instead of aborting the whole enumeration.

use crate::classify::{RawRef, RefAttributes, TrackingState};
use crate::config::TagMode;
use crate::context::RepositoryContext;
use crate::error::{GoneError, Result};
use crate::git::{BranchListing, Git, TagListing};
use crate::time::parse_commit_day;

use std::collections::BTreeSet;
use tracing::warn;

/// Refs read from the repository together with the recovered failures.
#[derive(Debug, Default)]
pub struct Enumeration {
    pub refs: Vec<RawRef>,
    pub warnings: Vec<GoneError>,
}

impl Enumeration {
    fn warn(&mut self, source_name: &'static str, err: GoneError) {
        warn!(source = source_name, error = %err, "enumeration failed, using empty result");
        self.warnings.push(GoneError::RefEnumerationFailed {
            source_name,
            cause: err.diagnostic(),
        });
    }
}

/// Fetch all remotes with pruning, then prune remote-tracking refs.
///
/// Failure leaves the local tracking data as it was; callers should warn and
/// carry on.
pub fn refresh_remotes(git: &Git) -> Result<()> {
    git.fetch_all_prune()
        .map_err(|err| GoneError::RemoteRefreshFailed(format!("fetch failed: {}", err.diagnostic())))?;
    git.remote_update_prune().map_err(|err| {
        GoneError::RemoteRefreshFailed(format!("remote update failed: {}", err.diagnostic()))
    })
}

/// All local branches with their merge flag and tracking state.
pub fn enumerate_branches(git: &Git, context: &RepositoryContext) -> Enumeration {
    let mut enumeration = Enumeration::default();

    let listings = git.list_branches().unwrap_or_else(|err| {
        enumeration.warn("local branches", err);
        Vec::new()
    });

    let merged = git
        .list_merged_branches(&context.default_branch)
        .unwrap_or_else(|err| {
            enumeration.warn("merged branches", err);
            BTreeSet::new()
        });

    enumeration.refs = build_branch_refs(listings, &merged);
    enumeration
}

/// Local tags, compared against the remote tag set in stale mode.
pub fn enumerate_tags(git: &Git, context: &RepositoryContext, mode: TagMode) -> Enumeration {
    let mut enumeration = Enumeration::default();

    let listings = git.list_local_tags().unwrap_or_else(|err| {
        enumeration.warn("local tags", err);
        Vec::new()
    });

    let remote_tags = match (mode, context.remote.as_deref()) {
        (TagMode::StaleOnly, Some(remote)) if !listings.is_empty() => {
            match git.list_remote_tags(remote) {
                Ok(tags) => Some(tags),
                Err(err) => {
                    // Unknown remote state must not turn every tag stale
                    enumeration.warn("remote tags", err);
                    None
                }
            }
        }
        _ => None,
    };

    enumeration.refs = build_tag_refs(listings, remote_tags.as_ref());
    enumeration
}

fn tracking_state(listing: &BranchListing) -> TrackingState {
    match (&listing.upstream, listing.upstream_gone) {
        (None, _) => TrackingState::Untracked,
        (Some(_), true) => TrackingState::Gone,
        (Some(_), false) => TrackingState::Active,
    }
}

pub fn build_branch_refs(listings: Vec<BranchListing>, merged: &BTreeSet<String>) -> Vec<RawRef> {
    listings
        .into_iter()
        .map(|listing| RawRef {
            attributes: RefAttributes::Branch {
                merged_into_default: merged.contains(&listing.name),
                tracking: tracking_state(&listing),
                upstream: listing.upstream.clone(),
            },
            last_commit: listing.committer_date.as_deref().and_then(parse_commit_day),
            name: listing.name,
        })
        .collect()
}

/// `remote_tags` is `None` when the remote was not (or could not be) asked.
pub fn build_tag_refs(listings: Vec<TagListing>, remote_tags: Option<&BTreeSet<String>>) -> Vec<RawRef> {
    listings
        .into_iter()
        .map(|listing| RawRef {
            attributes: RefAttributes::Tag {
                on_remote: remote_tags.map(|tags| tags.contains(&listing.name)),
            },
            last_commit: listing.committer_date.as_deref().and_then(parse_commit_day),
            name: listing.name,
        })
        .collect()
}
