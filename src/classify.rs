//! Classification of local refs into deletion candidates.
//!
//! Branch rules are evaluated in a fixed order and the first match wins:
//!
//! 1. the default branch is protected
//! 2. the checked-out branch is protected
//! 3. a branch whose upstream is gone is safe (`gone_remote`), even if merged
//! 4. a merged branch is safe (`merged`), or local-only when it never had an
//!    upstream
//! 5. anything else is unmerged and only emitted when unmerged branches were
//!    requested
//!
//! Tags are candidates when they are missing from the remote, or always when
//! every local tag was requested.

use crate::config::{RunConfiguration, TagMode};
use crate::context::RepositoryContext;
use crate::git::RemoteBranch;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Marker prefixed to the label of a dangerous candidate.
pub const DANGEROUS_MARKER: &str = "(!) ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Branch,
    Tag,
}

impl RefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RefKind::Branch => "branch",
            RefKind::Tag => "tag",
        }
    }
}

/// Upstream state of a local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingState {
    /// Upstream configured and still present.
    Active,
    /// Upstream configured but deleted on the remote.
    Gone,
    /// No upstream configured.
    Untracked,
}

/// Ref-kind specific attributes gathered by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefAttributes {
    Branch {
        merged_into_default: bool,
        tracking: TrackingState,
        /// Configured upstream on a remote, if any.
        upstream: Option<RemoteBranch>,
    },
    Tag {
        /// `None` when the remote tag set was not consulted.
        on_remote: Option<bool>,
    },
}

/// A local ref as read from the repository, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRef {
    pub name: String,
    pub attributes: RefAttributes,
    pub last_commit: Option<NaiveDate>,
}

impl RawRef {
    pub fn kind(&self) -> RefKind {
        match self.attributes {
            RefAttributes::Branch { .. } => RefKind::Branch,
            RefAttributes::Tag { .. } => RefKind::Tag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "protected")]
    Protected,
    #[serde(rename = "safe_to_delete")]
    Safe,
    #[serde(rename = "local_only")]
    LocalOnly,
    #[serde(rename = "unmerged")]
    Unmerged,
    #[serde(rename = "stale_tag")]
    StaleTag,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Protected => "protected",
            Category::Safe => "safe_to_delete",
            Category::LocalOnly => "local_only",
            Category::Unmerged => "unmerged",
            Category::StaleTag => "stale_tag",
        }
    }

    pub fn risk_tier(self) -> RiskTier {
        match self {
            Category::Unmerged => RiskTier::Dangerous,
            _ => RiskTier::Safe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMethod {
    Merged,
    GoneRemote,
    Force,
    StaleTag,
}

impl DeleteMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteMethod::Merged => "merged",
            DeleteMethod::GoneRemote => "gone_remote",
            DeleteMethod::Force => "force",
            DeleteMethod::StaleTag => "stale_tag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Confirmed with a single yes/no prompt.
    Safe,
    /// Confirmed only by typing the literal confirmation word.
    Dangerous,
}

/// Where the ref stands relative to the remote, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteState {
    Exists,
    Gone,
    LocalOnly,
    Unknown,
}

impl RemoteState {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteState::Exists => "exists",
            RemoteState::Gone => "gone",
            RemoteState::LocalOnly => "local_only",
            RemoteState::Unknown => "unknown",
        }
    }
}

impl From<TrackingState> for RemoteState {
    fn from(tracking: TrackingState) -> Self {
        match tracking {
            TrackingState::Active => RemoteState::Exists,
            TrackingState::Gone => RemoteState::Gone,
            TrackingState::Untracked => RemoteState::LocalOnly,
        }
    }
}

/// A classified ref. Built only by the classifier; `risk_tier` always
/// follows from `category`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionCandidate {
    kind: RefKind,
    name: String,
    category: Category,
    method: Option<DeleteMethod>,
    risk_tier: RiskTier,
    reason: String,
    remote_state: RemoteState,
    /// Remote branch a forced branch delete should also clean up.
    upstream: Option<RemoteBranch>,
    last_commit: Option<NaiveDate>,
}

impl DeletionCandidate {
    fn new(
        raw: &RawRef,
        category: Category,
        method: Option<DeleteMethod>,
        reason: impl Into<String>,
        remote_state: RemoteState,
        upstream: Option<RemoteBranch>,
    ) -> Self {
        Self {
            kind: raw.kind(),
            name: raw.name.clone(),
            category,
            method,
            risk_tier: category.risk_tier(),
            reason: reason.into(),
            remote_state,
            upstream,
            last_commit: raw.last_commit,
        }
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn method(&self) -> Option<DeleteMethod> {
        self.method
    }

    /// Method as printed in reports; empty for protected refs.
    pub fn method_label(&self) -> &'static str {
        self.method.map(DeleteMethod::as_str).unwrap_or("")
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.risk_tier
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn remote_state(&self) -> RemoteState {
        self.remote_state
    }

    pub fn upstream(&self) -> Option<&RemoteBranch> {
        self.upstream.as_ref()
    }

    pub fn last_commit(&self) -> Option<NaiveDate> {
        self.last_commit
    }

    pub fn is_deletable(&self) -> bool {
        self.category != Category::Protected
    }

    /// Name as shown in selectors, marked when dangerous.
    pub fn display_label(&self) -> String {
        match self.risk_tier {
            RiskTier::Dangerous => format!("{DANGEROUS_MARKER}{}", self.name),
            RiskTier::Safe => self.name.clone(),
        }
    }
}

/// Classify one ref. `None` means the ref is neither deletable nor reported.
pub fn classify(
    raw: &RawRef,
    context: &RepositoryContext,
    config: &RunConfiguration,
) -> Option<DeletionCandidate> {
    let candidate = match &raw.attributes {
        RefAttributes::Branch {
            merged_into_default,
            tracking,
            upstream,
        } => classify_branch(raw, *merged_into_default, *tracking, upstream, context, config),
        RefAttributes::Tag { on_remote } => classify_tag(raw, *on_remote, config),
    };

    match &candidate {
        Some(c) => debug!(
            name = %raw.name,
            category = c.category.as_str(),
            method = c.method_label(),
            "classified ref"
        ),
        None => debug!(name = %raw.name, "ref omitted from candidates"),
    }
    candidate
}

fn classify_branch(
    raw: &RawRef,
    merged: bool,
    tracking: TrackingState,
    upstream: &Option<RemoteBranch>,
    context: &RepositoryContext,
    config: &RunConfiguration,
) -> Option<DeletionCandidate> {
    let remote_state = RemoteState::from(tracking);
    let delete_remote = upstream.clone();

    if raw.name == context.default_branch {
        return Some(DeletionCandidate::new(
            raw,
            Category::Protected,
            None,
            "Default branch",
            remote_state,
            None,
        ));
    }

    if context.current_branch.as_deref() == Some(raw.name.as_str()) {
        return Some(DeletionCandidate::new(
            raw,
            Category::Protected,
            None,
            "Currently checked out",
            remote_state,
            None,
        ));
    }

    if tracking == TrackingState::Gone {
        return Some(DeletionCandidate::new(
            raw,
            Category::Safe,
            Some(DeleteMethod::GoneRemote),
            "Remote tracking branch deleted",
            RemoteState::Gone,
            delete_remote,
        ));
    }

    if merged {
        return Some(if tracking == TrackingState::Untracked {
            DeletionCandidate::new(
                raw,
                Category::LocalOnly,
                Some(DeleteMethod::Merged),
                "Merged but never pushed to remote (local-only)",
                remote_state,
                delete_remote,
            )
        } else {
            DeletionCandidate::new(
                raw,
                Category::Safe,
                Some(DeleteMethod::Merged),
                format!("Merged into {}", context.default_branch),
                remote_state,
                delete_remote,
            )
        });
    }

    config.include_unmerged.then(|| {
        DeletionCandidate::new(
            raw,
            Category::Unmerged,
            Some(DeleteMethod::Force),
            "Not merged, requires force delete",
            remote_state,
            delete_remote,
        )
    })
}

fn classify_tag(
    raw: &RawRef,
    on_remote: Option<bool>,
    config: &RunConfiguration,
) -> Option<DeletionCandidate> {
    let remote_state = match on_remote {
        Some(true) => RemoteState::Exists,
        Some(false) => RemoteState::LocalOnly,
        None => RemoteState::Unknown,
    };

    let reason = match (config.tag_mode, on_remote) {
        (TagMode::AllLocal, _) => "Local tag",
        (TagMode::StaleOnly, Some(false)) => "Tag not found on remote",
        (TagMode::StaleOnly, _) => return None,
    };

    Some(DeletionCandidate::new(
        raw,
        Category::StaleTag,
        Some(DeleteMethod::StaleTag),
        reason,
        remote_state,
        None,
    ))
}

/// Classify every ref, keeping input order and dropping omitted refs.
pub fn classify_all(
    refs: &[RawRef],
    context: &RepositoryContext,
    config: &RunConfiguration,
) -> Vec<DeletionCandidate> {
    refs.iter()
        .filter_map(|raw| classify(raw, context, config))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn context() -> RepositoryContext {
        RepositoryContext {
            root: PathBuf::from("/repo"),
            default_branch: "main".into(),
            current_branch: Some("work".into()),
            remote: Some("origin".into()),
        }
    }

    pub(crate) fn branch(name: &str, merged: bool, tracking: TrackingState) -> RawRef {
        let upstream = match tracking {
            TrackingState::Untracked => None,
            _ => Some(RemoteBranch::new("origin", name)),
        };
        RawRef {
            name: name.into(),
            attributes: RefAttributes::Branch {
                merged_into_default: merged,
                tracking,
                upstream,
            },
            last_commit: NaiveDate::from_ymd_opt(2024, 5, 1),
        }
    }

    pub(crate) fn tag(name: &str, on_remote: Option<bool>) -> RawRef {
        RawRef {
            name: name.into(),
            attributes: RefAttributes::Tag { on_remote },
            last_commit: None,
        }
    }

    fn with_unmerged() -> RunConfiguration {
        RunConfiguration {
            include_unmerged: true,
            ..Default::default()
        }
    }

    const ALL_TRACKING: [TrackingState; 3] = [
        TrackingState::Active,
        TrackingState::Gone,
        TrackingState::Untracked,
    ];

    #[test]
    fn test_default_branch_always_protected() {
        for tracking in ALL_TRACKING {
            for merged in [true, false] {
                let c = classify(&branch("main", merged, tracking), &context(), &with_unmerged())
                    .unwrap();
                assert_eq!(c.category(), Category::Protected);
                assert_eq!(c.reason(), "Default branch");
                assert_eq!(c.method(), None);
                assert!(!c.is_deletable());
            }
        }
    }

    #[test]
    fn test_current_branch_always_protected() {
        for tracking in ALL_TRACKING {
            for merged in [true, false] {
                let c = classify(&branch("work", merged, tracking), &context(), &with_unmerged())
                    .unwrap();
                assert_eq!(c.category(), Category::Protected);
                assert_eq!(c.reason(), "Currently checked out");
            }
        }
    }

    #[test]
    fn test_gone_takes_precedence_over_merged() {
        let c = classify(
            &branch("ghost", true, TrackingState::Gone),
            &context(),
            &RunConfiguration::default(),
        )
        .unwrap();
        assert_eq!(c.category(), Category::Safe);
        assert_eq!(c.method(), Some(DeleteMethod::GoneRemote));
        assert_eq!(c.remote_state(), RemoteState::Gone);
        assert_eq!(c.upstream(), Some(&RemoteBranch::new("origin", "ghost")));
    }

    #[test]
    fn test_upstream_with_other_name_is_carried() {
        let raw = RawRef {
            name: "foo".into(),
            attributes: RefAttributes::Branch {
                merged_into_default: false,
                tracking: TrackingState::Gone,
                upstream: Some(RemoteBranch::new("fork", "bar")),
            },
            last_commit: None,
        };
        let c = classify(&raw, &context(), &RunConfiguration::default()).unwrap();
        assert_eq!(c.name(), "foo");
        assert_eq!(c.upstream(), Some(&RemoteBranch::new("fork", "bar")));
    }

    #[test]
    fn test_protected_branch_has_no_remote_target() {
        let c = classify(
            &branch("main", true, TrackingState::Active),
            &context(),
            &RunConfiguration::default(),
        )
        .unwrap();
        assert_eq!(c.upstream(), None);
    }

    #[test]
    fn test_gone_unmerged_is_still_safe() {
        let c = classify(
            &branch("ghost", false, TrackingState::Gone),
            &context(),
            &RunConfiguration::default(),
        )
        .unwrap();
        assert_eq!(c.category(), Category::Safe);
        assert_eq!(c.risk_tier(), RiskTier::Safe);
    }

    #[test]
    fn test_merged_with_active_upstream() {
        let c = classify(
            &branch("done", true, TrackingState::Active),
            &context(),
            &RunConfiguration::default(),
        )
        .unwrap();
        assert_eq!(c.category(), Category::Safe);
        assert_eq!(c.method(), Some(DeleteMethod::Merged));
        assert_eq!(c.reason(), "Merged into main");
        assert_eq!(c.remote_state(), RemoteState::Exists);
    }

    #[test]
    fn test_merged_without_upstream_is_local_only() {
        let c = classify(
            &branch("never-pushed", true, TrackingState::Untracked),
            &context(),
            &RunConfiguration::default(),
        )
        .unwrap();
        assert_eq!(c.category(), Category::LocalOnly);
        assert_eq!(c.method(), Some(DeleteMethod::Merged));
        assert_eq!(c.risk_tier(), RiskTier::Safe);
        assert_eq!(c.remote_state(), RemoteState::LocalOnly);
    }

    #[test]
    fn test_unmerged_omitted_by_default() {
        for tracking in [TrackingState::Active, TrackingState::Untracked] {
            let c = classify(
                &branch("wip", false, tracking),
                &context(),
                &RunConfiguration::default(),
            );
            assert!(c.is_none());
        }
    }

    #[test]
    fn test_unmerged_included_is_dangerous() {
        let c = classify(
            &branch("wip", false, TrackingState::Untracked),
            &context(),
            &with_unmerged(),
        )
        .unwrap();
        assert_eq!(c.category(), Category::Unmerged);
        assert_eq!(c.method(), Some(DeleteMethod::Force));
        assert_eq!(c.risk_tier(), RiskTier::Dangerous);
        assert_eq!(c.display_label(), "(!) wip");
        // No upstream, so nothing on the remote is touched
        assert_eq!(c.upstream(), None);
    }

    #[test]
    fn test_only_unmerged_is_dangerous() {
        let refs = vec![
            branch("main", true, TrackingState::Active),
            branch("work", false, TrackingState::Active),
            branch("a", true, TrackingState::Active),
            branch("b", true, TrackingState::Gone),
            branch("c", true, TrackingState::Untracked),
            branch("d", false, TrackingState::Active),
            tag("v1", Some(false)),
        ];
        for c in classify_all(&refs, &context(), &with_unmerged()) {
            let dangerous = c.risk_tier() == RiskTier::Dangerous;
            assert_eq!(dangerous, c.category() == Category::Unmerged, "{}", c.name());
            assert_eq!(dangerous, c.display_label().starts_with(DANGEROUS_MARKER));
        }
    }

    #[test]
    fn test_detached_head_protects_only_default() {
        let mut ctx = context();
        ctx.current_branch = None;
        let c = classify(
            &branch("work", true, TrackingState::Active),
            &ctx,
            &RunConfiguration::default(),
        )
        .unwrap();
        assert_eq!(c.category(), Category::Safe);
    }

    #[test]
    fn test_stale_tag() {
        let c = classify(&tag("v2", Some(false)), &context(), &RunConfiguration::default())
            .unwrap();
        assert_eq!(c.kind(), RefKind::Tag);
        assert_eq!(c.category(), Category::StaleTag);
        assert_eq!(c.method(), Some(DeleteMethod::StaleTag));
        assert_eq!(c.risk_tier(), RiskTier::Safe);
        assert_eq!(c.reason(), "Tag not found on remote");
        assert_eq!(c.display_label(), "v2");
    }

    #[test]
    fn test_pushed_tag_is_not_a_candidate() {
        let config = RunConfiguration::default();
        assert!(classify(&tag("v1", Some(true)), &context(), &config).is_none());
        assert!(classify(&tag("v1", None), &context(), &config).is_none());
    }

    #[test]
    fn test_all_local_tags_mode() {
        let config = RunConfiguration {
            tag_mode: TagMode::AllLocal,
            ..Default::default()
        };
        for on_remote in [Some(true), Some(false), None] {
            let c = classify(&tag("v1", on_remote), &context(), &config).unwrap();
            assert_eq!(c.category(), Category::StaleTag);
            assert_eq!(c.risk_tier(), RiskTier::Safe);
            assert_eq!(c.reason(), "Local tag");
        }
    }

    #[test]
    fn test_tag_named_like_default_branch_is_not_protected() {
        let c = classify(&tag("main", Some(false)), &context(), &RunConfiguration::default())
            .unwrap();
        assert_eq!(c.category(), Category::StaleTag);
    }

    #[test]
    fn test_example_scenario() {
        let mut ctx = context();
        ctx.current_branch = Some("main".into());
        let refs = vec![
            branch("main", true, TrackingState::Active),
            branch("feature-done", true, TrackingState::Active),
            branch("feature-ghost", true, TrackingState::Gone),
            branch("feature-wip", false, TrackingState::Untracked),
        ];

        let summary = |config: &RunConfiguration| -> Vec<(String, Category, Option<DeleteMethod>)> {
            classify_all(&refs, &ctx, config)
                .into_iter()
                .map(|c| (c.name().to_string(), c.category(), c.method()))
                .collect()
        };

        let expected = vec![
            ("main".to_string(), Category::Protected, None),
            ("feature-done".to_string(), Category::Safe, Some(DeleteMethod::Merged)),
            ("feature-ghost".to_string(), Category::Safe, Some(DeleteMethod::GoneRemote)),
        ];
        assert_eq!(summary(&RunConfiguration::default()), expected);

        let mut with_wip = expected.clone();
        with_wip.push((
            "feature-wip".to_string(),
            Category::Unmerged,
            Some(DeleteMethod::Force),
        ));
        assert_eq!(summary(&with_unmerged()), with_wip);
    }
}
