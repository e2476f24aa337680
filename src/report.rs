//! Non-destructive analysis report: build, render and write.

use crate::classify::{Category, DeleteMethod, DeletionCandidate, RefKind, RemoteState};
use crate::context::RepositoryContext;
use crate::error::Result;
use crate::time::format_commit_day;

use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const BANNER: &str = "============================================================";
const RULE: &str = "------------------------------------------------------------";
const CSV_HEADER: [&str; 7] = [
    "Name",
    "Kind",
    "Status",
    "Delete Method",
    "Reason",
    "Remote Status",
    "Last Commit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub kind: RefKind,
    pub status: Category,
    /// Empty for protected branches.
    pub delete_method: &'static str,
    pub reason: String,
    pub remote_status: RemoteState,
    pub last_commit: String,
}

impl From<&DeletionCandidate> for ReportEntry {
    fn from(candidate: &DeletionCandidate) -> Self {
        Self {
            name: candidate.name().to_string(),
            kind: candidate.kind(),
            status: candidate.category(),
            delete_method: candidate.method_label(),
            reason: candidate.reason().to_string(),
            remote_status: candidate.remote_state(),
            last_commit: format_commit_day(candidate.last_commit()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub safe_to_delete_count: usize,
    pub local_only_count: usize,
    pub unmerged_count: usize,
    pub protected_count: usize,
    pub stale_tag_count: usize,
    pub merged_count: usize,
    pub gone_remote_count: usize,
    pub force_count: usize,
}

impl ReportSummary {
    fn count(&mut self, candidate: &DeletionCandidate) {
        match candidate.category() {
            Category::Safe => self.safe_to_delete_count += 1,
            Category::LocalOnly => self.local_only_count += 1,
            Category::Unmerged => self.unmerged_count += 1,
            Category::Protected => self.protected_count += 1,
            Category::StaleTag => self.stale_tag_count += 1,
        }
        match candidate.method() {
            Some(DeleteMethod::Merged) => self.merged_count += 1,
            Some(DeleteMethod::GoneRemote) => self.gone_remote_count += 1,
            Some(DeleteMethod::Force) => self.force_count += 1,
            // Already counted by category
            Some(DeleteMethod::StaleTag) | None => {}
        }
    }
}

/// Local ref counts for the report header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefTotals {
    pub branches: usize,
    pub tags: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub repository: String,
    pub analysis_date: String,
    pub default_branch: String,
    pub current_branch: String,
    pub total_branches: usize,
    pub total_tags: usize,
    pub safe_to_delete: Vec<ReportEntry>,
    pub local_only: Vec<ReportEntry>,
    pub unmerged: Vec<ReportEntry>,
    pub protected: Vec<ReportEntry>,
    pub stale_tags: Vec<ReportEntry>,
    pub summary: ReportSummary,
}

impl AnalysisReport {
    pub fn build(
        context: &RepositoryContext,
        candidates: &[DeletionCandidate],
        totals: RefTotals,
        analysis_date: String,
    ) -> Self {
        let mut report = Self {
            repository: context.root.display().to_string(),
            analysis_date,
            default_branch: context.default_branch.clone(),
            current_branch: context.current_branch_label().to_string(),
            total_branches: totals.branches,
            total_tags: totals.tags,
            safe_to_delete: Vec::new(),
            local_only: Vec::new(),
            unmerged: Vec::new(),
            protected: Vec::new(),
            stale_tags: Vec::new(),
            summary: ReportSummary::default(),
        };

        for candidate in candidates {
            report.summary.count(candidate);
            let entry = ReportEntry::from(candidate);
            match candidate.category() {
                Category::Safe => report.safe_to_delete.push(entry),
                Category::LocalOnly => report.local_only.push(entry),
                Category::Unmerged => report.unmerged.push(entry),
                Category::Protected => report.protected.push(entry),
                Category::StaleTag => report.stale_tags.push(entry),
            }
        }
        report
    }

    /// Entries in category order: safe, local-only, unmerged, protected, tags.
    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.safe_to_delete
            .iter()
            .chain(&self.local_only)
            .chain(&self.unmerged)
            .chain(&self.protected)
            .chain(&self.stale_tags)
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => serde_json::to_string_pretty(self),
            ReportFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{BANNER}");
        let _ = writeln!(out, "              GIT-GONE BRANCH ANALYSIS REPORT");
        let _ = writeln!(out, "{BANNER}");
        let _ = writeln!(out, "Repository: {}", self.repository);
        let _ = writeln!(out, "Date: {}", self.analysis_date);
        let _ = writeln!(out, "Default Branch: {}", self.default_branch);
        let _ = writeln!(out, "Current Branch: {}", self.current_branch);
        let _ = writeln!(
            out,
            "Branches: {} | Tags: {}",
            self.total_branches, self.total_tags
        );
        out.push('\n');

        let count = |entries: &[ReportEntry], unit: &str| format!("({} {unit})", entries.len());
        text_section(
            &mut out,
            &format!("SAFE TO DELETE {}", count(&self.safe_to_delete, "branches")),
            &self.safe_to_delete,
            true,
        );
        text_section(
            &mut out,
            &format!(
                "LOCAL-ONLY {} - Merged but never pushed",
                count(&self.local_only, "branches")
            ),
            &self.local_only,
            true,
        );
        text_section(
            &mut out,
            &format!("UNMERGED {}", count(&self.unmerged, "branches")),
            &self.unmerged,
            true,
        );
        text_section(
            &mut out,
            &format!("PROTECTED {}", count(&self.protected, "branches")),
            &self.protected,
            false,
        );
        text_section(
            &mut out,
            &format!("STALE TAGS {}", count(&self.stale_tags, "tags")),
            &self.stale_tags,
            true,
        );

        let s = &self.summary;
        let _ = writeln!(out, "{BANNER}");
        let _ = writeln!(
            out,
            "SUMMARY: {} safe | {} local-only | {} unmerged | {} protected | {} stale tags",
            s.safe_to_delete_count,
            s.local_only_count,
            s.unmerged_count,
            s.protected_count,
            s.stale_tag_count
        );
        let _ = writeln!(out, "{BANNER}");
        out
    }

    pub fn to_csv(&self) -> String {
        let mut out = csv_row(CSV_HEADER);
        for entry in self.entries() {
            let last_commit = entry.last_commit.as_str();
            out.push_str(&csv_row([
                entry.name.as_str(),
                entry.kind.as_str(),
                entry.status.as_str(),
                entry.delete_method,
                entry.reason.as_str(),
                entry.remote_status.as_str(),
                last_commit,
            ]));
        }
        out
    }
}

fn text_section(out: &mut String, heading: &str, entries: &[ReportEntry], detailed: bool) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{heading}");
    let _ = writeln!(out, "{RULE}");
    for entry in entries {
        let _ = writeln!(out, "  * {}", entry.name);
        if detailed {
            let _ = writeln!(
                out,
                "    Method: {} | Reason: {}",
                entry.delete_method, entry.reason
            );
            let _ = writeln!(
                out,
                "    Remote: {} | Last commit: {}",
                entry.remote_status.as_str(),
                entry.last_commit
            );
        } else {
            let _ = writeln!(out, "    Reason: {}", entry.reason);
        }
        out.push('\n');
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut row = fields.into_iter().map(csv_field).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

/// Where a rendered report ended up.
#[derive(Debug)]
pub enum Emitted {
    File(PathBuf),
    Stdout,
    /// Writing the file failed; the report went to stdout instead.
    StdoutFallback { path: PathBuf, error: io::Error },
}

/// Write `rendered` to `file`, or to `stdout` when no file is given or the
/// file cannot be written.
pub fn emit_report<W: Write>(rendered: &str, file: Option<&Path>, stdout: &mut W) -> Result<Emitted> {
    let Some(path) = file else {
        writeln!(stdout, "{rendered}")?;
        return Ok(Emitted::Stdout);
    };

    match fs::write(path, rendered) {
        Ok(()) => Ok(Emitted::File(path.to_path_buf())),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "report write failed, using stdout");
            writeln!(stdout, "{rendered}")?;
            Ok(Emitted::StdoutFallback {
                path: path.to_path_buf(),
                error,
            })
        }
    }
}
