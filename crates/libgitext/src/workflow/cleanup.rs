use tracing::{info, warn};

use super::Gitext;
use crate::{error::Result, git::RepositoryState};

/// Outcome of a cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// State at the start; `merged_branches` holds the candidates.
    pub state: RepositoryState,
    /// Whether deletion was requested.
    pub hard: bool,
    /// Removed with `branch -d`.
    pub deleted: Vec<String>,
    /// Removed with `branch -D` after `-d` refused.
    pub force_deleted: Vec<String>,
    /// Could not be removed, with git's explanation.
    pub failed: Vec<(String, String)>,
    /// Protected branches that were left alone.
    pub skipped: Vec<String>,
    /// Branches a dry run would have tried to delete.
    pub would_delete: Vec<String>,
    /// Recommended next command.
    pub next: String,
}

impl CleanupReport {
    /// Branches merged into a protected branch, excluding the current one.
    pub fn candidates(&self) -> &[String] {
        &self.state.merged_branches
    }

    /// Number of branches that are gone.
    pub fn removed(&self) -> usize {
        self.deleted.len() + self.force_deleted.len()
    }
}

/// Branches merged into stage or production, stage first, without
/// duplicates and without `current`. A side whose query fails is skipped.
fn merged_candidates(gx: &Gitext, current: &str) -> Result<Vec<String>> {
    let inspector = gx.inspector();
    let mut candidates: Vec<String> = Vec::new();
    for into in [&gx.policy.stage_branch, &gx.policy.production_branch] {
        match inspector.merged_branches(into) {
            Ok(branches) => {
                for branch in branches {
                    if branch != current && !candidates.contains(&branch) {
                        candidates.push(branch);
                    }
                }
            }
            Err(err) => {
                warn!(into = %into, error = %err, "merged-branch query failed");
                gx.output
                    .warn(&format!("Could not list branches merged into {into}"))?;
            }
        }
    }
    Ok(candidates)
}

/// List local branches already merged into a protected branch and, when
/// `hard`, delete them.
pub(super) fn run(gx: &Gitext, hard: bool) -> Result<CleanupReport> {
    let mut state = gx.snapshot()?;
    state.merged_branches = merged_candidates(gx, &state.current_branch)?;
    let mut report = CleanupReport {
        state,
        hard,
        ..CleanupReport::default()
    };

    if report.candidates().is_empty() {
        gx.output.message("No merged branches to clean up")?;
        report.next = "run: gitext status".to_string();
        return Ok(report);
    }

    let listing = gx.output.section(&format!(
        "Found {} merged branch(es):",
        report.candidates().len()
    ));
    for branch in report.candidates() {
        if gx.policy.is_protected(branch) {
            listing.plain(&format!("- {branch} (protected)"))?;
        } else {
            listing.plain(&format!("- {branch}"))?;
        }
    }

    if !hard {
        gx.output.warn("Report only, no branches deleted")?;
        report.next = "run with --hard to delete these branches: gitext cleanup --hard".to_string();
        return Ok(report);
    }

    gx.output.step("Deleting merged branches")?;
    for branch in report.state.merged_branches.clone() {
        if gx.policy.is_protected(&branch) {
            gx.output
                .warn(&format!("Skipping protected branch: {branch}"))?;
            report.skipped.push(branch);
            continue;
        }
        if gx.exec.is_dry_run() {
            gx.exec.write(&["branch", "-d", &branch])?;
            report.would_delete.push(branch);
            continue;
        }
        if gx.exec.write(&["branch", "-d", &branch]).is_ok() {
            gx.output.detail(&format!("Deleted {branch}"))?;
            report.deleted.push(branch);
            continue;
        }
        match gx.exec.write(&["branch", "-D", &branch]) {
            Ok(_) => {
                gx.output.warn(&format!("Force deleted {branch}"))?;
                report.force_deleted.push(branch);
            }
            Err(err) => {
                gx.output
                    .fail(&format!("Failed to delete {branch}: {}", err.output))?;
                report.failed.push((branch, err.output));
            }
        }
    }

    if gx.exec.is_dry_run() {
        gx.output.success(&format!(
            "Would delete {} branch(es)",
            report.would_delete.len()
        ))?;
    } else {
        gx.output
            .success(&format!("Deleted {} branch(es)", report.removed()))?;
    }
    info!(
        deleted = report.deleted.len(),
        force_deleted = report.force_deleted.len(),
        failed = report.failed.len(),
        "cleanup finished"
    );
    report.next = "run: gitext status".to_string();
    Ok(report)
}
