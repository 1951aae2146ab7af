use tracing::warn;

use super::Gitext;
use crate::{
    error::Result,
    git::RepositoryState,
    policy::{BranchKind, Target},
};

/// Where the current branch stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// State after the best-effort fetch.
    pub state: RepositoryState,
    /// What the current branch is, by policy; `None` when detached.
    pub kind: Option<BranchKind>,
    /// The index has changes not yet committed.
    pub has_staged_changes: bool,
    /// The configured remote exists.
    pub remote_configured: bool,
    /// The fetch succeeded (always `false` under dry-run).
    pub fetched: bool,
    /// Commits on `<remote>/<stage>` missing from `HEAD`.
    pub behind_stage: Option<u32>,
    /// Commits on `<remote>/<production>` missing from `HEAD`.
    pub behind_production: Option<u32>,
    /// Recommended commands, most pressing first.
    pub next: Vec<String>,
}

/// How far `HEAD` trails `<remote>/<branch>`, when that ref is known locally.
fn behind(gx: &Gitext, branch: &str) -> Option<u32> {
    let remote = &gx.policy.remote_name;
    let inspector = gx.inspector();
    if !inspector
        .ref_exists(&format!("refs/remotes/{remote}/{branch}"))
        .unwrap_or(false)
    {
        return None;
    }
    match inspector.ahead_behind(remote, branch, "HEAD") {
        Ok(divergence) => Some(divergence.behind),
        Err(err) => {
            warn!(branch = %branch, error = %err, "ahead/behind query failed");
            None
        }
    }
}

/// Summarise the current branch without changing anything but remote-tracking
/// refs.
pub(super) fn run(gx: &Gitext) -> Result<StatusReport> {
    let remote = gx.policy.remote_name.as_str();
    let inspector = gx.inspector();
    let mut report = StatusReport {
        state: gx.snapshot()?,
        ..StatusReport::default()
    };

    if report.state.is_detached_head {
        gx.output.warn("HEAD is detached")?;
        report
            .next
            .push("checkout a branch: git checkout -b <branch-name>".to_string());
        return Ok(report);
    }

    let branch = report.state.current_branch.clone();
    let kind = gx.policy.classify(&branch);
    report.kind = Some(kind);
    gx.output.message(&format!("Current branch: {branch}"))?;

    report.has_staged_changes = match inspector.has_staged_changes() {
        Ok(staged) => staged,
        Err(err) => {
            warn!(error = %err, "staged-change query failed");
            gx.output
                .warn(&format!("Could not check the index: {err}"))?;
            false
        }
    };
    if report.state.is_clean {
        gx.output.success("Working tree is clean")?;
    } else {
        gx.output.warn("Working tree has uncommitted changes")?;
        report.next.push(
            "commit or stash changes: git commit -am '<message>' or git stash".to_string(),
        );
    }

    report.remote_configured = inspector.remote_exists(remote)?;
    if !report.remote_configured {
        gx.output
            .warn(&format!("Remote '{remote}' not configured"))?;
        return Ok(report);
    }

    gx.output.detail(&format!("Fetching from {remote}"))?;
    match gx.exec.write(&["fetch", remote]) {
        Ok(_) => report.fetched = !gx.exec.is_dry_run(),
        Err(err) => {
            warn!(remote = %remote, error = %err, "fetch failed");
            gx.output
                .warn(&format!("Failed to fetch from {remote}: {err}"))?;
        }
    }

    report.state.divergence = inspector.divergence(remote, &branch)?;
    let target = match kind {
        BranchKind::Production => Some(Target::Production),
        BranchKind::Stage => Some(Target::Stage),
        BranchKind::Feature | BranchKind::Hotfix | BranchKind::Other => None,
    };
    if let Some(divergence) = report.state.divergence.clone() {
        let remote_ref = divergence.remote_ref;
        if divergence.ahead > 0 {
            gx.output.message(&format!(
                "Ahead of {remote_ref} by {} commit(s)",
                divergence.ahead
            ))?;
        }
        if divergence.behind > 0 {
            gx.output.warn(&format!(
                "Behind {remote_ref} by {} commit(s)",
                divergence.behind
            ))?;
            report.next.push(match target {
                Some(target) => format!("sync with remote: gitext sync {target}"),
                None => format!("sync with remote: git pull --ff-only {remote} {branch}"),
            });
        } else if divergence.ahead > 0 {
            report
                .next
                .push(format!("push changes: git push {remote} {branch}"));
        }
    }

    let stage = gx.policy.stage_branch.as_str();
    let production = gx.policy.production_branch.as_str();
    if branch != stage {
        report.behind_stage = behind(gx, stage);
    }
    if branch != production {
        report.behind_production = behind(gx, production);
    }
    if let Some(count) = report.behind_stage.filter(|count| *count > 0) {
        gx.output
            .message(&format!("Behind {stage} by {count} commit(s)"))?;
        if report.state.is_clean && kind == BranchKind::Feature {
            report
                .next
                .push("update with stage: gitext update feature --with stage".to_string());
        }
    }
    if let Some(count) = report.behind_production.filter(|count| *count > 0) {
        gx.output
            .message(&format!("Behind {production} by {count} commit(s)"))?;
    }

    if report.state.is_clean {
        report.next.push(match target {
            Some(target) => format!("sync latest changes: gitext sync {target}"),
            None => "prepare PR: gitext prepare pr --to stage".to_string(),
        });
    }
    Ok(report)
}
