use tracing::{info, warn};

use super::Gitext;
use crate::{
    error::{GitextError, Result},
    git::RepositoryState,
    policy::Target,
    validate,
};

/// Outcome of starting a feature branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    /// The new branch.
    pub branch: String,
    /// Protected branch it was created from.
    pub source: String,
    /// State before anything was changed.
    pub state: RepositoryState,
    /// Whether the source was fast-forwarded before branching.
    pub source_updated: bool,
    /// Recommended next command.
    pub next: String,
}

/// Create and check out `feature/<ticket>-<slug>` from the `from` branch.
pub(super) fn run(gx: &Gitext, ticket: &str, slug: &str, from: Target) -> Result<StartReport> {
    let remote = gx.policy.remote_name.as_str();
    let source = gx.policy.branch(from).to_string();

    gx.require_remote()?;
    gx.require_branch(&source)?;
    let state = gx.snapshot()?;
    validate::require_clean(state.is_clean)?;

    let branch = validate::feature_branch_name(ticket, slug)?;
    validate::require_pattern(&branch, &gx.policy.feature_pattern, false)?;
    if gx.inspector().branch_exists(&branch)? {
        return Err(GitextError::BranchExists { branch });
    }

    gx.fetch()?;
    gx.checkout(&source)?;

    gx.output.step(&format!("Pulling latest {source}"))?;
    let source_updated = match gx.exec.write(&["pull", "--ff-only", remote, &source]) {
        Ok(_) => true,
        Err(err) => {
            warn!(branch = %source, error = %err, "fast-forward before branching failed");
            gx.output.warn(&format!(
                "Fast-forward of {source} failed, branching from the local {source}"
            ))?;
            false
        }
    };

    gx.output.step(&format!("Creating branch {branch}"))?;
    gx.exec.write(&["checkout", "-b", &branch])?;
    gx.output
        .success(&format!("Created and checked out {branch}"))?;
    info!(branch = %branch, source = %source, "started feature");

    Ok(StartReport {
        branch,
        source,
        state,
        source_updated,
        next: format!("start making changes, then run: gitext prepare pr --to {from}"),
    })
}

#[cfg(test)]
mod tests {
    use liboutput::Kind;

    use super::*;
    use crate::{
        policy::Policy,
        workflow::tests::{clean_repo, harness, harness_with},
    };

    #[test]
    fn test_start_creates_branch_from_source() {
        let h = harness(clean_repo("production"), false);
        let report = h.gx.start("ABC-1", "retry", Target::Stage).unwrap();

        assert_eq!(report.branch, "feature/ABC-1-retry");
        assert_eq!(report.source, "stage");
        assert!(report.source_updated);
        assert_eq!(
            h.journal.writes(),
            vec![
                "git fetch origin",
                "git checkout stage",
                "git pull --ff-only origin stage",
                "git checkout -b feature/ABC-1-retry",
            ]
        );
        assert_eq!(
            report.next,
            "start making changes, then run: gitext prepare pr --to stage"
        );
    }

    #[test]
    fn test_start_pull_failure_is_not_fatal() {
        let h = harness(
            clean_repo("stage").fail(&["pull"], 1, "fatal: Not possible to fast-forward"),
            false,
        );
        let report = h.gx.start("ABC-1", "retry", Target::Stage).unwrap();

        assert!(!report.source_updated);
        assert!(h.journal.issued("git checkout -b feature/ABC-1-retry"));
        assert_eq!(h.capture.texts(Kind::Warn).len(), 1);
    }

    #[test]
    fn test_start_existing_branch_fails_before_any_write() {
        let h = harness(
            clean_repo("stage").ok(
                &["branch", "--list", "feature/ABC-1-retry"],
                "  feature/ABC-1-retry",
            ),
            false,
        );
        let err = h.gx.start("ABC-1", "retry", Target::Stage).unwrap_err();

        assert!(matches!(err, GitextError::BranchExists { .. }));
        assert!(h.journal.writes().is_empty());
    }

    #[test]
    fn test_start_pattern_mismatch_fails_before_any_write() {
        let mut policy = Policy::defaults("/repo");
        policy.feature_pattern = "feat/*".to_string();
        let h = harness_with(clean_repo("stage"), false, policy);
        let err = h.gx.start("ABC-1", "retry", Target::Stage).unwrap_err();

        assert!(matches!(
            err,
            GitextError::PatternMismatch {
                overridable: false,
                ..
            }
        ));
        assert!(h.journal.writes().is_empty());
    }

    #[test]
    fn test_start_missing_source_branch() {
        let h = harness(
            clean_repo("stage").ok(&["branch", "--list", "production"], ""),
            false,
        );
        let err = h.gx.start("ABC-1", "retry", Target::Production).unwrap_err();

        assert!(matches!(err, GitextError::BranchNotFound { ref branch, .. } if branch == "production"));
        assert!(h.journal.issued("git ls-remote --heads origin refs/heads/production"));
        assert!(h.journal.writes().is_empty());
    }

    #[test]
    fn test_start_dry_run_issues_no_writes() {
        let h = harness(clean_repo("production"), true);
        let report = h.gx.start("ABC-1", "retry", Target::Stage).unwrap();

        assert_eq!(report.branch, "feature/ABC-1-retry");
        assert!(report.state.is_clean);
        assert!(h.journal.writes().is_empty());
        assert_eq!(
            h.capture.texts(Kind::Plain),
            vec![
                "[DRY RUN] git fetch origin",
                "[DRY RUN] git checkout stage",
                "[DRY RUN] git pull --ff-only origin stage",
                "[DRY RUN] git checkout -b feature/ABC-1-retry",
            ]
        );
    }
}
