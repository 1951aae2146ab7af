//! Workflow entry points. Each one follows the same shape: validate, fetch,
//! mutate, report. Precondition and fetch failures abort before anything is
//! changed; mutation failures carry the command that finishes the job.

use std::{path::Path, sync::Arc};

use liboutput::Output;
use tracing::info;

use crate::{
    error::{ConflictKind, ExecErrorKind, ExecutionError, GitextError, Result},
    exec::{ExecOptions, Executor},
    git::{Inspector, RepositoryState},
    policy::{Policy, Target},
    validate,
};

/// Merged-branch cleanup.
mod cleanup;
/// PR draft generation.
mod prepare;
/// Moving a feature branch from stage onto production.
mod retarget;
/// Creating feature branches.
mod start;
/// Read-only status overview.
mod status;
/// Fast-forwarding protected branches.
mod sync;
/// Bringing protected-branch changes into a feature branch.
mod update;

pub use cleanup::CleanupReport;
pub use prepare::{PullRequestDraft, extract_ticket};
pub use retarget::{RetargetOptions, RetargetReport};
pub use start::StartReport;
pub use status::StatusReport;
pub use sync::SyncReport;
pub use update::{UpdateMode, UpdateReport};

/// Runs workflows against one repository under one policy.
pub struct Gitext {
    /// Resolved policy for the run.
    policy: Policy,
    /// Executor every git invocation goes through.
    exec: Executor,
    /// Narration channel.
    output: Arc<dyn Output>,
}

impl Gitext {
    /// Assemble from parts. The executor should already run in the policy root.
    pub fn new(policy: Policy, exec: Executor, output: Arc<dyn Output>) -> Self {
        Self {
            policy,
            exec,
            output,
        }
    }

    /// Load the policy for the repository containing `start_dir` and verify
    /// that git agrees it is a repository.
    pub fn open(start_dir: &Path, options: ExecOptions, output: Arc<dyn Output>) -> Result<Self> {
        let policy = Policy::load(start_dir)?;
        let exec = Executor::new(options, Arc::clone(&output)).in_dir(&policy.root);
        Inspector::new(&exec)
            .validate_repository()
            .map_err(|_| GitextError::NotARepository {
                path: start_dir.to_path_buf(),
            })?;
        Ok(Self::new(policy, exec, output))
    }

    /// The policy in force.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The executor workflows run through.
    pub fn executor(&self) -> &Executor {
        &self.exec
    }

    /// The narration channel.
    pub fn output(&self) -> &dyn Output {
        self.output.as_ref()
    }

    /// Fast-forward `target` to its remote counterpart.
    pub fn sync(&self, target: Target) -> Result<SyncReport> {
        sync::run(self, target)
    }

    /// Create `feature/<ticket>-<slug>` from `from`.
    pub fn start(&self, ticket: &str, slug: &str, from: Target) -> Result<StartReport> {
        start::run(self, ticket, slug, from)
    }

    /// Bring `with` into the current feature branch.
    pub fn update(&self, with: Target, mode: UpdateMode) -> Result<UpdateReport> {
        update::run(self, with, mode)
    }

    /// Rebase the current branch from stage onto production.
    pub fn retarget(&self, options: RetargetOptions) -> Result<RetargetReport> {
        retarget::run(self, options)
    }

    /// List, and with `hard` delete, branches merged into a protected branch.
    pub fn cleanup(&self, hard: bool) -> Result<CleanupReport> {
        cleanup::run(self, hard)
    }

    /// Summarise where the current branch stands.
    pub fn status(&self) -> Result<StatusReport> {
        status::run(self)
    }

    /// Draft a pull request from the current branch into `to`.
    pub fn prepare_pr(&self, to: Target) -> Result<PullRequestDraft> {
        prepare::run(self, to)
    }

    /// Inspector over this repository.
    fn inspector(&self) -> Inspector<'_> {
        Inspector::new(&self.exec)
    }

    /// Capture the starting state.
    fn snapshot(&self) -> Result<RepositoryState> {
        Ok(self
            .inspector()
            .snapshot(&self.policy.remote_name, self.policy.shared_window)?)
    }

    /// Fail unless the configured remote exists.
    fn require_remote(&self) -> Result<()> {
        let remote = &self.policy.remote_name;
        validate::require_remote(self.inspector().remote_exists(remote)?, remote)
    }

    /// Fail unless `branch` exists locally or on the remote.
    fn require_branch(&self, branch: &str) -> Result<()> {
        let remote = &self.policy.remote_name;
        let inspector = self.inspector();
        let local = inspector.branch_exists(branch)?;
        let remote_side = !local && inspector.remote_branch_exists(remote, branch)?;
        validate::require_branch(local, remote_side, branch, remote)
    }

    /// Fetch the configured remote. A failure here aborts the workflow.
    fn fetch(&self) -> Result<()> {
        let remote = &self.policy.remote_name;
        self.output.step(&format!("Fetching from {remote}"))?;
        self.exec.write(&["fetch", remote])?;
        info!(remote = %remote, "fetched");
        self.output.success(&format!("Fetched from {remote}"))?;
        Ok(())
    }

    /// Check out an existing branch.
    fn checkout(&self, branch: &str) -> Result<()> {
        self.output.step(&format!("Checking out {branch}"))?;
        self.exec.write(&["checkout", branch])?;
        self.output.success(&format!("Checked out {branch}"))?;
        Ok(())
    }

    /// `<remote>/<branch>`.
    fn remote_ref(&self, branch: &str) -> String {
        format!("{}/{branch}", self.policy.remote_name)
    }
}

/// Turn a failed rebase or merge into a recoverable conflict. Failures that
/// never got as far as applying history (timeouts, spawn errors) stay
/// execution errors.
fn conflict(kind: ConflictKind, onto: &str, err: ExecutionError) -> GitextError {
    match err.kind {
        ExecErrorKind::NonZeroExit { .. } => GitextError::Conflict {
            kind,
            onto: onto.to_string(),
            output: err.output,
        },
        _ => GitextError::Execution(err),
    }
}

#[cfg(test)]
mod tests {
    use liboutput::{Capture, Kind};

    use super::*;
    use crate::testing::{Journal, Script};

    /// Workflow harness over a scripted runner.
    pub(super) struct Harness {
        /// The engine under test.
        pub gx: Gitext,
        /// Every invocation the runner saw.
        pub journal: Journal,
        /// Narration.
        pub capture: Capture,
    }

    /// A script answering the queries of a clean checkout of `branch` that
    /// has an `origin` remote carrying both protected branches.
    pub(super) fn clean_repo(branch: &str) -> Script {
        Script::new()
            .ok(&["rev-parse", "--abbrev-ref", "HEAD"], branch)
            .ok(&["symbolic-ref"], &format!("refs/heads/{branch}"))
            .ok(&["status", "--porcelain"], "")
            .ok(&["remote", "get-url"], "git@example.com:team/repo.git")
            .ok(&["branch", "--list", "stage"], "  stage")
            .ok(&["branch", "--list", "production"], "  production")
            .ok(&["log", "-n"], "Test User")
            .fail(&["rev-parse", "--verify"], 1, "")
    }

    /// Build a harness; `dry_run` controls the executor.
    pub(super) fn harness(script: Script, dry_run: bool) -> Harness {
        harness_with(script, dry_run, Policy::defaults("/repo"))
    }

    /// Build a harness under a custom policy.
    pub(super) fn harness_with(script: Script, dry_run: bool, policy: Policy) -> Harness {
        let journal = script.journal();
        let capture = Capture::new();
        let exec = Executor::with_runner(
            Box::new(script),
            ExecOptions {
                dry_run,
                ..ExecOptions::default()
            },
            Arc::new(capture.clone()),
        );
        Harness {
            gx: Gitext::new(policy, exec, Arc::new(capture.clone())),
            journal,
            capture,
        }
    }

    #[test]
    fn test_conflict_only_for_nonzero_exit() {
        let err = conflict(
            ConflictKind::Merge,
            "origin/stage",
            ExecutionError::new(
                ExecErrorKind::NonZeroExit { code: Some(1) },
                "git merge origin/stage",
                "CONFLICT (content)",
            ),
        );
        assert!(err.is_recoverable());
        assert_eq!(err.continuation(), Some("git commit"));

        let err = conflict(
            ConflictKind::Rebase,
            "origin/stage",
            ExecutionError::new(ExecErrorKind::Timeout, "git rebase origin/stage", ""),
        );
        assert!(matches!(err, GitextError::Execution(_)));
    }

    #[test]
    fn test_fetch_failure_narrates_step_only() {
        let h = harness(Script::new().fail(&["fetch"], 128, "fatal: unreachable"), false);
        let err = h.gx.fetch().unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert_eq!(h.capture.texts(Kind::Step), vec!["Fetching from origin"]);
        assert!(h.capture.texts(Kind::Success).is_empty());
    }

    #[test]
    fn test_require_branch_falls_back_to_remote() {
        let h = harness(
            Script::new()
                .ok(&["branch", "--list"], "")
                .ok(&["ls-remote"], "abc123\trefs/heads/stage"),
            false,
        );
        assert!(h.gx.require_branch("stage").is_ok());
        assert!(h.journal.issued("git ls-remote --heads origin refs/heads/stage"));

        let h = harness(Script::new().ok(&["branch", "--list"], ""), false);
        let err = h.gx.require_branch("stage").unwrap_err();
        assert!(matches!(err, GitextError::BranchNotFound { .. }));
    }
}
