use tracing::{info, warn};

use super::{Gitext, conflict};
use crate::{
    error::{ConflictKind, GitextError, Result},
    git::RepositoryState,
    policy::Target,
    validate,
};

/// Parameters of a retarget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetargetOptions {
    /// Branch to move onto; only production is accepted.
    pub onto: Target,
    /// Branch the feature was started from; only stage is accepted.
    pub from: Target,
    /// Skip the feature-pattern check.
    pub allow_non_feature: bool,
    /// Proceed even when the branch looks shared.
    pub acknowledge_shared: bool,
}

impl Default for RetargetOptions {
    fn default() -> Self {
        Self {
            onto: Target::Production,
            from: Target::Stage,
            allow_non_feature: false,
            acknowledge_shared: false,
        }
    }
}

/// Outcome of a retarget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetargetReport {
    /// Branch whose history was rewritten.
    pub branch: String,
    /// New base, e.g. `origin/production`.
    pub onto_ref: String,
    /// Old base, e.g. `origin/stage`.
    pub from_ref: String,
    /// State before anything was changed.
    pub state: RepositoryState,
    /// Whether the shared-branch check fired and was acknowledged.
    pub shared: bool,
    /// Whether the branch exists on the remote and must be force-pushed.
    pub needs_force_push: bool,
    /// Recommended next command.
    pub next: String,
}

/// Move the current branch's commits from stage onto production with
/// `rebase --onto`.
pub(super) fn run(gx: &Gitext, options: RetargetOptions) -> Result<RetargetReport> {
    if options.onto != Target::Production || options.from != Target::Stage {
        return Err(GitextError::InvalidArgument {
            message: format!(
                "cannot retarget from {} onto {}",
                options.from, options.onto
            ),
            suggestion: "only --from stage --onto production is supported".to_string(),
        });
    }

    let remote = gx.policy.remote_name.as_str();
    let state = gx.snapshot()?;
    let branch = state.current_branch.clone();
    if state.is_detached_head {
        return Err(GitextError::InvalidArgument {
            message: "HEAD is detached".to_string(),
            suggestion: "checkout a branch: git checkout -b <branch-name>".to_string(),
        });
    }

    if !options.allow_non_feature {
        validate::require_pattern(&branch, &gx.policy.feature_pattern, true)?;
    }
    gx.require_remote()?;
    validate::require_clean(state.is_clean)?;

    let on_remote = gx.inspector().remote_branch_exists(remote, &branch)?;
    let shared = validate::is_shared_branch(on_remote, &state.recent_authors);
    if shared {
        if !options.acknowledge_shared {
            gx.output.fail(&format!(
                "{branch} appears to be shared (multiple authors in recent commits)"
            ))?;
            return Err(GitextError::SharedBranch {
                branch,
                authors: state.recent_authors,
            });
        }
        warn!(branch = %branch, authors = ?state.recent_authors, "retargeting shared branch");
        gx.output
            .warn("Branch appears shared, proceeding as acknowledged")?;
    }

    gx.fetch()?;

    let onto_branch = gx.policy.branch(options.onto);
    let from_branch = gx.policy.branch(options.from);
    gx.require_branch(onto_branch)?;
    gx.require_branch(from_branch)?;

    let onto_ref = gx.remote_ref(onto_branch);
    let from_ref = gx.remote_ref(from_branch);
    gx.output.step(&format!(
        "Retargeting {branch} onto {onto_ref} (from {from_ref})"
    ))?;
    if let Err(err) = gx.exec.write(&["rebase", "--onto", &onto_ref, &from_ref]) {
        let err = conflict(ConflictKind::Rebase, &onto_ref, err);
        if err.is_recoverable() {
            gx.output.fail("Rebase stopped with conflicts")?;
        }
        return Err(err);
    }
    gx.output
        .success(&format!("Retargeted {branch} onto {onto_ref}"))?;
    info!(branch = %branch, onto = %onto_ref, from = %from_ref, "retargeted");

    let next = if on_remote {
        gx.output.warn(&format!(
            "{branch} exists on {remote}; the rewritten history must be force-pushed"
        ))?;
        format!("push with force: git push --force-with-lease {remote} {branch}")
    } else {
        format!("push branch: git push {remote} {branch}")
    };

    Ok(RetargetReport {
        branch,
        onto_ref,
        from_ref,
        state,
        shared,
        needs_force_push: on_remote,
        next,
    })
}
