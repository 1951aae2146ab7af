use std::{fmt, str::FromStr};

use tracing::{debug, info};

use super::{Gitext, conflict};
use crate::{
    error::{ConflictKind, GitextError, Result},
    git::RepositoryState,
    policy::Target,
    validate,
};

/// How protected-branch changes are brought into a feature branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Replay the feature commits on top of the source.
    #[default]
    Rebase,
    /// Merge the source into the feature branch.
    Merge,
}

impl UpdateMode {
    /// Conflict kind this mode produces.
    fn conflict_kind(self) -> ConflictKind {
        match self {
            Self::Rebase => ConflictKind::Rebase,
            Self::Merge => ConflictKind::Merge,
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rebase => f.write_str("rebase"),
            Self::Merge => f.write_str("merge"),
        }
    }
}

impl FromStr for UpdateMode {
    type Err = GitextError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rebase" => Ok(Self::Rebase),
            "merge" => Ok(Self::Merge),
            other => Err(GitextError::InvalidArgument {
                message: format!("invalid mode '{other}'"),
                suggestion: "use 'rebase' or 'merge'".to_string(),
            }),
        }
    }
}

/// Outcome of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Feature branch that was updated.
    pub branch: String,
    /// Remote ref that was applied, e.g. `origin/stage`.
    pub source_ref: String,
    /// Rebase or merge.
    pub mode: UpdateMode,
    /// State before anything was changed.
    pub state: RepositoryState,
    /// Recommended next command.
    pub next: String,
}

/// Apply `<remote>/<with>` to the current feature branch.
pub(super) fn run(gx: &Gitext, with: Target, mode: UpdateMode) -> Result<UpdateReport> {
    let remote = gx.policy.remote_name.as_str();
    let source = gx.policy.branch(with).to_string();

    let state = gx.snapshot()?;
    let branch = state.current_branch.clone();
    validate::require_pattern(&branch, &gx.policy.feature_pattern, false)?;
    gx.require_remote()?;
    validate::require_clean(state.is_clean)?;

    gx.fetch()?;

    // Keep the local copy of the source current when it can be fast-forwarded.
    gx.output.step(&format!("Updating {source}"))?;
    let refspec = format!("{source}:{source}");
    if let Err(err) = gx.exec.write(&["fetch", remote, &refspec]) {
        debug!(branch = %source, error = %err, "local source not updated");
        gx.output.detail(&format!(
            "{source} could not be updated locally, using {remote}/{source}"
        ))?;
    }

    let source_ref = gx.remote_ref(&source);
    match mode {
        UpdateMode::Rebase => gx.output.step(&format!("Rebasing onto {source_ref}"))?,
        UpdateMode::Merge => gx.output.step(&format!("Merging {source_ref}"))?,
    }
    let verb = mode.to_string();
    if let Err(err) = gx.exec.write(&[verb.as_str(), &source_ref]) {
        let err = conflict(mode.conflict_kind(), &source_ref, err);
        if err.is_recoverable() {
            gx.output
                .fail(&format!("{verb} of {source_ref} stopped with conflicts"))?;
        }
        return Err(err);
    }
    match mode {
        UpdateMode::Rebase => gx.output.success(&format!("Rebased onto {source_ref}"))?,
        UpdateMode::Merge => gx.output.success(&format!("Merged {source_ref}"))?,
    }
    info!(branch = %branch, source = %source_ref, %mode, "updated feature");

    let next = format!("push changes: git push {remote} {branch}");
    Ok(UpdateReport {
        branch,
        source_ref,
        mode,
        state,
        next,
    })
}
