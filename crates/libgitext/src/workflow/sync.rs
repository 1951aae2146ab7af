use tracing::info;

use super::Gitext;
use crate::{
    error::{ExecErrorKind, GitextError, Result},
    git::{Divergence, RepositoryState},
    policy::Target,
    validate,
};

/// Outcome of a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Branch that was synced.
    pub branch: String,
    /// State before anything was changed.
    pub state: RepositoryState,
    /// Whether the branch had to be checked out first.
    pub switched: bool,
    /// Branch against its remote after the pull.
    pub divergence: Option<Divergence>,
    /// Recommended next command.
    pub next: String,
}

impl SyncReport {
    /// Whether the branch now matches its remote.
    pub fn is_up_to_date(&self) -> bool {
        self.divergence
            .as_ref()
            .is_some_and(Divergence::is_up_to_date)
    }
}

/// Check out `target` if needed, fetch, and fast-forward it. A branch that
/// cannot be fast-forwarded is reported, never rebased.
pub(super) fn run(gx: &Gitext, target: Target) -> Result<SyncReport> {
    let remote = gx.policy.remote_name.as_str();
    let branch = gx.policy.branch(target).to_string();

    gx.require_remote()?;
    gx.require_branch(&branch)?;
    let state = gx.snapshot()?;
    validate::require_clean(state.is_clean)?;

    let switched = state.current_branch != branch;
    if switched {
        gx.checkout(&branch)?;
    }

    gx.fetch()?;

    let remote_ref = gx.remote_ref(&branch);
    gx.output
        .step(&format!("Pulling {remote_ref} (fast-forward only)"))?;
    if let Err(err) = gx.exec.write(&["pull", "--ff-only", remote, &branch]) {
        if !matches!(err.kind, ExecErrorKind::NonZeroExit { .. }) {
            return Err(err.into());
        }
        gx.output.fail("Fast-forward pull failed")?;
        return Err(GitextError::FastForwardRejected {
            branch,
            remote: remote.to_string(),
            output: err.output,
        });
    }
    gx.output.success(&format!("Pulled {remote_ref}"))?;

    let divergence = gx.inspector().divergence(remote, &branch)?;
    match &divergence {
        Some(d) if d.is_up_to_date() => gx
            .output
            .success(&format!("{branch} is up to date with {remote_ref}"))?,
        Some(d) => gx
            .output
            .message(&format!("Ahead: {}, Behind: {}", d.ahead, d.behind))?,
        None => {}
    }
    info!(branch = %branch, switched, "synced");

    Ok(SyncReport {
        branch,
        state,
        switched,
        divergence,
        next: "continue working or run: gitext status".to_string(),
    })
}
