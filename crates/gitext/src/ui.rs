use std::result::Result as StdResult;

use anyhow::Result;
use libgitext::{Divergence, GitextError};
use liboutput::{Output, OutputError};

/// Emit an output result, mapping errors into `GitextError`.
pub fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(GitextError::from)?;
    Ok(())
}

/// Prompt for confirmation, mapping cancellation to `UserAborted`.
pub fn prompt_confirm(output: &dyn Output, prompt: &str) -> Result<bool> {
    match output.confirm(prompt) {
        Ok(value) => Ok(value),
        Err(OutputError::Cancelled) => Err(GitextError::UserAborted.into()),
        Err(err) => Err(GitextError::Output(err.to_string()).into()),
    }
}

/// Print a recommended next command, skipping empty recommendations.
pub fn render_next(output: &dyn Output, next: &str) -> Result<()> {
    if next.is_empty() {
        return Ok(());
    }
    emit(output.next(next))
}

/// One-line summary of a branch against its remote counterpart.
pub fn describe_divergence(divergence: &Divergence) -> String {
    match (divergence.ahead, divergence.behind) {
        (0, 0) => format!("in step with {}", divergence.remote_ref),
        (ahead, 0) => format!("{ahead} commit(s) ahead of {}", divergence.remote_ref),
        (0, behind) => format!("{behind} commit(s) behind {}", divergence.remote_ref),
        (ahead, behind) => format!(
            "diverged from {}: {ahead} ahead, {behind} behind",
            divergence.remote_ref
        ),
    }
}

/// Captured command output carried by `err`, if any.
fn captured_output(err: &GitextError) -> Option<&str> {
    match err {
        GitextError::Conflict { output, .. } | GitextError::FastForwardRejected { output, .. } => {
            Some(output.as_str())
        }
        GitextError::Execution(exec) => Some(exec.output.as_str()),
        _ => None,
    }
}

/// Report a failed run. Git's own output is always shown, verbose or not,
/// so conflicts and remote failures can be diagnosed.
pub fn render_error(output: &dyn Output, err: &anyhow::Error) -> Result<()> {
    emit(output.fail(&format!("{err:#}")))?;
    let Some(gitext_err) = err.downcast_ref::<GitextError>() else {
        return Ok(());
    };
    if let Some(captured) = captured_output(gitext_err) {
        for line in captured.lines().filter(|line| !line.trim().is_empty()) {
            emit(output.plain(&format!("    {line}")))?;
        }
    }
    if let Some(suggestion) = gitext_err.suggestion() {
        emit(output.next(&suggestion))?;
    }
    Ok(())
}
