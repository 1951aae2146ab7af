use anyhow::Result;
use libgitext::{Gitext, GitextError};
use liboutput::Output;

use crate::ui::{emit, prompt_confirm, render_next};

/// Run the `gitext cleanup` command logic.
pub fn cleanup(gx: &Gitext, output: &dyn Output, hard: bool, no_prompt: bool) -> Result<()> {
    let policy = gx.policy();
    if hard
        && !no_prompt
        && !gx.executor().is_dry_run()
        && !prompt_confirm(
            output,
            &format!(
                "Delete local branches already merged into {} or {}?",
                policy.stage_branch, policy.production_branch
            ),
        )?
    {
        return Err(GitextError::UserAborted.into());
    }

    let report = gx.cleanup(hard)?;
    for (branch, reason) in &report.failed {
        emit(output.detail(&format!("{branch}: {reason}")))?;
    }
    render_next(output, &report.next)
}
