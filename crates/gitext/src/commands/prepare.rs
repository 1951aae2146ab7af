use std::process::Command;

use anyhow::Result;
use libgitext::{ExecErrorKind, ExecutionError, Gitext, GitextError, Target};
use liboutput::Output;
use tracing::{debug, info};

use crate::ui::{emit, render_next};

/// Run one configured CI command from the repository root with inherited
/// stdio. Commands are split on whitespace; there is no shell.
fn run_ci_command(gx: &Gitext, command: &str) -> Result<()> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Ok(());
    };
    debug!(command = %command, "running CI command");
    let status = Command::new(program)
        .args(parts)
        .current_dir(&gx.policy().root)
        .status()
        .map_err(|err| {
            GitextError::Execution(ExecutionError::new(
                ExecErrorKind::Spawn,
                command,
                err.to_string(),
            ))
        })?;
    if !status.success() {
        return Err(GitextError::Execution(ExecutionError::new(
            ExecErrorKind::NonZeroExit {
                code: status.code(),
            },
            command,
            String::new(),
        ))
        .into());
    }
    Ok(())
}

/// Run the `gitext prepare pr` command logic: CI checks for the target,
/// then the PR text.
pub fn prepare_pr(gx: &Gitext, output: &dyn Output, to: Target) -> Result<()> {
    let commands = gx.policy().ci_commands(to);
    if commands.is_empty() {
        emit(output.message(&format!("No CI commands configured for {to}")))?;
    } else {
        emit(output.step(&format!("Running CI checks for {to}")))?;
        for command in commands {
            if gx.executor().is_dry_run() {
                emit(output.plain(&format!("[DRY RUN] {command}")))?;
                continue;
            }
            emit(output.detail(&format!("Running: {command}")))?;
            if let Err(err) = run_ci_command(gx, command) {
                emit(output.fail(&format!("CI check failed: {command}")))?;
                return Err(err);
            }
        }
        emit(output.success("All CI checks passed"))?;
        info!(to = %to, count = commands.len(), "CI checks passed");
    }

    let draft = gx.prepare_pr(to)?;
    emit(output.plain(""))?;
    for line in draft.body.lines() {
        emit(output.plain(line))?;
    }
    emit(output.plain(""))?;
    render_next(output, &draft.next)
}
