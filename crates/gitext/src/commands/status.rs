use anyhow::Result;
use libgitext::{BranchKind, Gitext};
use liboutput::Output;

use crate::ui::{describe_divergence, emit, render_next};

/// Human name for a branch classification.
fn kind_label(kind: BranchKind) -> &'static str {
    match kind {
        BranchKind::Production => "production branch",
        BranchKind::Stage => "stage branch",
        BranchKind::Feature => "feature branch",
        BranchKind::Hotfix => "hotfix branch",
        BranchKind::Other => "unmanaged branch",
    }
}

/// Run the `gitext status` command logic.
pub fn status(gx: &Gitext, output: &dyn Output) -> Result<()> {
    let report = gx.status()?;

    if let Some(kind) = report.kind {
        emit(output.detail(&format!(
            "{} is a {}",
            report.state.current_branch,
            kind_label(kind)
        )))?;
    }
    if report.has_staged_changes {
        emit(output.detail("Index has staged changes"))?;
    }
    if let Some(divergence) = &report.state.divergence {
        emit(output.detail(&describe_divergence(divergence)))?;
    }

    for next in &report.next {
        render_next(output, next)?;
    }
    Ok(())
}
