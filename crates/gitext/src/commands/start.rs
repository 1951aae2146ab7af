use anyhow::Result;
use libgitext::{Gitext, Target};
use liboutput::Output;

use crate::ui::{emit, render_next};

/// Run the `gitext start feature` command logic.
pub fn start(
    gx: &Gitext,
    output: &dyn Output,
    ticket: &str,
    slug: &str,
    from: Target,
) -> Result<()> {
    let report = gx.start(ticket, slug, from)?;
    if !report.source_updated && !gx.executor().is_dry_run() {
        emit(output.detail(&format!(
            "{} may be behind its remote; run: gitext sync {from}",
            report.source
        )))?;
    }
    render_next(output, &report.next)
}
