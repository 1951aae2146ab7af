use anyhow::Result;
use libgitext::{Gitext, RetargetOptions};
use liboutput::Output;

use crate::ui::{emit, render_next};

/// Run the `gitext retarget feature` command logic.
pub fn retarget(gx: &Gitext, output: &dyn Output, options: RetargetOptions) -> Result<()> {
    let report = gx.retarget(options)?;
    emit(output.detail(&format!(
        "{} now sits on {} instead of {}",
        report.branch, report.onto_ref, report.from_ref
    )))?;
    render_next(output, &report.next)
}
