use anyhow::Result;
use libgitext::{Gitext, Target, UpdateMode};
use liboutput::Output;

use crate::ui::render_next;

/// Run the `gitext update feature` command logic.
pub fn update(gx: &Gitext, output: &dyn Output, with: Target, mode: UpdateMode) -> Result<()> {
    let report = gx.update(with, mode)?;
    render_next(output, &report.next)
}
