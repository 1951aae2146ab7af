use anyhow::Result;
use libgitext::{Gitext, Target};
use liboutput::Output;

use crate::ui::render_next;

/// Run the `gitext sync` command logic.
pub fn sync(gx: &Gitext, output: &dyn Output, target: Target) -> Result<()> {
    let report = gx.sync(target)?;
    render_next(output, &report.next)
}
