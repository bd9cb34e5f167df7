//! Diff command - compare a proposed render against the current release

use composepack_core::CancelToken;
use miette::Result;

use crate::app::{Application, RenderOptions};
use crate::display;

pub fn run(
    app: &Application,
    opts: &RenderOptions,
    show_files: bool,
    cancel: &CancelToken,
) -> Result<()> {
    let report = app.diff(opts, show_files, cancel)?;
    display::print_diff_report(&report, show_files);
    Ok(())
}
