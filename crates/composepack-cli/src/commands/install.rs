//! Install command - render a chart and start its services

use composepack_core::CancelToken;
use console::style;
use miette::Result;

use crate::app::{Application, RenderOptions};

pub fn run(
    app: &Application,
    opts: &RenderOptions,
    auto_start: bool,
    cancel: &CancelToken,
) -> Result<()> {
    let runtime_dir = app.install(opts, auto_start, cancel)?;

    println!(
        "{} Release {} installed",
        style("✓").green(),
        style(&opts.release_name).bold()
    );
    println!("  Runtime directory: {}", runtime_dir.display());
    Ok(())
}
