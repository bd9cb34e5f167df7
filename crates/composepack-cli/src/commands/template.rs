//! Template command - render a chart without running containers

use composepack_core::CancelToken;
use console::style;
use miette::Result;

use crate::app::{Application, RenderOptions};

pub fn run(
    app: &Application,
    opts: &RenderOptions,
    quiet: bool,
    cancel: &CancelToken,
) -> Result<()> {
    let (runtime_dir, compose) = app.template(opts, cancel)?;

    if quiet {
        println!("{}", runtime_dir.display());
    } else {
        println!("{}", compose);
        eprintln!(
            "{} Rendered release {} into {}",
            style("✓").green(),
            opts.release_name,
            runtime_dir.display()
        );
    }
    Ok(())
}
