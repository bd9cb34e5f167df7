//! Package command - archive a chart directory into a .cpack.tgz

use std::path::{Path, PathBuf};

use composepack_core::{CancelToken, CompositeLoader, PackageOptions, package_chart};
use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};

pub fn run(
    chart_path: &Path,
    destination: Option<PathBuf>,
    output_name: Option<String>,
    force: bool,
    cancel: &CancelToken,
) -> Result<()> {
    let loader = CompositeLoader::new();
    let opts = PackageOptions {
        chart_path: chart_path.to_path_buf(),
        destination,
        output_name,
        force,
    };

    let output = package_chart(&loader, &opts, cancel)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to package chart at {}", chart_path.display()))?;

    println!(
        "{} Packaged chart to {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}
