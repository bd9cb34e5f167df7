//! Pass-through compose commands: up, down, logs, ps

use std::path::Path;

use composepack_core::CancelToken;
use miette::Result;

use crate::app::Application;

pub fn up(
    app: &Application,
    release: &str,
    runtime_path: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    app.compose_command(release, runtime_path, &["up", "-d"], cancel)
}

pub fn down(
    app: &Application,
    release: &str,
    runtime_path: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    app.compose_command(release, runtime_path, &["down"], cancel)
}

pub fn logs(
    app: &Application,
    release: &str,
    runtime_path: Option<&Path>,
    follow: bool,
    service: Option<&str>,
    cancel: &CancelToken,
) -> Result<()> {
    let mut args = vec!["logs"];
    if follow {
        args.push("--follow");
    }
    if let Some(service) = service {
        args.push(service);
    }
    app.compose_command(release, runtime_path, &args, cancel)
}

pub fn ps(
    app: &Application,
    release: &str,
    runtime_path: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    app.compose_command(release, runtime_path, &["ps"], cancel)
}
