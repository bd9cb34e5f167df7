//! Releases base directory resolution

use std::path::PathBuf;

use miette::{Result, miette};

/// Default base directory for release runtime directories:
/// `<data dir>/composepack/releases` (e.g. `~/.local/share/composepack/releases`)
pub fn default_base_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("composepack").join("releases"))
        .ok_or_else(|| {
            miette!("cannot determine the data directory; pass --release-dir explicitly")
        })
}

/// Base directory after applying an explicit override
pub fn resolve_base_dir(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => default_base_dir(),
    }
}
