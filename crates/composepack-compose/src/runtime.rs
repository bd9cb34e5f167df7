//! Runtime directory layout for rendered releases
//!
//! A release runs from `<base>/<release-name>/` containing:
//!
//! ```text
//! docker-compose.yaml    merged compose document
//! files/                 rendered file assets and static chart files
//! release.json           persisted metadata (written by the release store)
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use composepack_core::CancelToken;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::merge::write_file_tree;

/// Name of the merged compose document inside the runtime directory
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yaml";

/// Subdirectory holding the release's file assets
pub const FILES_DIR_NAME: &str = "files";

/// Options for materializing a release's runtime directory
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub release_name: String,
    /// Parent directory; the runtime directory is `<base>/<release-name>`
    pub base_dir: PathBuf,
    /// Merged compose document
    pub compose_yaml: Vec<u8>,
    /// File assets, keyed by slash-separated relative path
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Writes a release's runtime directory
#[derive(Debug, Default)]
pub struct RuntimeWriter;

impl RuntimeWriter {
    pub fn new() -> Self {
        Self
    }

    /// Materialize the runtime directory, returning its path.
    ///
    /// The `files/` subtree is replaced wholesale so assets removed from
    /// the chart do not linger between renders. The compose document and
    /// release metadata at the top level are left to their own writers.
    pub fn write(&self, opts: &WriteOptions, cancel: &CancelToken) -> Result<PathBuf> {
        cancel.check()?;

        let runtime_dir = opts.base_dir.join(&opts.release_name);
        fs::create_dir_all(&runtime_dir)?;

        fs::write(runtime_dir.join(COMPOSE_FILE_NAME), &opts.compose_yaml)?;

        let files_dir = runtime_dir.join(FILES_DIR_NAME);
        if files_dir.exists() {
            fs::remove_dir_all(&files_dir)?;
        }
        if !opts.files.is_empty() {
            write_file_tree(&files_dir, &opts.files)?;
        }

        debug!(path = %runtime_dir.display(), files = opts.files.len(), "wrote runtime directory");
        Ok(runtime_dir)
    }
}

/// Read the `files/` subtree of a runtime directory into memory.
///
/// Returns an empty map when the directory does not exist. Keys are
/// slash-separated relative paths matching the writer's layout.
pub fn load_current_files(runtime_dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let files_dir = runtime_dir.join(FILES_DIR_NAME);
    let mut files = BTreeMap::new();

    if !files_dir.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(&files_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(&files_dir)
            .unwrap_or(entry.path());
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.insert(key, fs::read(entry.path())?);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_opts(base: &Path) -> WriteOptions {
        let mut files = BTreeMap::new();
        files.insert("nginx/default.conf".to_string(), b"server {}".to_vec());
        files.insert("app.env".to_string(), b"DEBUG=1".to_vec());
        WriteOptions {
            release_name: "myapp".to_string(),
            base_dir: base.to_path_buf(),
            compose_yaml: b"services: {}\n".to_vec(),
            files,
        }
    }

    #[test]
    fn test_write_creates_layout() {
        let base = tempfile::tempdir().unwrap();
        let writer = RuntimeWriter::new();

        let dir = writer
            .write(&sample_opts(base.path()), &CancelToken::new())
            .unwrap();

        assert_eq!(dir, base.path().join("myapp"));
        assert_eq!(fs::read(dir.join("docker-compose.yaml")).unwrap(), b"services: {}\n");
        assert_eq!(
            fs::read(dir.join("files/nginx/default.conf")).unwrap(),
            b"server {}"
        );
    }

    #[test]
    fn test_rewrite_drops_stale_files() {
        let base = tempfile::tempdir().unwrap();
        let writer = RuntimeWriter::new();
        let cancel = CancelToken::new();

        writer.write(&sample_opts(base.path()), &cancel).unwrap();

        let mut opts = sample_opts(base.path());
        opts.files.remove("app.env");
        let dir = writer.write(&opts, &cancel).unwrap();

        assert!(!dir.join("files/app.env").exists());
        assert!(dir.join("files/nginx/default.conf").exists());
    }

    #[test]
    fn test_load_current_files_roundtrip() {
        let base = tempfile::tempdir().unwrap();
        let writer = RuntimeWriter::new();
        let opts = sample_opts(base.path());

        let dir = writer.write(&opts, &CancelToken::new()).unwrap();
        let loaded = load_current_files(&dir).unwrap();

        assert_eq!(loaded, opts.files);
    }

    #[test]
    fn test_load_current_files_missing_dir() {
        let base = tempfile::tempdir().unwrap();
        let loaded = load_current_files(&base.path().join("nope")).unwrap();
        assert!(loaded.is_empty());
    }
}
