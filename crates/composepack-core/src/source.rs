//! Chart source resolution: directory, archive, or URL
//!
//! The source kind is decided once up front, then each kind is handled by a
//! dedicated strategy behind a single dispatcher.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::archive::{extract_archive, find_chart_root, looks_like_archive};
use crate::cancel::CancelToken;
use crate::chart::Chart;
use crate::error::{CoreError, Result};
use crate::loader::FsChartLoader;

/// Closed set of chart source kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// Unpacked chart directory
    Directory(PathBuf),
    /// Local archive file (`.tar`, `.tar.gz`, `.tgz`, `.cpack`, `.cpack.tgz`)
    Archive(PathBuf),
    /// Remote archive behind http(s)
    Url(String),
}

impl ChartSource {
    /// Classify a raw source string
    pub fn detect(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(CoreError::invalid_chart("chart source must be provided"));
        }
        if is_url(source) {
            return Ok(Self::Url(source.to_string()));
        }

        let path = Path::new(source);
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Self::Directory(path.to_path_buf())),
            Ok(_) if looks_like_archive(source) => Ok(Self::Archive(path.to_path_buf())),
            Ok(_) => Err(CoreError::invalid_chart(format!(
                "chart source {} is neither a directory nor a recognized archive",
                source
            ))),
            Err(_) => Err(CoreError::NotFound {
                path: source.to_string(),
            }),
        }
    }
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Loads a chart from any supported source
#[derive(Debug, Clone, Default)]
pub struct CompositeLoader {
    fs: FsChartLoader,
}

impl CompositeLoader {
    pub fn new() -> Self {
        Self {
            fs: FsChartLoader::new(),
        }
    }

    /// Resolve and load a chart from a directory, archive, or URL
    ///
    /// All temporary resources (downloaded files, extraction directories) are
    /// owned by this call and removed on every exit path.
    pub fn load(&self, source: &str, cancel: &CancelToken) -> Result<Chart> {
        match ChartSource::detect(source)? {
            ChartSource::Directory(dir) => self.fs.load(&dir, cancel),
            ChartSource::Archive(path) => self.load_archive(&path, cancel),
            ChartSource::Url(url) => {
                // NamedTempFile is deleted on drop, success or failure
                let downloaded = download(&url, cancel)?;
                self.load_archive(downloaded.path(), cancel)
            }
        }
    }

    fn load_archive(&self, path: &Path, cancel: &CancelToken) -> Result<Chart> {
        cancel.check()?;

        let tmp = tempfile::Builder::new()
            .prefix("composepack-chart-")
            .tempdir()?;
        extract_archive(path, tmp.path())?;
        let root = find_chart_root(tmp.path())?;
        self.fs.load(&root, cancel)
        // tmp dropped here, extraction directory removed
    }
}

/// Download a remote archive to a temporary file
fn download(url: &str, cancel: &CancelToken) -> Result<tempfile::NamedTempFile> {
    cancel.check()?;

    let parsed = url::Url::parse(url).map_err(|e| CoreError::Network {
        url: url.to_string(),
        message: format!("invalid URL: {}", e),
    })?;

    tracing::debug!("downloading chart from {}", parsed);

    let response = reqwest::blocking::get(parsed.clone()).map_err(|e| CoreError::Network {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(CoreError::Network {
            url: url.to_string(),
            message: format!("unexpected status {}", response.status()),
        });
    }

    let bytes = response.bytes().map_err(|e| CoreError::Network {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix("composepack-chart-")
        .suffix(".cpack.tgz")
        .tempfile()?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    Ok(tmp)
}
