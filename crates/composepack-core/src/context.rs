//! Template rendering context

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chart::ChartMetadata;
use crate::values::Values;

/// Release identity exposed to templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Release name
    pub name: String,
}

impl ReleaseInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Read-only accessor over the chart's static file bytes
///
/// Templates inline static content through this handle; it never touches the
/// filesystem, so rendering stays pure given the loaded chart.
#[derive(Debug, Clone, Default)]
pub struct StaticFiles(Arc<BTreeMap<String, Vec<u8>>>);

impl StaticFiles {
    pub fn new(files: BTreeMap<String, Vec<u8>>) -> Self {
        Self(Arc::new(files))
    }

    /// Raw bytes of a static file
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.0.get(path).map(|v| v.as_slice())
    }

    /// File content as lossy UTF-8
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Relative paths in lexicographic order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }
}

/// The read-only view templates are evaluated against
///
/// The environment snapshot is an explicit input: the render path never reads
/// process state, so identical inputs produce identical output.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Merged configuration tree
    pub values: Values,

    /// Environment snapshot supplied by the caller
    pub env: BTreeMap<String, String>,

    /// Release identity
    pub release: ReleaseInfo,

    /// Chart identity
    pub chart: ChartMetadata,

    /// Accessor over the chart's static file bytes
    pub files: StaticFiles,
}

impl RenderContext {
    pub fn new(
        values: Values,
        env: BTreeMap<String, String>,
        release: ReleaseInfo,
        chart: &crate::chart::Chart,
    ) -> Self {
        Self {
            values,
            env,
            release,
            chart: chart.metadata.clone(),
            files: StaticFiles::new(chart.static_files.clone()),
        }
    }
}
