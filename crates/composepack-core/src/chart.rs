//! Chart definition and layout conventions

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Metadata file at the chart root
pub const METADATA_FILE: &str = "Chart.yaml";
/// Default values file at the chart root
pub const VALUES_FILE: &str = "values.yaml";
/// Optional JSON Schema for merged values
pub const VALUES_SCHEMA_FILE: &str = "values.schema.json";
/// Compose fragment templates, rendered to compose YAML
pub const COMPOSE_TEMPLATES_DIR: &str = "templates/compose";
/// Generic file templates, rendered to runtime files
pub const FILE_TEMPLATES_DIR: &str = "templates/files";
/// Include-only helper snippets
pub const HELPER_TEMPLATES_DIR: &str = "templates/helpers";
/// Static assets copied verbatim
pub const STATIC_FILES_DIR: &str = "files";

/// Suffixes that mark a file as a template. The suffix is stripped from the
/// stored key, so `app.yaml.j2` and `app.yaml.tpl` both render to `app.yaml`.
pub const TEMPLATE_SUFFIXES: [&str; 2] = [".j2", ".tpl"];

/// Strip the template suffix from a file name, if it carries one
pub fn strip_template_suffix(name: &str) -> Option<&str> {
    TEMPLATE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
}

/// Chart metadata from `Chart.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartMetadata {
    /// Chart name (required, non-empty)
    pub name: String,

    /// Chart version (required, non-empty)
    pub version: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Maintainers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<String>,
}

impl ChartMetadata {
    /// Validate the mandatory fields
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid_chart("chart name must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(CoreError::invalid_chart("chart version must not be empty"));
        }
        Ok(())
    }
}

/// A fully loaded chart
///
/// Created once per render by the chart loader, never mutated afterwards,
/// safe to share read-only across concurrent renders.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    /// Chart metadata
    pub metadata: ChartMetadata,

    /// Base values from `values.yaml`
    pub values: Values,

    /// Raw `values.schema.json` bytes, if present
    pub values_schema: Option<Vec<u8>>,

    /// `templates/compose/**` keyed by relative path, template suffix stripped
    pub compose_templates: BTreeMap<String, String>,

    /// `templates/files/**` keyed by relative path, template suffix stripped
    pub file_templates: BTreeMap<String, String>,

    /// `templates/helpers/**` keyed by relative path, template suffix stripped
    pub helper_templates: BTreeMap<String, String>,

    /// `files/**` captured verbatim by relative path
    pub static_files: BTreeMap<String, Vec<u8>>,
}
