//! Values handling with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::chart::{Chart, VALUES_FILE};
use crate::error::{CoreError, Result};
use crate::schema;

/// Provenance label for the chart's own defaults
pub const SOURCE_CHART_DEFAULTS: &str = "chart:values.yaml";
/// Provenance label for inline `--set` overrides
pub const SOURCE_SET_OVERRIDES: &str = "cli:set";

/// Values container with deep merge capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a YAML file
    ///
    /// An empty file yields an empty mapping; unreadable or unparsable files
    /// fail with a values error naming the path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::values(format!("cannot read {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        Self::from_yaml(&content).map_err(|e| {
            CoreError::values(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Parse values from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Deep merge another Values into this one
    ///
    /// Rules (right-biased):
    /// - Scalars: overlay replaces base
    /// - Objects: recursive key-by-key merge
    /// - Arrays: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Set a value by dotted path (e.g. `image.tag`)
    ///
    /// A non-mapping value at an intermediate segment is silently replaced by
    /// a new mapping (last-write-wins).
    pub fn set(&mut self, path: &str, value: JsonValue) {
        let parts: Vec<&str> = path.split('.').collect();
        set_nested(&mut self.0, &parts, value);
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to the inner JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// Deep merge two JSON values, overlay winning at every non-mapping leaf
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    if path.is_empty() {
        *value = new_value;
        return;
    }

    // A scalar or list in the way is replaced by a fresh mapping.
    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }
    let map = value
        .as_object_mut()
        .expect("value is an object after initialization");

    let key = path[0];
    let remaining = &path[1..];

    if remaining.is_empty() {
        map.insert(key.to_string(), new_value);
    } else {
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        set_nested(entry, remaining, new_value);
    }
}

fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return Some(value);
    }
    match value {
        JsonValue::Object(map) => map.get(path[0]).and_then(|v| get_nested(v, &path[1..])),
        _ => None,
    }
}

/// Parse `--set key=value` arguments into a single overlay layer
///
/// The leaf is always the literal string from the command line; type coercion
/// is left to the templates consuming the value.
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| {
            CoreError::values(format!("invalid --set format: '{}', expected key=value", arg))
        })?;
        if key.is_empty() {
            return Err(CoreError::values(format!(
                "invalid --set format: '{}', key must not be empty",
                arg
            )));
        }
        values.set(key, JsonValue::String(val.to_string()));
    }

    Ok(values)
}

/// Layer chart defaults, values files, and inline overrides into one tree
///
/// Returns the merged values plus the ordered provenance list. The final tree
/// is validated against the chart's schema when it carries one.
pub fn build_values(
    chart: &Chart,
    value_files: &[std::path::PathBuf],
    set_values: &[String],
) -> Result<(Values, Vec<String>)> {
    let mut result = chart.values.clone();
    if result.0.is_null() {
        result = Values::new();
    }
    let mut sources = vec![SOURCE_CHART_DEFAULTS.to_string()];

    for path in value_files {
        let overlay = Values::from_file(path)?;
        result.merge(&overlay);
        sources.push(path.display().to_string());
    }

    if !set_values.is_empty() {
        let overrides = parse_set_values(set_values)?;
        if !overrides.is_empty() {
            result.merge(&overrides);
            sources.push(SOURCE_SET_OVERRIDES.to_string());
        }
    }

    if let Some(schema_bytes) = &chart.values_schema {
        schema::validate(schema_bytes, &result)?;
        tracing::debug!(chart = %chart.metadata.name, "values validated against {}", VALUES_FILE);
    }

    Ok((result, sources))
}
