//! Diff engine for comparing a proposed render against the current release
//!
//! Comparison is deliberately text based: the merged compose document has
//! already been canonicalized by `docker compose config`, so any textual
//! difference is a real difference. Per-service changes are detected by
//! re-serializing each service subtree and comparing the trimmed text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of change to a service or file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

/// A single line of a positional diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub change_type: ChangeType,
    pub content: String,
}

/// A change to one compose service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceChange {
    pub name: String,
    pub change_type: ChangeType,
}

/// A change to one file asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub change_type: ChangeType,
    /// Line diff, populated for modified files on request
    pub diff: Option<Vec<DiffLine>>,
}

/// Result of comparing the current release against a proposed one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
    /// True when no release exists yet and everything would be created
    pub is_new_release: bool,

    /// Positional diff of the merged compose documents
    pub compose_diff: Vec<DiffLine>,

    /// Proposed compose document, shown in full for new releases
    pub new_compose: String,

    /// Services added, modified, or removed
    pub services: Vec<ServiceChange>,

    /// File assets added, modified, or removed
    pub files: Vec<FileChange>,
}

impl DiffReport {
    pub fn has_changes(&self) -> bool {
        self.is_new_release || !self.compose_diff.is_empty() || !self.files.is_empty()
    }
}

/// Computes release diffs
pub struct DiffEngine {
    /// Include line diffs for modified files
    pub detail_files: bool,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine {
    pub fn new() -> Self {
        Self { detail_files: false }
    }

    pub fn with_file_details(mut self, detail: bool) -> Self {
        self.detail_files = detail;
        self
    }

    /// Compare the current release state against a proposed render.
    ///
    /// `current_compose` is None when the release does not exist yet, in
    /// which case everything in the proposed render is reported as created.
    pub fn diff(
        &self,
        current_compose: Option<&[u8]>,
        new_compose: &[u8],
        current_files: &BTreeMap<String, Vec<u8>>,
        new_files: &BTreeMap<String, Vec<u8>>,
    ) -> Result<DiffReport> {
        let new_compose_str = String::from_utf8_lossy(new_compose).into_owned();

        let Some(current) = current_compose else {
            let services = extract_service_names(new_compose)
                .into_iter()
                .map(|name| ServiceChange {
                    name,
                    change_type: ChangeType::Added,
                })
                .collect();

            let files = new_files
                .keys()
                .map(|path| FileChange {
                    path: path.clone(),
                    change_type: ChangeType::Added,
                    diff: None,
                })
                .collect();

            return Ok(DiffReport {
                is_new_release: true,
                compose_diff: Vec::new(),
                new_compose: new_compose_str,
                services,
                files,
            });
        };

        let current_str = String::from_utf8_lossy(current).into_owned();
        let compose_diff = if current_str == new_compose_str {
            Vec::new()
        } else {
            positional_diff(&current_str, &new_compose_str)
        };

        let services = diff_services(current, new_compose);
        let files = self.diff_files(current_files, new_files);

        Ok(DiffReport {
            is_new_release: false,
            compose_diff,
            new_compose: new_compose_str,
            services,
            files,
        })
    }

    fn diff_files(
        &self,
        current: &BTreeMap<String, Vec<u8>>,
        new: &BTreeMap<String, Vec<u8>>,
    ) -> Vec<FileChange> {
        let mut changes = Vec::new();

        for (path, new_data) in new {
            match current.get(path) {
                None => changes.push(FileChange {
                    path: path.clone(),
                    change_type: ChangeType::Added,
                    diff: None,
                }),
                Some(old_data) if old_data != new_data => {
                    let diff = self.detail_files.then(|| {
                        positional_diff(
                            &String::from_utf8_lossy(old_data),
                            &String::from_utf8_lossy(new_data),
                        )
                    });
                    changes.push(FileChange {
                        path: path.clone(),
                        change_type: ChangeType::Modified,
                        diff,
                    });
                }
                _ => {}
            }
        }

        for path in current.keys() {
            if !new.contains_key(path) {
                changes.push(FileChange {
                    path: path.clone(),
                    change_type: ChangeType::Removed,
                    diff: None,
                });
            }
        }

        changes
    }
}

/// Index-by-index line comparison emitting removed-then-added pairs.
///
/// Lines are compared positionally rather than via longest common
/// subsequence; the canonical compose output is stable enough that this
/// stays readable, and it keeps behavior simple and predictable.
pub fn positional_diff(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let max_len = old_lines.len().max(new_lines.len());

    let mut lines = Vec::new();
    for i in 0..max_len {
        let old_line = old_lines.get(i).copied().unwrap_or("");
        let new_line = new_lines.get(i).copied().unwrap_or("");
        if old_line == new_line {
            continue;
        }
        if !old_line.is_empty() {
            lines.push(DiffLine {
                change_type: ChangeType::Removed,
                content: old_line.to_string(),
            });
        }
        if !new_line.is_empty() {
            lines.push(DiffLine {
                change_type: ChangeType::Added,
                content: new_line.to_string(),
            });
        }
    }
    lines
}

/// Compare the service sets of two compose documents
fn diff_services(old_yaml: &[u8], new_yaml: &[u8]) -> Vec<ServiceChange> {
    let old_services = extract_services(old_yaml);
    let new_services = extract_services(new_yaml);

    let mut changes = Vec::new();

    for (name, new_body) in &new_services {
        match old_services.get(name) {
            None => changes.push(ServiceChange {
                name: name.clone(),
                change_type: ChangeType::Added,
            }),
            Some(old_body) if old_body != new_body => changes.push(ServiceChange {
                name: name.clone(),
                change_type: ChangeType::Modified,
            }),
            _ => {}
        }
    }

    for name in old_services.keys() {
        if !new_services.contains_key(name) {
            changes.push(ServiceChange {
                name: name.clone(),
                change_type: ChangeType::Removed,
            });
        }
    }

    changes
}

/// Service names declared under the document's top-level `services` key
pub fn extract_service_names(compose_yaml: &[u8]) -> Vec<String> {
    extract_services(compose_yaml).into_keys().collect()
}

/// Per-service canonical text, keyed by service name.
///
/// Each service subtree is re-serialized to YAML and trimmed so the
/// comparison is insensitive to its position in the parent document.
fn extract_services(compose_yaml: &[u8]) -> BTreeMap<String, String> {
    let mut services = BTreeMap::new();

    let Ok(doc) = serde_yaml::from_slice::<serde_yaml::Value>(compose_yaml) else {
        return services;
    };
    let Some(mapping) = doc.get("services").and_then(|v| v.as_mapping()) else {
        return services;
    };

    for (key, body) in mapping {
        let Some(name) = key.as_str() else { continue };
        let text = serde_yaml::to_string(body)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        services.insert(name.to_string(), text);
    }

    services
}
