//! Filesystem chart loader

use std::collections::BTreeMap;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::chart::{
    self, Chart, ChartMetadata, COMPOSE_TEMPLATES_DIR, FILE_TEMPLATES_DIR, HELPER_TEMPLATES_DIR,
    METADATA_FILE, STATIC_FILES_DIR, VALUES_FILE, VALUES_SCHEMA_FILE,
};
use crate::error::{CoreError, Result};
use crate::values::Values;

/// Loads charts from an unpacked directory layout
#[derive(Debug, Clone, Default)]
pub struct FsChartLoader;

impl FsChartLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a chart from a directory
    pub fn load(&self, root: &Path, cancel: &CancelToken) -> Result<Chart> {
        cancel.check()?;

        if !root.is_dir() {
            return Err(CoreError::NotFound {
                path: root.display().to_string(),
            });
        }

        let metadata = load_metadata(root)?;
        metadata.validate()?;

        let values_path = root.join(VALUES_FILE);
        if !values_path.is_file() {
            return Err(CoreError::invalid_chart(format!(
                "{} not found in {}",
                VALUES_FILE,
                root.display()
            )));
        }
        let values = Values::from_file(&values_path)
            .map_err(|e| CoreError::invalid_chart(e.to_string()))?;

        let schema_path = root.join(VALUES_SCHEMA_FILE);
        let values_schema = if schema_path.is_file() {
            Some(std::fs::read(&schema_path)?)
        } else {
            None
        };

        let compose_templates = collect_templates(&root.join(COMPOSE_TEMPLATES_DIR))?;
        let file_templates = collect_templates(&root.join(FILE_TEMPLATES_DIR))?;
        let helper_templates = collect_templates(&root.join(HELPER_TEMPLATES_DIR))?;
        let static_files = collect_static_files(&root.join(STATIC_FILES_DIR))?;

        tracing::debug!(
            chart = %metadata.name,
            compose = compose_templates.len(),
            files = file_templates.len(),
            helpers = helper_templates.len(),
            "loaded chart from {}", root.display()
        );

        Ok(Chart {
            metadata,
            values,
            values_schema,
            compose_templates,
            file_templates,
            helper_templates,
            static_files,
        })
    }
}

fn load_metadata(root: &Path) -> Result<ChartMetadata> {
    let path = root.join(METADATA_FILE);
    let content = std::fs::read_to_string(&path).map_err(|_| {
        CoreError::invalid_chart(format!("{} not found in {}", METADATA_FILE, root.display()))
    })?;
    serde_yaml::from_str(&content)
        .map_err(|e| CoreError::invalid_chart(format!("cannot parse {}: {}", METADATA_FILE, e)))
}

/// Walk a template directory, keeping files that carry a template suffix.
/// Keys are slash-separated relative paths with the suffix stripped.
fn collect_templates(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut templates = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(templates);
    }

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .expect("walkdir yields paths under its root");
        let rel = path_key(rel);

        match chart::strip_template_suffix(&rel) {
            Some(key) => {
                let content = std::fs::read_to_string(entry.path())?;
                templates.insert(key.to_string(), content);
            }
            None => {
                tracing::warn!("ignoring non-template file {}", entry.path().display());
            }
        }
    }

    Ok(templates)
}

fn collect_static_files(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(files);
    }

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .expect("walkdir yields paths under its root");
        files.insert(path_key(rel), std::fs::read(entry.path())?);
    }

    Ok(files)
}

fn path_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_chart(root: &Path) {
        fs::create_dir_all(root.join("templates/compose")).unwrap();
        fs::create_dir_all(root.join("templates/files")).unwrap();
        fs::create_dir_all(root.join("templates/helpers")).unwrap();
        fs::create_dir_all(root.join("files/config")).unwrap();

        fs::write(
            root.join("Chart.yaml"),
            "name: demo\nversion: 0.1.0\ndescription: demo chart\n",
        )
        .unwrap();
        fs::write(root.join("values.yaml"), "image:\n  tag: \"1.0\"\n").unwrap();
        fs::write(
            root.join("templates/compose/app.yaml.j2"),
            "services:\n  app:\n    image: \"app:{{ values.image.tag }}\"\n",
        )
        .unwrap();
        fs::write(root.join("templates/files/motd.txt.tpl"), "{{ release.name }}").unwrap();
        fs::write(root.join("templates/helpers/labels.j2"), "demo").unwrap();
        fs::write(root.join("files/config/static.conf"), b"listen 80;").unwrap();
    }

    #[test]
    fn test_load_directory_chart() {
        let dir = tempfile::tempdir().unwrap();
        write_chart(dir.path());

        let chart = FsChartLoader::new()
            .load(dir.path(), &CancelToken::new())
            .unwrap();

        assert_eq!(chart.metadata.name, "demo");
        // Template suffixes are stripped from the stored keys
        assert!(chart.compose_templates.contains_key("app.yaml"));
        assert!(chart.file_templates.contains_key("motd.txt"));
        assert!(chart.helper_templates.contains_key("labels"));
        assert_eq!(
            chart.static_files.get("config/static.conf").unwrap(),
            b"listen 80;"
        );
    }

    #[test]
    fn test_missing_metadata_is_invalid_chart() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("values.yaml"), "").unwrap();

        let err = FsChartLoader::new()
            .load(dir.path(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }

    #[test]
    fn test_missing_values_is_invalid_chart() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Chart.yaml"), "name: x\nversion: 1.0.0\n").unwrap();

        let err = FsChartLoader::new()
            .load(dir.path(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }

    #[test]
    fn test_cancelled_before_io() {
        let dir = tempfile::tempdir().unwrap();
        write_chart(dir.path());

        let token = CancelToken::new();
        token.cancel();
        let err = FsChartLoader::new().load(dir.path(), &token).unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }
}
