//! Release metadata persistence
//!
//! Each release's runtime directory carries a `release.json` describing the
//! render that produced it. The file is written atomically (temp file plus
//! rename) so a reader never observes a partial write.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::chart::ChartMetadata;
use crate::error::{CoreError, Result};
use crate::values::Values;

/// Well-known metadata filename inside a runtime directory
pub const METADATA_FILE_NAME: &str = "release.json";

const METADATA_TEMP_NAME: &str = ".release.json.tmp";

/// Durable record of one successful render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    /// Release name
    pub release_name: String,

    /// Chart identity at render time
    pub chart_metadata: ChartMetadata,

    /// Source string the chart was loaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_source: Option<String>,

    /// Digest of the identity fields, recomputed on every save
    #[serde(default)]
    pub chart_digest: String,

    /// Runtime directory, stamped on save
    #[serde(default)]
    pub runtime_path: PathBuf,

    /// Creation timestamp, set on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Merged values; blanked before serialization so configuration never
    /// leaks to disk, restored in memory after the write
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub values: Values,

    /// Ordered provenance of value sources
    pub values_sources: Vec<String>,

    /// Ordered fragment names that were merged
    pub compose_files: Vec<String>,
}

impl ReleaseMetadata {
    /// Recompute the digest over the identity fields.
    ///
    /// The digest identifies this specific render event, not the rendered
    /// content: (release name, chart name, version, description, timestamp).
    pub fn recompute_digest(&mut self) {
        let description = self
            .chart_metadata
            .description
            .clone()
            .unwrap_or_default();
        let created = self
            .created_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        for field in [
            self.release_name.as_str(),
            self.chart_metadata.name.as_str(),
            self.chart_metadata.version.as_str(),
            description.as_str(),
            created.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        self.chart_digest = hex::encode(hasher.finalize());
    }
}

/// Persists release metadata inside runtime directories
#[derive(Debug, Clone, Default)]
pub struct Store;

impl Store {
    pub fn new() -> Self {
        Self
    }

    /// Read metadata from `<runtime>/release.json`
    ///
    /// A missing file means the release was never installed and yields
    /// `None`; a corrupt file is an error.
    pub fn load(&self, runtime_path: &Path, cancel: &CancelToken) -> Result<Option<ReleaseMetadata>> {
        cancel.check()?;

        let path = runtime_path.join(METADATA_FILE_NAME);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::Io(e)),
        };

        let meta: ReleaseMetadata = serde_json::from_slice(&data)?;
        Ok(Some(meta))
    }

    /// Write metadata to `<runtime>/release.json` atomically
    ///
    /// Stamps the runtime path and (if unset) the creation time, recomputes
    /// the digest, and blanks the values field for the on-disk copy. The
    /// caller's in-memory values are left intact.
    pub fn save(
        &self,
        runtime_path: &Path,
        meta: &mut ReleaseMetadata,
        cancel: &CancelToken,
    ) -> Result<()> {
        cancel.check()?;

        meta.runtime_path = runtime_path.to_path_buf();
        if meta.created_at.is_none() {
            meta.created_at = Some(Utc::now());
        }
        meta.recompute_digest();

        std::fs::create_dir_all(runtime_path)?;

        let values = std::mem::take(&mut meta.values);
        let serialized = serde_json::to_vec_pretty(&*meta);
        meta.values = values;
        let data = serialized?;

        let temp_path = runtime_path.join(METADATA_TEMP_NAME);
        std::fs::write(&temp_path, &data)?;
        std::fs::rename(&temp_path, runtime_path.join(METADATA_FILE_NAME))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_meta() -> ReleaseMetadata {
        ReleaseMetadata {
            release_name: "prod".to_string(),
            chart_metadata: ChartMetadata {
                name: "webapp".to_string(),
                version: "1.0.0".to_string(),
                description: Some("demo".to_string()),
                maintainers: vec![],
            },
            chart_source: Some("./charts/webapp".to_string()),
            chart_digest: String::new(),
            runtime_path: PathBuf::new(),
            created_at: None,
            values: Values::from_yaml("secret: hunter2").unwrap(),
            values_sources: vec!["chart:values.yaml".to_string()],
            compose_files: vec!["app.yaml".to_string()],
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Store::new().load(dir.path(), &CancelToken::new()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load_keeps_digest() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new();
        let mut meta = sample_meta();

        store.save(dir.path(), &mut meta, &CancelToken::new()).unwrap();
        let loaded = store
            .load(dir.path(), &CancelToken::new())
            .unwrap()
            .expect("metadata present after save");

        assert_eq!(loaded.chart_digest, meta.chart_digest);
        assert_eq!(loaded.release_name, "prod");
        // Values are blanked on disk but intact in memory
        assert!(loaded.values.is_empty());
        assert_eq!(meta.values.get("secret").unwrap(), "hunter2");
    }

    #[test]
    fn test_digest_tracks_timestamp() {
        let mut a = sample_meta();
        let mut b = sample_meta();
        a.created_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        b.created_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap());
        a.recompute_digest();
        b.recompute_digest();
        assert_ne!(a.chart_digest, b.chart_digest);

        // Identical identity fields hash identically
        b.created_at = a.created_at;
        b.recompute_digest();
        assert_eq!(a.chart_digest, b.chart_digest);
    }

    #[test]
    fn test_no_partial_metadata_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = sample_meta();
        Store::new()
            .save(dir.path(), &mut meta, &CancelToken::new())
            .unwrap();
        assert!(!dir.path().join(METADATA_TEMP_NAME).exists());
        assert!(dir.path().join(METADATA_FILE_NAME).exists());
    }

    #[test]
    fn test_save_honours_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let mut meta = sample_meta();
        assert!(matches!(
            Store::new().save(dir.path(), &mut meta, &token),
            Err(CoreError::Cancelled)
        ));
        assert!(!dir.path().join(METADATA_FILE_NAME).exists());
    }
}
