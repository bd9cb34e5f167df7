//! Fragment merging through `docker compose config`
//!
//! Rendered compose fragments are staged in a scratch directory together
//! with the release's file assets, then handed to `docker compose config`
//! which validates them and produces a single canonical document. The
//! scratch path leaks into the merged output through relative volume
//! mounts, so it is rewritten back to "." before the result is returned.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use composepack_core::CancelToken;
use tracing::debug;

use crate::error::{ComposeError, Result};
use crate::runner::{ComposeRunner, MergeOptions};

/// Merge rendered fragments into one canonical compose document.
///
/// Returns the merged YAML and the fragment names in the order they were
/// passed to compose (lexicographic). File assets are staged under a
/// `files/` subtree so relative mounts resolve during validation.
pub fn merge_fragments(
    runner: &ComposeRunner,
    fragments: &BTreeMap<String, String>,
    files: &BTreeMap<String, Vec<u8>>,
    release_name: &str,
    cancel: &CancelToken,
) -> Result<(Vec<u8>, Vec<String>)> {
    cancel.check()?;
    if fragments.is_empty() {
        return Err(ComposeError::NoFragments);
    }

    let scratch = tempfile::Builder::new()
        .prefix("composepack-fragments-")
        .tempdir()?;

    let mut fragment_paths = Vec::with_capacity(fragments.len());
    for (name, content) in fragments {
        let dest = scratch.path().join(name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, content)?;
        fragment_paths.push(dest);
    }

    if !files.is_empty() {
        let files_root = scratch.path().join("files");
        write_file_tree(&files_root, files)?;
    }

    debug!(
        fragments = fragments.len(),
        release = release_name,
        "merging compose fragments"
    );

    let merged = runner.merge_config(
        &MergeOptions {
            working_dir: scratch.path().to_path_buf(),
            fragment_paths,
            project_name: release_name.to_string(),
        },
        cancel,
    )?;

    // Rewrite scratch paths so the stored document is location independent
    let scratch_str = scratch.path().display().to_string();
    let rendered = String::from_utf8_lossy(&merged).replace(&scratch_str, ".");

    let names = fragments.keys().cloned().collect();
    Ok((rendered.into_bytes(), names))
}

pub(crate) fn write_file_tree(root: &Path, files: &BTreeMap<String, Vec<u8>>) -> Result<()> {
    for (path, data) in files {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, data)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn cat_stub(dir: &Path) -> ComposeRunner {
        // Echoes each -f fragment back, close enough to `config` for tests
        let path = dir.join("stub-compose");
        let script = r#"#!/bin/sh
while [ "$1" != "config" ]; do
  if [ "$1" = "-f" ]; then
    shift
    cat "$1"
  fi
  shift
done
"#;
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        ComposeRunner::with_commands(vec![path.display().to_string()], None)
    }

    #[test]
    fn test_merge_empty_fragments_rejected() {
        let runner = ComposeRunner::new();
        let err = merge_fragments(
            &runner,
            &BTreeMap::new(),
            &BTreeMap::new(),
            "myapp",
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::NoFragments));
    }

    #[test]
    fn test_merge_orders_fragments_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        let runner = cat_stub(dir.path());

        let mut fragments = BTreeMap::new();
        fragments.insert("b.yaml".to_string(), "second\n".to_string());
        fragments.insert("a.yaml".to_string(), "first\n".to_string());

        let (merged, names) = merge_fragments(
            &runner,
            &fragments,
            &BTreeMap::new(),
            "myapp",
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(names, vec!["a.yaml".to_string(), "b.yaml".to_string()]);
        assert_eq!(String::from_utf8_lossy(&merged), "first\nsecond\n");
    }

    #[test]
    fn test_merge_stages_file_assets() {
        let dir = tempfile::tempdir().unwrap();

        // Stub that proves files/ exists in the scratch dir at merge time
        let path = dir.path().join("check-files");
        let script = "#!/bin/sh\nls files/\n";
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        let runner = ComposeRunner::with_commands(vec![path.display().to_string()], None);

        let mut fragments = BTreeMap::new();
        fragments.insert("web.yaml".to_string(), "services: {}\n".to_string());
        let mut files = BTreeMap::new();
        files.insert("app.conf".to_string(), b"key=value".to_vec());

        let (merged, _) = merge_fragments(
            &runner,
            &fragments,
            &files,
            "myapp",
            &CancelToken::new(),
        )
        .unwrap();
        assert!(String::from_utf8_lossy(&merged).contains("app.conf"));
    }

    #[test]
    fn test_merge_rewrites_scratch_path() {
        let dir = tempfile::tempdir().unwrap();

        // Stub that leaks its working directory into the output
        let path = dir.path().join("leak-pwd");
        fs::write(&path, "#!/bin/sh\necho \"source: $PWD/files/app.conf\"\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        let runner = ComposeRunner::with_commands(vec![path.display().to_string()], None);

        let mut fragments = BTreeMap::new();
        fragments.insert("web.yaml".to_string(), "services: {}\n".to_string());

        let (merged, _) = merge_fragments(
            &runner,
            &fragments,
            &BTreeMap::new(),
            "myapp",
            &CancelToken::new(),
        )
        .unwrap();
        let text = String::from_utf8_lossy(&merged);
        assert!(
            text.contains("source: ./files/app.conf"),
            "scratch path not rewritten: {}",
            text
        );
    }
}
