//! Chart archive extraction and `.cpack.tgz` packaging

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

use crate::cancel::CancelToken;
use crate::chart::METADATA_FILE;
use crate::error::{CoreError, Result};
use crate::source::CompositeLoader;

/// Archive extensions the loader recognizes
pub const ARCHIVE_EXTENSIONS: [&str; 5] = [".tar", ".tar.gz", ".tgz", ".cpack", ".cpack.tgz"];

/// True if the path looks like a chart archive by extension
pub fn looks_like_archive(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn is_gzipped(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_ascii_lowercase();
    lower.ends_with(".gz") || lower.ends_with(".tgz")
}

/// Entries skipped both when extracting and when packaging
fn should_skip_entry(rel: &str) -> bool {
    rel.split('/').any(|part| {
        part == ".git"
            || part == ".DS_Store"
            || part.starts_with("._")
            || part.starts_with("__MACOSX")
    })
}

/// Extract a chart archive into `dest`, skipping VCS and OS-artifact entries
pub fn extract_archive(path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(path).map_err(|e| {
        CoreError::invalid_chart(format!("cannot open archive {}: {}", path.display(), e))
    })?;

    let reader: Box<dyn Read> = if is_gzipped(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut archive = Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let rel = entry.path()?.to_string_lossy().replace('\\', "/");
        if should_skip_entry(&rel) {
            continue;
        }
        // unpack_in refuses paths escaping dest
        entry.unpack_in(dest)?;
    }

    Ok(())
}

/// Depth-first search for the first directory containing the metadata file.
///
/// Packaged charts usually nest the layout under a versioned top-level
/// directory, so the root itself is also a candidate.
pub fn find_chart_root(base: &Path) -> Result<PathBuf> {
    for entry in walkdir::WalkDir::new(base).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(base)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if should_skip_entry(&rel) {
            continue;
        }
        if entry
            .file_name()
            .to_string_lossy()
            .eq_ignore_ascii_case(METADATA_FILE)
        {
            return Ok(entry
                .path()
                .parent()
                .unwrap_or(base)
                .to_path_buf());
        }
    }

    Err(CoreError::invalid_chart(format!(
        "chart archive is missing {}",
        METADATA_FILE
    )))
}

/// Packaging options for `package_chart`
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Chart directory to package
    pub chart_path: PathBuf,
    /// Destination directory (defaults to the current directory)
    pub destination: Option<PathBuf>,
    /// Output filename (defaults to `<name>-<version>.cpack.tgz`)
    pub output_name: Option<String>,
    /// Overwrite an existing output file
    pub force: bool,
}

/// Package a chart directory into a `.cpack.tgz` archive
///
/// The chart is loaded first so a malformed chart is rejected before any
/// output is produced, and so name/version can seed the default filename.
pub fn package_chart(
    loader: &CompositeLoader,
    opts: &PackageOptions,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    cancel.check()?;

    let chart_path = opts.chart_path.canonicalize().map_err(|_| CoreError::NotFound {
        path: opts.chart_path.display().to_string(),
    })?;
    let chart = loader.load(&chart_path.to_string_lossy(), cancel)?;

    let dest_dir = opts
        .destination
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dest_dir)?;

    let filename = opts.output_name.clone().unwrap_or_else(|| {
        format!("{}-{}.cpack.tgz", chart.metadata.name, chart.metadata.version)
    });
    let output = dest_dir.join(filename);

    if !opts.force && output.exists() {
        return Err(CoreError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "output file {} already exists (use --force to overwrite)",
                output.display()
            ),
        )));
    }

    let file = File::create(&output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in walkdir::WalkDir::new(&chart_path).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        let rel = match entry.path().strip_prefix(&chart_path) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let rel_key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if should_skip_entry(&rel_key) {
            continue;
        }
        builder.append_path_with_name(entry.path(), &rel_key)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    tracing::debug!("packaged chart into {}", output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_looks_like_archive() {
        assert!(looks_like_archive("demo-0.1.0.cpack.tgz"));
        assert!(looks_like_archive("demo.TAR.GZ"));
        assert!(looks_like_archive("demo.tar"));
        assert!(!looks_like_archive("demo"));
        assert!(!looks_like_archive("demo.zip"));
    }

    #[test]
    fn test_should_skip_entry() {
        assert!(should_skip_entry(".git/config"));
        assert!(should_skip_entry("nested/.DS_Store"));
        assert!(should_skip_entry("__MACOSX/foo"));
        assert!(should_skip_entry("._resource"));
        assert!(!should_skip_entry("templates/compose/app.yaml.j2"));
    }

    #[test]
    fn test_package_then_extract_roundtrip() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("chart/templates/compose")).unwrap();
        fs::create_dir_all(src.path().join("chart/.git")).unwrap();
        fs::write(
            src.path().join("chart/Chart.yaml"),
            "name: demo\nversion: 0.1.0\n",
        )
        .unwrap();
        fs::write(src.path().join("chart/values.yaml"), "a: 1\n").unwrap();
        fs::write(
            src.path().join("chart/templates/compose/app.yaml.j2"),
            "services: {}\n",
        )
        .unwrap();
        fs::write(src.path().join("chart/.git/HEAD"), "ref\n").unwrap();

        let loader = CompositeLoader::new();
        let out_dir = tempfile::tempdir().unwrap();
        let opts = PackageOptions {
            chart_path: src.path().join("chart"),
            destination: Some(out_dir.path().to_path_buf()),
            output_name: None,
            force: false,
        };
        let archive_path = package_chart(&loader, &opts, &CancelToken::new()).unwrap();
        assert!(archive_path.ends_with("demo-0.1.0.cpack.tgz"));

        let extracted = tempfile::tempdir().unwrap();
        extract_archive(&archive_path, extracted.path()).unwrap();
        let root = find_chart_root(extracted.path()).unwrap();
        assert!(root.join("Chart.yaml").is_file());
        // VCS artifacts never make it into the archive
        assert!(!root.join(".git").exists());
    }

    #[test]
    fn test_package_refuses_overwrite_without_force() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("templates/compose")).unwrap();
        fs::write(src.path().join("Chart.yaml"), "name: demo\nversion: 0.1.0\n").unwrap();
        fs::write(src.path().join("values.yaml"), "").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        fs::write(out_dir.path().join("demo-0.1.0.cpack.tgz"), b"existing").unwrap();

        let loader = CompositeLoader::new();
        let opts = PackageOptions {
            chart_path: src.path().to_path_buf(),
            destination: Some(out_dir.path().to_path_buf()),
            output_name: None,
            force: false,
        };
        let err = package_chart(&loader, &opts, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_find_chart_root_missing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), "no chart here").unwrap();
        assert!(matches!(
            find_chart_root(dir.path()),
            Err(CoreError::InvalidChart { .. })
        ));
    }
}
