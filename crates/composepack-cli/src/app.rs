//! High-level release workflows shared by the CLI commands
//!
//! Everything here composes the core, engine, and compose crates into the
//! render pipeline: load chart, build values, render templates, merge
//! fragments through docker compose, write the runtime directory, persist
//! metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use composepack_compose::{
    ComposeRunner, DiffEngine, DiffReport, RunOptions, RuntimeWriter, WriteOptions,
    load_current_files, merge_fragments,
};
use composepack_core::{
    CancelToken, CompositeLoader, ReleaseInfo, ReleaseMetadata, RenderContext, Store,
    build_values,
};
use composepack_engine::Engine;
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use composepack_compose::runtime::COMPOSE_FILE_NAME;
use tracing::warn;

/// Options driving a render into a runtime directory
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub release_name: String,
    /// Chart source: directory, archive, or URL. Optional only for diff,
    /// which can recover it from existing release metadata.
    pub chart_source: Option<String>,
    pub value_files: Vec<PathBuf>,
    pub set_values: Vec<String>,
    /// Explicit runtime directory; its basename must equal the release name
    pub runtime_path: Option<PathBuf>,
}

/// Binds the pipeline components together with the caller's environment
/// snapshot and the releases base directory.
pub struct Application {
    loader: CompositeLoader,
    engine: Engine,
    runner: ComposeRunner,
    writer: RuntimeWriter,
    store: Store,
    env: BTreeMap<String, String>,
    base_dir: PathBuf,
}

impl Application {
    pub fn new(base_dir: PathBuf, env: BTreeMap<String, String>) -> Self {
        Self {
            loader: CompositeLoader::new(),
            engine: Engine::new(true),
            runner: ComposeRunner::new(),
            writer: RuntimeWriter::new(),
            store: Store::new(),
            env,
            base_dir,
        }
    }

    /// Resolve (base dir, runtime dir) for a release.
    ///
    /// An explicit runtime path overrides the base directory, but its
    /// basename must match the release name so a typo cannot point one
    /// release's commands at another's directory.
    pub fn resolve_runtime_location(
        &self,
        release_name: &str,
        runtime_path: Option<&Path>,
    ) -> Result<(PathBuf, PathBuf)> {
        if release_name.is_empty() {
            return Err(miette!("release name is required"));
        }

        if let Some(path) = runtime_path {
            let abs = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir().into_diagnostic()?.join(path)
            };
            let base = abs
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if base != release_name {
                return Err(miette!(
                    "runtime directory {} does not match release {}",
                    abs.display(),
                    release_name
                ));
            }
            let parent = abs.parent().unwrap_or(Path::new(".")).to_path_buf();
            return Ok((parent, abs));
        }

        Ok((self.base_dir.clone(), self.base_dir.join(release_name)))
    }

    /// Render a chart into the release's runtime directory and persist
    /// metadata. Returns the runtime directory and the saved metadata.
    pub fn render_release(
        &self,
        opts: &RenderOptions,
        cancel: &CancelToken,
    ) -> Result<(PathBuf, ReleaseMetadata)> {
        if opts.release_name.is_empty() {
            return Err(miette!("release name is required"));
        }
        let chart_source = opts
            .chart_source
            .as_deref()
            .ok_or_else(|| miette!("chart source must be provided"))?;

        let chart = self
            .loader
            .load(chart_source, cancel)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to load chart from {}", chart_source))?;

        let (values, value_sources) =
            build_values(&chart, &opts.value_files, &opts.set_values).into_diagnostic()?;

        let ctx = RenderContext::new(
            values.clone(),
            self.env.clone(),
            ReleaseInfo::new(&opts.release_name),
            &chart,
        );

        let fragments = self
            .engine
            .render_compose_fragments(&chart, &ctx)
            .into_diagnostic()
            .wrap_err("failed to render compose templates")?;
        if fragments.is_empty() {
            return Err(miette!("chart produced no compose templates"));
        }

        let files = self
            .engine
            .render_files(&chart, &ctx)
            .into_diagnostic()
            .wrap_err("failed to render file templates")?;

        let (merged, ordered_fragments) = merge_fragments(
            &self.runner,
            &fragments,
            &files,
            &opts.release_name,
            cancel,
        )
        .into_diagnostic()?;

        let (base_dir, runtime_dir) =
            self.resolve_runtime_location(&opts.release_name, opts.runtime_path.as_deref())?;

        let written = self
            .writer
            .write(
                &WriteOptions {
                    release_name: opts.release_name.clone(),
                    base_dir,
                    compose_yaml: merged,
                    files,
                },
                cancel,
            )
            .into_diagnostic()
            .wrap_err("failed to write runtime directory")?;
        debug_assert_eq!(written, runtime_dir);

        let mut meta = ReleaseMetadata {
            release_name: opts.release_name.clone(),
            chart_metadata: chart.metadata.clone(),
            chart_source: Some(chart_source.to_string()),
            chart_digest: String::new(),
            runtime_path: PathBuf::new(),
            created_at: None,
            values,
            values_sources: value_sources,
            compose_files: ordered_fragments,
        };
        self.store
            .save(&runtime_dir, &mut meta, cancel)
            .into_diagnostic()
            .wrap_err("failed to save release metadata")?;

        Ok((runtime_dir, meta))
    }

    /// Install a release: render, then bring services up unless
    /// `auto_start` is off. Fails if the release already exists.
    pub fn install(
        &self,
        opts: &RenderOptions,
        auto_start: bool,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let (_, runtime_dir) =
            self.resolve_runtime_location(&opts.release_name, opts.runtime_path.as_deref())?;

        if self
            .store
            .load(&runtime_dir, cancel)
            .into_diagnostic()?
            .is_some()
        {
            return Err(miette!(
                "release {} already exists (use apply to update it)",
                opts.release_name
            ));
        }

        let (runtime_dir, _) = self.render_release(opts, cancel)?;
        if auto_start {
            self.compose_run(&runtime_dir, &["up", "-d"], cancel)?;
        }
        Ok(runtime_dir)
    }

    /// Apply a release: stop the old stack if one is running, re-render,
    /// and bring services up unless `auto_start` is off.
    pub fn apply(
        &self,
        opts: &RenderOptions,
        auto_start: bool,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let (_, runtime_dir) =
            self.resolve_runtime_location(&opts.release_name, opts.runtime_path.as_deref())?;

        let existing = self.store.load(&runtime_dir, cancel).into_diagnostic()?;
        if existing.is_some() && runtime_dir.join(COMPOSE_FILE_NAME).exists() {
            // Best effort: a stack that was never started has nothing to stop
            if let Err(e) = self.compose_run(&runtime_dir, &["down"], cancel) {
                warn!(release = %opts.release_name, "failed to stop existing stack: {}", e);
            }
        }

        let (runtime_dir, _) = self.render_release(opts, cancel)?;
        if auto_start {
            self.compose_run(&runtime_dir, &["up", "-d"], cancel)?;
        }
        Ok(runtime_dir)
    }

    /// Render and write the runtime directory without touching containers
    pub fn template(
        &self,
        opts: &RenderOptions,
        cancel: &CancelToken,
    ) -> Result<(PathBuf, String)> {
        let (runtime_dir, _) = self.render_release(opts, cancel)?;
        let compose = fs::read_to_string(runtime_dir.join(COMPOSE_FILE_NAME))
            .into_diagnostic()
            .wrap_err("failed to read merged compose file")?;
        Ok((runtime_dir, compose))
    }

    /// Compare a proposed render against the current release state.
    ///
    /// The proposed release is rendered entirely in memory; nothing on disk
    /// changes. When no chart source is given it is recovered from the
    /// existing release metadata.
    pub fn diff(
        &self,
        opts: &RenderOptions,
        show_files: bool,
        cancel: &CancelToken,
    ) -> Result<DiffReport> {
        let (_, runtime_dir) =
            self.resolve_runtime_location(&opts.release_name, opts.runtime_path.as_deref())?;

        let current_meta = self.store.load(&runtime_dir, cancel).into_diagnostic()?;

        let chart_source = match (&opts.chart_source, &current_meta) {
            (Some(source), _) => source.clone(),
            (None, None) => {
                return Err(miette!(
                    "--chart is required (release {} doesn't exist yet; specify chart to see what would be created)",
                    opts.release_name
                ));
            }
            (None, Some(meta)) => meta.chart_source.clone().ok_or_else(|| {
                miette!(
                    "release {} exists but chart source is unknown (provide --chart to compare)",
                    opts.release_name
                )
            })?,
        };

        let chart = self
            .loader
            .load(&chart_source, cancel)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to load chart from {}", chart_source))?;

        let (values, _) =
            build_values(&chart, &opts.value_files, &opts.set_values).into_diagnostic()?;

        let ctx = RenderContext::new(
            values,
            self.env.clone(),
            ReleaseInfo::new(&opts.release_name),
            &chart,
        );

        let fragments = self
            .engine
            .render_compose_fragments(&chart, &ctx)
            .into_diagnostic()
            .wrap_err("failed to render compose templates")?;
        let new_files = self
            .engine
            .render_files(&chart, &ctx)
            .into_diagnostic()
            .wrap_err("failed to render file templates")?;

        let (new_compose, _) = merge_fragments(
            &self.runner,
            &fragments,
            &new_files,
            &opts.release_name,
            cancel,
        )
        .into_diagnostic()?;

        let engine = DiffEngine::new().with_file_details(show_files);

        if current_meta.is_none() {
            return engine
                .diff(None, &new_compose, &BTreeMap::new(), &new_files)
                .into_diagnostic();
        }

        let current_compose = fs::read(runtime_dir.join(COMPOSE_FILE_NAME))
            .into_diagnostic()
            .wrap_err("failed to read current compose file")?;
        let current_files = load_current_files(&runtime_dir).into_diagnostic()?;

        engine
            .diff(
                Some(&current_compose),
                &new_compose,
                &current_files,
                &new_files,
            )
            .into_diagnostic()
    }

    /// Run a docker compose command in a release's runtime directory
    pub fn compose_command(
        &self,
        release_name: &str,
        runtime_path: Option<&Path>,
        args: &[&str],
        cancel: &CancelToken,
    ) -> Result<()> {
        let (_, runtime_dir) = self.resolve_runtime_location(release_name, runtime_path)?;

        if !runtime_dir.join(COMPOSE_FILE_NAME).exists() {
            return Err(miette!(
                "release {} has no runtime directory at {} (install it first)",
                release_name,
                runtime_dir.display()
            ));
        }

        self.compose_run(&runtime_dir, args, cancel)
    }

    fn compose_run(&self, runtime_dir: &Path, args: &[&str], cancel: &CancelToken) -> Result<()> {
        self.runner
            .run(
                &RunOptions {
                    working_dir: runtime_dir.to_path_buf(),
                    args: args.iter().map(|s| s.to_string()).collect(),
                },
                cancel,
            )
            .into_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(base: &Path) -> Application {
        Application::new(base.to_path_buf(), BTreeMap::new())
    }

    #[test]
    fn test_resolve_default_location() {
        let base = tempfile::tempdir().unwrap();
        let application = app(base.path());

        let (parent, dir) = application
            .resolve_runtime_location("myapp", None)
            .unwrap();
        assert_eq!(parent, base.path());
        assert_eq!(dir, base.path().join("myapp"));
    }

    #[test]
    fn test_resolve_explicit_path_must_match_release() {
        let base = tempfile::tempdir().unwrap();
        let application = app(base.path());

        let err = application
            .resolve_runtime_location("myapp", Some(&base.path().join("other")))
            .unwrap_err();
        assert!(err.to_string().contains("does not match release"));

        let (_, dir) = application
            .resolve_runtime_location("myapp", Some(&base.path().join("myapp")))
            .unwrap();
        assert_eq!(dir, base.path().join("myapp"));
    }

    #[test]
    fn test_render_requires_chart_source() {
        let base = tempfile::tempdir().unwrap();
        let application = app(base.path());

        let opts = RenderOptions {
            release_name: "myapp".to_string(),
            ..Default::default()
        };
        let err = application
            .render_release(&opts, &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("chart source"));
    }
}
