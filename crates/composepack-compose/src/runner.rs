//! Invocation of the `docker compose` CLI

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use composepack_core::CancelToken;
use tracing::debug;

use crate::error::{ComposeError, Result};

/// Preferred compose invocation, the plugin form bundled with modern Docker
const DEFAULT_COMMAND: &[&str] = &["docker", "compose"];

/// Legacy standalone binary, tried when the plugin form is absent
const LEGACY_COMMAND: &[&str] = &["docker-compose"];

/// Options for merging fragments through `docker compose config`
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Directory the command runs in
    pub working_dir: PathBuf,
    /// Fragment files passed as repeated -f flags, in order
    pub fragment_paths: Vec<PathBuf>,
    /// Compose project name, exported as COMPOSE_PROJECT_NAME
    pub project_name: String,
}

/// Options for pass-through compose commands (up, down, logs, ps)
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Runtime directory holding docker-compose.yaml
    pub working_dir: PathBuf,
    /// Arguments appended after the compose command itself
    pub args: Vec<String>,
}

/// Wraps exec invocations to `docker compose` / `docker-compose`
///
/// The command vectors are injectable so tests can substitute stub scripts
/// and exercise the full pipeline without Docker installed.
pub struct ComposeRunner {
    primary: Vec<String>,
    fallback: Option<Vec<String>>,
}

impl Default for ComposeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeRunner {
    pub fn new() -> Self {
        Self {
            primary: DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect(),
            fallback: Some(LEGACY_COMMAND.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Replace the compose command vectors
    pub fn with_commands(primary: Vec<String>, fallback: Option<Vec<String>>) -> Self {
        Self { primary, fallback }
    }

    /// Merge compose fragments via `docker compose config`, returning the
    /// canonical merged YAML
    pub fn merge_config(&self, opts: &MergeOptions, cancel: &CancelToken) -> Result<Vec<u8>> {
        cancel.check()?;
        if opts.fragment_paths.is_empty() {
            return Err(ComposeError::NoFragments);
        }

        let mut args = Vec::with_capacity(opts.fragment_paths.len() * 2 + 1);
        for path in &opts.fragment_paths {
            args.push("-f".to_string());
            args.push(path.display().to_string());
        }
        args.push("config".to_string());

        let mut env = BTreeMap::new();
        env.insert("COMPOSE_PROJECT_NAME".to_string(), opts.project_name.clone());

        let output = self.invoke(&opts.working_dir, &args, &env)?;
        if !output.status.success() {
            return Err(ComposeError::command_failed(
                "docker compose config",
                output.status,
                &output.stderr,
            ));
        }

        Ok(output.stdout)
    }

    /// Execute a compose command in the runtime directory, inheriting the
    /// caller's stdio so `logs -f` and friends stream naturally
    pub fn run(&self, opts: &RunOptions, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        self.validate_run_opts(opts)?;

        let status = self.spawn_inherited(&opts.working_dir, &opts.args)?;
        if !status.success() {
            return Err(ComposeError::command_failed(
                "docker compose",
                status,
                &[],
            ));
        }
        Ok(())
    }

    /// Execute a compose command and capture stdout
    pub fn run_with_output(&self, opts: &RunOptions, cancel: &CancelToken) -> Result<Vec<u8>> {
        cancel.check()?;
        self.validate_run_opts(opts)?;

        let output = self.invoke(&opts.working_dir, &opts.args, &BTreeMap::new())?;
        if !output.status.success() {
            return Err(ComposeError::command_failed(
                "docker compose",
                output.status,
                &output.stderr,
            ));
        }
        Ok(output.stdout)
    }

    fn validate_run_opts(&self, opts: &RunOptions) -> Result<()> {
        if opts.working_dir.as_os_str().is_empty() {
            return Err(ComposeError::InvalidInvocation(
                "working directory is required".to_string(),
            ));
        }
        if opts.args.is_empty() {
            return Err(ComposeError::InvalidInvocation(
                "docker compose arguments are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Run the primary command, retrying with the fallback when the binary
    /// itself is missing
    fn invoke(
        &self,
        dir: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Output> {
        match self.capture(&self.primary, dir, args, env) {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let Some(fallback) = &self.fallback else {
                    return Err(ComposeError::Spawn {
                        command: self.primary.join(" "),
                        source: e,
                    });
                };
                debug!(command = %fallback.join(" "), "primary compose binary not found, trying fallback");
                self.capture(fallback, dir, args, env)
                    .map_err(|e| ComposeError::Spawn {
                        command: fallback.join(" "),
                        source: e,
                    })
            }
            Err(e) => Err(ComposeError::Spawn {
                command: self.primary.join(" "),
                source: e,
            }),
        }
    }

    fn capture(
        &self,
        command: &[String],
        dir: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> std::io::Result<Output> {
        debug!(command = %command.join(" "), args = ?args, "running compose command");
        let mut cmd = Command::new(&command[0]);
        cmd.args(&command[1..]).args(args).current_dir(dir);
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.output()
    }

    fn spawn_inherited(&self, dir: &Path, args: &[String]) -> Result<std::process::ExitStatus> {
        let run = |command: &[String]| -> std::io::Result<std::process::ExitStatus> {
            debug!(command = %command.join(" "), args = ?args, "running compose command");
            Command::new(&command[0])
                .args(&command[1..])
                .args(args)
                .current_dir(dir)
                .status()
        };

        match run(&self.primary) {
            Ok(status) => Ok(status),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let Some(fallback) = &self.fallback else {
                    return Err(ComposeError::Spawn {
                        command: self.primary.join(" "),
                        source: e,
                    });
                };
                run(fallback).map_err(|e| ComposeError::Spawn {
                    command: fallback.join(" "),
                    source: e,
                })
            }
            Err(e) => Err(ComposeError::Spawn {
                command: self.primary.join(" "),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn stub_script(dir: &Path, name: &str, body: &str) -> Vec<String> {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        vec![path.display().to_string()]
    }

    #[test]
    fn test_merge_requires_fragments() {
        let runner = ComposeRunner::new();
        let opts = MergeOptions {
            working_dir: PathBuf::from("."),
            fragment_paths: vec![],
            project_name: "test".to_string(),
        };
        let err = runner.merge_config(&opts, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ComposeError::NoFragments));
    }

    #[test]
    fn test_run_requires_args() {
        let runner = ComposeRunner::new();
        let opts = RunOptions {
            working_dir: PathBuf::from("."),
            args: vec![],
        };
        let err = runner.run(&opts, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidInvocation(_)));
    }

    #[test]
    fn test_stub_merge_outputs_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let command = stub_script(dir.path(), "fake-compose", "echo \"services: {}\"");
        let runner = ComposeRunner::with_commands(command, None);

        let fragment = dir.path().join("a.yaml");
        fs::write(&fragment, "services: {}\n").unwrap();

        let out = runner
            .merge_config(
                &MergeOptions {
                    working_dir: dir.path().to_path_buf(),
                    fragment_paths: vec![fragment],
                    project_name: "test".to_string(),
                },
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "services: {}");
    }

    #[test]
    fn test_stub_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let command = stub_script(dir.path(), "fake-compose", "echo \"bad config\" >&2; exit 1");
        let runner = ComposeRunner::with_commands(command, None);

        let fragment = dir.path().join("a.yaml");
        fs::write(&fragment, "services: {}\n").unwrap();

        let err = runner
            .merge_config(
                &MergeOptions {
                    working_dir: dir.path().to_path_buf(),
                    fragment_paths: vec![fragment],
                    project_name: "test".to_string(),
                },
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_fallback_on_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = stub_script(dir.path(), "fake-legacy", "echo legacy");
        let runner = ComposeRunner::with_commands(
            vec!["/nonexistent/compose-binary".to_string()],
            Some(fallback),
        );

        let out = runner
            .run_with_output(
                &RunOptions {
                    working_dir: dir.path().to_path_buf(),
                    args: vec!["ps".to_string()],
                },
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "legacy");
    }

    #[test]
    fn test_cancelled_before_spawn() {
        let runner = ComposeRunner::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = runner
            .run(
                &RunOptions {
                    working_dir: PathBuf::from("."),
                    args: vec!["ps".to_string()],
                },
                &cancel,
            )
            .unwrap_err();
        assert!(matches!(err, ComposeError::Core(_)));
    }
}
