//! Compose integration errors

use composepack_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    /// A compose invocation exited with a failure status
    #[error("{action} failed: {message}")]
    CommandFailed { action: String, message: String },

    /// Neither the primary nor the fallback compose binary could be spawned
    #[error("cannot execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A chart must render at least one compose fragment
    #[error("at least one compose fragment is required")]
    NoFragments,

    #[error("invalid compose invocation: {0}")]
    InvalidInvocation(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComposeError {
    /// Build a CommandFailed error from captured stderr, falling back to the
    /// exit status when stderr is empty
    pub fn command_failed(action: &str, status: std::process::ExitStatus, stderr: &[u8]) -> Self {
        let message = String::from_utf8_lossy(stderr).trim().to_string();
        let message = if message.is_empty() {
            format!("exit status {}", status.code().map_or("unknown".to_string(), |c| c.to_string()))
        } else {
            message
        };
        Self::CommandFailed {
            action: action.to_string(),
            message,
        }
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;
