//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("chart source not found: {path}")]
    NotFound { path: String },

    #[error("invalid chart: {message}")]
    InvalidChart { message: String },

    #[error("download failed for {url}: {message}")]
    Network { url: String, message: String },

    #[error("values error: {message}")]
    Values { message: String },

    #[error("values do not match schema: {detail}")]
    SchemaValidation { detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    pub fn invalid_chart(message: impl Into<String>) -> Self {
        Self::InvalidChart {
            message: message.into(),
        }
    }

    pub fn values(message: impl Into<String>) -> Self {
        Self::Values {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
