//! Engine error types

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("template error in {}", .0.template_path)]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Template-specific error with source information
#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(composepack::template::render))]
pub struct TemplateError {
    /// Error message
    pub message: String,

    /// Path of the template that failed
    pub template_path: String,

    /// Template source code
    #[source_code]
    pub src: NamedSource<String>,

    /// Error location in source
    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// Hint for fixing the error
    #[help]
    pub help: Option<String>,
}

impl TemplateError {
    /// Build a template error from a MiniJinja error, pointing at the
    /// offending template path and line
    pub fn from_minijinja(err: minijinja::Error, path: &str, source: &str) -> Self {
        let span = err.line().and_then(|line| line_span(source, line));
        let help = err.detail().map(|d| d.to_string());

        Self {
            message: format!("{}: {}", err.kind(), err),
            template_path: path.to_string(),
            src: NamedSource::new(path, source.to_string()),
            span,
            help,
        }
    }

    /// Error without an attributable source location
    pub fn simple(path: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            template_path: path.to_string(),
            src: NamedSource::new(path, String::new()),
            span: None,
            help: None,
        }
    }
}

/// Byte span covering a 1-based line of the source
fn line_span(source: &str, line: usize) -> Option<SourceSpan> {
    let mut offset = 0usize;
    for (idx, text) in source.lines().enumerate() {
        if idx + 1 == line {
            return Some(SourceSpan::new(offset.into(), text.len()));
        }
        offset += text.len() + 1;
    }
    None
}

pub type Result<T> = std::result::Result<T, EngineError>;
