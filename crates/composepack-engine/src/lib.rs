//! Composepack Engine - Jinja2 templating for compose charts
//!
//! A MiniJinja-based renderer that turns a chart's compose, file, and helper
//! templates into compose fragments and file assets:
//! - Helper snippets are pre-registered so every template can include them
//! - Compose-oriented filters (toyaml, quote, b64encode, ...)
//! - Template errors carry the offending template's path and source span

pub mod engine;
pub mod env_object;
pub mod error;
pub mod files_object;
pub mod filters;
pub mod functions;

pub use engine::Engine;
pub use error::{EngineError, Result, TemplateError};
