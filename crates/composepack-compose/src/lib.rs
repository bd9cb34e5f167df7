//! Docker Compose integration for Composepack
//!
//! This crate owns everything that happens after templates are rendered:
//! merging compose fragments through `docker compose config`, writing the
//! runtime directory a release runs from, and diffing a proposed render
//! against what is currently on disk.

pub mod diff;
pub mod error;
pub mod merge;
pub mod runner;
pub mod runtime;

pub use diff::{ChangeType, DiffEngine, DiffLine, DiffReport, FileChange, ServiceChange};
pub use error::{ComposeError, Result};
pub use merge::merge_fragments;
pub use runner::{ComposeRunner, MergeOptions, RunOptions};
pub use runtime::{RuntimeWriter, WriteOptions, load_current_files};
