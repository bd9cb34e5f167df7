//! Composepack Core - Core types and utilities for the Docker Compose package manager
//!
//! This crate provides the foundational types used throughout Composepack:
//! - `Chart`: The loaded package (templates, default values, static assets)
//! - `Values`: Configuration values with deep merge support
//! - `ReleaseMetadata`/`Store`: Durable record of a rendered release
//! - `RenderContext`: Template rendering context
//! - Chart source resolution (directory, archive, URL) and `.cpack.tgz` packaging

pub mod archive;
pub mod cancel;
pub mod chart;
pub mod context;
pub mod error;
pub mod loader;
pub mod release;
pub mod schema;
pub mod source;
pub mod values;

pub use archive::{PackageOptions, package_chart};
pub use cancel::CancelToken;
pub use chart::{Chart, ChartMetadata};
pub use context::{ReleaseInfo, RenderContext, StaticFiles};
pub use error::{CoreError, Result};
pub use loader::FsChartLoader;
pub use release::{ReleaseMetadata, Store};
pub use source::{ChartSource, CompositeLoader};
pub use values::{Values, build_values, parse_set_values};
