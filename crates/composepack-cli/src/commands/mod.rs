//! CLI command implementations

pub mod apply;
pub mod compose;
pub mod diff;
pub mod init;
pub mod install;
pub mod package;
pub mod template;
