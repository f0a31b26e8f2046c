//! Tooling & Integration Layer
//!
//! CLI commands for listing, inspecting, validating, and authoring skills,
//! plus the text formatters they share.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
