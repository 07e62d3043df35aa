//! Content loaders for reading rules and power data from files.
//!
//! Rules tunables are TOML; power catalogs are RON.

pub mod config;
pub mod factory;
pub mod powers;

pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use powers::{PowerFile, PowerLoader};

use std::path::Path;

use anyhow::Context;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
