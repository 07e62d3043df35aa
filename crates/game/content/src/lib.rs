//! Data-driven content for the skirmish rules core.
//!
//! This crate provides the power catalog handed to the engine as a
//! [`PowerOracle`](skirmish_core::PowerOracle) and loaders for RON/TOML
//! data files:
//! - Power definitions (RON)
//! - Rules tunables (TOML)
//!
//! Content is consumed through the engine environment and never appears in
//! game state.

pub mod catalog;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use catalog::PowerCatalog;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, PowerFile, PowerLoader};
