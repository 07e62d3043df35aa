//! Content factory for building catalogs from data files.

use std::path::{Path, PathBuf};

use skirmish_core::RulesConfig;
use tracing::info;

use crate::catalog::PowerCatalog;
use crate::loaders::{ConfigLoader, LoadResult, PowerLoader};

/// Content factory that loads game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── rules.toml
/// └── powers.ron
/// ```
///
/// Both files are optional: a missing `rules.toml` yields the default rules
/// and a missing `powers.ron` yields the builtin catalog.
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load rules tunables from `rules.toml`.
    pub fn load_rules(&self) -> LoadResult<RulesConfig> {
        let path = self.data_dir.join("rules.toml");
        if !path.exists() {
            info!(path = %path.display(), "no rules file, using defaults");
            return Ok(RulesConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load `powers.ron` on top of the builtin catalog.
    pub fn load_powers(&self) -> LoadResult<PowerCatalog> {
        let path = self.data_dir.join("powers.ron");
        if !path.exists() {
            info!(path = %path.display(), "no power file, using builtin catalog");
            return Ok(PowerCatalog::builtin());
        }
        PowerLoader::load_into(PowerCatalog::builtin(), &path)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
