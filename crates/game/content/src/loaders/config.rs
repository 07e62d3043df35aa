//! Rules configuration loader.

use std::path::Path;

use anyhow::Context;
use skirmish_core::RulesConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for rules tunables from TOML files.
///
/// Missing keys keep their defaults, so a file only needs the values it
/// overrides.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<RulesConfig> {
        let content = read_file(path)?;
        Self::parse(&content).with_context(|| format!("invalid rules config {}", path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<RulesConfig> {
        let config: RulesConfig =
            toml::from_str(content).context("failed to parse rules config TOML")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ConfigLoader::parse("save_target = 11\nstabilize_dc = 12\n").expect("parse");
        assert_eq!(config.save_target, 11);
        assert_eq!(config.stabilize_dc, 12);
        assert_eq!(config.death_failures_to_die, RulesConfig::default().death_failures_to_die);
    }

    #[test]
    fn wrong_types_are_reported() {
        let error = ConfigLoader::parse("save_target = \"ten\"").expect_err("bad type");
        assert!(format!("{error:#}").contains("rules config"));
    }
}
