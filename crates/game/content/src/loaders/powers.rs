//! Power catalog loader.

use std::path::Path;

use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};
use skirmish_core::PowerDefinition;
use tracing::debug;

use crate::catalog::PowerCatalog;
use crate::loaders::{LoadResult, read_file};

/// Power catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerFile {
    pub powers: Vec<PowerDefinition>,
}

/// Loader for power catalogs from RON files.
pub struct PowerLoader;

impl PowerLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<PowerDefinition>> {
        let content = read_file(path)?;
        let powers = Self::parse(&content)
            .with_context(|| format!("invalid power catalog {}", path.display()))?;
        debug!(path = %path.display(), count = powers.len(), "loaded power catalog");
        Ok(powers)
    }

    /// Parses a catalog, normalizing each template and rejecting blank or
    /// duplicate ids.
    pub fn parse(content: &str) -> LoadResult<Vec<PowerDefinition>> {
        let file: PowerFile = ron::from_str(content).context("failed to parse power catalog RON")?;
        let mut seen = std::collections::BTreeSet::new();
        let mut powers = Vec::with_capacity(file.powers.len());
        for mut power in file.powers {
            ensure!(!power.id.is_empty(), "power without an id");
            ensure!(seen.insert(power.id.clone()), "duplicate power id '{}'", power.id);
            power.template = power.template.normalize();
            power.targeting = power.targeting.normalize();
            power
                .template
                .validate()
                .with_context(|| format!("power '{}' has an invalid template", power.id))?;
            if power.name.is_empty() {
                power.name = power.id.clone();
            }
            powers.push(power);
        }
        Ok(powers)
    }

    /// Loads `path` into a catalog on top of `base`.
    pub fn load_into(base: PowerCatalog, path: &Path) -> LoadResult<PowerCatalog> {
        let mut catalog = base;
        catalog.extend(Self::load(path)?);
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::action::{ActionType, PowerType};
    use skirmish_core::env::PowerOracle;

    const CATALOG: &str = r#"(
        powers: [
            (
                id: "cleave",
                name: "Cleave",
                type: encounter,
                attack: Some((vs: Ac, ability: Str)),
                hit: Some((damage: Some((dice: [(n: 1, d: 10)], ability: Some(Str))))),
            ),
            (
                id: "inspiring-word",
                action: minor,
                template: (kind: single, origin: ranged, range: Some(5)),
                effect: Some((healing: Some((surge: true)))),
            ),
        ],
    )"#;

    #[test]
    fn parses_and_normalizes_definitions() {
        let powers = PowerLoader::parse(CATALOG).expect("parse");
        assert_eq!(powers.len(), 2);
        assert_eq!(powers[0].power_type, PowerType::Encounter);
        assert_eq!(powers[1].action, ActionType::Minor);
        assert_eq!(powers[1].name, "inspiring-word");
        assert_eq!(powers[1].template.requires_loe_to_origin, Some(true));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let duplicated = r#"(powers: [(id: "a"), (id: "a")])"#;
        let error = PowerLoader::parse(duplicated).expect_err("duplicate");
        assert!(error.to_string().contains("duplicate power id 'a'"));
    }

    #[test]
    fn file_powers_extend_the_builtin_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("powers.ron");
        std::fs::write(&path, CATALOG).expect("write");

        let catalog = PowerLoader::load_into(PowerCatalog::builtin(), &path).expect("load");
        assert_eq!(catalog.len(), 6);
        assert!(catalog.power("cleave").is_some());
        assert!(catalog.power("magic-missile").is_some());
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = PowerLoader::load(Path::new("/nonexistent/powers.ron")).expect_err("missing");
        assert!(format!("{error:#}").contains("/nonexistent/powers.ron"));
    }
}
