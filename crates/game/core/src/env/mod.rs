//! Read-only collaborators and deterministic dice.
//!
//! Oracles expose content the rules consume but never own. The [`Env`]
//! aggregate bundles them so the engine can reach everything it needs without
//! hard coupling to concrete implementations.
mod error;
mod powers;
mod rng;

pub use error::OracleError;
pub use powers::PowerOracle;
pub use rng::{DiceSpec, DiceTerm, PcgRng, Roll, roll, roll_d20};

use crate::action::PowerDefinition;

/// Aggregates read-only oracles required by the engine.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    powers: Option<&'a dyn PowerOracle>,
}

impl<'a> Env<'a> {
    pub fn new(powers: Option<&'a dyn PowerOracle>) -> Self {
        Self { powers }
    }

    pub fn with_powers(powers: &'a dyn PowerOracle) -> Self {
        Self::new(Some(powers))
    }

    pub fn empty() -> Self {
        Self { powers: None }
    }

    /// Returns the PowerOracle, or an error if not available.
    pub fn powers(&self) -> Result<&'a dyn PowerOracle, OracleError> {
        self.powers.ok_or(OracleError::PowersNotAvailable)
    }

    /// Looks up a power definition by id.
    pub fn power(&self, id: &str) -> Result<&'a PowerDefinition, OracleError> {
        self.powers()?
            .power(id)
            .ok_or_else(|| OracleError::PowerNotFound(id.to_owned()))
    }
}

impl std::fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("powers", &self.powers.map(|p| p.power_ids()))
            .finish()
    }
}
