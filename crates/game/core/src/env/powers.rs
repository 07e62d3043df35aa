//! Power definition oracle.
//!
//! The content repository is built by the host and handed to the engine
//! through [`Env`](super::Env); the core keeps no global lookup tables.

use crate::action::PowerDefinition;

/// Read-only access to normalized power definitions.
pub trait PowerOracle: Send + Sync {
    fn power(&self, id: &str) -> Option<&PowerDefinition>;

    /// Ids of every known power, in a stable order.
    fn power_ids(&self) -> Vec<String>;
}
