//! Powers: declarative definitions and their execution.
//!
//! This module contains:
//! - [`power`]: power definitions, attack lines and outcome payloads
//! - [`resolve`]: usability checks and the power orchestrator
//! - [`error`]: why a power cannot be used
pub mod error;
pub mod power;
pub mod resolve;

pub use error::PowerError;
pub use power::{
    ActionType, ConditionGrant, ForcedGrant, HealGrant, PowerAttack, PowerDefinition,
    PowerOutcome, PowerType,
};
pub use resolve::{PowerOptions, execute_power, validate_power_use};
