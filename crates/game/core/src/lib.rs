//! Deterministic tactical combat rules.
//!
//! `skirmish-core` is a pure rules library for grid-based skirmishes: every
//! operation reads a [`State`] and proposes an ordered list of [`Patch`]es plus
//! human-readable log entries. Nothing here performs I/O, reads clocks or
//! keeps global state; dice come from a counter-based generator seeded on
//! the state, so the same initial state and command stream always replays to
//! the same result.
//!
//! All state mutation flows through [`engine::GameEngine`] (or directly
//! through [`engine::apply_patches`]), and supporting crates depend on the
//! types re-exported here.
pub mod action;
pub mod combat;
pub mod config;
pub mod effects;
pub mod engine;
pub mod env;
pub mod error;
pub mod healing;
pub mod state;
pub mod tactics;

pub use action::{
    ActionType, PowerDefinition, PowerError, PowerOptions, PowerType, execute_power,
    validate_power_use,
};
pub use combat::{
    AttackContext, AttackOptions, AttackSpec, DamageSpec, HitOutcome, apply_damage,
    resolve_attack, resolve_attack_multi,
};
pub use config::RulesConfig;
pub use engine::{
    ApplyReport, Command, CommandError, CommandResult, ExecutionOutcome, GameEngine, Proposal,
    TurnError, advance_turn, apply_patches, replay, set_initiative_order, spend_action,
};
pub use env::{DiceSpec, Env, OracleError, PowerOracle, roll, roll_d20};
pub use error::{ErrorSeverity, GameError};
pub use healing::{DeathSaveResult, HealOptions, death_save, second_wind, stabilize};
pub use state::{
    ActionKind, ActionPool, Actor, ActorId, Board, ConditionId, Duration, EffectId, LogEntry,
    LogKind, Patch, Position, State,
};
pub use tactics::{MoveError, MoveMode, MovePlan, TargetingError, TargetingErrors};
