pub mod actor;
pub mod board;
pub mod common;
pub mod effect;
pub mod reactive;
pub mod turn;

pub use actor::{
    AbilityMods, Actor, ActorFlags, DeathState, Defenses, FlagsUpdate, HitPoints, Surges,
};
pub use board::Board;
pub use common::{Ability, ActorId, DamageType, Defense, EffectId, ParsePositionError, Position};
pub use effect::{AppliedAt, ConditionId, Duration, EffectData, EffectInstance, EffectMeta};
pub use reactive::{ReactiveEvent, ReactiveKind, ReactiveStatus, ReactiveTrigger};
pub use turn::{
    ActionKind, ActionPool, QueueEntry, QueueKind, TurnState, UsageFlag, UsageFlags,
    UsageFrequency, UsageScope,
};
