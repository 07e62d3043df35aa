//! Typed mutation commands.
//!
//! A [`Patch`] is the only way any subsystem changes [`State`](super::State).
//! Subsystems read the state, return `Vec<Patch>`, and the engine's reducer
//! applies them in order. Each variant belongs to one wire category
//! ([`PatchOp`]) so an audit trail can still be rendered in set/inc/merge/add/
//! remove/log terms.

use crate::tactics::StagedTargeting;

use super::log::LogRecord;
use super::types::{
    ActionKind, ActionPool, ActorId, DeathState, EffectId, EffectInstance, EffectMeta,
    FlagsUpdate, Position, QueueEntry, ReactiveEvent, UsageFlag, UsageFrequency, UsageScope,
};

/// Wire category of a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[strum(serialize_all = "lowercase")]
pub enum PatchOp {
    Set,
    Inc,
    Merge,
    Add,
    Remove,
    Log,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "kebab-case"))]
pub enum Patch {
    SetRound {
        round: u32,
    },
    SetTurnOrder {
        order: Vec<ActorId>,
    },
    SetTurnIndex {
        index: usize,
    },
    SetActions {
        pool: ActionPool,
    },
    /// Adds `delta` to one slot of the action pool, saturating at zero.
    AdjustAction {
        kind: ActionKind,
        delta: i8,
    },
    SetImmediateUsed {
        used: bool,
    },
    SetHp {
        actor: ActorId,
        current: i32,
    },
    SetTempHp {
        actor: ActorId,
        temp: i32,
    },
    AdjustSurges {
        actor: ActorId,
        delta: i32,
    },
    MergeFlags {
        actor: ActorId,
        update: FlagsUpdate,
    },
    SetDeath {
        actor: ActorId,
        death: DeathState,
    },
    SetPosition {
        actor: ActorId,
        to: Position,
    },
    AddEffect {
        effect: Box<EffectInstance>,
    },
    RemoveEffect {
        id: EffectId,
    },
    SetEffectMeta {
        id: EffectId,
        meta: EffectMeta,
    },
    AttachCondition {
        actor: ActorId,
        effect: EffectId,
    },
    DetachCondition {
        actor: ActorId,
        effect: EffectId,
    },
    Enqueue {
        entry: QueueEntry,
    },
    Dequeue {
        seq: u64,
    },
    SetUsage {
        actor: ActorId,
        flag: UsageFlag,
        value: bool,
    },
    MarkPowerUsed {
        actor: ActorId,
        power: String,
        frequency: UsageFrequency,
    },
    ResetUsage {
        scope: UsageScope,
    },
    OpenReaction {
        event: ReactiveEvent,
    },
    CloseReaction {
        id: u64,
    },
    SetStaging {
        staging: Option<Box<StagedTargeting>>,
    },
    SetRngCursor {
        cursor: u64,
    },
    Log {
        record: LogRecord,
    },
}

impl Patch {
    pub fn log(record: LogRecord) -> Self {
        Self::Log { record }
    }

    pub fn add_effect(effect: EffectInstance) -> Self {
        Self::AddEffect {
            effect: Box::new(effect),
        }
    }

    pub const fn op(&self) -> PatchOp {
        match self {
            Self::SetRound { .. }
            | Self::SetTurnOrder { .. }
            | Self::SetTurnIndex { .. }
            | Self::SetActions { .. }
            | Self::SetImmediateUsed { .. }
            | Self::SetHp { .. }
            | Self::SetTempHp { .. }
            | Self::SetDeath { .. }
            | Self::SetPosition { .. }
            | Self::SetEffectMeta { .. }
            | Self::SetUsage { .. }
            | Self::ResetUsage { .. }
            | Self::SetStaging { .. }
            | Self::SetRngCursor { .. } => PatchOp::Set,
            Self::AdjustAction { .. } | Self::AdjustSurges { .. } => PatchOp::Inc,
            Self::MergeFlags { .. } | Self::MarkPowerUsed { .. } => PatchOp::Merge,
            Self::AddEffect { .. }
            | Self::AttachCondition { .. }
            | Self::Enqueue { .. }
            | Self::OpenReaction { .. } => PatchOp::Add,
            Self::RemoveEffect { .. }
            | Self::DetachCondition { .. }
            | Self::Dequeue { .. }
            | Self::CloseReaction { .. } => PatchOp::Remove,
            Self::Log { .. } => PatchOp::Log,
        }
    }

    /// Log record carried by this patch, if any.
    pub fn as_log(&self) -> Option<&LogRecord> {
        match self {
            Self::Log { record } => Some(record),
            _ => None,
        }
    }
}
