//! Append-only combat log.
//!
//! Every subsystem narrates what it did through [`Patch::Log`](super::Patch)
//! records. The reducer stamps each record with the next `ts` value when it is
//! appended, so log order is total and replayable.

use crate::combat::{BonusPart, HitOutcome, HitReason};
use crate::env::DiceSpec;
use crate::healing::DeathSaveResult;
use crate::tactics::{ForcedKind, MoveMode, MoveWarning, TargetingError};

use super::types::{
    ActionKind, ActorId, ConditionId, Defense, Duration, EffectId, HitPoints, Position,
    ReactiveKind,
};

/// Log entry category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum LogKind {
    Roll,
    AttackPreview,
    AttackRoll,
    AttackResult,
    DamageRoll,
    DamageApply,
    BloodiedEnter,
    BloodiedExit,
    #[cfg_attr(feature = "serde", serde(rename = "drop-to-0"))]
    #[strum(serialize = "drop-to-0")]
    DropToZero,
    Die,
    SurgeSpend,
    HealApply,
    TempApply,
    Revive,
    SecondWind,
    DeathSave,
    Stabilize,
    ConditionAdd,
    ConditionRemove,
    EffectExpire,
    EffectSustain,
    OngoingApply,
    SaveRoll,
    SaveSuccess,
    SaveFail,
    MovePreview,
    MoveCommit,
    ForcedMove,
    TargetPreview,
    TemplateChoose,
    TurnBegin,
    TurnEnd,
    RoundBegin,
    ActionSpend,
    ActionUnavailable,
    Delay,
    Ready,
    DelayResolve,
    ReadyResolve,
    PowerUse,
    PowerError,
    OaOpen,
    OaResolve,
    IntOpen,
    IntResolve,
    ReactOpen,
    ReactResolve,
    Info,
}

/// Cursor position a roll was drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RngStamp {
    pub seed: u64,
    pub idx: u64,
}

/// Structured payload of a log entry.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LogData {
    #[default]
    None,
    Roll {
        spec: DiceSpec,
        result: i32,
        parts: Vec<i32>,
        rng: RngStamp,
    },
    AttackRoll {
        attacker: ActorId,
        defender: ActorId,
        d20: i32,
        forced: bool,
        bonus: Vec<BonusPart>,
        total: i32,
        vs: Defense,
        defense: i32,
    },
    AttackResult {
        attacker: ActorId,
        defender: ActorId,
        outcome: HitOutcome,
        reason: HitReason,
    },
    AttackPreview {
        attacker: ActorId,
        defender: ActorId,
        bonus: Vec<BonusPart>,
        total: i32,
        vs: Defense,
        defense: i32,
    },
    DamageRoll {
        attacker: ActorId,
        defender: ActorId,
        crit: bool,
        parts: Vec<BonusPart>,
        total: i32,
    },
    DamageApply {
        actor: ActorId,
        amount: i32,
        adjusted: i32,
        absorbed: i32,
        hp: HitPoints,
    },
    Hp {
        actor: ActorId,
        hp: HitPoints,
    },
    Heal {
        actor: ActorId,
        amount: i32,
        hp: HitPoints,
    },
    Surge {
        actor: ActorId,
        amount: i32,
        remaining: u32,
    },
    SecondWind {
        actor: ActorId,
        healed: Option<i32>,
    },
    DeathSave {
        actor: ActorId,
        d20: i32,
        result: DeathSaveResult,
        failures: u8,
    },
    Stabilize {
        target: ActorId,
        healer: ActorId,
        dc: i32,
        d20: i32,
        success: bool,
    },
    Effect {
        instance: EffectId,
        condition: ConditionId,
        source: ActorId,
        target: ActorId,
        duration: Duration,
    },
    Save {
        instance: EffectId,
        target: ActorId,
        d20: i32,
        success: bool,
    },
    Move {
        actor: ActorId,
        mode: MoveMode,
        from: Position,
        to: Position,
        path: Vec<Position>,
        cost: u32,
        warnings: Vec<MoveWarning>,
    },
    ForcedMove {
        kind: ForcedKind,
        source: ActorId,
        target: ActorId,
        from: Position,
        to: Position,
        path: Vec<Position>,
    },
    Targeting {
        actor: ActorId,
        cells: Vec<Position>,
        targets: Vec<ActorId>,
        errors: Vec<TargetingError>,
    },
    Turn {
        actor: Option<ActorId>,
        round: u32,
    },
    Queue {
        actor: ActorId,
        trigger: Option<String>,
    },
    Action {
        actor: Option<ActorId>,
        kind: ActionKind,
        paid_with: Option<ActionKind>,
    },
    Power {
        actor: ActorId,
        power: String,
        targets: Vec<ActorId>,
    },
    PowerError {
        actor: ActorId,
        power: String,
        reason: String,
    },
    Reactive {
        event: u64,
        kind: ReactiveKind,
        actor: Option<ActorId>,
        eligible: Vec<ActorId>,
    },
}

/// A log record before the reducer stamps it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogRecord {
    pub kind: LogKind,
    pub msg: String,
    pub data: LogData,
}

impl LogRecord {
    pub fn new(kind: LogKind, msg: impl Into<String>, data: LogData) -> Self {
        Self {
            kind,
            msg: msg.into(),
            data,
        }
    }

    pub fn message(kind: LogKind, msg: impl Into<String>) -> Self {
        Self::new(kind, msg, LogData::None)
    }
}

/// A stamped entry in `State::log`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub ts: u64,
    pub kind: LogKind,
    pub msg: String,
    pub data: LogData,
}

impl LogEntry {
    pub fn stamp(ts: u64, record: LogRecord) -> Self {
        Self {
            ts,
            kind: record.kind,
            msg: record.msg,
            data: record.data,
        }
    }
}
