use std::collections::BTreeSet;

use super::ActorId;

/// Initiative order and the pointer to the acting combatant.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnState {
    pub order: Vec<ActorId>,
    pub index: usize,
}

impl TurnState {
    pub fn new(order: Vec<ActorId>) -> Self {
        Self { order, index: 0 }
    }

    /// The combatant whose turn it is, if any.
    pub fn current(&self) -> Option<&ActorId> {
        self.order.get(self.index)
    }

    pub fn position_of(&self, actor: &ActorId) -> Option<usize> {
        self.order.iter().position(|id| id == actor)
    }
}

/// Action slots spent during a turn.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum ActionKind {
    Standard,
    Move,
    Minor,
    Free,
}

/// Per-turn action pool. Free actions are unbounded and never tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionPool {
    pub standard: u8,
    #[cfg_attr(feature = "serde", serde(rename = "move"))]
    pub move_: u8,
    pub minor: u8,
    pub immediate_used_this_round: bool,
}

impl ActionPool {
    pub const FULL: Self = Self {
        standard: 1,
        move_: 1,
        minor: 1,
        immediate_used_this_round: false,
    };

    pub const EMPTY: Self = Self {
        standard: 0,
        move_: 0,
        minor: 0,
        immediate_used_this_round: false,
    };

    pub const fn get(&self, kind: ActionKind) -> u8 {
        match kind {
            ActionKind::Standard => self.standard,
            ActionKind::Move => self.move_,
            ActionKind::Minor => self.minor,
            ActionKind::Free => u8::MAX,
        }
    }

    pub fn slot_mut(&mut self, kind: ActionKind) -> Option<&mut u8> {
        match kind {
            ActionKind::Standard => Some(&mut self.standard),
            ActionKind::Move => Some(&mut self.move_),
            ActionKind::Minor => Some(&mut self.minor),
            ActionKind::Free => None,
        }
    }
}

impl Default for ActionPool {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "kebab-case"))]
pub enum QueueKind {
    /// The actor postponed its turn and re-enters initiative later.
    Delay,
    /// The actor readied an action against a trigger.
    Ready { trigger: String },
}

/// FIFO entry drained at the start of turns.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueEntry {
    /// Unique within the encounter; used to dequeue.
    pub seq: u64,
    pub kind: QueueKind,
    pub actor: ActorId,
    /// Round and turn index in which the entry was enqueued.
    pub round: u32,
    pub turn_index: usize,
}

/// Per-actor usage tracking for rate-limited actions and limited powers.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsageFlags {
    pub opportunity_used_this_turn: bool,
    pub immediate_used_this_round: bool,
    pub ran_this_turn: bool,
    pub encounter_powers: BTreeSet<String>,
    pub daily_powers: BTreeSet<String>,
}

/// Which usage bucket a limited power draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "kebab-case")]
pub enum UsageFrequency {
    Encounter,
    Daily,
}

/// Rate-limit flags that can be set on an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UsageFlag {
    Opportunity,
    Immediate,
    Ran,
}

/// Boundary at which usage flags reset for every actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UsageScope {
    /// Opportunity attacks and the run marker.
    Turn,
    /// Immediate actions.
    Round,
}
