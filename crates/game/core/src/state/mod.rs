//! Authoritative encounter state.
//!
//! This module owns the data structures describing combatants, the board,
//! live effects, turn bookkeeping and the combat log. Every subsystem receives
//! [`State`] by shared reference and proposes [`Patch`]es; only the engine's
//! reducer mutates it.
pub mod log;
pub mod patch;
pub mod types;

use std::collections::BTreeMap;

use crate::config::RulesConfig;
use crate::tactics::StagedTargeting;

pub use log::{LogData, LogEntry, LogKind, LogRecord, RngStamp};
pub use patch::{Patch, PatchOp};
pub use types::{
    Ability, AbilityMods, ActionKind, ActionPool, Actor, ActorFlags, ActorId, AppliedAt, Board,
    ConditionId, DamageType, DeathState, Defense, Defenses, Duration, EffectData, EffectId,
    EffectInstance, EffectMeta, FlagsUpdate, HitPoints, ParsePositionError, Position, QueueEntry,
    QueueKind, ReactiveEvent, ReactiveKind, ReactiveStatus, ReactiveTrigger, Surges, TurnState,
    UsageFlag, UsageFlags, UsageFrequency, UsageScope,
};

/// Seed and draw counter of the counter-based RNG.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RngState {
    pub seed: u64,
    pub cursor: u64,
}

/// Canonical snapshot of one encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct State {
    /// Current round, starting at 1. Never decreases.
    pub round: u32,
    pub turn: TurnState,
    /// Action pool of the acting combatant.
    pub actions: ActionPool,
    pub actors: BTreeMap<ActorId, Actor>,
    pub board: Board,
    pub effects: BTreeMap<EffectId, EffectInstance>,
    /// Delay/ready entries, oldest first.
    pub queue: Vec<QueueEntry>,
    pub usage: BTreeMap<ActorId, UsageFlags>,
    pub reactions: Vec<ReactiveEvent>,
    /// Targeting selection staged by the acting player.
    pub staging: Option<Box<StagedTargeting>>,
    pub log: Vec<LogEntry>,
    pub rng: RngState,
    /// Monotonic counter stamped on log entries and used to mint ids.
    pub ts: u64,
    pub rules: RulesConfig,
}

impl State {
    /// Creates an empty encounter on `board` with the given RNG seed.
    pub fn new(seed: u64, board: Board) -> Self {
        Self {
            round: 1,
            turn: TurnState::default(),
            actions: ActionPool::FULL,
            actors: BTreeMap::new(),
            board,
            effects: BTreeMap::new(),
            queue: Vec::new(),
            usage: BTreeMap::new(),
            reactions: Vec::new(),
            staging: None,
            log: Vec::new(),
            rng: RngState { seed, cursor: 0 },
            ts: 0,
            rules: RulesConfig::default(),
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: RulesConfig) -> Self {
        self.rules = rules;
        self
    }

    /// Adds an actor standing on `at`.
    #[must_use]
    pub fn with_actor(mut self, actor: Actor, at: Position) -> Self {
        self.board.positions.insert(actor.id.clone(), at);
        self.usage.entry(actor.id.clone()).or_default();
        self.actors.insert(actor.id.clone(), actor);
        self
    }

    /// Sets the initiative order directly, without running turn hooks.
    #[must_use]
    pub fn with_turn_order(mut self, order: Vec<ActorId>) -> Self {
        self.turn = TurnState::new(order);
        self
    }

    /// Copy of everything except the log, which starts empty. `ts` is kept so
    /// records appended to the copy are stamped as they would be here.
    pub(crate) fn clone_without_log(&self) -> Self {
        Self {
            round: self.round,
            turn: self.turn.clone(),
            actions: self.actions,
            actors: self.actors.clone(),
            board: self.board.clone(),
            effects: self.effects.clone(),
            queue: self.queue.clone(),
            usage: self.usage.clone(),
            reactions: self.reactions.clone(),
            staging: self.staging.clone(),
            log: Vec::new(),
            rng: self.rng,
            ts: self.ts,
            rules: self.rules.clone(),
        }
    }

    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn current_actor(&self) -> Option<&ActorId> {
        self.turn.current()
    }

    pub fn position_of(&self, id: &ActorId) -> Option<Position> {
        self.board.position_of(id)
    }

    pub fn usage_of(&self, id: &ActorId) -> Option<&UsageFlags> {
        self.usage.get(id)
    }

    pub fn effect(&self, id: &EffectId) -> Option<&EffectInstance> {
        self.effects.get(id)
    }

    /// Live effects targeting `actor`, in id order.
    pub fn effects_on<'a>(
        &'a self,
        actor: &'a ActorId,
    ) -> impl Iterator<Item = &'a EffectInstance> + 'a {
        self.effects.values().filter(move |e| &e.target == actor)
    }

    /// Both exist and are on different teams. Unknown actors are never enemies.
    pub fn are_enemies(&self, a: &ActorId, b: &ActorId) -> bool {
        match (self.actors.get(a), self.actors.get(b)) {
            (Some(a), Some(b)) => a.is_enemy_of(b),
            _ => false,
        }
    }

    pub fn are_allies(&self, a: &ActorId, b: &ActorId) -> bool {
        match (self.actors.get(a), self.actors.get(b)) {
            (Some(a), Some(b)) => !a.is_enemy_of(b),
            _ => false,
        }
    }

    pub fn open_reaction(&self, id: u64) -> Option<&ReactiveEvent> {
        self.reactions.iter().find(|e| e.id == id && e.is_open())
    }

    /// Next reactive-window id. Windows are closed, never removed.
    pub fn next_reaction_id(&self) -> u64 {
        self.reactions.len() as u64 + 1
    }

    /// Sequence number for a new queue entry.
    pub fn next_queue_seq(&self) -> u64 {
        self.ts + 1
    }

    /// Last `n` log entries, oldest first.
    pub fn recent_log(&self, n: usize) -> &[LogEntry] {
        let start = self.log.len().saturating_sub(n);
        &self.log[start..]
    }

    /// SHA-256 over the canonical bincode encoding.
    ///
    /// Two states replayed from the same initial state and patch stream have
    /// identical digests.
    #[cfg(feature = "serde")]
    pub fn digest(&self) -> Result<[u8; 32], bincode::Error> {
        use sha2::{Digest, Sha256};

        let bytes = bincode::serialize(self)?;
        Ok(Sha256::digest(&bytes).into())
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(0, Board::new(20, 15))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_in_round_one_with_full_pool() {
        let state = State::new(42, Board::new(10, 10));
        assert_eq!(state.round, 1);
        assert_eq!(state.actions, ActionPool::FULL);
        assert_eq!(state.rng, RngState { seed: 42, cursor: 0 });
        assert!(state.current_actor().is_none());
    }

    #[test]
    fn enemies_require_known_actors_on_different_teams() {
        let state = State::default()
            .with_actor(Actor::new("A1", "heroes", 20), Position::new(0, 0))
            .with_actor(Actor::new("A2", "heroes", 20), Position::new(1, 0))
            .with_actor(Actor::new("E1", "monsters", 20), Position::new(2, 0));

        assert!(state.are_enemies(&"A1".into(), &"E1".into()));
        assert!(!state.are_enemies(&"A1".into(), &"A2".into()));
        assert!(state.are_allies(&"A1".into(), &"A2".into()));
        assert!(!state.are_enemies(&"A1".into(), &"ghost".into()));
    }
}
