//! The only writer of [`State`].
//!
//! Patches are applied one at a time in list order. A patch that refers to
//! something that no longer exists is skipped with a warning; it never
//! panics and never leaves the state half-updated.

use tracing::warn;

use crate::error::{ErrorSeverity, GameError};
use crate::state::{
    Actor, ActorId, EffectId, LogEntry, Patch, ReactiveStatus, State, UsageFlag, UsageFrequency,
    UsageScope,
};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    #[error("unknown effect {0}")]
    UnknownEffect(EffectId),

    #[error("unknown queue entry {0}")]
    UnknownQueueEntry(u64),

    #[error("unknown reactive event {0}")]
    UnknownReaction(u64),

    #[error("turn index {index} out of range for order of {len}")]
    TurnIndexOutOfRange { index: usize, len: usize },

    #[error("free actions have no slot to adjust")]
    FreeActionSlot,
}

impl GameError for PatchError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownActor(_) => "PATCH_UNKNOWN_ACTOR",
            Self::UnknownEffect(_) => "PATCH_UNKNOWN_EFFECT",
            Self::UnknownQueueEntry(_) => "PATCH_UNKNOWN_QUEUE_ENTRY",
            Self::UnknownReaction(_) => "PATCH_UNKNOWN_REACTION",
            Self::TurnIndexOutOfRange { .. } => "PATCH_TURN_INDEX_OUT_OF_RANGE",
            Self::FreeActionSlot => "PATCH_FREE_ACTION_SLOT",
        }
    }
}

/// Counts of applied and skipped patches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Applies one patch, or reports why it could not be applied.
pub fn apply_patch(state: &mut State, patch: &Patch) -> Result<(), PatchError> {
    match patch {
        Patch::SetRound { round } => {
            state.round = *round;
        }
        Patch::SetTurnOrder { order } => {
            state.turn.order = order.clone();
            if state.turn.index >= state.turn.order.len() {
                state.turn.index = 0;
            }
        }
        Patch::SetTurnIndex { index } => {
            let len = state.turn.order.len();
            if *index >= len.max(1) {
                return Err(PatchError::TurnIndexOutOfRange { index: *index, len });
            }
            state.turn.index = *index;
        }
        Patch::SetActions { pool } => {
            state.actions = *pool;
        }
        Patch::AdjustAction { kind, delta } => {
            let slot = state
                .actions
                .slot_mut(*kind)
                .ok_or(PatchError::FreeActionSlot)?;
            *slot = slot.saturating_add_signed(*delta);
        }
        Patch::SetImmediateUsed { used } => {
            state.actions.immediate_used_this_round = *used;
        }
        Patch::SetHp { actor, current } => {
            let target = actor_mut(state, actor)?;
            target.hp.current = *current;
        }
        Patch::SetTempHp { actor, temp } => {
            actor_mut(state, actor)?.hp.temp = *temp;
        }
        Patch::AdjustSurges { actor, delta } => {
            let surges = &mut actor_mut(state, actor)?.surges;
            surges.remaining = surges.remaining.saturating_add_signed(*delta);
        }
        Patch::MergeFlags { actor, update } => {
            update.merge_into(&mut actor_mut(state, actor)?.flags);
        }
        Patch::SetDeath { actor, death } => {
            actor_mut(state, actor)?.death = *death;
        }
        Patch::SetPosition { actor, to } => {
            if !state.actors.contains_key(actor) {
                return Err(PatchError::UnknownActor(actor.clone()));
            }
            state.board.positions.insert(actor.clone(), *to);
        }
        Patch::AddEffect { effect } => {
            state.effects.insert(effect.id.clone(), (**effect).clone());
        }
        Patch::RemoveEffect { id } => {
            state
                .effects
                .remove(id)
                .ok_or_else(|| PatchError::UnknownEffect(id.clone()))?;
        }
        Patch::SetEffectMeta { id, meta } => {
            let effect = state
                .effects
                .get_mut(id)
                .ok_or_else(|| PatchError::UnknownEffect(id.clone()))?;
            effect.meta = *meta;
        }
        Patch::AttachCondition { actor, effect } => {
            let conditions = &mut actor_mut(state, actor)?.conditions;
            if !conditions.contains(effect) {
                conditions.push(effect.clone());
            }
        }
        Patch::DetachCondition { actor, effect } => {
            actor_mut(state, actor)?.conditions.retain(|id| id != effect);
        }
        Patch::Enqueue { entry } => {
            state.queue.push(entry.clone());
        }
        Patch::Dequeue { seq } => {
            let position = state
                .queue
                .iter()
                .position(|entry| entry.seq == *seq)
                .ok_or(PatchError::UnknownQueueEntry(*seq))?;
            state.queue.remove(position);
        }
        Patch::SetUsage { actor, flag, value } => {
            let usage = state.usage.entry(actor.clone()).or_default();
            match flag {
                UsageFlag::Opportunity => usage.opportunity_used_this_turn = *value,
                UsageFlag::Immediate => usage.immediate_used_this_round = *value,
                UsageFlag::Ran => usage.ran_this_turn = *value,
            }
        }
        Patch::MarkPowerUsed {
            actor,
            power,
            frequency,
        } => {
            let usage = state.usage.entry(actor.clone()).or_default();
            let bucket = match frequency {
                UsageFrequency::Encounter => &mut usage.encounter_powers,
                UsageFrequency::Daily => &mut usage.daily_powers,
            };
            bucket.insert(power.clone());
        }
        Patch::ResetUsage { scope } => {
            for usage in state.usage.values_mut() {
                match scope {
                    UsageScope::Turn => {
                        usage.opportunity_used_this_turn = false;
                        usage.ran_this_turn = false;
                    }
                    UsageScope::Round => usage.immediate_used_this_round = false,
                }
            }
        }
        Patch::OpenReaction { event } => {
            state.reactions.push(event.clone());
        }
        Patch::CloseReaction { id } => {
            let event = state
                .reactions
                .iter_mut()
                .find(|event| event.id == *id)
                .ok_or(PatchError::UnknownReaction(*id))?;
            event.status = ReactiveStatus::Resolved;
        }
        Patch::SetStaging { staging } => {
            state.staging = staging.clone();
        }
        Patch::SetRngCursor { cursor } => {
            state.rng.cursor = *cursor;
        }
        Patch::Log { record } => {
            state.ts += 1;
            state.log.push(LogEntry::stamp(state.ts, record.clone()));
        }
    }
    Ok(())
}

/// Applies patches in order, skipping (and warning about) any that fail.
pub fn apply_patches(state: &mut State, patches: &[Patch]) -> ApplyReport {
    let mut report = ApplyReport::default();
    for patch in patches {
        match apply_patch(state, patch) {
            Ok(()) => report.applied += 1,
            Err(error) => {
                warn!(op = %patch.op(), %error, "skipping patch");
                report.skipped += 1;
            }
        }
    }
    report
}

/// Rebuilds a state from its initial snapshot and the full patch stream.
pub fn replay(initial: &State, patches: &[Patch]) -> State {
    let mut state = initial.clone();
    apply_patches(&mut state, patches);
    state
}

fn actor_mut<'s>(state: &'s mut State, id: &ActorId) -> Result<&'s mut Actor, PatchError> {
    state
        .actors
        .get_mut(id)
        .ok_or_else(|| PatchError::UnknownActor(id.clone()))
}
