//! Condition instances: creation, removal, saving throws and expiry.
//!
//! At most one instance of a condition exists per target. Applying a
//! duplicate removes the old instance first, in the same patch list.
//!
//! Expiry is anchored to turn boundaries:
//!
//! | duration            | ends at                                   |
//! |---------------------|-------------------------------------------|
//! | `saveEnds`          | a successful save at the target's turn end |
//! | `endOfSourceNext`   | end of the source's next turn              |
//! | `startOfSourceNext` | start of the source's next turn            |
//! | `untilStartOfTurn`  | start of the owner's turn                  |
//! | `untilEndOfTurn`    | end of the owner's turn                    |
//! | `encounter`         | never, unless it must be sustained         |
pub mod flags;

pub use flags::{CombatFlags, compute_action_mask, compute_flags, intersect};

use tracing::debug;

use crate::combat::apply_damage;
use crate::engine::Proposal;
use crate::env::roll_d20;
use crate::state::{
    ActorId, AppliedAt, ConditionId, Duration, EffectData, EffectId, EffectInstance, EffectMeta,
    LogData, LogKind, LogRecord, Patch, State,
};

/// Id for the next effect instance, unique within the encounter.
pub fn mint_effect_id(state: &State) -> EffectId {
    EffectId::new(format!("e{}.{}", state.ts + 1, state.effects.len() + 1))
}

/// Attaches `condition` to `target`, replacing any instance it already has.
pub fn apply_condition(
    state: &State,
    condition: ConditionId,
    source: &ActorId,
    target: &ActorId,
    duration: Duration,
    data: EffectData,
) -> Vec<Patch> {
    let mut patches: Vec<Patch> = state
        .effects_on(target)
        .filter(|effect| effect.condition == condition)
        .flat_map(|effect| remove_condition(state, &effect.id))
        .collect();

    let instance = EffectInstance {
        id: mint_effect_id(state),
        condition,
        source: source.clone(),
        target: target.clone(),
        duration,
        applied_at: AppliedAt {
            round: state.round,
            turn_actor: state.current_actor().cloned(),
        },
        data,
        meta: EffectMeta::default(),
    };

    let record = effect_record(
        LogKind::ConditionAdd,
        format!("{condition} applied to {target}"),
        &instance,
    );
    patches.push(Patch::AttachCondition {
        actor: target.clone(),
        effect: instance.id.clone(),
    });
    patches.push(Patch::add_effect(instance));
    patches.push(Patch::log(record));
    patches
}

/// Marks `target` on behalf of `source`.
pub fn apply_mark(
    state: &State,
    source: &ActorId,
    target: &ActorId,
    duration: Duration,
) -> Vec<Patch> {
    let data = EffectData {
        by: Some(source.clone()),
        ..EffectData::default()
    };
    apply_condition(state, ConditionId::Marked, source, target, duration, data)
}

/// Detaches and deletes an instance. Unknown ids are a no-op.
pub fn remove_condition(state: &State, id: &EffectId) -> Vec<Patch> {
    let Some(effect) = state.effect(id) else {
        debug!(%id, "remove_condition on missing effect");
        return Vec::new();
    };
    vec![
        Patch::DetachCondition {
            actor: effect.target.clone(),
            effect: id.clone(),
        },
        Patch::RemoveEffect { id: id.clone() },
        Patch::log(effect_record(
            LogKind::ConditionRemove,
            format!("{} removed from {}", effect.condition, effect.target),
            effect,
        )),
    ]
}

/// Removes an instance and logs why it expired.
fn expire(state: &State, id: &EffectId, why: &str) -> Vec<Patch> {
    let Some(effect) = state.effect(id) else {
        return Vec::new();
    };
    let mut patches = remove_condition(state, id);
    patches.push(Patch::log(effect_record(
        LogKind::EffectExpire,
        format!("{} on {} expired ({why})", effect.condition, effect.target),
        effect,
    )));
    patches
}

/// Result of one saving throw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveOutcome {
    pub d20: i32,
    pub success: bool,
    pub patches: Vec<Patch>,
}

/// Rolls a flat d20 save against an instance; success removes it.
///
/// Returns `None` for an unknown instance.
pub fn saving_throw(state: &State, id: &EffectId, force_d20: Option<i32>) -> Option<SaveOutcome> {
    let effect = state.effect(id)?;
    let rolled = roll_d20(state, force_d20);
    let d20 = rolled.result;
    let success = d20 >= state.rules.save_target;

    let mut patches = rolled.patches;
    patches.push(Patch::log(LogRecord::new(
        LogKind::SaveRoll,
        format!("{} saves vs {}", effect.target, effect.condition),
        LogData::Save {
            instance: id.clone(),
            target: effect.target.clone(),
            d20,
            success,
        },
    )));
    let (kind, msg) = if success {
        (LogKind::SaveSuccess, "Save succeeds")
    } else {
        (LogKind::SaveFail, "Save fails")
    };
    patches.push(Patch::log(LogRecord::new(
        kind,
        msg,
        LogData::Save {
            instance: id.clone(),
            target: effect.target.clone(),
            d20,
            success,
        },
    )));
    if success {
        patches.extend(remove_condition(state, id));
    }
    Some(SaveOutcome {
        d20,
        success,
        patches,
    })
}

/// Keeps a sustained effect alive through the current round.
pub fn sustain_effect(state: &State, id: &EffectId) -> Vec<Patch> {
    let Some(effect) = state.effect(id) else {
        return Vec::new();
    };
    vec![
        Patch::SetEffectMeta {
            id: id.clone(),
            meta: EffectMeta {
                sustained_round: Some(state.round),
            },
        },
        Patch::log(effect_record(
            LogKind::EffectSustain,
            format!("{} on {} sustained", effect.condition, effect.target),
            effect,
        )),
    ]
}

/// Start-of-turn upkeep for `actor`: ongoing damage, then expiry of effects
/// that end when this turn starts.
pub fn tick_start_of_turn(state: &State, actor: &ActorId) -> Vec<Patch> {
    let mut proposal = Proposal::begin(state);

    let ongoing: Vec<EffectId> = state
        .effects_on(actor)
        .filter(|effect| effect.condition == ConditionId::OngoingDamage)
        .map(|effect| effect.id.clone())
        .collect();
    for id in ongoing {
        let Some(effect) = proposal.state().effect(&id).cloned() else {
            continue;
        };
        let amount = effect.data.amount.unwrap_or(0);
        let damage_type = effect.data.damage_type.unwrap_or_default();
        proposal.log(effect_record(
            LogKind::OngoingApply,
            format!("Ongoing {amount} {damage_type} to {actor}"),
            &effect,
        ));
        let patches = apply_damage(proposal.state(), actor, amount, damage_type);
        proposal.extend(patches);
    }

    let expiring: Vec<(EffectId, &str)> = proposal
        .state()
        .effects
        .values()
        .filter_map(|effect| match effect.duration {
            Duration::StartOfSourceNext if &effect.source == actor => {
                Some((effect.id.clone(), "start of source's turn"))
            }
            Duration::UntilStartOfTurn if effect.owner() == actor => {
                Some((effect.id.clone(), "start of turn"))
            }
            _ => None,
        })
        .collect();
    for (id, why) in expiring {
        let patches = expire(proposal.state(), &id, why);
        proposal.extend(patches);
    }

    proposal.finish()
}

/// End-of-turn upkeep for `actor`: saving throws, then expiry, then
/// sustain-bound effects on `actor` nobody sustained this round.
pub fn tick_end_of_turn(state: &State, actor: &ActorId) -> Vec<Patch> {
    let mut proposal = Proposal::begin(state);

    let saves: Vec<EffectId> = state
        .effects_on(actor)
        .filter(|effect| effect.duration == Duration::SaveEnds)
        .map(|effect| effect.id.clone())
        .collect();
    for id in saves {
        if let Some(outcome) = saving_throw(proposal.state(), &id, None) {
            proposal.extend(outcome.patches);
        }
    }

    let round = state.round;
    let expiring: Vec<(EffectId, &str)> = proposal
        .state()
        .effects
        .values()
        .filter_map(|effect| match effect.duration {
            Duration::EndOfSourceNext
                if &effect.source == actor && !applied_this_turn(effect, actor, round) =>
            {
                Some((effect.id.clone(), "end of source's next turn"))
            }
            Duration::UntilEndOfTurn if effect.owner() == actor => {
                Some((effect.id.clone(), "end of turn"))
            }
            _ if effect.data.sustain
                && &effect.target == actor
                && effect.meta.sustained_round != Some(round) =>
            {
                Some((effect.id.clone(), "not sustained"))
            }
            _ => None,
        })
        .collect();
    for (id, why) in expiring {
        let patches = expire(proposal.state(), &id, why);
        proposal.extend(patches);
    }

    proposal.finish()
}

/// Created during `actor`'s own turn in `round`, so "next turn" is still ahead.
fn applied_this_turn(effect: &EffectInstance, actor: &ActorId, round: u32) -> bool {
    effect.applied_at.round == round && effect.applied_at.turn_actor.as_ref() == Some(actor)
}

fn effect_record(kind: LogKind, msg: String, effect: &EffectInstance) -> LogRecord {
    LogRecord::new(
        kind,
        msg,
        LogData::Effect {
            instance: effect.id.clone(),
            condition: effect.condition,
            source: effect.source.clone(),
            target: effect.target.clone(),
            duration: effect.duration,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply_patches;
    use crate::state::{Actor, Board, DamageType, Position};

    fn pair() -> State {
        State::new(42, Board::new(8, 8))
            .with_actor(Actor::new("A1", "heroes", 30), Position::new(0, 0))
            .with_actor(Actor::new("E1", "monsters", 30), Position::new(1, 0))
            .with_turn_order(vec!["A1".into(), "E1".into()])
    }

    fn afflict(state: &mut State, condition: ConditionId, duration: Duration, data: EffectData) {
        let patches = apply_condition(state, condition, &"A1".into(), &"E1".into(), duration, data);
        apply_patches(state, &patches);
    }

    #[test]
    fn applying_twice_replaces_the_instance() {
        let mut state = pair();
        afflict(&mut state, ConditionId::Dazed, Duration::SaveEnds, EffectData::default());
        afflict(&mut state, ConditionId::Dazed, Duration::Encounter, EffectData::default());

        let target = ActorId::from("E1");
        let on_target: Vec<&EffectInstance> = state.effects_on(&target).collect();
        assert_eq!(on_target.len(), 1);
        assert_eq!(on_target[0].duration, Duration::Encounter);
        assert_eq!(state.actors[&target].conditions, vec![on_target[0].id.clone()]);
    }

    #[test]
    fn removing_a_missing_effect_is_a_no_op() {
        let state = pair();
        assert!(remove_condition(&state, &"e404".into()).is_empty());
        assert!(saving_throw(&state, &"e404".into(), Some(20)).is_none());
    }

    #[test]
    fn successful_save_removes_the_condition() {
        let mut state = pair();
        afflict(&mut state, ConditionId::Slowed, Duration::SaveEnds, EffectData::default());
        let id = state.effects.keys().next().cloned().expect("effect");

        let failed = saving_throw(&state, &id, Some(9)).expect("save");
        assert!(!failed.success);
        apply_patches(&mut state, &failed.patches);
        assert!(state.effect(&id).is_some());

        let passed = saving_throw(&state, &id, Some(10)).expect("save");
        assert!(passed.success);
        apply_patches(&mut state, &passed.patches);
        assert!(state.effect(&id).is_none());
        assert!(state.actors[&ActorId::from("E1")].conditions.is_empty());
    }

    #[test]
    fn mark_records_the_marker() {
        let mut state = pair();
        let patches = apply_mark(&state, &"A1".into(), &"E1".into(), Duration::SaveEnds);
        apply_patches(&mut state, &patches);
        let target = ActorId::from("E1");
        let mark = state.effects_on(&target).next().expect("mark");
        assert_eq!(mark.condition, ConditionId::Marked);
        assert_eq!(mark.data.by, Some(ActorId::from("A1")));
    }

    #[test]
    fn unsustained_effects_lapse_at_the_targets_turn_end() {
        let mut state = pair();
        afflict(&mut state, ConditionId::Immobilized, Duration::Encounter, EffectData::sustained());
        let id = state.effects.keys().next().cloned().expect("effect");
        assert_eq!(state.effect(&id).map(|e| e.meta.sustained_round), Some(None));

        // The source's turn end never checks sustain.
        assert!(tick_end_of_turn(&state, &"A1".into()).is_empty());

        let mut sustained = state.clone();
        let patches = sustain_effect(&sustained, &id);
        apply_patches(&mut sustained, &patches);
        assert!(tick_end_of_turn(&sustained, &"E1".into()).is_empty());

        let patches = tick_end_of_turn(&state, &"E1".into());
        apply_patches(&mut state, &patches);
        assert!(state.effects.is_empty());
        assert!(state.actors[&ActorId::from("E1")].conditions.is_empty());
        assert!(state.log.iter().any(|e| e.kind == LogKind::EffectExpire));

        // A sustain from an earlier round does not carry over.
        sustained.round += 1;
        let patches = tick_end_of_turn(&sustained, &"E1".into());
        apply_patches(&mut sustained, &patches);
        assert!(sustained.effects.is_empty());
    }

    #[test]
    fn source_bound_durations_expire_at_the_named_boundary() {
        let mut state = pair();
        afflict(&mut state, ConditionId::Dazed, Duration::StartOfSourceNext, EffectData::default());
        afflict(&mut state, ConditionId::Weakened, Duration::EndOfSourceNext, EffectData::default());
        // Applied during A1's turn: the end of this turn is not "next".
        assert!(tick_end_of_turn(&state, &"A1".into()).is_empty());

        let patches = tick_start_of_turn(&state, &"A1".into());
        apply_patches(&mut state, &patches);
        let left: Vec<ConditionId> = state.effects.values().map(|e| e.condition).collect();
        assert_eq!(left, vec![ConditionId::Weakened]);

        state.round += 1;
        let patches = tick_end_of_turn(&state, &"A1".into());
        apply_patches(&mut state, &patches);
        assert!(state.effects.is_empty());
    }

    #[test]
    fn ongoing_damage_ticks_at_turn_start() {
        let mut state = pair();
        afflict(
            &mut state,
            ConditionId::OngoingDamage,
            Duration::SaveEnds,
            EffectData::ongoing(5, DamageType::Fire),
        );
        let patches = tick_start_of_turn(&state, &"E1".into());
        apply_patches(&mut state, &patches);
        assert_eq!(state.actors[&ActorId::from("E1")].hp.current, 25);
        assert!(state.log.iter().any(|e| e.kind == LogKind::OngoingApply));
    }
}
