//! Opportunity, interrupt and reaction windows.
//!
//! A window is opened by the action that provokes it and stays open until an
//! eligible actor resolves it. Each actor gets one opportunity action per
//! turn and one immediate action (interrupt or reaction) per round; a denied
//! attempt is logged and leaves the window open.

use crate::engine::Proposal;
use crate::state::{
    ActorId, LogData, LogKind, LogRecord, Patch, ReactiveEvent, ReactiveKind, ReactiveStatus,
    ReactiveTrigger, State, UsageFlag,
};

use super::attack::{AttackOptions, resolve_attack};
use super::hit::{AttackContext, AttackSpec};

/// Why an actor could not answer a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReactiveDenied {
    #[error("no open {0} window with that id")]
    NoWindow(ReactiveKind),
    #[error("not eligible")]
    NotEligible,
    #[error("cannot act")]
    CannotAct,
    #[error("opportunity action already used this turn")]
    OpportunityUsed,
    #[error("immediate action already used this round")]
    ImmediateUsed,
    #[error("provoking actor is gone")]
    ProvokerGone,
}

/// Opens a window of `kind` for `eligible`.
pub fn open_window(
    state: &State,
    kind: ReactiveKind,
    trigger: ReactiveTrigger,
    eligible: Vec<ActorId>,
) -> Vec<Patch> {
    let event = ReactiveEvent {
        id: state.next_reaction_id(),
        kind,
        trigger,
        eligible,
        status: ReactiveStatus::Open,
    };
    let log_kind = match kind {
        ReactiveKind::Opportunity => LogKind::OaOpen,
        ReactiveKind::Interrupt => LogKind::IntOpen,
        ReactiveKind::Reaction => LogKind::ReactOpen,
    };
    let record = LogRecord::new(
        log_kind,
        format!(
            "{kind} window {} opened by {}",
            event.id,
            event.trigger.provoker()
        ),
        LogData::Reactive {
            event: event.id,
            kind,
            actor: Some(event.trigger.provoker().clone()),
            eligible: event.eligible.clone(),
        },
    );
    vec![Patch::OpenReaction { event }, Patch::log(record)]
}

/// Living enemies of `actor` within threat range.
pub fn threatening_enemies(state: &State, actor: &ActorId) -> Vec<ActorId> {
    let Some(origin) = state.position_of(actor) else {
        return Vec::new();
    };
    state
        .board
        .positions
        .iter()
        .filter(|(id, pos)| *id != actor && pos.distance(origin) <= state.rules.threat_range)
        .filter(|(id, _)| state.actor(id).is_some_and(|a| a.is_alive()))
        .filter(|(id, _)| state.are_enemies(actor, id))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Takes the opportunity attack offered by window `event` as `actor`.
///
/// The attack is a melee basic attack against whoever provoked the window.
pub fn resolve_opportunity(
    state: &State,
    actor: &ActorId,
    event: u64,
    options: &AttackOptions,
) -> Vec<Patch> {
    let window = match check(state, actor, event, ReactiveKind::Opportunity) {
        Ok(window) => window,
        Err(denied) => return vec![denial(actor, event, ReactiveKind::Opportunity, denied)],
    };
    let provoker = window.trigger.provoker().clone();
    if !state.actor(&provoker).is_some_and(|a| a.is_alive()) {
        return vec![denial(
            actor,
            event,
            ReactiveKind::Opportunity,
            ReactiveDenied::ProvokerGone,
        )];
    }

    let mut proposal = Proposal::begin(state);
    let ctx = AttackContext {
        power: Some("melee-basic".to_owned()),
        ..AttackContext::new(actor.clone(), provoker.clone())
    };
    let resolution = resolve_attack(proposal.state(), &ctx, &AttackSpec::melee_basic(), options);
    proposal.extend(resolution.patches);
    proposal.push(Patch::SetUsage {
        actor: actor.clone(),
        flag: UsageFlag::Opportunity,
        value: true,
    });
    proposal.push(Patch::CloseReaction { id: event });
    proposal.log(resolved(
        LogKind::OaResolve,
        format!("{actor} takes an opportunity attack against {provoker}"),
        actor,
        &window,
    ));
    proposal.finish()
}

/// Spends `actor`'s immediate action on interrupt window `event`.
pub fn resolve_interrupt(state: &State, actor: &ActorId, event: u64) -> Vec<Patch> {
    resolve_immediate(state, actor, event, ReactiveKind::Interrupt)
}

/// Spends `actor`'s immediate action on reaction window `event`.
pub fn resolve_reaction(state: &State, actor: &ActorId, event: u64) -> Vec<Patch> {
    resolve_immediate(state, actor, event, ReactiveKind::Reaction)
}

fn resolve_immediate(state: &State, actor: &ActorId, event: u64, kind: ReactiveKind) -> Vec<Patch> {
    let window = match check(state, actor, event, kind) {
        Ok(window) => window,
        Err(denied) => return vec![denial(actor, event, kind, denied)],
    };
    let log_kind = match kind {
        ReactiveKind::Interrupt => LogKind::IntResolve,
        _ => LogKind::ReactResolve,
    };
    vec![
        Patch::SetUsage {
            actor: actor.clone(),
            flag: UsageFlag::Immediate,
            value: true,
        },
        Patch::CloseReaction { id: event },
        Patch::log(resolved(
            log_kind,
            format!("{actor} answers {kind} window {event}"),
            actor,
            &window,
        )),
    ]
}

fn check(
    state: &State,
    actor: &ActorId,
    event: u64,
    kind: ReactiveKind,
) -> Result<ReactiveEvent, ReactiveDenied> {
    let window = state
        .open_reaction(event)
        .filter(|window| window.kind == kind)
        .ok_or(ReactiveDenied::NoWindow(kind))?;
    if !window.eligible.contains(actor) {
        return Err(ReactiveDenied::NotEligible);
    }
    if !state.actor(actor).is_some_and(|a| a.can_act()) {
        return Err(ReactiveDenied::CannotAct);
    }
    let usage = state.usage_of(actor).cloned().unwrap_or_default();
    match kind {
        ReactiveKind::Opportunity if usage.opportunity_used_this_turn => {
            Err(ReactiveDenied::OpportunityUsed)
        }
        ReactiveKind::Interrupt | ReactiveKind::Reaction if usage.immediate_used_this_round => {
            Err(ReactiveDenied::ImmediateUsed)
        }
        _ => Ok(window.clone()),
    }
}

fn resolved(kind: LogKind, msg: String, actor: &ActorId, window: &ReactiveEvent) -> LogRecord {
    LogRecord::new(
        kind,
        msg,
        LogData::Reactive {
            event: window.id,
            kind: window.kind,
            actor: Some(actor.clone()),
            eligible: window.eligible.clone(),
        },
    )
}

fn denial(actor: &ActorId, event: u64, kind: ReactiveKind, denied: ReactiveDenied) -> Patch {
    let log_kind = match kind {
        ReactiveKind::Opportunity => LogKind::OaResolve,
        ReactiveKind::Interrupt => LogKind::IntResolve,
        ReactiveKind::Reaction => LogKind::ReactResolve,
    };
    Patch::log(LogRecord::new(
        log_kind,
        format!("{kind} denied for {actor}: {denied}"),
        LogData::Reactive {
            event,
            kind,
            actor: Some(actor.clone()),
            eligible: Vec::new(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply_patches;
    use crate::state::{Actor, Board, Position};

    fn provoked() -> (State, u64) {
        let mut state = State::new(11, Board::new(8, 8))
            .with_actor(Actor::new("M", "heroes", 20), Position::new(3, 3))
            .with_actor(Actor::new("G", "monsters", 20), Position::new(4, 3));
        let patches = open_window(
            &state,
            ReactiveKind::Opportunity,
            ReactiveTrigger::Movement {
                mover: "M".into(),
                from: Position::new(3, 3),
                to: Position::new(2, 3),
            },
            vec!["G".into()],
        );
        apply_patches(&mut state, &patches);
        (state, 1)
    }

    #[test]
    fn opening_logs_and_records_the_window() {
        let (state, id) = provoked();
        assert!(state.open_reaction(id).is_some());
        assert_eq!(state.log.last().map(|e| e.kind), Some(LogKind::OaOpen));
    }

    #[test]
    fn opportunity_attack_is_once_per_turn() {
        let (mut state, id) = provoked();
        let options = AttackOptions { force_d20: Some(15) };
        let patches = resolve_opportunity(&state, &"G".into(), id, &options);
        apply_patches(&mut state, &patches);
        assert!(state.usage_of(&"G".into()).expect("usage").opportunity_used_this_turn);
        assert!(state.open_reaction(id).is_none());
        assert!(state.log.iter().any(|e| e.kind == LogKind::AttackRoll));

        let second = open_window(
            &state,
            ReactiveKind::Opportunity,
            ReactiveTrigger::RangedAttack {
                attacker: "M".into(),
            },
            vec!["G".into()],
        );
        apply_patches(&mut state, &second);
        let denied = resolve_opportunity(&state, &"G".into(), 2, &options);
        assert_eq!(denied.len(), 1);
        let Patch::Log { record } = &denied[0] else {
            panic!("expected a log patch");
        };
        assert!(record.msg.contains("already used"));
    }

    #[test]
    fn ineligible_actor_is_denied() {
        let (state, id) = provoked();
        let patches = resolve_opportunity(&state, &"M".into(), id, &AttackOptions::default());
        assert_eq!(patches.len(), 1);
    }

    #[test]
    fn immediate_action_is_once_per_round() {
        let mut state = State::new(11, Board::new(8, 8))
            .with_actor(Actor::new("A", "heroes", 20), Position::new(0, 0))
            .with_actor(Actor::new("D", "monsters", 20), Position::new(1, 0));
        for _ in 0..2 {
            let opened = open_window(
                &state,
                ReactiveKind::Interrupt,
                ReactiveTrigger::Hit {
                    attacker: "A".into(),
                    defender: "D".into(),
                },
                vec!["D".into()],
            );
            apply_patches(&mut state, &opened);
        }
        let first = resolve_interrupt(&state, &"D".into(), 1);
        apply_patches(&mut state, &first);
        assert!(state.usage_of(&"D".into()).expect("usage").immediate_used_this_round);

        let second = resolve_interrupt(&state, &"D".into(), 2);
        apply_patches(&mut state, &second);
        assert!(state.open_reaction(2).is_some());
        let last = state.log.last().expect("log");
        assert_eq!(last.kind, LogKind::IntResolve);
        assert!(last.msg.contains("already used this round"));
    }
}
