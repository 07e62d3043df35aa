//! Turn sequencing and the action economy.
//!
//! [`advance_turn`] runs one full turn boundary in a fixed phase order:
//!
//! 1. end-of-turn saves and expiry for the outgoing actor
//! 2. death save if it is dying
//! 3. `turn-end`, then index advance (round wrap logs `round-begin` and
//!    resets immediate actions)
//! 4. queue drain: ready entries resolve, a delayed actor may preempt
//! 5. ongoing damage and start-of-turn expiry for the incoming actor
//! 6. action pool reset intersected with the condition mask, `turn-begin`
//!
//! Each phase reads the state left by the previous one through a
//! [`Proposal`].

use tracing::{debug, warn};

use crate::effects::{compute_action_mask, intersect, tick_end_of_turn, tick_start_of_turn};
use crate::error::{ErrorSeverity, GameError};
use crate::healing::death_save;
use crate::state::{
    ActionKind, ActionPool, ActorId, FlagsUpdate, LogData, LogKind, LogRecord, Patch, QueueEntry,
    QueueKind, State, UsageScope,
};

use super::Proposal;

/// The requested slot and every slot that could pay for it are spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no {kind} action available")]
pub struct ActionUnavailable {
    pub kind: ActionKind,
}

impl GameError for ActionUnavailable {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        "ACTION_UNAVAILABLE"
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("initiative order is empty")]
    EmptyOrder,

    #[error("it is not {0}'s turn")]
    NotYourTurn(ActorId),

    #[error(transparent)]
    Action(#[from] ActionUnavailable),
}

impl GameError for TurnError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::EmptyOrder => ErrorSeverity::Validation,
            Self::NotYourTurn(_) => ErrorSeverity::Recoverable,
            Self::Action(inner) => inner.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyOrder => "TURN_EMPTY_ORDER",
            Self::NotYourTurn(_) => "TURN_NOT_YOUR_TURN",
            Self::Action(inner) => inner.error_code(),
        }
    }
}

/// Which slot pays for a requested action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpendPlan {
    pub kind: ActionKind,
    pub paid_with: ActionKind,
}

/// Resolves the swap rules without spending anything.
///
/// A move may be paid with a standard; a minor with a move, then a standard.
/// Free actions always succeed.
pub fn plan_spend(state: &State, kind: ActionKind) -> Result<SpendPlan, ActionUnavailable> {
    let payers: &[ActionKind] = match kind {
        ActionKind::Free => return Ok(SpendPlan {
            kind,
            paid_with: ActionKind::Free,
        }),
        ActionKind::Standard => &[ActionKind::Standard],
        ActionKind::Move => &[ActionKind::Move, ActionKind::Standard],
        ActionKind::Minor => &[ActionKind::Minor, ActionKind::Move, ActionKind::Standard],
    };
    payers
        .iter()
        .copied()
        .find(|payer| state.actions.get(*payer) > 0)
        .map(|paid_with| SpendPlan { kind, paid_with })
        .ok_or(ActionUnavailable { kind })
}

pub fn can_spend_action(state: &State, kind: ActionKind) -> bool {
    plan_spend(state, kind).is_ok()
}

/// Spends `kind` for the acting combatant.
///
/// When nothing can pay, the only patch is an `action-unavailable` log entry.
pub fn spend_action(state: &State, kind: ActionKind) -> Vec<Patch> {
    let actor = state.current_actor().cloned();
    match plan_spend(state, kind) {
        Ok(plan) => {
            let mut patches = Vec::with_capacity(2);
            if plan.paid_with != ActionKind::Free {
                patches.push(Patch::AdjustAction {
                    kind: plan.paid_with,
                    delta: -1,
                });
            }
            let msg = if plan.paid_with == kind {
                format!("spent {kind} action")
            } else {
                format!("spent {kind} action (paid with {})", plan.paid_with)
            };
            patches.push(Patch::log(LogRecord::new(
                LogKind::ActionSpend,
                msg,
                LogData::Action {
                    actor,
                    kind,
                    paid_with: Some(plan.paid_with),
                },
            )));
            patches
        }
        Err(error) => {
            warn!(?actor, %kind, "action unavailable");
            vec![Patch::log(LogRecord::new(
                LogKind::ActionUnavailable,
                error.to_string(),
                LogData::Action {
                    actor,
                    kind,
                    paid_with: None,
                },
            ))]
        }
    }
}

/// Installs `order` and starts the first actor's turn.
pub fn set_initiative_order(state: &State, order: Vec<ActorId>) -> Result<Vec<Patch>, TurnError> {
    if order.is_empty() {
        return Err(TurnError::EmptyOrder);
    }
    let mut proposal = Proposal::begin(state);
    proposal.push(Patch::SetTurnOrder { order });
    proposal.push(Patch::SetTurnIndex { index: 0 });
    proposal.log(LogRecord::new(
        LogKind::RoundBegin,
        format!("Round {} begins", state.round),
        LogData::Turn {
            actor: None,
            round: state.round,
        },
    ));
    begin_turn(&mut proposal);
    Ok(proposal.finish())
}

/// Ends the current turn and begins the next one.
pub fn advance_turn(state: &State) -> Result<Vec<Patch>, TurnError> {
    let Some(outgoing) = state.current_actor().cloned() else {
        return Err(TurnError::EmptyOrder);
    };
    let ended = (state.round, state.turn.index);
    let mut proposal = Proposal::begin(state);

    let end_ticks = tick_end_of_turn(proposal.state(), &outgoing);
    proposal.extend(end_ticks);
    let save = death_save(proposal.state(), &outgoing, None);
    proposal.extend(save);
    proposal.log(turn_record(LogKind::TurnEnd, &outgoing, proposal.state().round));

    let len = proposal.state().turn.order.len();
    let next = (proposal.state().turn.index + 1) % len.max(1);
    if next == 0 {
        let round = proposal.state().round + 1;
        proposal.push(Patch::SetRound { round });
        proposal.push(Patch::ResetUsage {
            scope: UsageScope::Round,
        });
        proposal.log(LogRecord::new(
            LogKind::RoundBegin,
            format!("Round {round} begins"),
            LogData::Turn { actor: None, round },
        ));
    }
    proposal.push(Patch::SetTurnIndex { index: next });

    drain_queue(&mut proposal, ended);
    begin_turn(&mut proposal);
    Ok(proposal.finish())
}

/// Resolves queued entries in FIFO order. Entries made during the turn that
/// just ended wait one more boundary. A delayed actor that is not the
/// nominal next actor takes over this slot and draining stops.
fn drain_queue(proposal: &mut Proposal, ended: (u32, usize)) {
    let entries: Vec<QueueEntry> = proposal
        .state()
        .queue
        .iter()
        .filter(|entry| (entry.round, entry.turn_index) != ended)
        .cloned()
        .collect();

    for entry in entries {
        let Some(nominal) = proposal.state().current_actor().cloned() else {
            return;
        };
        proposal.push(Patch::Dequeue { seq: entry.seq });
        match &entry.kind {
            QueueKind::Ready { trigger } => {
                proposal.log(LogRecord::new(
                    LogKind::ReadyResolve,
                    format!("{}'s readied action resolves ({trigger})", entry.actor),
                    LogData::Queue {
                        actor: entry.actor.clone(),
                        trigger: Some(trigger.clone()),
                    },
                ));
            }
            QueueKind::Delay => {
                let preempts = entry.actor != nominal;
                if preempts {
                    let mut order = proposal.state().turn.order.clone();
                    order.retain(|id| id != &entry.actor);
                    let slot = order.iter().position(|id| id == &nominal).unwrap_or(0);
                    order.insert(slot, entry.actor.clone());
                    proposal.push(Patch::SetTurnOrder { order });
                    proposal.push(Patch::SetTurnIndex { index: slot });
                }
                proposal.log(LogRecord::new(
                    LogKind::DelayResolve,
                    format!("{} acts before {nominal}", entry.actor),
                    LogData::Queue {
                        actor: entry.actor.clone(),
                        trigger: None,
                    },
                ));
                if preempts {
                    return;
                }
            }
        }
    }
}

/// Start-of-turn hooks for whoever the turn pointer now names.
fn begin_turn(proposal: &mut Proposal) {
    let Some(actor) = proposal.state().current_actor().cloned() else {
        return;
    };
    let round = proposal.state().round;

    proposal.push(Patch::ResetUsage {
        scope: UsageScope::Turn,
    });
    let bonus = proposal
        .state()
        .actor(&actor)
        .map_or(0, |a| a.flags.defense_bonus);
    if bonus != 0 {
        proposal.push(Patch::MergeFlags {
            actor: actor.clone(),
            update: FlagsUpdate {
                defense_bonus: Some(0),
                ..FlagsUpdate::default()
            },
        });
    }

    let start_ticks = tick_start_of_turn(proposal.state(), &actor);
    proposal.extend(start_ticks);

    let mask = compute_action_mask(proposal.state(), &actor);
    let immediate_used = proposal
        .state()
        .usage_of(&actor)
        .is_some_and(|usage| usage.immediate_used_this_round);
    let pool = ActionPool {
        immediate_used_this_round: immediate_used,
        ..intersect(&ActionPool::FULL, &mask)
    };
    proposal.push(Patch::SetActions { pool });
    if !proposal.state().actor(&actor).is_some_and(|a| a.can_act()) {
        debug!(%actor, "turn begins for an actor that cannot act");
    }
    proposal.log(turn_record(LogKind::TurnBegin, &actor, round));
}

/// Postpones `actor`'s turn. The entry is eligible from the boundary after
/// the next one.
pub fn delay_turn(state: &State, actor: &ActorId) -> Result<Vec<Patch>, TurnError> {
    ensure_turn(state, actor)?;
    Ok(vec![
        Patch::Enqueue {
            entry: queue_entry(state, actor, QueueKind::Delay),
        },
        Patch::log(LogRecord::new(
            LogKind::Delay,
            format!("{actor} delays"),
            LogData::Queue {
                actor: actor.clone(),
                trigger: None,
            },
        )),
    ])
}

/// Readies an action against `trigger`, spending the standard action now.
pub fn ready_action(
    state: &State,
    actor: &ActorId,
    trigger: impl Into<String>,
) -> Result<Vec<Patch>, TurnError> {
    ensure_turn(state, actor)?;
    plan_spend(state, ActionKind::Standard)?;
    let trigger = trigger.into();

    let mut proposal = Proposal::begin(state);
    proposal.extend(spend_action(state, ActionKind::Standard));
    let entry = queue_entry(
        proposal.state(),
        actor,
        QueueKind::Ready {
            trigger: trigger.clone(),
        },
    );
    proposal.push(Patch::Enqueue { entry });
    proposal.log(LogRecord::new(
        LogKind::Ready,
        format!("{actor} readies an action ({trigger})"),
        LogData::Queue {
            actor: actor.clone(),
            trigger: Some(trigger),
        },
    ));
    Ok(proposal.finish())
}

fn ensure_turn(state: &State, actor: &ActorId) -> Result<(), TurnError> {
    if state.current_actor() == Some(actor) {
        Ok(())
    } else {
        Err(TurnError::NotYourTurn(actor.clone()))
    }
}

fn queue_entry(state: &State, actor: &ActorId, kind: QueueKind) -> QueueEntry {
    QueueEntry {
        seq: state.next_queue_seq(),
        kind,
        actor: actor.clone(),
        round: state.round,
        turn_index: state.turn.index,
    }
}

fn turn_record(kind: LogKind, actor: &ActorId, round: u32) -> LogRecord {
    let verb = if kind == LogKind::TurnBegin {
        "begins"
    } else {
        "ends"
    };
    LogRecord::new(
        kind,
        format!("{actor}'s turn {verb} (round {round})"),
        LogData::Turn {
            actor: Some(actor.clone()),
            round,
        },
    )
}
