//! Voluntary movement: preview, commit, and standing up.
//!
//! A preview is side-effect free and returns a [`MovePlan`]; committing a plan
//! produces the position patch, the `move-commit` log entry, and opens an
//! opportunity window for every provoker the plan warned about.

use std::collections::BTreeSet;

use crate::combat::reactive::open_window;
use crate::effects::{CombatFlags, compute_flags, remove_condition};
use crate::engine::turns::{plan_spend, spend_action};
use crate::error::{ErrorSeverity, GameError};
use crate::state::{
    ActionKind, ActorId, ConditionId, LogData, LogKind, LogRecord, Patch, Position,
    ReactiveKind, ReactiveTrigger, State, UsageFlag,
};

use super::grid::is_legal_destination;
use super::pathing::{PathOptions, find_path};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum MoveMode {
    Walk,
    Run,
    Shift,
}

/// Soft problems with a legal move.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "kebab-case"))]
pub enum MoveWarning {
    /// Path cost exceeds the movement budget.
    Range { max: u32 },
    /// Leaving these actors' threatened squares provokes opportunity attacks.
    Oa { provokers: Vec<ActorId> },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("actor {0} not found")]
    UnknownActor(ActorId),

    #[error("actor {0} has no position on the board")]
    NotOnBoard(ActorId),

    #[error("actor cannot move (speed 0)")]
    Immobilized,

    #[error("actor cannot shift")]
    CannotShift,

    #[error("shift must be exactly one square")]
    ShiftTooFar,

    #[error("cannot shift into difficult terrain")]
    ShiftIntoDifficult,

    #[error("destination {0} is blocked or occupied")]
    IllegalDestination(Position),

    #[error("no path to {0}")]
    NoPath(Position),

    #[error("plan no longer matches the board")]
    StalePlan,

    #[error("actor is not prone")]
    NotProne,

    #[error("no move action available")]
    NoMoveAction,
}

impl GameError for MoveError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownActor(_) | Self::NotOnBoard(_) | Self::StalePlan => {
                ErrorSeverity::Recoverable
            }
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownActor(_) => "MOVE_UNKNOWN_ACTOR",
            Self::NotOnBoard(_) => "MOVE_NOT_ON_BOARD",
            Self::Immobilized => "MOVE_IMMOBILIZED",
            Self::CannotShift => "MOVE_CANNOT_SHIFT",
            Self::ShiftTooFar => "MOVE_SHIFT_TOO_FAR",
            Self::ShiftIntoDifficult => "MOVE_SHIFT_DIFFICULT",
            Self::IllegalDestination(_) => "MOVE_ILLEGAL_DESTINATION",
            Self::NoPath(_) => "MOVE_NO_PATH",
            Self::StalePlan => "MOVE_STALE_PLAN",
            Self::NotProne => "MOVE_NOT_PRONE",
            Self::NoMoveAction => "MOVE_NO_ACTION",
        }
    }
}

/// A validated move, ready to commit.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovePlan {
    pub actor: ActorId,
    pub mode: MoveMode,
    pub from: Position,
    pub to: Position,
    pub path: Vec<Position>,
    pub cost: u32,
    /// Movement budget the cost was measured against.
    pub budget: u32,
    pub warnings: Vec<MoveWarning>,
}

impl MovePlan {
    pub fn provokers(&self) -> &[ActorId] {
        self.warnings
            .iter()
            .find_map(|warning| match warning {
                MoveWarning::Oa { provokers } => Some(provokers.as_slice()),
                MoveWarning::Range { .. } => None,
            })
            .unwrap_or(&[])
    }

    pub fn exceeds_budget(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, MoveWarning::Range { .. }))
    }
}

/// Validates a move without touching the state.
pub fn preview_move(
    state: &State,
    actor: &ActorId,
    to: Position,
    mode: MoveMode,
) -> Result<MovePlan, MoveError> {
    let mover = state
        .actor(actor)
        .ok_or_else(|| MoveError::UnknownActor(actor.clone()))?;
    let from = state
        .position_of(actor)
        .ok_or_else(|| MoveError::NotOnBoard(actor.clone()))?;
    let flags = compute_flags(state, actor);

    if flags.contains(CombatFlags::SPEED0) {
        return Err(MoveError::Immobilized);
    }

    if mode == MoveMode::Shift {
        if flags.contains(CombatFlags::CANNOT_SHIFT) {
            return Err(MoveError::CannotShift);
        }
        if from.distance(to) != 1 {
            return Err(MoveError::ShiftTooFar);
        }
        if !is_legal_destination(&state.board, to, actor) {
            return Err(MoveError::IllegalDestination(to));
        }
        if state.board.is_difficult(to) {
            return Err(MoveError::ShiftIntoDifficult);
        }
        return Ok(MovePlan {
            actor: actor.clone(),
            mode,
            from,
            to,
            path: vec![from, to],
            cost: 1,
            budget: 1,
            warnings: Vec::new(),
        });
    }

    if !is_legal_destination(&state.board, to, actor) {
        return Err(MoveError::IllegalDestination(to));
    }
    let found = find_path(state, from, to, &PathOptions::for_mover(actor.clone()))
        .ok_or(MoveError::NoPath(to))?;

    let mut budget = mover.speed;
    if mode == MoveMode::Run {
        budget += state.rules.run_bonus;
    }
    if flags.contains(CombatFlags::SLOW_CAP2) {
        budget = budget.min(state.rules.slow_cap);
    }

    let mut warnings = Vec::new();
    if found.cost > budget {
        warnings.push(MoveWarning::Range { max: budget });
    }
    let provokers = detect_provokers(state, actor, &found.path);
    if !provokers.is_empty() {
        warnings.push(MoveWarning::Oa { provokers });
    }

    Ok(MovePlan {
        actor: actor.clone(),
        mode,
        from,
        to,
        path: found.path,
        cost: found.cost,
        budget,
        warnings,
    })
}

/// Living enemies threatening the origin cell of any step along `path`.
pub fn detect_provokers(state: &State, mover: &ActorId, path: &[Position]) -> Vec<ActorId> {
    let reach = state.rules.threat_range;
    let mut provokers = BTreeSet::new();
    for step in path.windows(2) {
        let origin = step[0];
        for (id, pos) in &state.board.positions {
            if id == mover || pos.distance(origin) > reach {
                continue;
            }
            let alive = state.actor(id).is_some_and(|a| a.is_alive());
            if alive && state.are_enemies(mover, id) {
                provokers.insert(id.clone());
            }
        }
    }
    provokers.into_iter().collect()
}

/// Applies a previewed move.
///
/// The plan is rejected if the actor has moved or the destination has been
/// taken since it was previewed. Action cost is paid by the caller.
pub fn commit_move(state: &State, plan: &MovePlan) -> Result<Vec<Patch>, MoveError> {
    if state.position_of(&plan.actor) != Some(plan.from)
        || !is_legal_destination(&state.board, plan.to, &plan.actor)
    {
        return Err(MoveError::StalePlan);
    }

    let mut patches = vec![
        Patch::SetPosition {
            actor: plan.actor.clone(),
            to: plan.to,
        },
        Patch::log(move_record(LogKind::MoveCommit, plan)),
    ];
    if plan.mode == MoveMode::Run {
        patches.push(Patch::SetUsage {
            actor: plan.actor.clone(),
            flag: UsageFlag::Ran,
            value: true,
        });
    }

    let provokers = plan.provokers();
    if !provokers.is_empty() {
        patches.extend(open_window(
            state,
            ReactiveKind::Opportunity,
            ReactiveTrigger::Movement {
                mover: plan.actor.clone(),
                from: plan.from,
                to: plan.to,
            },
            provokers.to_vec(),
        ));
    }
    Ok(patches)
}

/// Removes `prone` from `actor`, paying a move action.
pub fn stand_up(state: &State, actor: &ActorId) -> Result<Vec<Patch>, MoveError> {
    if state.actor(actor).is_none() {
        return Err(MoveError::UnknownActor(actor.clone()));
    }
    let prone = state
        .effects_on(actor)
        .find(|effect| effect.condition == ConditionId::Prone)
        .map(|effect| effect.id.clone())
        .ok_or(MoveError::NotProne)?;
    plan_spend(state, ActionKind::Move).map_err(|_| MoveError::NoMoveAction)?;

    let mut patches = spend_action(state, ActionKind::Move);
    patches.extend(remove_condition(state, &prone));
    patches.push(Patch::log(LogRecord::message(
        LogKind::Info,
        format!("{actor} stands up"),
    )));
    Ok(patches)
}

/// `move-preview` log entry for a preview result.
pub fn build_move_preview_log(
    actor: &ActorId,
    preview: &Result<MovePlan, MoveError>,
    mode: MoveMode,
) -> Patch {
    match preview {
        Ok(plan) => Patch::log(move_record(LogKind::MovePreview, plan)),
        Err(error) => Patch::log(LogRecord::message(
            LogKind::MovePreview,
            format!("{actor} cannot {mode}: {error}"),
        )),
    }
}

fn move_record(kind: LogKind, plan: &MovePlan) -> LogRecord {
    LogRecord::new(
        kind,
        format!(
            "{} {}s from {} to {} (cost {})",
            plan.actor, plan.mode, plan.from, plan.to, plan.cost
        ),
        LogData::Move {
            actor: plan.actor.clone(),
            mode: plan.mode,
            from: plan.from,
            to: plan.to,
            path: plan.path.clone(),
            cost: plan.cost,
            warnings: plan.warnings.clone(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::apply_condition;
    use crate::engine::apply_patches;
    use crate::state::{Actor, Board, Duration, EffectData};

    fn open_field() -> State {
        State::new(42, Board::new(20, 20))
            .with_actor(Actor::new("A1", "heroes", 20), Position::new(0, 0))
            .with_turn_order(vec!["A1".into()])
    }

    fn afflict(state: &mut State, condition: ConditionId) {
        let patches = apply_condition(
            state,
            condition,
            &"SRC".into(),
            &"A1".into(),
            Duration::SaveEnds,
            EffectData::default(),
        );
        apply_patches(state, &patches);
    }

    #[test]
    fn walking_past_speed_warns_and_running_extends_the_budget() {
        let state = open_field();
        let walk = preview_move(&state, &"A1".into(), Position::new(8, 0), MoveMode::Walk)
            .expect("walk");
        assert!(walk.warnings.contains(&MoveWarning::Range { max: 6 }));

        let run = preview_move(&state, &"A1".into(), Position::new(8, 0), MoveMode::Run)
            .expect("run");
        assert!(!run.exceeds_budget());
    }

    #[test]
    fn preview_does_not_touch_state() {
        let state = open_field();
        let before = state.clone();
        let plan = preview_move(&state, &"A1".into(), Position::new(1, 0), MoveMode::Walk);
        assert!(plan.is_ok());
        assert_eq!(state, before);
    }

    #[test]
    fn shift_is_one_clear_square() {
        let state = State::new(1, Board::new(5, 5).with_difficult([Position::new(1, 1)]))
            .with_actor(Actor::new("A1", "heroes", 20), Position::new(0, 0));
        let id = ActorId::from("A1");
        assert_eq!(
            preview_move(&state, &id, Position::new(2, 0), MoveMode::Shift),
            Err(MoveError::ShiftTooFar)
        );
        assert_eq!(
            preview_move(&state, &id, Position::new(1, 1), MoveMode::Shift),
            Err(MoveError::ShiftIntoDifficult)
        );
        assert!(preview_move(&state, &id, Position::new(1, 0), MoveMode::Shift).is_ok());
    }

    #[test]
    fn immobilized_blocks_and_slowed_caps_budget() {
        let mut state = open_field();
        afflict(&mut state, ConditionId::Immobilized);
        assert_eq!(
            preview_move(&state, &"A1".into(), Position::new(1, 0), MoveMode::Walk),
            Err(MoveError::Immobilized)
        );

        let mut state = open_field();
        afflict(&mut state, ConditionId::Slowed);
        let plan = preview_move(&state, &"A1".into(), Position::new(3, 0), MoveMode::Walk)
            .expect("slowed walk");
        assert!(plan.warnings.contains(&MoveWarning::Range { max: 2 }));
    }

    #[test]
    fn leaving_an_adjacent_enemy_warns_but_shifting_does_not() {
        let state = State::new(42, Board::new(5, 5))
            .with_actor(Actor::new("A1", "heroes", 20), Position::new(1, 1))
            .with_actor(Actor::new("A2", "heroes", 20), Position::new(0, 1))
            .with_actor(Actor::new("E1", "monsters", 20), Position::new(1, 2));

        let walk = preview_move(&state, &"A1".into(), Position::new(3, 1), MoveMode::Walk)
            .expect("walk");
        assert_eq!(walk.provokers(), &[ActorId::from("E1")]);

        let shift = preview_move(&state, &"A1".into(), Position::new(2, 1), MoveMode::Shift)
            .expect("shift");
        assert!(shift.provokers().is_empty());
    }

    #[test]
    fn commit_moves_logs_and_marks_running() {
        let mut state = open_field();
        let plan = preview_move(&state, &"A1".into(), Position::new(2, 0), MoveMode::Run)
            .expect("run");
        let patches = commit_move(&state, &plan).expect("commit");
        apply_patches(&mut state, &patches);

        assert_eq!(state.position_of(&"A1".into()), Some(Position::new(2, 0)));
        let last = state.log.last().expect("log");
        assert_eq!(last.kind, LogKind::MoveCommit);
        assert!(state.usage[&ActorId::from("A1")].ran_this_turn);

        assert_eq!(commit_move(&state, &plan), Err(MoveError::StalePlan));
    }

    #[test]
    fn standing_up_removes_prone_and_spends_move() {
        let mut state = open_field();
        afflict(&mut state, ConditionId::Prone);
        let patches = stand_up(&state, &"A1".into()).expect("stand");
        apply_patches(&mut state, &patches);

        assert!(state.effects_on(&"A1".into()).next().is_none());
        assert_eq!(state.actions.move_, 0);
        assert_eq!(stand_up(&state, &"A1".into()), Err(MoveError::NotProne));
    }
}
