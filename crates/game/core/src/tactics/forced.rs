//! Forced movement: push, pull and slide.
//!
//! Each resolver walks the target one square at a time and stops at the first
//! illegal step. The target always ends on the furthest legal square of the
//! walked prefix; it never skips over an obstruction.

use crate::state::{ActorId, LogData, LogKind, LogRecord, Patch, Position, State};

use super::grid::{is_legal_destination, neighbors8, step_towards};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum ForcedKind {
    Push,
    Pull,
    Slide,
}

/// Pushes `target` straight away from `source` by up to `squares`.
///
/// Occupied squares may be crossed but never ended on; blockers and the
/// board edge stop the push.
pub fn push(state: &State, source: &ActorId, target: &ActorId, squares: u32) -> Vec<Patch> {
    let (Some(from), Some(origin)) = (state.position_of(target), state.position_of(source))
    else {
        return Vec::new();
    };
    let (dx, dy) = step_towards(origin, from);
    if (dx, dy) == (0, 0) {
        return Vec::new();
    }

    let mut path = vec![from];
    let mut current = from;
    for _ in 0..squares {
        let next = current.offset(dx, dy);
        if !state.board.is_open(next) {
            break;
        }
        path.push(next);
        current = next;
    }
    settle(state, ForcedKind::Push, Some(source), target, path)
}

/// Pulls `target` towards `source` by up to `squares`, stopping once adjacent.
///
/// Each step takes the first legal neighbor that strictly reduces the distance
/// to the source, preferring the largest reduction.
pub fn pull(state: &State, source: &ActorId, target: &ActorId, squares: u32) -> Vec<Patch> {
    let (Some(from), Some(origin)) = (state.position_of(target), state.position_of(source))
    else {
        return Vec::new();
    };

    let mut path = vec![from];
    let mut current = from;
    for _ in 0..squares {
        let distance = current.distance(origin);
        if distance <= 1 {
            break;
        }
        let best = neighbors8(current)
            .into_iter()
            .filter(|cell| cell.distance(origin) < distance)
            .filter(|cell| is_legal_destination(&state.board, *cell, target))
            .min_by_key(|cell| cell.distance(origin));
        let Some(next) = best else {
            break;
        };
        path.push(next);
        current = next;
    }
    settle(state, ForcedKind::Pull, Some(source), target, path)
}

/// Slides `target` up to `squares`, letting `choose` pick each step.
///
/// `choose` receives the current square and the legal neighbors. Returning
/// `None` ends the slide early; returning a square that is not among the
/// candidates falls back to the first candidate.
pub fn slide<F>(
    state: &State,
    source: Option<&ActorId>,
    target: &ActorId,
    squares: u32,
    mut choose: F,
) -> Vec<Patch>
where
    F: FnMut(Position, &[Position]) -> Option<Position>,
{
    let Some(from) = state.position_of(target) else {
        return Vec::new();
    };

    let mut path = vec![from];
    let mut current = from;
    for _ in 0..squares {
        let candidates: Vec<Position> = neighbors8(current)
            .into_iter()
            .filter(|cell| is_legal_destination(&state.board, *cell, target))
            .filter(|cell| !path.contains(cell))
            .collect();
        let Some(&fallback) = candidates.first() else {
            break;
        };
        let Some(choice) = choose(current, &candidates) else {
            break;
        };
        let next = if candidates.contains(&choice) {
            choice
        } else {
            fallback
        };
        path.push(next);
        current = next;
    }
    settle(state, ForcedKind::Slide, source, target, path)
}

/// Trims `path` back to its last square the target may stand on and emits
/// the move.
fn settle(
    state: &State,
    kind: ForcedKind,
    source: Option<&ActorId>,
    target: &ActorId,
    mut path: Vec<Position>,
) -> Vec<Patch> {
    while path.len() > 1
        && path
            .last()
            .is_some_and(|cell| !is_legal_destination(&state.board, *cell, target))
    {
        path.pop();
    }
    let (Some(&from), Some(&to)) = (path.first(), path.last()) else {
        return Vec::new();
    };

    let mut patches = Vec::with_capacity(2);
    if from != to {
        patches.push(Patch::SetPosition {
            actor: target.clone(),
            to,
        });
    }
    let source = source.cloned().unwrap_or_else(|| target.clone());
    patches.push(Patch::log(LogRecord::new(
        LogKind::ForcedMove,
        format!("{source}: {kind} {target} from {from} to {to}"),
        LogData::ForcedMove {
            kind,
            source,
            target: target.clone(),
            from,
            to,
            path,
        },
    )));
    patches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply_patches;
    use crate::state::{Actor, Board};

    fn duel(board: Board, source: Position, target: Position) -> State {
        State::new(42, board)
            .with_actor(Actor::new("S", "heroes", 20), source)
            .with_actor(Actor::new("T", "monsters", 20), target)
    }

    #[test]
    fn push_stops_at_the_near_edge_of_a_blocker() {
        let board = Board::new(10, 10).with_blockers([Position::new(6, 2)]);
        let mut state = duel(board, Position::new(2, 2), Position::new(3, 2));
        let patches = push(&state, &"S".into(), &"T".into(), 5);
        apply_patches(&mut state, &patches);
        assert_eq!(state.position_of(&"T".into()), Some(Position::new(5, 2)));
    }

    #[test]
    fn push_never_ends_on_an_occupied_square() {
        let mut state = duel(Board::new(10, 10), Position::new(0, 0), Position::new(1, 0))
            .with_actor(Actor::new("X", "monsters", 20), Position::new(3, 0));
        let patches = push(&state, &"S".into(), &"T".into(), 2);
        apply_patches(&mut state, &patches);
        assert_eq!(state.position_of(&"T".into()), Some(Position::new(2, 0)));
    }

    #[test]
    fn pull_stops_once_adjacent() {
        let mut state = duel(Board::new(10, 10), Position::new(2, 2), Position::new(7, 2));
        let patches = pull(&state, &"S".into(), &"T".into(), 5);
        apply_patches(&mut state, &patches);
        let at = state.position_of(&"T".into()).expect("position");
        assert_eq!(at.distance(Position::new(2, 2)), 1);
    }

    #[test]
    fn slide_follows_the_chooser() {
        let mut state = State::new(42, Board::new(10, 10))
            .with_actor(Actor::new("T", "monsters", 20), Position::new(0, 0));
        let chooser = |current: Position, options: &[Position]| {
            options
                .iter()
                .copied()
                .find(|c| *c == current.offset(1, 0))
                .or_else(|| options.first().copied())
        };
        let patches = slide(&state, None, &"T".into(), 3, chooser);
        apply_patches(&mut state, &patches);
        assert_eq!(state.position_of(&"T".into()), Some(Position::new(3, 0)));
        assert_eq!(state.log.last().map(|e| e.kind), Some(LogKind::ForcedMove));
    }
}
