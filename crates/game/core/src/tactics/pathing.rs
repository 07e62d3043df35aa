//! A* pathfinding and budgeted flood fill over 8-connected cells.
//!
//! Cost model: entering a cell costs 1, or 2 if it is difficult terrain.
//! Blocked cells are impassable. An occupied cell can be passed through when
//! its occupant is not an enemy of the mover, but never used as the final
//! destination; enemy-occupied cells are impassable.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::config::RulesConfig;
use crate::state::{ActorId, Position, State};

use super::grid::neighbors8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathOptions {
    /// Actor doing the moving; enables enemy blocking and self-exclusion.
    pub mover: Option<ActorId>,
    pub allow_ally_pass_through: bool,
}

impl PathOptions {
    pub fn for_mover(mover: ActorId) -> Self {
        Self {
            mover: Some(mover),
            allow_ally_pass_through: true,
        }
    }
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            mover: None,
            allow_ally_pass_through: true,
        }
    }
}

/// A path including both endpoints, and its total entry cost.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathResult {
    pub path: Vec<Position>,
    pub cost: u32,
}

/// How an occupied cell treats the mover.
enum Occupancy {
    Free,
    PassOnly,
    Impassable,
}

fn occupancy(state: &State, cell: Position, opts: &PathOptions) -> Occupancy {
    let occupant = state
        .board
        .positions
        .iter()
        .find(|(id, pos)| **pos == cell && Some(*id) != opts.mover.as_ref())
        .map(|(id, _)| id);

    match (occupant, opts.mover.as_ref()) {
        (None, _) => Occupancy::Free,
        (Some(occupant), Some(mover)) if state.are_enemies(mover, occupant) => {
            Occupancy::Impassable
        }
        (Some(_), _) if opts.allow_ally_pass_through => Occupancy::PassOnly,
        (Some(_), _) => Occupancy::Impassable,
    }
}

/// Cheapest path from `start` to `goal`, or `None` if the goal cannot be
/// reached or cannot be stood on.
pub fn find_path(
    state: &State,
    start: Position,
    goal: Position,
    opts: &PathOptions,
) -> Option<PathResult> {
    let board = &state.board;
    if !board.in_bounds(start) || !board.is_open(goal) {
        return None;
    }
    if start == goal {
        return Some(PathResult {
            path: vec![start],
            cost: 0,
        });
    }
    if !matches!(occupancy(state, goal, opts), Occupancy::Free) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut g_score: BTreeMap<Position, u32> = BTreeMap::new();
    let mut came_from: BTreeMap<Position, Position> = BTreeMap::new();
    let mut closed: BTreeSet<Position> = BTreeSet::new();

    g_score.insert(start, 0);
    open.push(Reverse((start.distance(goal), start.distance(goal), start)));

    let mut expansions = 0usize;
    while let Some(Reverse((_, _, current))) = open.pop() {
        if current == goal {
            return Some(reconstruct(state, &came_from, goal));
        }
        if !closed.insert(current) {
            continue;
        }
        expansions += 1;
        if expansions > RulesConfig::MAX_PATH_EXPANSIONS {
            break;
        }

        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);
        for next in neighbors8(current) {
            if !board.is_open(next) || closed.contains(&next) {
                continue;
            }
            match occupancy(state, next, opts) {
                Occupancy::Impassable => continue,
                Occupancy::PassOnly if next == goal => continue,
                Occupancy::PassOnly | Occupancy::Free => {}
            }

            let tentative = current_g.saturating_add(board.step_cost(next));
            if g_score.get(&next).is_none_or(|&known| tentative < known) {
                g_score.insert(next, tentative);
                came_from.insert(next, current);
                let h = next.distance(goal);
                open.push(Reverse((tentative + h, h, next)));
            }
        }
    }
    None
}

fn reconstruct(
    state: &State,
    came_from: &BTreeMap<Position, Position>,
    goal: Position,
) -> PathResult {
    let mut path = vec![goal];
    let mut cursor = goal;
    while let Some(previous) = came_from.get(&cursor) {
        path.push(*previous);
        cursor = *previous;
    }
    path.reverse();
    let cost = path_cost(state, &path);
    PathResult { path, cost }
}

/// Sum of entry costs for every cell after the first.
pub fn path_cost(state: &State, path: &[Position]) -> u32 {
    path.iter()
        .skip(1)
        .map(|cell| state.board.step_cost(*cell))
        .sum()
}

/// Cells `actor` can stop on within `budget` movement.
///
/// Includes the starting cell. Enemy-occupied cells are never entered and
/// occupied cells are never returned. Growing the budget never shrinks the
/// result.
pub fn reachable(state: &State, actor: &ActorId, budget: u32) -> BTreeSet<Position> {
    let Some(start) = state.position_of(actor) else {
        return BTreeSet::new();
    };
    let opts = PathOptions::for_mover(actor.clone());
    let board = &state.board;

    let mut best: BTreeMap<Position, u32> = BTreeMap::new();
    let mut frontier = BinaryHeap::new();
    best.insert(start, 0);
    frontier.push(Reverse((0u32, start)));

    while let Some(Reverse((cost, current))) = frontier.pop() {
        if best.get(&current).is_some_and(|&known| cost > known) {
            continue;
        }
        for next in neighbors8(current) {
            if !board.is_open(next) {
                continue;
            }
            if matches!(occupancy(state, next, &opts), Occupancy::Impassable) {
                continue;
            }
            let next_cost = cost + board.step_cost(next);
            if next_cost > budget {
                continue;
            }
            if best.get(&next).is_none_or(|&known| next_cost < known) {
                best.insert(next, next_cost);
                frontier.push(Reverse((next_cost, next)));
            }
        }
    }

    best.into_keys()
        .filter(|cell| *cell == start || !board.is_occupied_by_other(*cell, actor))
        .collect()
}
