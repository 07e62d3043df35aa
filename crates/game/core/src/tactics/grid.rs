//! Grid primitives: distance, neighbor enumeration, cell legality.

use arrayvec::ArrayVec;

use crate::config::RulesConfig;
use crate::state::{ActorId, Board, Position};

/// Orthogonal steps, in enumeration order.
pub const CARDINALS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Diagonal steps, enumerated after the cardinals.
pub const DIAGONALS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub type Neighbors = ArrayVec<Position, { RulesConfig::MAX_NEIGHBORS }>;

#[inline]
pub fn chebyshev(a: Position, b: Position) -> u32 {
    a.distance(b)
}

pub fn neighbors4(cell: Position) -> Neighbors {
    CARDINALS
        .iter()
        .map(|&(dx, dy)| cell.offset(dx, dy))
        .collect()
}

pub fn neighbors8(cell: Position) -> Neighbors {
    CARDINALS
        .iter()
        .chain(DIAGONALS.iter())
        .map(|&(dx, dy)| cell.offset(dx, dy))
        .collect()
}

/// A cell `actor` could stop on: open and not occupied by anyone else.
pub fn is_legal_destination(board: &Board, cell: Position, actor: &ActorId) -> bool {
    board.is_open(cell) && !board.is_occupied_by_other(cell, actor)
}

/// Unit step from `from` towards `to` on each axis (`-1`, `0` or `1`).
#[inline]
pub fn step_towards(from: Position, to: Position) -> (i32, i32) {
    ((to.x - from.x).signum(), (to.y - from.y).signum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbor_sets_have_expected_sizes() {
        let cell = Position::new(2, 2);
        assert_eq!(neighbors4(cell).len(), 4);
        let all = neighbors8(cell);
        assert_eq!(all.len(), 8);
        assert!(all.iter().all(|n| chebyshev(cell, *n) == 1));
        assert_eq!(all[0], Position::new(3, 2));
    }

    #[test]
    fn legal_destination_excludes_blockers_and_others() {
        let mut board = Board::new(4, 4).with_blockers([Position::new(1, 1)]);
        board.positions.insert("A1".into(), Position::new(0, 0));
        board.positions.insert("E1".into(), Position::new(2, 2));
        let mover = ActorId::from("A1");

        assert!(is_legal_destination(&board, Position::new(0, 0), &mover));
        assert!(!is_legal_destination(&board, Position::new(1, 1), &mover));
        assert!(!is_legal_destination(&board, Position::new(2, 2), &mover));
        assert!(!is_legal_destination(&board, Position::new(4, 0), &mover));
    }
}
