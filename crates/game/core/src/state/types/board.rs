use std::collections::{BTreeMap, BTreeSet};

use super::{ActorId, Position};

/// Static per-encounter grid plus the actor placement table.
///
/// `positions` is the only place actor location is recorded.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Board {
    pub width: i32,
    pub height: i32,
    pub blockers: BTreeSet<Position>,
    pub difficult: BTreeSet<Position>,
    pub positions: BTreeMap<ActorId, Position>,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_blockers(mut self, cells: impl IntoIterator<Item = Position>) -> Self {
        self.blockers.extend(cells);
        self
    }

    #[must_use]
    pub fn with_difficult(mut self, cells: impl IntoIterator<Item = Position>) -> Self {
        self.difficult.extend(cells);
        self
    }

    #[inline]
    pub fn in_bounds(&self, cell: Position) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    #[inline]
    pub fn is_blocked(&self, cell: Position) -> bool {
        self.blockers.contains(&cell)
    }

    #[inline]
    pub fn is_difficult(&self, cell: Position) -> bool {
        self.difficult.contains(&cell)
    }

    /// In bounds and not a blocker. Occupancy is checked separately.
    #[inline]
    pub fn is_open(&self, cell: Position) -> bool {
        self.in_bounds(cell) && !self.is_blocked(cell)
    }

    pub fn position_of(&self, actor: &ActorId) -> Option<Position> {
        self.positions.get(actor).copied()
    }

    /// First actor (in id order) standing on `cell`.
    pub fn actor_at(&self, cell: Position) -> Option<&ActorId> {
        self.positions
            .iter()
            .find_map(|(id, pos)| (*pos == cell).then_some(id))
    }

    pub fn is_occupied(&self, cell: Position) -> bool {
        self.actor_at(cell).is_some()
    }

    /// True when some actor other than `except` stands on `cell`.
    pub fn is_occupied_by_other(&self, cell: Position, except: &ActorId) -> bool {
        self.positions
            .iter()
            .any(|(id, pos)| *pos == cell && id != except)
    }

    /// Cost of entering `cell`: 2 for difficult terrain, otherwise 1.
    #[inline]
    pub fn step_cost(&self, cell: Position) -> u32 {
        if self.is_difficult(cell) { 2 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_half_open() {
        let board = Board::new(4, 3);
        assert!(board.in_bounds(Position::new(0, 0)));
        assert!(board.in_bounds(Position::new(3, 2)));
        assert!(!board.in_bounds(Position::new(4, 0)));
        assert!(!board.in_bounds(Position::new(0, -1)));
    }

    #[test]
    fn occupancy_lookup_uses_positions_table() {
        let mut board = Board::new(5, 5);
        board.positions.insert(ActorId::from("A1"), Position::new(1, 1));

        assert_eq!(board.actor_at(Position::new(1, 1)), Some(&ActorId::from("A1")));
        assert!(board.is_occupied(Position::new(1, 1)));
        assert!(!board.is_occupied_by_other(Position::new(1, 1), &ActorId::from("A1")));
        assert!(!board.is_occupied(Position::new(2, 1)));
    }
}
