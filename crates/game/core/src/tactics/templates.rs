//! Area template footprints.

use std::collections::BTreeSet;

use crate::state::{Board, Position};

pub type Cells = BTreeSet<Position>;

/// Eight-way unit facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Facing {
    pub x: i32,
    pub y: i32,
}

impl Facing {
    pub const EAST: Self = Self { x: 1, y: 0 };

    /// Facing rotated a quarter turn to the left.
    const fn lateral(self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }
}

impl Default for Facing {
    fn default() -> Self {
        Self::EAST
    }
}

/// Quantizes a vector to one of the eight directions. A zero vector faces east.
pub fn facing_from_vector(dx: i32, dy: i32) -> Facing {
    match (dx.signum(), dy.signum()) {
        (0, 0) => Facing::EAST,
        (x, y) => Facing { x, y },
    }
}

pub fn cells_for_single(anchor: Position) -> Cells {
    Cells::from([anchor])
}

/// All cells within Chebyshev `radius` of `center`, clipped to the board.
pub fn cells_for_burst(center: Position, radius: u32, board: &Board) -> Cells {
    let r = radius as i32;
    (-r..=r)
        .flat_map(|dx| (-r..=r).map(move |dy| center.offset(dx, dy)))
        .filter(|cell| board.in_bounds(*cell))
        .collect()
}

/// A `size` by `size` block projected forward from `origin`.
///
/// The origin cell itself is never included. Even sizes bias one column to the
/// positive lateral side and add one on the negative side so the footprint is
/// still `size` wide.
pub fn cells_for_blast(origin: Position, facing: Facing, size: u32, board: &Board) -> Cells {
    let forward = facing_from_vector(facing.x, facing.y);
    let lateral = forward.lateral();
    let size = size as i32;
    let half = (size - 1) / 2;
    let even = size % 2 == 0;

    let at = |i: i32, offset: i32| {
        origin.offset(
            i * forward.x + offset * lateral.x,
            i * forward.y + offset * lateral.y,
        )
    };

    let mut cells = Cells::new();
    for i in 1..=size {
        for j in -half..=half {
            let offset = if even && j == half { half } else { j };
            cells.insert(at(i, offset));
        }
        if even {
            cells.insert(at(i, -half - 1));
        }
    }
    cells.retain(|cell| board.in_bounds(*cell));
    cells
}

/// Every board cell that can serve as an area-burst center within `range`.
pub fn area_burst_centers_within(attacker: Position, range: u32, board: &Board) -> Cells {
    (0..board.width)
        .flat_map(|x| (0..board.height).map(move |y| Position::new(x, y)))
        .filter(|cell| attacker.distance(*cell) <= range)
        .collect()
}
