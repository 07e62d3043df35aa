//! Line of effect.
//!
//! Corner-to-corner supercover sampling: a line is traced from each of the
//! four corners of the origin cell to each of the four corners of the target
//! cell, and LoE exists if any of the 16 lines crosses no blocker. Origin and
//! target cells themselves never block. The "any pair" rule deliberately lets
//! diagonal sightlines slip past a single corner.
//!
//! Sampling uses exact integer arithmetic: point `i` of `steps` along the
//! segment is floored with Euclidean division, so results never depend on
//! floating-point rounding.

use std::collections::BTreeSet;

use crate::state::{Board, Position};

const CORNERS: [(i32, i32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

/// Cells touched by the segment between two lattice points.
fn supercover(from: (i32, i32), to: (i32, i32)) -> BTreeSet<Position> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()) as i64 * 4 + 1;
    (0..=steps)
        .map(|i| {
            let x = (i64::from(from.0) * steps + i64::from(dx) * i).div_euclid(steps);
            let y = (i64::from(from.1) * steps + i64::from(dy) * i).div_euclid(steps);
            Position::new(x as i32, y as i32)
        })
        .collect()
}

pub fn has_line_of_effect(board: &Board, from: Position, to: Position) -> bool {
    if from == to {
        return true;
    }
    CORNERS.iter().any(|&(ax, ay)| {
        CORNERS.iter().any(|&(bx, by)| {
            supercover((from.x + ax, from.y + ay), (to.x + bx, to.y + by))
                .into_iter()
                .filter(|cell| *cell != from && *cell != to)
                .all(|cell| !board.is_blocked(cell))
        })
    })
}
