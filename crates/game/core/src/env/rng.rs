//! Counter-based dice for deterministic rolls.
//!
//! Every draw is a pure function of `(seed, index)`: the seed is mixed with
//! the draw index and pushed through one PCG output permutation. There is no
//! stream state to carry around, so any roll can be recomputed from the
//! state's `rng` record alone.
//!
//! # Determinism
//!
//! [`roll`] never mutates the state. It returns the patches that advance
//! `rng.cursor` by the number of draws consumed and log the roll. Callers must
//! apply them before rolling again in the same logical action, otherwise the
//! next roll reuses the same draws.

use crate::state::{LogData, LogKind, LogRecord, Patch, RngStamp, State};

/// PCG random number generator (Permuted Congruential Generator).
///
/// Uses the PCG-XSH-RR output function over a 64-bit LCG step.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    /// `state' = state * multiplier + increment (mod 2^64)`
    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    /// XSH-RR: xorshift high bits, then a state-dependent rotation.
    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform 32-bit value for draw `index` under `seed`.
    pub fn draw(seed: u64, index: u64) -> u32 {
        Self::output(Self::step(mix(seed, index)))
    }

    /// Die face in `1..=sides` for draw `index` under `seed`.
    pub fn die(seed: u64, index: u64, sides: u32) -> i32 {
        let scaled = (u64::from(Self::draw(seed, index)) * u64::from(sides)) >> 32;
        scaled as i32 + 1
    }
}

/// SplitMix-style avalanche of seed and draw index.
#[inline]
fn mix(seed: u64, index: u64) -> u64 {
    let mut hash = seed;
    hash ^= index.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xc4ceb9fe1a85ec53);
    hash ^= hash >> 33;
    hash
}

/// One term of a summed roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DiceTerm {
    /// A single die with the given number of faces.
    Die(u32),
    Flat(i32),
}

/// What to roll.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DiceSpec {
    D20,
    D6,
    /// Sum of the terms, one part per term.
    Sum(Vec<DiceTerm>),
}

impl DiceSpec {
    /// `count` dice of `sides` faces plus a flat modifier.
    pub fn pool(count: u32, sides: u32, flat: i32) -> Self {
        let mut terms: Vec<DiceTerm> = (0..count).map(|_| DiceTerm::Die(sides)).collect();
        if flat != 0 {
            terms.push(DiceTerm::Flat(flat));
        }
        Self::Sum(terms)
    }

    fn label(&self) -> String {
        match self {
            Self::D20 => "d20".to_owned(),
            Self::D6 => "d6".to_owned(),
            Self::Sum(terms) => {
                let labels: Vec<String> = terms
                    .iter()
                    .map(|term| match term {
                        DiceTerm::Die(sides) => format!("d{sides}"),
                        DiceTerm::Flat(value) => value.to_string(),
                    })
                    .collect();
                labels.join("+")
            }
        }
    }
}

/// Outcome of a roll plus the patches that commit it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roll {
    pub result: i32,
    pub parts: Vec<i32>,
    pub patches: Vec<Patch>,
}

/// Rolls `spec` at the state's current cursor.
///
/// A zero-faced die contributes 0 and consumes no draw.
pub fn roll(state: &State, spec: &DiceSpec) -> Roll {
    let seed = state.rng.seed;
    let start = state.rng.cursor;
    let mut draws = 0u64;
    let mut next_die = |sides: u32| -> i32 {
        if sides == 0 {
            return 0;
        }
        let face = PcgRng::die(seed, start + draws, sides);
        draws += 1;
        face
    };

    let parts: Vec<i32> = match spec {
        DiceSpec::D20 => vec![next_die(20)],
        DiceSpec::D6 => vec![next_die(6)],
        DiceSpec::Sum(terms) => terms
            .iter()
            .map(|term| match *term {
                DiceTerm::Die(sides) => next_die(sides),
                DiceTerm::Flat(value) => value,
            })
            .collect(),
    };
    let result = parts.iter().sum();

    let patches = vec![
        Patch::SetRngCursor {
            cursor: start + draws,
        },
        Patch::log(LogRecord::new(
            LogKind::Roll,
            format!("Rolled {} = {result}", spec.label()),
            LogData::Roll {
                spec: spec.clone(),
                result,
                parts: parts.clone(),
                rng: RngStamp { seed, idx: start },
            },
        )),
    ];

    Roll {
        result,
        parts,
        patches,
    }
}

/// Rolls a d20 unless a forced face is supplied.
///
/// Forced faces consume no draw and emit no patches.
pub fn roll_d20(state: &State, forced: Option<i32>) -> Roll {
    match forced {
        Some(face) => Roll {
            result: face,
            parts: vec![face],
            patches: Vec::new(),
        },
        None => roll(state, &DiceSpec::D20),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply_patches;

    #[test]
    fn same_seed_and_cursor_yield_same_roll() {
        let state = State::new(1234, Default::default());
        let first = roll(&state, &DiceSpec::D20);
        let second = roll(&state, &DiceSpec::D20);
        assert_eq!(first, second);
        assert!((1..=20).contains(&first.result));
    }

    #[test]
    fn cursor_advances_by_number_of_draws() {
        let mut state = State::new(7, Default::default());
        let rolled = roll(
            &state,
            &DiceSpec::Sum(vec![DiceTerm::Die(6), DiceTerm::Flat(3), DiceTerm::Die(8)]),
        );
        apply_patches(&mut state, &rolled.patches);

        assert_eq!(state.rng.cursor, 2);
        assert_eq!(rolled.parts.len(), 3);
        assert_eq!(rolled.parts[1], 3);
        assert_eq!(rolled.result, rolled.parts.iter().sum::<i32>());
        assert_eq!(state.log.last().map(|e| e.kind), Some(LogKind::Roll));
    }

    #[test]
    fn faces_stay_in_range_across_many_draws() {
        for index in 0..2_000 {
            let face = PcgRng::die(99, index, 6);
            assert!((1..=6).contains(&face), "face {face} at {index}");
        }
    }

    #[test]
    fn distinct_cursors_produce_varied_faces() {
        let faces: std::collections::BTreeSet<i32> =
            (0..200).map(|i| PcgRng::die(5, i, 20)).collect();
        assert!(faces.len() > 10);
    }

    #[test]
    fn forced_d20_bypasses_the_rng() {
        let state = State::new(3, Default::default());
        let rolled = roll_d20(&state, Some(17));
        assert_eq!(rolled.result, 17);
        assert!(rolled.patches.is_empty());
    }
}
