//! Damage rolls and application.
//!
//! # Application order
//!
//! ```text
//! adjusted  = immune ? 0 : max(0, amount + vulnerable - resist)
//! absorbed  = min(temp, adjusted)
//! remaining = adjusted - absorbed
//! raw       = current - remaining
//!
//! raw <= -floor(max / 2)  => dead
//! current > 0 >= raw      => dying, hp stored as 0
//! already at 0 or below   => +1 death-save failure, stabilization lost
//! ```

use tracing::debug;

use crate::effects::remove_condition;
use crate::env::{DiceSpec, DiceTerm, roll};
use crate::state::{
    Ability, ActorId, DamageType, DeathState, FlagsUpdate, HitPoints, LogData, LogKind, LogRecord,
    Patch, State,
};

use super::{BonusPart, BonusSource, total_of};

/// `n` dice of `d` faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiceGroup {
    pub n: u32,
    pub d: u32,
}

impl DiceGroup {
    pub const fn new(n: u32, d: u32) -> Self {
        Self { n, d }
    }

    pub fn max(&self) -> i32 {
        i32::try_from(self.n.saturating_mul(self.d)).unwrap_or(i32::MAX)
    }

    /// `floor(n * (d + 1) / 2)`, used for any pool that is not all d6.
    pub fn average(&self) -> i32 {
        let doubled = u64::from(self.n) * (u64::from(self.d) + 1);
        i32::try_from(doubled / 2).unwrap_or(i32::MAX)
    }

    pub const fn is_d6(&self) -> bool {
        self.d == 6
    }
}

/// Damage dealt on a hit or a miss.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DamageSpec {
    pub dice: Vec<DiceGroup>,
    pub flat: i32,
    /// Attacker ability modifier added to the total.
    pub ability: Option<Ability>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub damage_type: DamageType,
    pub half_on_miss: bool,
}

impl DamageSpec {
    pub fn dice(n: u32, d: u32) -> Self {
        Self {
            dice: vec![DiceGroup::new(n, d)],
            ..Self::default()
        }
    }

    pub fn flat(value: i32) -> Self {
        Self {
            flat: value,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.ability = Some(ability);
        self
    }

    #[must_use]
    pub fn with_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    #[must_use]
    pub fn with_flat(mut self, flat: i32) -> Self {
        self.flat = flat;
        self
    }

    #[must_use]
    pub fn half_on_miss(mut self) -> Self {
        self.half_on_miss = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DamageOptions {
    /// Maximize every die.
    pub crit: bool,
    pub on_miss: bool,
    /// Attacker is weakened: halve the total.
    pub weakened: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DamageRoll {
    pub total: i32,
    pub parts: Vec<BonusPart>,
    pub patches: Vec<Patch>,
}

/// Rolls `spec` for `attacker` hitting `defender`.
///
/// Only all-d6 pools draw from the RNG. Any other pool uses the fixed
/// average of each group and leaves the cursor alone. Crits maximize dice
/// without drawing. Halving (weakened, then half on miss)
/// rounds down and is recorded as negative parts so the parts always sum to
/// the total.
pub fn evaluate_damage(
    state: &State,
    attacker: &ActorId,
    defender: &ActorId,
    spec: &DamageSpec,
    options: DamageOptions,
) -> DamageRoll {
    let mut parts = Vec::new();
    let mut patches = Vec::new();

    if options.crit {
        parts.extend(
            spec.dice
                .iter()
                .map(|group| BonusPart::new(BonusSource::CritDice, group.max())),
        );
    } else if spec.dice.iter().all(DiceGroup::is_d6) {
        let terms: Vec<DiceTerm> = spec
            .dice
            .iter()
            .flat_map(|group| (0..group.n).map(move |_| DiceTerm::Die(group.d)))
            .collect();
        if !terms.is_empty() {
            let rolled = roll(state, &DiceSpec::Sum(terms));
            parts.push(BonusPart::new(BonusSource::Dice, rolled.result));
            patches.extend(rolled.patches);
        }
    } else {
        parts.extend(
            spec.dice
                .iter()
                .map(|group| BonusPart::new(BonusSource::AverageDice, group.average())),
        );
    }
    if spec.flat != 0 {
        parts.push(BonusPart::new(BonusSource::Flat, spec.flat));
    }
    if let Some(ability) = spec.ability {
        let modifier = state
            .actor(attacker)
            .map_or(0, |actor| actor.abilities.get(ability));
        parts.push(BonusPart::new(BonusSource::Ability, modifier));
    }

    let mut total = total_of(&parts);
    if options.weakened {
        let halved = total.div_euclid(2);
        parts.push(BonusPart::new(BonusSource::Weakened, halved - total));
        total = halved;
    }
    if options.on_miss && spec.half_on_miss {
        let halved = total.div_euclid(2);
        parts.push(BonusPart::new(BonusSource::HalfOnMiss, halved - total));
        total = halved;
    }

    patches.push(Patch::log(LogRecord::new(
        LogKind::DamageRoll,
        format!("{attacker} rolls {total} damage against {defender}"),
        LogData::DamageRoll {
            attacker: attacker.clone(),
            defender: defender.clone(),
            crit: options.crit,
            parts: parts.clone(),
            total,
        },
    )));
    DamageRoll {
        total,
        parts,
        patches,
    }
}

/// Applies `amount` of `damage_type` damage to `actor`.
///
/// Handles resistances, temp HP, bloodied transitions, dropping to 0,
/// death-save failures for actors already dying, and instant death. The dead
/// take no further damage.
pub fn apply_damage(
    state: &State,
    actor: &ActorId,
    amount: i32,
    damage_type: DamageType,
) -> Vec<Patch> {
    let Some(target) = state.actor(actor) else {
        debug!(%actor, "damage to unknown actor ignored");
        return Vec::new();
    };
    if target.flags.dead {
        debug!(%actor, "damage to dead actor ignored");
        return Vec::new();
    }

    let adjusted = if target.immune.contains(&damage_type) {
        0
    } else {
        let vulnerable = target.vulnerable.get(&damage_type).copied().unwrap_or(0);
        let resist = target.resist.get(&damage_type).copied().unwrap_or(0);
        (amount + vulnerable - resist).max(0)
    };
    let before = target.hp;
    let absorbed = before.temp.min(adjusted).max(0);
    let remaining = adjusted - absorbed;
    let raw = before.current - remaining;
    let after = HitPoints {
        current: raw.max(before.current.min(0)).max(-before.max),
        temp: before.temp - absorbed,
        ..before
    };

    let mut patches = Vec::new();
    if absorbed > 0 {
        patches.push(Patch::SetTempHp {
            actor: actor.clone(),
            temp: after.temp,
        });
    }
    if after.current != before.current {
        patches.push(Patch::SetHp {
            actor: actor.clone(),
            current: after.current,
        });
    }
    patches.push(Patch::log(LogRecord::new(
        LogKind::DamageApply,
        format!("{actor} takes {remaining} {damage_type} damage ({absorbed} absorbed)"),
        LogData::DamageApply {
            actor: actor.clone(),
            amount,
            adjusted,
            absorbed,
            hp: after,
        },
    )));
    if remaining == 0 {
        return patches;
    }

    let bloodied = after.is_bloodied();
    if bloodied != target.flags.bloodied {
        patches.push(Patch::MergeFlags {
            actor: actor.clone(),
            update: FlagsUpdate {
                bloodied: Some(bloodied),
                ..FlagsUpdate::default()
            },
        });
        let (kind, msg) = if bloodied {
            (LogKind::BloodiedEnter, format!("{actor} is bloodied"))
        } else {
            (LogKind::BloodiedExit, format!("{actor} is no longer bloodied"))
        };
        patches.push(Patch::log(hp_record(kind, msg, actor, after)));
    }

    if raw <= -before.bloodied_value() {
        patches.extend(kill(state, actor, after, "massive damage"));
    } else if before.current > 0 && raw <= 0 {
        patches.push(Patch::MergeFlags {
            actor: actor.clone(),
            update: FlagsUpdate {
                dying: Some(true),
                ..FlagsUpdate::default()
            },
        });
        patches.push(Patch::log(hp_record(
            LogKind::DropToZero,
            format!("{actor} drops to 0 HP and is dying"),
            actor,
            after,
        )));
    } else if before.current <= 0 {
        let death = DeathState {
            failures: target.death.failures.saturating_add(1),
            stabilized: false,
        };
        patches.push(Patch::SetDeath {
            actor: actor.clone(),
            death,
        });
        if !target.flags.dying {
            patches.push(Patch::MergeFlags {
                actor: actor.clone(),
                update: FlagsUpdate {
                    dying: Some(true),
                    ..FlagsUpdate::default()
                },
            });
        }
        if death.failures >= state.rules.death_failures_to_die {
            patches.extend(kill(state, actor, after, "death-save failures"));
        }
    }
    patches
}

/// Removes everything tied to a dead actor: effects it holds or sources,
/// its delay/ready entries, and windows it provoked or alone could answer.
pub fn death_cleanup(state: &State, actor: &ActorId) -> Vec<Patch> {
    let mut patches: Vec<Patch> = state
        .effects
        .values()
        .filter(|effect| effect.involves(actor))
        .flat_map(|effect| remove_condition(state, &effect.id))
        .collect();
    patches.extend(
        state
            .queue
            .iter()
            .filter(|entry| &entry.actor == actor)
            .map(|entry| Patch::Dequeue { seq: entry.seq }),
    );
    patches.extend(
        state
            .reactions
            .iter()
            .filter(|event| event.is_open())
            .filter(|event| {
                event.trigger.provoker() == actor || event.eligible.iter().all(|id| id == actor)
            })
            .map(|event| Patch::CloseReaction { id: event.id }),
    );
    patches
}

pub(crate) fn kill(state: &State, actor: &ActorId, hp: HitPoints, cause: &str) -> Vec<Patch> {
    let mut patches = vec![
        Patch::MergeFlags {
            actor: actor.clone(),
            update: FlagsUpdate {
                dead: Some(true),
                dying: Some(false),
                ..FlagsUpdate::default()
            },
        },
        Patch::log(hp_record(
            LogKind::Die,
            format!("{actor} dies ({cause})"),
            actor,
            hp,
        )),
    ];
    patches.extend(death_cleanup(state, actor));
    patches
}

pub(crate) fn hp_record(kind: LogKind, msg: String, actor: &ActorId, hp: HitPoints) -> LogRecord {
    LogRecord::new(
        kind,
        msg,
        LogData::Hp {
            actor: actor.clone(),
            hp,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::apply_condition;
    use crate::engine::apply_patches;
    use crate::state::{Actor, Board, ConditionId, Duration, EffectData, Position};

    fn target(actor: Actor) -> (State, ActorId) {
        let id = actor.id.clone();
        let state = State::new(3, Board::new(6, 6))
            .with_actor(Actor::new("A", "heroes", 20), Position::new(0, 0))
            .with_actor(actor, Position::new(1, 0));
        (state, id)
    }

    fn hit(state: &mut State, actor: &ActorId, amount: i32, damage_type: DamageType) {
        let patches = apply_damage(state, actor, amount, damage_type);
        apply_patches(state, &patches);
    }

    #[test]
    fn temp_hp_absorbs_before_hit_points() {
        let (mut state, id) = target(Actor::new("T", "monsters", 20));
        state.actors.get_mut(&id).expect("actor").hp.temp = 5;
        hit(&mut state, &id, 8, DamageType::Untyped);
        let hp = state.actor(&id).expect("actor").hp;
        assert_eq!((hp.current, hp.temp), (17, 0));
    }

    #[test]
    fn resist_vulnerable_and_immune() {
        let (mut state, id) = target(
            Actor::new("T", "monsters", 30)
                .with_resist(DamageType::Fire, 5)
                .with_vulnerability(DamageType::Radiant, 5)
                .with_immunity(DamageType::Poison),
        );
        hit(&mut state, &id, 4, DamageType::Fire);
        hit(&mut state, &id, 2, DamageType::Radiant);
        hit(&mut state, &id, 50, DamageType::Poison);
        assert_eq!(state.actor(&id).expect("actor").hp.current, 23);
    }

    #[test]
    fn crossing_half_hp_enters_bloodied() {
        let (mut state, id) = target(Actor::new("T", "monsters", 20));
        hit(&mut state, &id, 10, DamageType::Untyped);
        assert!(state.actor(&id).expect("actor").flags.bloodied);
        assert!(state.log.iter().any(|e| e.kind == LogKind::BloodiedEnter));
    }

    #[test]
    fn dropping_to_zero_starts_dying() {
        let (mut state, id) = target(Actor::new("T", "monsters", 20).with_hp(3, 20));
        hit(&mut state, &id, 10, DamageType::Untyped);
        let actor = state.actor(&id).expect("actor");
        assert_eq!(actor.hp.current, 0);
        assert!(actor.flags.dying && !actor.flags.dead);
        assert!(state.log.iter().any(|e| e.kind == LogKind::DropToZero));
    }

    #[test]
    fn massive_damage_kills_outright() {
        let (mut state, id) = target(Actor::new("T", "monsters", 20).with_hp(3, 20));
        hit(&mut state, &id, 13, DamageType::Untyped);
        let actor = state.actor(&id).expect("actor");
        assert!(actor.flags.dead && !actor.flags.dying);
        assert!(actor.hp.current >= -actor.hp.max);
    }

    #[test]
    fn damage_while_dying_accrues_failures_until_death() {
        let (mut state, id) = target(Actor::new("T", "monsters", 20).with_hp(0, 20));
        for _ in 0..2 {
            hit(&mut state, &id, 1, DamageType::Untyped);
        }
        assert_eq!(state.actor(&id).expect("actor").death.failures, 2);
        hit(&mut state, &id, 1, DamageType::Untyped);
        assert!(state.actor(&id).expect("actor").flags.dead);
    }

    #[test]
    fn death_removes_effects_the_actor_is_part_of() {
        let (mut state, id) = target(Actor::new("T", "monsters", 20).with_hp(1, 20));
        let slowed = apply_condition(
            &state,
            ConditionId::Slowed,
            &id,
            &"A".into(),
            Duration::Encounter,
            EffectData::default(),
        );
        apply_patches(&mut state, &slowed);
        assert_eq!(state.effects.len(), 1);
        hit(&mut state, &id, 20, DamageType::Untyped);
        assert!(state.actor(&id).expect("actor").flags.dead);
        assert!(state.effects.is_empty());
        assert!(state.actor(&"A".into()).expect("actor").conditions.is_empty());
    }

    #[test]
    fn crit_maximizes_dice_and_weakened_halves() {
        let state = State::new(1, Board::new(4, 4))
            .with_actor(Actor::new("A", "heroes", 20).with_ability(Ability::Str, 3), Position::new(0, 0));
        let spec = DamageSpec::dice(2, 6).with_ability(Ability::Str);
        let crit = evaluate_damage(
            &state,
            &"A".into(),
            &"D".into(),
            &spec,
            DamageOptions {
                crit: true,
                ..DamageOptions::default()
            },
        );
        assert_eq!(crit.total, 15);
        let weak = evaluate_damage(
            &state,
            &"A".into(),
            &"D".into(),
            &spec,
            DamageOptions {
                crit: true,
                weakened: true,
                ..DamageOptions::default()
            },
        );
        assert_eq!(weak.total, 7);
        assert_eq!(total_of(&weak.parts), 7);
    }

    fn damage_of(state: &State, spec: &DamageSpec) -> DamageRoll {
        evaluate_damage(state, &"A".into(), &"D".into(), spec, DamageOptions::default())
    }

    #[test]
    fn non_d6_pools_use_the_average_without_drawing() {
        let (state, _) = target(Actor::new("T", "monsters", 20));
        for (spec, expected) in [
            (DamageSpec::dice(1, 8), 4),
            (DamageSpec::dice(2, 10), 11),
            (DamageSpec::dice(1, 4), 2),
        ] {
            let rolled = damage_of(&state, &spec);
            assert_eq!(rolled.total, expected);
            assert_eq!(rolled.parts, vec![BonusPart::new(BonusSource::AverageDice, expected)]);
            assert!(!rolled.patches.iter().any(|p| matches!(p, Patch::SetRngCursor { .. })));

            let mut after = state.clone();
            apply_patches(&mut after, &rolled.patches);
            assert_eq!(after.rng.cursor, state.rng.cursor);
        }
    }

    #[test]
    fn a_mixed_pool_averages_every_group() {
        let (state, _) = target(Actor::new("T", "monsters", 20));
        let spec = DamageSpec {
            dice: vec![DiceGroup::new(1, 6), DiceGroup::new(1, 8)],
            ..DamageSpec::default()
        };
        let rolled = damage_of(&state, &spec);
        assert_eq!(rolled.total, 7);
        assert_eq!(rolled.parts.len(), 2);
    }

    #[test]
    fn d6_pools_draw_one_value_per_die() {
        let (mut state, _) = target(Actor::new("T", "monsters", 20));
        let rolled = damage_of(&state, &DamageSpec::dice(2, 6));
        assert!((2..=12).contains(&rolled.total));
        assert_eq!(rolled.parts[0].source, BonusSource::Dice);
        apply_patches(&mut state, &rolled.patches);
        assert_eq!(state.rng.cursor, 2);
    }

    #[test]
    fn crit_dice_saturate_instead_of_wrapping() {
        assert_eq!(DiceGroup::new(3, 8).max(), 24);
        assert_eq!(DiceGroup::new(u32::MAX, 2).max(), i32::MAX);
        assert_eq!(DiceGroup::new(u32::MAX, u32::MAX).average(), i32::MAX);
    }
}
