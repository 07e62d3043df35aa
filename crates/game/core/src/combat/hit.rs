//! Attack bonus breakdown and the d20 check.
//!
//! # Formula
//!
//! ```text
//! total   = d20 + ability + proficiency + enhancement + flat
//!               + combat advantage - cover - concealment
//! defense = defender.defenses[vs] + defender.defense_bonus
//!
//! nat 1   => miss
//! nat 20  => crit
//! else    => hit if total >= defense
//! ```

use crate::effects::{CombatFlags, compute_flags};
use crate::env::roll_d20;
use crate::state::{Ability, ActorId, Defense, Patch, State};

use super::damage::DamageSpec;
use super::{BonusPart, BonusSource, HitOutcome, HitReason, total_of};

/// Delivery of an attack. Ranged and area attacks provoke from adjacent
/// enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum AttackKind {
    #[default]
    MeleeWeapon,
    Ranged,
    Close,
    Area,
}

impl AttackKind {
    pub const fn provokes(self) -> bool {
        matches!(self, Self::Ranged | Self::Area)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[strum(serialize_all = "lowercase")]
pub enum Cover {
    #[default]
    None,
    Cover,
    Superior,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[strum(serialize_all = "lowercase")]
pub enum Concealment {
    #[default]
    None,
    Conceal,
    Total,
}

/// Static description of an attack, usually taken from a power.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AttackSpec {
    pub kind: AttackKind,
    pub vs: Defense,
    pub ability: Ability,
    pub proficiency: i32,
    pub enhancement: i32,
    pub reach: u32,
    pub range: u32,
    pub hit: Option<DamageSpec>,
    pub miss: Option<DamageSpec>,
}

impl Default for AttackSpec {
    fn default() -> Self {
        Self {
            kind: AttackKind::MeleeWeapon,
            vs: Defense::Ac,
            ability: Ability::Str,
            proficiency: 0,
            enhancement: 0,
            reach: 1,
            range: 5,
            hit: None,
            miss: None,
        }
    }
}

impl AttackSpec {
    /// Melee basic attack: STR vs AC, 1d6 + STR on a hit.
    pub fn melee_basic() -> Self {
        Self {
            hit: Some(DamageSpec::dice(1, 6).with_ability(Ability::Str)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_hit(mut self, damage: DamageSpec) -> Self {
        self.hit = Some(damage);
        self
    }

    #[must_use]
    pub fn with_miss(mut self, damage: DamageSpec) -> Self {
        self.miss = Some(damage);
        self
    }
}

/// Per-attack situational modifiers.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackContext {
    pub attacker: ActorId,
    pub defender: ActorId,
    pub flat_bonus: i32,
    pub combat_advantage: bool,
    pub cover: Cover,
    pub concealment: Concealment,
    pub power: Option<String>,
}

impl AttackContext {
    pub fn new(attacker: impl Into<ActorId>, defender: impl Into<ActorId>) -> Self {
        Self {
            attacker: attacker.into(),
            defender: defender.into(),
            ..Self::default()
        }
    }

    /// Same context aimed at another defender.
    #[must_use]
    pub fn against(&self, defender: &ActorId) -> Self {
        Self {
            defender: defender.clone(),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttackBonus {
    pub parts: Vec<BonusPart>,
    pub total: i32,
    /// Defense targeted, including any transient bonus.
    pub defense: i32,
}

/// Itemized attack bonus of `ctx.attacker` against `ctx.defender`.
///
/// Combat advantage applies when the context asks for it, when the defender
/// grants it through a condition, or when the attacker is invisible. Missing
/// actors contribute zero modifiers and a defense of 10.
pub fn compute_attack_bonus(state: &State, ctx: &AttackContext, spec: &AttackSpec) -> AttackBonus {
    let rules = &state.rules;
    let attacker = state.actor(&ctx.attacker);
    let defender = state.actor(&ctx.defender);
    let mut parts = Vec::new();

    let ability = attacker.map_or(0, |actor| actor.abilities.get(spec.ability));
    let candidates = [
        (BonusSource::Ability, ability),
        (BonusSource::Proficiency, spec.proficiency),
        (BonusSource::Enhancement, spec.enhancement),
        (BonusSource::Flat, ctx.flat_bonus),
    ];
    parts.extend(
        candidates
            .into_iter()
            .filter(|(_, value)| *value != 0)
            .map(|(source, value)| BonusPart::new(source, value)),
    );

    let combat_advantage = ctx.combat_advantage
        || compute_flags(state, &ctx.defender).contains(CombatFlags::GRANT_CA)
        || compute_flags(state, &ctx.attacker).contains(CombatFlags::HAS_CA);
    if combat_advantage {
        parts.push(BonusPart::new(
            BonusSource::CombatAdvantage,
            rules.combat_advantage_bonus,
        ));
    }
    match ctx.cover {
        Cover::None => {}
        Cover::Cover => parts.push(BonusPart::new(BonusSource::Cover, -rules.cover_penalty)),
        Cover::Superior => parts.push(BonusPart::new(
            BonusSource::Cover,
            -rules.superior_cover_penalty,
        )),
    }
    match ctx.concealment {
        Concealment::None => {}
        Concealment::Conceal => parts.push(BonusPart::new(
            BonusSource::Concealment,
            -rules.concealment_penalty,
        )),
        Concealment::Total => parts.push(BonusPart::new(
            BonusSource::Concealment,
            -rules.total_concealment_penalty,
        )),
    }

    let defense = defender.map_or(10, |actor| {
        actor.defenses.get(spec.vs) + actor.flags.defense_bonus
    });
    AttackBonus {
        total: total_of(&parts),
        parts,
        defense,
    }
}

/// Result of the d20 check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToHit {
    pub d20: i32,
    pub total: i32,
    pub outcome: HitOutcome,
    pub reason: HitReason,
    /// The face was supplied by the caller rather than drawn.
    pub forced: bool,
    pub patches: Vec<Patch>,
}

/// Rolls a d20, adds `bonus` and compares against `defense`.
pub fn roll_to_hit(state: &State, bonus: i32, defense: i32, force_d20: Option<i32>) -> ToHit {
    let roll = roll_d20(state, force_d20);
    let d20 = roll.result;
    let total = d20 + bonus;
    let (outcome, reason) = match d20 {
        1 => (HitOutcome::Miss, HitReason::Nat1),
        20 => (HitOutcome::Crit, HitReason::Nat20),
        _ if total >= defense => (HitOutcome::Hit, HitReason::TotalMeetsDefense),
        _ => (HitOutcome::Miss, HitReason::TotalBelowDefense),
    };
    ToHit {
        d20,
        total,
        outcome,
        reason,
        forced: force_d20.is_some(),
        patches: roll.patches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Actor, Board, Defenses, Position};

    fn duel() -> State {
        State::new(7, Board::new(8, 8))
            .with_actor(
                Actor::new("A", "heroes", 30).with_ability(Ability::Str, 4),
                Position::new(1, 1),
            )
            .with_actor(
                Actor::new("D", "monsters", 30).with_defenses(Defenses::new(15, 13, 12, 11)),
                Position::new(2, 1),
            )
    }

    #[test]
    fn bonus_itemizes_every_modifier() {
        let state = duel();
        let ctx = AttackContext {
            flat_bonus: 1,
            combat_advantage: true,
            cover: Cover::Superior,
            concealment: Concealment::Conceal,
            ..AttackContext::new("A", "D")
        };
        let spec = AttackSpec {
            proficiency: 2,
            ..AttackSpec::default()
        };
        let bonus = compute_attack_bonus(&state, &ctx, &spec);
        let sources: Vec<BonusSource> = bonus.parts.iter().map(|p| p.source).collect();
        assert_eq!(
            sources,
            vec![
                BonusSource::Ability,
                BonusSource::Proficiency,
                BonusSource::Flat,
                BonusSource::CombatAdvantage,
                BonusSource::Cover,
                BonusSource::Concealment,
            ]
        );
        assert_eq!(bonus.total, 4 + 2 + 1 + 2 - 5 - 2);
        assert_eq!(bonus.defense, 15);
    }

    #[test]
    fn missing_defender_defaults_to_ten() {
        let state = duel();
        let bonus = compute_attack_bonus(
            &state,
            &AttackContext::new("A", "ghost"),
            &AttackSpec::default(),
        );
        assert_eq!(bonus.defense, 10);
    }

    #[test]
    fn natural_faces_override_the_total() {
        let state = duel();
        let low = roll_to_hit(&state, 100, 15, Some(1));
        assert_eq!((low.outcome, low.reason), (HitOutcome::Miss, HitReason::Nat1));
        let high = roll_to_hit(&state, -100, 15, Some(20));
        assert_eq!((high.outcome, high.reason), (HitOutcome::Crit, HitReason::Nat20));
        assert!(high.patches.is_empty());
    }

    #[test]
    fn total_meeting_defense_hits() {
        let state = duel();
        let hit = roll_to_hit(&state, 4, 15, Some(11));
        assert_eq!(hit.outcome, HitOutcome::Hit);
        assert_eq!(hit.reason.to_string(), "TOTAL>=DEFENSE");
        let miss = roll_to_hit(&state, 4, 15, Some(10));
        assert_eq!(miss.reason, HitReason::TotalBelowDefense);
    }
}
