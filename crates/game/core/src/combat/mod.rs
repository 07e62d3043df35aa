//! Attack resolution: to-hit math, damage, and reactive windows.
//!
//! # Modules
//!
//! - `hit`: attack bonus breakdown and the d20 check against a defense
//! - `damage`: damage rolls and HP application (temp HP, dying, death)
//! - `attack`: full single- and multi-target resolution
//! - `reactive`: opportunity, interrupt and reaction windows
pub mod attack;
pub mod damage;
pub mod hit;
pub mod reactive;

pub use attack::{
    AttackOptions, AttackResolution, build_attack_preview, resolve_attack, resolve_attack_multi,
};
pub use damage::{
    DamageOptions, DamageRoll, DamageSpec, DiceGroup, apply_damage, death_cleanup,
    evaluate_damage,
};
pub use hit::{
    AttackBonus, AttackContext, AttackKind, AttackSpec, Concealment, Cover, ToHit,
    compute_attack_bonus, roll_to_hit,
};
pub use reactive::{
    ReactiveDenied, open_window, resolve_interrupt, resolve_opportunity, resolve_reaction,
    threatening_enemies,
};

/// Where one term of an attack or damage total came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[strum(serialize_all = "camelCase")]
pub enum BonusSource {
    Ability,
    Proficiency,
    Enhancement,
    Flat,
    CombatAdvantage,
    Cover,
    Concealment,
    Dice,
    /// Fixed average for pools the RNG does not roll.
    AverageDice,
    /// Dice maximized by a critical hit.
    CritDice,
    Weakened,
    HalfOnMiss,
}

/// One labelled term of a total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BonusPart {
    pub source: BonusSource,
    pub value: i32,
}

impl BonusPart {
    pub const fn new(source: BonusSource, value: i32) -> Self {
        Self { source, value }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[strum(serialize_all = "lowercase")]
pub enum HitOutcome {
    Miss,
    Hit,
    Crit,
}

impl HitOutcome {
    /// Hits and crits both land.
    pub const fn landed(self) -> bool {
        matches!(self, Self::Hit | Self::Crit)
    }
}

/// Why the d20 check came out the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HitReason {
    #[strum(serialize = "NAT1")]
    #[cfg_attr(feature = "serde", serde(rename = "NAT1"))]
    Nat1,
    #[strum(serialize = "NAT20")]
    #[cfg_attr(feature = "serde", serde(rename = "NAT20"))]
    Nat20,
    #[strum(serialize = "TOTAL>=DEFENSE")]
    #[cfg_attr(feature = "serde", serde(rename = "TOTAL>=DEFENSE"))]
    TotalMeetsDefense,
    #[strum(serialize = "TOTAL<DEFENSE")]
    #[cfg_attr(feature = "serde", serde(rename = "TOTAL<DEFENSE"))]
    TotalBelowDefense,
}

/// Sum of a slice of parts.
pub fn total_of(parts: &[BonusPart]) -> i32 {
    parts.iter().map(|part| part.value).sum()
}
