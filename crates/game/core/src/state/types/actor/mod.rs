//! Combatant state.
//!
//! An [`Actor`] carries hit points, surges, defenses, ability modifiers and
//! damage adjustments. Location lives on the board, and conditions are held
//! by id only; the instances themselves live in `State::effects`.

use std::collections::{BTreeMap, BTreeSet};

use super::{Ability, ActorId, DamageType, Defense, EffectId};

/// Current, maximum and temporary hit points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
    pub temp: i32,
}

impl HitPoints {
    pub const fn full(max: i32) -> Self {
        Self {
            current: max,
            max,
            temp: 0,
        }
    }

    /// Half of max HP, rounded down.
    #[inline]
    pub const fn bloodied_value(&self) -> i32 {
        self.max.div_euclid(2)
    }

    #[inline]
    pub const fn is_bloodied(&self) -> bool {
        self.current <= self.bloodied_value()
    }
}

/// Healing surges left and the HP each one restores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Surges {
    pub remaining: u32,
    pub value: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Defenses {
    pub ac: i32,
    pub fortitude: i32,
    pub reflex: i32,
    pub will: i32,
}

impl Defenses {
    pub const fn new(ac: i32, fortitude: i32, reflex: i32, will: i32) -> Self {
        Self {
            ac,
            fortitude,
            reflex,
            will,
        }
    }

    pub const fn get(&self, defense: Defense) -> i32 {
        match defense {
            Defense::Ac => self.ac,
            Defense::Fortitude => self.fortitude,
            Defense::Reflex => self.reflex,
            Defense::Will => self.will,
        }
    }
}

/// Unlisted defenses read as 10.
impl Default for Defenses {
    fn default() -> Self {
        Self::new(10, 10, 10, 10)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityMods {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityMods {
    pub const fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Str => self.strength,
            Ability::Dex => self.dexterity,
            Ability::Con => self.constitution,
            Ability::Int => self.intelligence,
            Ability::Wis => self.wisdom,
            Ability::Cha => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: i32) {
        let slot = match ability {
            Ability::Str => &mut self.strength,
            Ability::Dex => &mut self.dexterity,
            Ability::Con => &mut self.constitution,
            Ability::Int => &mut self.intelligence,
            Ability::Wis => &mut self.wisdom,
            Ability::Cha => &mut self.charisma,
        };
        *slot = value;
    }
}

/// Cached status flags.
///
/// `bloodied`, `dying` and `dead` are derived from HP and kept in sync by the
/// damage and healing subsystems; `defense_bonus` is the transient Second Wind
/// bonus cleared at the start of the actor's next turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorFlags {
    pub bloodied: bool,
    pub dying: bool,
    pub dead: bool,
    pub defense_bonus: i32,
    pub used_second_wind: bool,
}

/// Partial update to [`ActorFlags`]; `None` fields are left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlagsUpdate {
    pub bloodied: Option<bool>,
    pub dying: Option<bool>,
    pub dead: Option<bool>,
    pub defense_bonus: Option<i32>,
    pub used_second_wind: Option<bool>,
}

impl FlagsUpdate {
    pub fn merge_into(&self, flags: &mut ActorFlags) {
        if let Some(value) = self.bloodied {
            flags.bloodied = value;
        }
        if let Some(value) = self.dying {
            flags.dying = value;
        }
        if let Some(value) = self.dead {
            flags.dead = value;
        }
        if let Some(value) = self.defense_bonus {
            flags.defense_bonus = value;
        }
        if let Some(value) = self.used_second_wind {
            flags.used_second_wind = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeathState {
    pub failures: u8,
    pub stabilized: bool,
}

/// A combatant on the board.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub team: String,
    pub hp: HitPoints,
    pub surges: Surges,
    pub defenses: Defenses,
    pub abilities: AbilityMods,
    pub resist: BTreeMap<DamageType, i32>,
    pub vulnerable: BTreeMap<DamageType, i32>,
    pub immune: BTreeSet<DamageType>,
    /// Squares per move action.
    pub speed: u32,
    pub flags: ActorFlags,
    pub death: DeathState,
    /// Live condition instances targeting this actor, in application order.
    pub conditions: Vec<EffectId>,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, team: impl Into<String>, max_hp: i32) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            team: team.into(),
            hp: HitPoints::full(max_hp),
            surges: Surges::default(),
            defenses: Defenses::default(),
            abilities: AbilityMods::default(),
            resist: BTreeMap::new(),
            vulnerable: BTreeMap::new(),
            immune: BTreeSet::new(),
            speed: 6,
            flags: ActorFlags::default(),
            death: DeathState::default(),
            conditions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_hp(mut self, current: i32, max: i32) -> Self {
        self.hp = HitPoints {
            current,
            max,
            temp: 0,
        };
        self.flags.bloodied = self.hp.is_bloodied();
        self.flags.dying = current <= 0;
        self
    }

    #[must_use]
    pub fn with_surges(mut self, remaining: u32, value: i32) -> Self {
        self.surges = Surges { remaining, value };
        self
    }

    #[must_use]
    pub fn with_defenses(mut self, defenses: Defenses) -> Self {
        self.defenses = defenses;
        self
    }

    #[must_use]
    pub fn with_ability(mut self, ability: Ability, modifier: i32) -> Self {
        self.abilities.set(ability, modifier);
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_resist(mut self, damage_type: DamageType, amount: i32) -> Self {
        self.resist.insert(damage_type, amount);
        self
    }

    #[must_use]
    pub fn with_vulnerability(mut self, damage_type: DamageType, amount: i32) -> Self {
        self.vulnerable.insert(damage_type, amount);
        self
    }

    #[must_use]
    pub fn with_immunity(mut self, damage_type: DamageType) -> Self {
        self.immune.insert(damage_type);
        self
    }

    pub fn is_alive(&self) -> bool {
        !self.flags.dead
    }

    /// Dying actors and the dead cannot take actions.
    pub fn can_act(&self) -> bool {
        !self.flags.dead && !self.flags.dying
    }

    pub fn is_enemy_of(&self, other: &Actor) -> bool {
        self.team != other.team
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bloodied_threshold_rounds_down() {
        let hp = HitPoints {
            current: 12,
            max: 25,
            temp: 0,
        };
        assert_eq!(hp.bloodied_value(), 12);
        assert!(hp.is_bloodied());

        let hp = HitPoints { current: 13, ..hp };
        assert!(!hp.is_bloodied());
    }

    #[test]
    fn with_hp_derives_cached_flags() {
        let actor = Actor::new("A1", "heroes", 20).with_hp(0, 20);
        assert!(actor.flags.bloodied);
        assert!(actor.flags.dying);
        assert!(!actor.can_act());
    }

    #[test]
    fn flags_update_touches_only_present_fields() {
        let mut flags = ActorFlags {
            bloodied: true,
            defense_bonus: 2,
            ..ActorFlags::default()
        };
        FlagsUpdate {
            dying: Some(true),
            defense_bonus: Some(0),
            ..FlagsUpdate::default()
        }
        .merge_into(&mut flags);

        assert!(flags.bloodied);
        assert!(flags.dying);
        assert_eq!(flags.defense_bonus, 0);
    }
}
