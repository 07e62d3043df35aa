//! Power definitions as loaded from content.

use crate::combat::{AttackKind, AttackSpec, DamageSpec, DiceGroup};
use crate::state::{Ability, ActionKind, ConditionId, Defense, Duration, EffectData};
use crate::tactics::{ForcedKind, TargetFilter, TemplateKind, TemplateOrigin, TemplateSpec};

/// Usage frequency of a power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum PowerType {
    #[default]
    AtWill,
    Encounter,
    Daily,
    Utility,
}

/// Action a power costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum ActionType {
    #[default]
    Standard,
    Move,
    Minor,
    Free,
    ImmediateInterrupt,
    ImmediateReaction,
    Opportunity,
}

impl ActionType {
    /// Slot in the acting combatant's pool, for actions taken on one's own
    /// turn.
    pub const fn pool_kind(self) -> Option<ActionKind> {
        match self {
            Self::Standard => Some(ActionKind::Standard),
            Self::Move => Some(ActionKind::Move),
            Self::Minor => Some(ActionKind::Minor),
            Self::Free => Some(ActionKind::Free),
            Self::ImmediateInterrupt | Self::ImmediateReaction | Self::Opportunity => None,
        }
    }

    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::ImmediateInterrupt | Self::ImmediateReaction)
    }
}

/// Attack line of a power: `ability vs defense`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PowerAttack {
    pub vs: Defense,
    pub ability: Ability,
    pub proficiency: i32,
    pub enhancement: i32,
}

impl Default for PowerAttack {
    fn default() -> Self {
        Self {
            vs: Defense::Ac,
            ability: Ability::Str,
            proficiency: 0,
            enhancement: 0,
        }
    }
}

/// A condition a power applies.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionGrant {
    pub id: ConditionId,
    #[cfg_attr(feature = "serde", serde(default = "save_ends"))]
    pub duration: Duration,
    #[cfg_attr(feature = "serde", serde(default))]
    pub data: EffectData,
}

#[cfg(feature = "serde")]
fn save_ends() -> Duration {
    Duration::SaveEnds
}

impl ConditionGrant {
    pub fn new(id: ConditionId, duration: Duration) -> Self {
        Self {
            id,
            duration,
            data: EffectData::default(),
        }
    }
}

/// Push, pull or slide applied to a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForcedGrant {
    pub kind: ForcedKind,
    pub squares: u32,
}

/// Healing granted to each target: optionally a surge, plus dice and flat.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HealGrant {
    pub surge: bool,
    pub dice: Vec<DiceGroup>,
    pub flat: i32,
}

/// What happens to a target on a hit, on a miss, or unconditionally.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PowerOutcome {
    pub damage: Option<DamageSpec>,
    pub conditions: Vec<ConditionGrant>,
    pub forced: Option<ForcedGrant>,
    pub healing: Option<HealGrant>,
}

/// A normalized power.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PowerDefinition {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub power_type: PowerType,
    pub action: ActionType,
    pub level: u32,
    pub keywords: Vec<String>,
    /// Area the power covers.
    pub template: TemplateSpec,
    /// Who in the area can be chosen.
    pub targeting: TargetFilter,
    pub attack: Option<PowerAttack>,
    pub hit: Option<PowerOutcome>,
    pub miss: Option<PowerOutcome>,
    /// Applied to every target regardless of the attack roll.
    pub effect: Option<PowerOutcome>,
}

impl Default for PowerDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            power_type: PowerType::AtWill,
            action: ActionType::Standard,
            level: 1,
            keywords: Vec::new(),
            template: TemplateSpec::single(TemplateOrigin::Melee),
            targeting: TargetFilter::default(),
            attack: None,
            hit: None,
            miss: None,
            effect: None,
        }
    }
}

impl PowerDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Personal powers with no attack target only their user.
    pub fn requires_targets(&self) -> bool {
        self.attack.is_some() || self.template.origin != TemplateOrigin::Personal
    }

    /// Attack spec derived from the attack line, template and hit/miss damage.
    pub fn attack_spec(&self) -> Option<AttackSpec> {
        let attack = self.attack?;
        let kind = match (self.template.kind, self.template.origin) {
            (TemplateKind::Single, TemplateOrigin::Ranged) => AttackKind::Ranged,
            (TemplateKind::Single, _) => AttackKind::MeleeWeapon,
            (_, TemplateOrigin::Area | TemplateOrigin::Ranged) => AttackKind::Area,
            _ => AttackKind::Close,
        };
        let defaults = AttackSpec::default();
        Some(AttackSpec {
            kind,
            vs: attack.vs,
            ability: attack.ability,
            proficiency: attack.proficiency,
            enhancement: attack.enhancement,
            reach: self.template.reach.unwrap_or(defaults.reach),
            range: self.template.range.unwrap_or(defaults.range),
            hit: self.hit.as_ref().and_then(|outcome| outcome.damage.clone()),
            miss: self.miss.as_ref().and_then(|outcome| outcome.damage.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_at_will_melee_standard() {
        let power = PowerDefinition::new("jab", "Jab");
        assert_eq!(power.power_type, PowerType::AtWill);
        assert_eq!(power.action, ActionType::Standard);
        assert_eq!(power.level, 1);
        assert!(power.requires_targets());
        assert!(power.attack_spec().is_none());
    }

    #[test]
    fn attack_spec_follows_the_template() {
        let power = PowerDefinition {
            template: TemplateSpec::single(TemplateOrigin::Ranged).with_range(10),
            attack: Some(PowerAttack {
                vs: Defense::Reflex,
                ability: Ability::Int,
                ..PowerAttack::default()
            }),
            hit: Some(PowerOutcome {
                damage: Some(DamageSpec::dice(2, 4)),
                ..PowerOutcome::default()
            }),
            ..PowerDefinition::new("magic-missile", "Magic Missile")
        };
        let spec = power.attack_spec().expect("attack");
        assert_eq!(spec.kind, AttackKind::Ranged);
        assert_eq!(spec.range, 10);
        assert_eq!(spec.vs, Defense::Reflex);
        assert!(spec.hit.is_some() && spec.miss.is_none());
    }

    #[test]
    fn action_type_names() {
        assert_eq!(ActionType::ImmediateInterrupt.to_string(), "immediate-interrupt");
        assert_eq!("at-will".parse::<PowerType>(), Ok(PowerType::AtWill));
        assert_eq!(ActionType::Opportunity.pool_kind(), None);
    }
}
