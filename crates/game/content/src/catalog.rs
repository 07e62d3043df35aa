//! In-memory power repository.

use std::collections::BTreeMap;

use skirmish_core::action::{
    ActionType, ForcedGrant, HealGrant, PowerAttack, PowerDefinition, PowerOutcome, PowerType,
};
use skirmish_core::combat::{DamageSpec, DiceGroup};
use skirmish_core::env::PowerOracle;
use skirmish_core::state::{Ability, DamageType, Defense};
use skirmish_core::tactics::{ForcedKind, TargetFilter, TargetWho, TemplateOrigin, TemplateSpec};
use tracing::debug;

/// Power definitions keyed by id.
///
/// Built explicitly by the host and handed to the engine through
/// [`Env`](skirmish_core::Env); nothing here is global.
#[derive(Clone, Debug, Default)]
pub struct PowerCatalog {
    powers: BTreeMap<String, PowerDefinition>,
}

impl PowerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the stock powers.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.extend([basic_attack(), magic_missile(), thunderwave(), healing_word()]);
        catalog
    }

    /// Adds `power`, replacing any definition with the same id.
    pub fn insert(&mut self, power: PowerDefinition) -> Option<PowerDefinition> {
        let replaced = self.powers.insert(power.id.clone(), power);
        if let Some(old) = &replaced {
            debug!(id = %old.id, "power definition replaced");
        }
        replaced
    }

    pub fn extend(&mut self, powers: impl IntoIterator<Item = PowerDefinition>) {
        for power in powers {
            self.insert(power);
        }
    }

    pub fn get(&self, id: &str) -> Option<&PowerDefinition> {
        self.powers.get(id)
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PowerDefinition> {
        self.powers.values()
    }
}

impl PowerOracle for PowerCatalog {
    fn power(&self, id: &str) -> Option<&PowerDefinition> {
        self.get(id)
    }

    fn power_ids(&self) -> Vec<String> {
        self.powers.keys().cloned().collect()
    }
}

impl FromIterator<PowerDefinition> for PowerCatalog {
    fn from_iter<I: IntoIterator<Item = PowerDefinition>>(iter: I) -> Self {
        let mut catalog = Self::new();
        catalog.extend(iter);
        catalog
    }
}

fn basic_attack() -> PowerDefinition {
    PowerDefinition {
        attack: Some(PowerAttack {
            proficiency: 3,
            ..PowerAttack::default()
        }),
        targeting: TargetFilter::new(TargetWho::Enemies),
        hit: Some(PowerOutcome {
            damage: Some(DamageSpec::dice(1, 8).with_ability(Ability::Str)),
            ..PowerOutcome::default()
        }),
        ..PowerDefinition::new("basic-attack", "Basic Attack")
    }
}

fn magic_missile() -> PowerDefinition {
    PowerDefinition {
        keywords: vec!["arcane".into(), "force".into(), "implement".into()],
        template: TemplateSpec::single(TemplateOrigin::Ranged).with_range(10),
        targeting: TargetFilter::new(TargetWho::Enemies),
        attack: Some(PowerAttack {
            vs: Defense::Reflex,
            ability: Ability::Int,
            ..PowerAttack::default()
        }),
        hit: Some(PowerOutcome {
            damage: Some(
                DamageSpec::dice(2, 4)
                    .with_ability(Ability::Int)
                    .with_type(DamageType::Force),
            ),
            ..PowerOutcome::default()
        }),
        ..PowerDefinition::new("magic-missile", "Magic Missile")
    }
}

fn thunderwave() -> PowerDefinition {
    PowerDefinition {
        power_type: PowerType::Encounter,
        keywords: vec!["arcane".into(), "thunder".into(), "implement".into()],
        template: TemplateSpec::burst(TemplateOrigin::Close, 1),
        targeting: TargetFilter::new(TargetWho::Creatures).up_to(8),
        attack: Some(PowerAttack {
            vs: Defense::Fortitude,
            ability: Ability::Con,
            ..PowerAttack::default()
        }),
        hit: Some(PowerOutcome {
            damage: Some(DamageSpec::dice(1, 6).with_type(DamageType::Thunder)),
            forced: Some(ForcedGrant {
                kind: ForcedKind::Push,
                squares: 2,
            }),
            ..PowerOutcome::default()
        }),
        ..PowerDefinition::new("thunderwave", "Thunderwave")
    }
}

fn healing_word() -> PowerDefinition {
    PowerDefinition {
        power_type: PowerType::Encounter,
        action: ActionType::Minor,
        keywords: vec!["divine".into(), "healing".into()],
        template: TemplateSpec::single(TemplateOrigin::Ranged).with_range(5),
        targeting: TargetFilter::new(TargetWho::Allies),
        effect: Some(PowerOutcome {
            healing: Some(HealGrant {
                surge: true,
                dice: vec![DiceGroup::new(1, 6)],
                flat: 0,
            }),
            ..PowerOutcome::default()
        }),
        ..PowerDefinition::new("healing-word", "Healing Word")
    }
}
