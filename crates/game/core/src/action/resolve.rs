//! Power validation and execution.
//!
//! `execute_power` is one of the two composition roots of the rules core: it
//! spends the action, records limited usage, hands the attack to the combat
//! resolver and applies the per-target payloads. Each step runs against the
//! state left by the previous one.

use tracing::{debug, warn};

use crate::combat::{AttackContext, AttackOptions, resolve_attack, resolve_attack_multi};
use crate::effects::apply_condition;
use crate::engine::{Proposal, plan_spend, spend_action};
use crate::env::{DiceSpec, DiceTerm, roll};
use crate::healing::{HealOptions, apply_healing};
use crate::state::{
    ActorId, LogData, LogKind, LogRecord, Patch, State, UsageFlag, UsageFrequency,
};
use crate::tactics::{ForcedKind, TemplateKind, pull, push, slide};

use super::error::PowerError;
use super::power::{ActionType, PowerDefinition, PowerOutcome, PowerType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerOptions {
    /// Face used for every attack roll instead of drawing.
    pub force_d20: Option<i32>,
    /// Reactive window this power answers; closed once the power resolves.
    pub reaction_event: Option<u64>,
}

/// Checks whether `actor` may use `power` on `targets` right now.
///
/// Pool actions require the actor's turn; immediate and opportunity actions
/// are gated by the actor's usage flags instead.
pub fn validate_power_use(
    state: &State,
    actor: &ActorId,
    power: &PowerDefinition,
    targets: &[ActorId],
) -> Result<(), PowerError> {
    let user = state.actor(actor).ok_or(PowerError::ActorNotFound)?;
    if user.flags.dead {
        return Err(PowerError::ActorDead);
    }
    if user.flags.dying {
        return Err(PowerError::ActorDying);
    }

    let usage = state.usage_of(actor).cloned().unwrap_or_default();
    match power.action.pool_kind() {
        Some(kind) => {
            if state.current_actor() != Some(actor) {
                return Err(PowerError::NotYourTurn);
            }
            plan_spend(state, kind).map_err(|unavailable| PowerError::NoAction(unavailable.kind))?;
        }
        None if power.action.is_immediate() => {
            if usage.immediate_used_this_round {
                return Err(PowerError::ImmediateUsed);
            }
        }
        None => {
            if usage.opportunity_used_this_turn {
                return Err(PowerError::OpportunityUsed);
            }
        }
    }

    match power.power_type {
        PowerType::Encounter if usage.encounter_powers.contains(&power.id) => {
            return Err(PowerError::EncounterUsed);
        }
        PowerType::Daily if usage.daily_powers.contains(&power.id) => {
            return Err(PowerError::DailyUsed);
        }
        _ => {}
    }

    if targets.is_empty() && power.requires_targets() {
        return Err(PowerError::RequiresTargets);
    }
    Ok(())
}

/// Uses `power` as `actor` against `targets`.
///
/// A failed validation yields a single `power-error` log entry and spends
/// nothing.
pub fn execute_power(
    state: &State,
    actor: &ActorId,
    power: &PowerDefinition,
    targets: &[ActorId],
    options: &PowerOptions,
) -> Vec<Patch> {
    if let Err(error) = validate_power_use(state, actor, power, targets) {
        warn!(%actor, power = %power.id, %error, "power use rejected");
        return vec![Patch::log(LogRecord::new(
            LogKind::PowerError,
            format!("Cannot use {}: {error}", power.name),
            LogData::PowerError {
                actor: actor.clone(),
                power: power.id.clone(),
                reason: error.to_string(),
            },
        ))];
    }

    let mut proposal = Proposal::begin(state);
    match power.action.pool_kind() {
        Some(kind) => {
            let spent = spend_action(proposal.state(), kind);
            proposal.extend(spent);
        }
        None => proposal.push(Patch::SetUsage {
            actor: actor.clone(),
            flag: if power.action == ActionType::Opportunity {
                UsageFlag::Opportunity
            } else {
                UsageFlag::Immediate
            },
            value: true,
        }),
    }

    let frequency = match power.power_type {
        PowerType::Encounter => Some(UsageFrequency::Encounter),
        PowerType::Daily => Some(UsageFrequency::Daily),
        PowerType::AtWill | PowerType::Utility => None,
    };
    if let Some(frequency) = frequency {
        proposal.push(Patch::MarkPowerUsed {
            actor: actor.clone(),
            power: power.id.clone(),
            frequency,
        });
    }

    let targets: Vec<ActorId> = if targets.is_empty() && !power.requires_targets() {
        vec![actor.clone()]
    } else {
        targets.to_vec()
    };
    proposal.log(LogRecord::new(
        LogKind::PowerUse,
        format!("{actor} uses {}", power.name),
        LogData::Power {
            actor: actor.clone(),
            power: power.id.clone(),
            targets: targets.clone(),
        },
    ));

    if let Some(spec) = power.attack_spec() {
        let ctx = AttackContext {
            power: Some(power.id.clone()),
            ..AttackContext::new(actor.clone(), targets[0].clone())
        };
        let attack_options = AttackOptions {
            force_d20: options.force_d20,
        };
        let resolutions = if power.template.kind == TemplateKind::Single {
            vec![resolve_attack(proposal.state(), &ctx, &spec, &attack_options)]
        } else {
            resolve_attack_multi(proposal.state(), &ctx, &targets, &spec, &attack_options)
        };

        let mut landed = Vec::with_capacity(resolutions.len());
        for resolution in resolutions {
            proposal.extend(resolution.patches);
            landed.push((resolution.defender, resolution.outcome.landed()));
        }
        for (defender, hit) in landed {
            let outcome = if hit { &power.hit } else { &power.miss };
            if let Some(outcome) = outcome {
                apply_outcome(&mut proposal, actor, &defender, outcome);
            }
        }
    }

    if let Some(effect) = &power.effect {
        for target in &targets {
            apply_outcome(&mut proposal, actor, target, effect);
            if let Some(healing) = &effect.healing {
                let mut terms: Vec<DiceTerm> = healing
                    .dice
                    .iter()
                    .flat_map(|group| (0..group.n).map(move |_| DiceTerm::Die(group.d)))
                    .collect();
                let mut amount = healing.flat;
                if !terms.is_empty() {
                    terms.push(DiceTerm::Flat(healing.flat));
                    let rolled = roll(proposal.state(), &DiceSpec::Sum(terms));
                    amount = rolled.result;
                    proposal.extend(rolled.patches);
                }
                let heal_options = HealOptions {
                    requires_surge: healing.surge,
                    ..HealOptions::CAPPED
                };
                let healed = apply_healing(proposal.state(), target, amount, heal_options);
                proposal.extend(healed);
            }
        }
    }

    if let Some(event) = options.reaction_event {
        if proposal.state().open_reaction(event).is_some() {
            proposal.push(Patch::CloseReaction { id: event });
        } else {
            debug!(event, "power answers a window that is no longer open");
        }
    }
    proposal.finish()
}

/// Conditions and forced movement from `outcome`, applied to one target.
/// Damage is left to the attack resolver.
fn apply_outcome(proposal: &mut Proposal, actor: &ActorId, target: &ActorId, outcome: &PowerOutcome) {
    if !proposal.state().actor(target).is_some_and(|a| a.is_alive()) {
        return;
    }
    for grant in &outcome.conditions {
        let applied = apply_condition(
            proposal.state(),
            grant.id,
            actor,
            target,
            grant.duration,
            grant.data.clone(),
        );
        proposal.extend(applied);
    }
    if let Some(forced) = outcome.forced {
        let moved = match forced.kind {
            ForcedKind::Push => push(proposal.state(), actor, target, forced.squares),
            ForcedKind::Pull => pull(proposal.state(), actor, target, forced.squares),
            ForcedKind::Slide => {
                let origin = proposal.state().position_of(actor);
                slide(proposal.state(), Some(actor), target, forced.squares, |_, options| {
                    options
                        .iter()
                        .copied()
                        .max_by_key(|cell| origin.map_or(0, |o| cell.distance(o)))
                })
            }
        };
        proposal.extend(moved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ConditionGrant, ForcedGrant, HealGrant, PowerAttack};
    use crate::combat::DamageSpec;
    use crate::engine::apply_patches;
    use crate::state::{Actor, Board, ConditionId, Defense, Defenses, Duration, Position};
    use crate::tactics::{TemplateOrigin, TemplateSpec};

    fn arena() -> State {
        State::new(7, Board::new(10, 10))
            .with_actor(
                Actor::new("hero", "heroes", 30).with_ability(crate::state::Ability::Str, 3),
                Position::new(2, 2),
            )
            .with_actor(
                Actor::new("goblin", "monsters", 20).with_defenses(Defenses::new(12, 12, 12, 12)),
                Position::new(3, 2),
            )
            .with_turn_order(vec!["hero".into(), "goblin".into()])
    }

    fn strike() -> PowerDefinition {
        PowerDefinition {
            power_type: PowerType::Encounter,
            attack: Some(PowerAttack::default()),
            hit: Some(PowerOutcome {
                damage: Some(DamageSpec::dice(1, 8).with_ability(crate::state::Ability::Str)),
                conditions: vec![ConditionGrant::new(ConditionId::Dazed, Duration::EndOfSourceNext)],
                ..PowerOutcome::default()
            }),
            ..PowerDefinition::new("crushing-blow", "Crushing Blow")
        }
    }

    #[test]
    fn hit_spends_marks_and_applies_conditions() {
        let mut state = arena();
        let options = PowerOptions {
            force_d20: Some(18),
            ..PowerOptions::default()
        };
        let patches = execute_power(&state, &"hero".into(), &strike(), &["goblin".into()], &options);
        apply_patches(&mut state, &patches);

        assert_eq!(state.actions.standard, 0);
        let usage = state.usage_of(&"hero".into()).expect("usage");
        assert!(usage.encounter_powers.contains("crushing-blow"));
        let goblin = state.actor(&"goblin".into()).expect("goblin");
        assert!(goblin.hp.current < 20);
        assert!(state
            .effects_on(&"goblin".into())
            .any(|effect| effect.condition == ConditionId::Dazed));
    }

    #[test]
    fn miss_skips_hit_conditions() {
        let mut state = arena();
        let options = PowerOptions {
            force_d20: Some(2),
            ..PowerOptions::default()
        };
        let patches = execute_power(&state, &"hero".into(), &strike(), &["goblin".into()], &options);
        apply_patches(&mut state, &patches);
        assert_eq!(state.effects_on(&"goblin".into()).count(), 0);
        assert_eq!(state.actor(&"goblin".into()).map(|a| a.hp.current), Some(20));
    }

    #[test]
    fn encounter_power_is_gated_after_use() {
        let mut state = arena();
        let options = PowerOptions {
            force_d20: Some(2),
            ..PowerOptions::default()
        };
        let first = execute_power(&state, &"hero".into(), &strike(), &["goblin".into()], &options);
        apply_patches(&mut state, &first);
        state.actions.standard = 1;

        assert_eq!(
            validate_power_use(&state, &"hero".into(), &strike(), &["goblin".into()]),
            Err(PowerError::EncounterUsed)
        );
        let second = execute_power(&state, &"hero".into(), &strike(), &["goblin".into()], &options);
        assert_eq!(second.len(), 1);
        let record = second[0].as_log().expect("log");
        assert_eq!(record.kind, LogKind::PowerError);
        assert!(record.msg.contains("encounter power already used"));
    }

    #[test]
    fn pool_actions_require_the_actors_turn() {
        let state = arena();
        assert_eq!(
            validate_power_use(&state, &"goblin".into(), &strike(), &["hero".into()]),
            Err(PowerError::NotYourTurn)
        );
        assert_eq!(
            validate_power_use(&state, &"ghost".into(), &strike(), &["hero".into()]),
            Err(PowerError::ActorNotFound)
        );
    }

    #[test]
    fn minor_power_falls_back_to_a_larger_slot() {
        let mut state = arena();
        state.actions.minor = 0;
        state.actions.move_ = 0;
        let power = PowerDefinition {
            action: ActionType::Minor,
            ..strike()
        };
        assert!(validate_power_use(&state, &"hero".into(), &power, &["goblin".into()]).is_ok());
        state.actions.standard = 0;
        assert_eq!(
            validate_power_use(&state, &"hero".into(), &power, &["goblin".into()]),
            Err(PowerError::NoAction(crate::state::ActionKind::Minor))
        );
    }

    #[test]
    fn immediate_power_off_turn_uses_the_round_flag() {
        let mut state = arena();
        let power = PowerDefinition {
            action: ActionType::ImmediateInterrupt,
            ..strike()
        };
        let options = PowerOptions {
            force_d20: Some(2),
            ..PowerOptions::default()
        };
        let patches = execute_power(&state, &"goblin".into(), &power, &["hero".into()], &options);
        apply_patches(&mut state, &patches);
        assert_eq!(state.actions.standard, 1);
        assert!(state.usage_of(&"goblin".into()).is_some_and(|u| u.immediate_used_this_round));
        assert_eq!(
            validate_power_use(&state, &"goblin".into(), &power, &["hero".into()]),
            Err(PowerError::ImmediateUsed)
        );
    }

    #[test]
    fn burst_attacks_every_target_and_pushes_the_hits() {
        let mut state = arena().with_actor(
            Actor::new("orc", "monsters", 20).with_defenses(Defenses::new(12, 12, 12, 12)),
            Position::new(1, 2),
        );
        let power = PowerDefinition {
            template: TemplateSpec::burst(TemplateOrigin::Close, 1),
            attack: Some(PowerAttack {
                vs: Defense::Fortitude,
                ..PowerAttack::default()
            }),
            hit: Some(PowerOutcome {
                damage: Some(DamageSpec::dice(1, 6)),
                forced: Some(ForcedGrant {
                    kind: ForcedKind::Push,
                    squares: 1,
                }),
                ..PowerOutcome::default()
            }),
            ..PowerDefinition::new("thunder-stomp", "Thunder Stomp")
        };
        let options = PowerOptions {
            force_d20: Some(19),
            ..PowerOptions::default()
        };
        let targets = ["goblin".into(), "orc".into()];
        let patches = execute_power(&state, &"hero".into(), &power, &targets, &options);
        apply_patches(&mut state, &patches);

        assert_eq!(state.position_of(&"goblin".into()), Some(Position::new(4, 2)));
        assert_eq!(state.position_of(&"orc".into()), Some(Position::new(0, 2)));
        let rolls = state
            .log
            .iter()
            .filter(|entry| entry.kind == LogKind::AttackRoll)
            .count();
        assert_eq!(rolls, 2);
    }

    #[test]
    fn personal_healing_targets_the_user() {
        let mut state = arena();
        state.actors.get_mut(&"hero".into()).expect("hero").hp.current = 10;
        let power = PowerDefinition {
            action: ActionType::Minor,
            template: TemplateSpec::single(TemplateOrigin::Personal),
            targeting: crate::tactics::TargetFilter::new(crate::tactics::TargetWho::Personal),
            effect: Some(PowerOutcome {
                healing: Some(HealGrant {
                    flat: 5,
                    ..HealGrant::default()
                }),
                ..PowerOutcome::default()
            }),
            ..PowerDefinition::new("deep-breath", "Deep Breath")
        };
        let patches = execute_power(&state, &"hero".into(), &power, &[], &PowerOptions::default());
        apply_patches(&mut state, &patches);
        assert_eq!(state.actor(&"hero".into()).map(|a| a.hp.current), Some(15));
        assert_eq!(state.actions.minor, 0);
    }
}
