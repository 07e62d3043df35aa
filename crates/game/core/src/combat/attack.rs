//! Full attack resolution.
//!
//! One attack runs, in order: the provoke check for ranged and area attacks,
//! the attack roll, the outcome, an interrupt window on a hit, damage, and a
//! reaction window for the defender. Multi-target attacks resolve each
//! defender in list order against the state left by the previous one.

use crate::effects::{CombatFlags, compute_flags};
use crate::engine::Proposal;
use crate::state::{
    ActorId, LogData, LogKind, LogRecord, Patch, ReactiveKind, ReactiveTrigger, State,
};

use super::damage::{DamageOptions, apply_damage, evaluate_damage};
use super::hit::{AttackContext, AttackSpec, compute_attack_bonus, roll_to_hit};
use super::reactive::{open_window, threatening_enemies};
use super::HitOutcome;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackOptions {
    /// Use this face instead of drawing a d20.
    pub force_d20: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttackResolution {
    pub defender: ActorId,
    pub outcome: HitOutcome,
    pub d20: i32,
    pub total: i32,
    /// Damage rolled before resistances, if any was dealt.
    pub damage: Option<i32>,
    pub patches: Vec<Patch>,
}

/// Resolves one attack of `ctx.attacker` against `ctx.defender`.
pub fn resolve_attack(
    state: &State,
    ctx: &AttackContext,
    spec: &AttackSpec,
    options: &AttackOptions,
) -> AttackResolution {
    let mut proposal = Proposal::begin(state);

    if spec.kind.provokes() {
        let provokers = threatening_enemies(proposal.state(), &ctx.attacker);
        let trigger = ReactiveTrigger::RangedAttack {
            attacker: ctx.attacker.clone(),
        };
        let already_open = proposal
            .state()
            .reactions
            .iter()
            .any(|event| event.is_open() && event.trigger == trigger);
        if !provokers.is_empty() && !already_open {
            let opened = open_window(
                proposal.state(),
                ReactiveKind::Opportunity,
                trigger,
                provokers,
            );
            proposal.extend(opened);
        }
    }

    let bonus = compute_attack_bonus(proposal.state(), ctx, spec);
    let to_hit = roll_to_hit(proposal.state(), bonus.total, bonus.defense, options.force_d20);
    proposal.extend(to_hit.patches.iter().cloned());
    proposal.log(LogRecord::new(
        LogKind::AttackRoll,
        format!(
            "{} attacks {}: {} + {} = {} vs {} {}",
            ctx.attacker,
            ctx.defender,
            to_hit.d20,
            bonus.total,
            to_hit.total,
            spec.vs,
            bonus.defense
        ),
        LogData::AttackRoll {
            attacker: ctx.attacker.clone(),
            defender: ctx.defender.clone(),
            d20: to_hit.d20,
            forced: to_hit.forced,
            bonus: bonus.parts.clone(),
            total: to_hit.total,
            vs: spec.vs,
            defense: bonus.defense,
        },
    ));
    proposal.log(LogRecord::new(
        LogKind::AttackResult,
        format!("{} vs {}", to_hit.outcome.to_string().to_uppercase(), spec.vs),
        LogData::AttackResult {
            attacker: ctx.attacker.clone(),
            defender: ctx.defender.clone(),
            outcome: to_hit.outcome,
            reason: to_hit.reason,
        },
    ));

    let landed = to_hit.outcome.landed();
    if landed {
        let eligible = defending_side(proposal.state(), &ctx.attacker, &ctx.defender);
        let opened = open_window(
            proposal.state(),
            ReactiveKind::Interrupt,
            ReactiveTrigger::Hit {
                attacker: ctx.attacker.clone(),
                defender: ctx.defender.clone(),
            },
            eligible,
        );
        proposal.extend(opened);
    }

    let damage_spec = if landed { &spec.hit } else { &spec.miss };
    let mut damage = None;
    if let Some(damage_spec) = damage_spec {
        let weakened = compute_flags(proposal.state(), &ctx.attacker).contains(CombatFlags::WEAKENED);
        let rolled = evaluate_damage(
            proposal.state(),
            &ctx.attacker,
            &ctx.defender,
            damage_spec,
            DamageOptions {
                crit: to_hit.outcome == HitOutcome::Crit,
                on_miss: !landed,
                weakened,
            },
        );
        proposal.extend(rolled.patches);
        let applied = apply_damage(
            proposal.state(),
            &ctx.defender,
            rolled.total,
            damage_spec.damage_type,
        );
        proposal.extend(applied);
        damage = Some(rolled.total);
    }

    let defender_alive = proposal
        .state()
        .actor(&ctx.defender)
        .is_some_and(|actor| actor.is_alive());
    if landed && defender_alive {
        let opened = open_window(
            proposal.state(),
            ReactiveKind::Reaction,
            ReactiveTrigger::Damaged {
                attacker: ctx.attacker.clone(),
                defender: ctx.defender.clone(),
            },
            vec![ctx.defender.clone()],
        );
        proposal.extend(opened);
    }

    AttackResolution {
        defender: ctx.defender.clone(),
        outcome: to_hit.outcome,
        d20: to_hit.d20,
        total: to_hit.total,
        damage,
        patches: proposal.finish(),
    }
}

/// Resolves the same attack against each of `defenders` in order.
///
/// Every resolution's patches assume the ones before it were applied, so the
/// concatenation is the full patch list.
pub fn resolve_attack_multi(
    state: &State,
    ctx: &AttackContext,
    defenders: &[ActorId],
    spec: &AttackSpec,
    options: &AttackOptions,
) -> Vec<AttackResolution> {
    let mut proposal = Proposal::begin(state);
    let mut resolutions = Vec::with_capacity(defenders.len());
    for defender in defenders {
        let resolution = resolve_attack(proposal.state(), &ctx.against(defender), spec, options);
        proposal.extend(resolution.patches.iter().cloned());
        resolutions.push(resolution);
    }
    resolutions
}

/// `attack-preview` log entry: the bonus breakdown and targeted defense,
/// without rolling.
pub fn build_attack_preview(state: &State, ctx: &AttackContext, spec: &AttackSpec) -> Patch {
    let bonus = compute_attack_bonus(state, ctx, spec);
    Patch::log(LogRecord::new(
        LogKind::AttackPreview,
        format!(
            "{} vs {}: {:+} against {} {}",
            ctx.attacker, ctx.defender, bonus.total, spec.vs, bonus.defense
        ),
        LogData::AttackPreview {
            attacker: ctx.attacker.clone(),
            defender: ctx.defender.clone(),
            bonus: bonus.parts,
            total: bonus.total,
            vs: spec.vs,
            defense: bonus.defense,
        },
    ))
}

/// The defender and its living allies, who may interrupt a hit.
fn defending_side(state: &State, attacker: &ActorId, defender: &ActorId) -> Vec<ActorId> {
    state
        .actors
        .values()
        .filter(|actor| actor.is_alive() && &actor.id != attacker)
        .filter(|actor| &actor.id == defender || state.are_allies(&actor.id, defender))
        .map(|actor| actor.id.clone())
        .collect()
}
