//! Healing surges, temporary hit points, second wind, death saves and
//! stabilization.
//!
//! Healing first lifts negative HP to 0 and then adds. Any heal that ends
//! above 0 clears `dying`/`dead` and the death-save track.

use tracing::debug;

use crate::combat::damage::{hp_record, kill};
use crate::engine::Proposal;
use crate::env::roll_d20;
use crate::state::{
    ActorId, DeathState, FlagsUpdate, HitPoints, LogData, LogKind, LogRecord, Patch, State,
};

/// Outcome of a single death saving throw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum DeathSaveResult {
    Fail,
    /// Natural 20 with a surge left: the surge is spent as healing.
    Surge,
    NoChange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealOptions {
    /// Spend a surge and add its value; with none left the heal still lifts
    /// the actor to at least 1 HP.
    pub requires_surge: bool,
    pub allow_overflow: bool,
}

impl Default for HealOptions {
    fn default() -> Self {
        Self {
            requires_surge: false,
            allow_overflow: true,
        }
    }
}

impl HealOptions {
    pub const CAPPED: Self = Self {
        requires_surge: false,
        allow_overflow: false,
    };
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SurgeSpend {
    /// Healing the surge is worth; 0 when none remained.
    pub healed: i32,
    pub patches: Vec<Patch>,
}

/// Spends one surge worth `value * multiplier + bonus`.
pub fn spend_surge(state: &State, actor: &ActorId, multiplier: i32, bonus: i32) -> SurgeSpend {
    let Some(surges) = state.actor(actor).map(|a| a.surges) else {
        return SurgeSpend::default();
    };
    if surges.remaining == 0 {
        debug!(%actor, "no surges left to spend");
        return SurgeSpend::default();
    }
    let healed = surges.value * multiplier + bonus;
    SurgeSpend {
        healed,
        patches: vec![
            Patch::AdjustSurges {
                actor: actor.clone(),
                delta: -1,
            },
            Patch::log(LogRecord::new(
                LogKind::SurgeSpend,
                format!("{actor} spends a healing surge worth {healed}"),
                LogData::Surge {
                    actor: actor.clone(),
                    amount: healed,
                    remaining: surges.remaining - 1,
                },
            )),
        ],
    }
}

/// Heals `actor` by `amount`.
pub fn apply_healing(state: &State, actor: &ActorId, amount: i32, options: HealOptions) -> Vec<Patch> {
    let Some(target) = state.actor(actor) else {
        return Vec::new();
    };
    let mut patches = Vec::new();
    let mut total = amount.max(0);
    let mut floor = i32::MIN;
    if options.requires_surge {
        if target.surges.remaining > 0 {
            let surge = spend_surge(state, actor, 1, 0);
            total += surge.healed;
            patches.extend(surge.patches);
        } else {
            floor = 1;
        }
    }

    let before = target.hp;
    let mut current = before.current.max(0) + total;
    if !options.allow_overflow {
        current = current.min(before.max);
    }
    current = current.max(floor);
    let after = HitPoints { current, ..before };

    if after.current != before.current {
        patches.push(Patch::SetHp {
            actor: actor.clone(),
            current: after.current,
        });
    }
    patches.push(Patch::log(LogRecord::new(
        LogKind::HealApply,
        format!("{actor} heals {} to {}", after.current - before.current, after.current),
        LogData::Heal {
            actor: actor.clone(),
            amount: after.current - before.current,
            hp: after,
        },
    )));

    let was_down = target.flags.dying || target.flags.dead;
    if after.current > 0 && (was_down || target.death != DeathState::default()) {
        patches.push(Patch::MergeFlags {
            actor: actor.clone(),
            update: FlagsUpdate {
                dying: Some(false),
                dead: Some(false),
                ..FlagsUpdate::default()
            },
        });
        patches.push(Patch::SetDeath {
            actor: actor.clone(),
            death: DeathState::default(),
        });
        if was_down {
            patches.push(Patch::log(hp_record(
                LogKind::Revive,
                format!("{actor} is back on their feet"),
                actor,
                after,
            )));
        }
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
        if !bloodied {
            patches.push(Patch::log(hp_record(
                LogKind::BloodiedExit,
                format!("{actor} is no longer bloodied"),
                actor,
                after,
            )));
        }
    }
    patches
}

/// Temporary hit points do not stack: the larger value wins.
pub fn gain_temp_hp(state: &State, actor: &ActorId, amount: i32) -> Vec<Patch> {
    let Some(hp) = state.actor(actor).map(|a| a.hp) else {
        return Vec::new();
    };
    let temp = hp.temp.max(amount.max(0));
    vec![
        Patch::SetTempHp {
            actor: actor.clone(),
            temp,
        },
        Patch::log(LogRecord::new(
            LogKind::TempApply,
            format!("{actor} has {temp} temporary hit points"),
            LogData::Hp {
                actor: actor.clone(),
                hp: HitPoints { temp, ..hp },
            },
        )),
    ]
}

/// Once per encounter: spend a surge, heal without overflow, and gain the
/// second-wind defense bonus until the start of the next turn.
///
/// A denied attempt only logs.
pub fn second_wind(state: &State, actor: &ActorId) -> Vec<Patch> {
    let Some(target) = state.actor(actor) else {
        return Vec::new();
    };
    let denied = if target.flags.used_second_wind {
        Some("already used")
    } else if target.surges.remaining == 0 {
        Some("no surges")
    } else {
        None
    };
    if let Some(reason) = denied {
        return vec![Patch::log(LogRecord::new(
            LogKind::SecondWind,
            format!("{actor} cannot use second wind ({reason})"),
            LogData::SecondWind {
                actor: actor.clone(),
                healed: None,
            },
        ))];
    }

    let mut proposal = Proposal::begin(state);
    let surge = spend_surge(proposal.state(), actor, 1, 0);
    proposal.extend(surge.patches);
    let healed = apply_healing(proposal.state(), actor, surge.healed, HealOptions::CAPPED);
    proposal.extend(healed);
    let bonus = state.rules.second_wind_defense_bonus;
    proposal.push(Patch::MergeFlags {
        actor: actor.clone(),
        update: FlagsUpdate {
            defense_bonus: Some(bonus),
            used_second_wind: Some(true),
            ..FlagsUpdate::default()
        },
    });
    proposal.log(LogRecord::new(
        LogKind::SecondWind,
        format!("{actor} uses second wind (+{bonus} defenses)"),
        LogData::SecondWind {
            actor: actor.clone(),
            healed: Some(surge.healed),
        },
    ));
    proposal.finish()
}

/// Rolls a death save for a dying, unstabilized actor. Anyone else is a no-op.
///
/// | d20                   | effect                            |
/// |-----------------------|-----------------------------------|
/// | `<= fail max` (9)     | one failure; three failures kill  |
/// | `>= critical` (20)    | spend a surge as healing, if any  |
/// | otherwise             | no change                         |
pub fn death_save(state: &State, actor: &ActorId, force_d20: Option<i32>) -> Vec<Patch> {
    let Some(target) = state.actor(actor) else {
        return Vec::new();
    };
    if !target.flags.dying || target.flags.dead || target.death.stabilized {
        return Vec::new();
    }
    let rules = &state.rules;
    let mut proposal = Proposal::begin(state);
    let roll = roll_d20(proposal.state(), force_d20);
    proposal.extend(roll.patches);
    let d20 = roll.result;

    let mut failures = target.death.failures;
    let result = if d20 <= rules.death_save_fail_max {
        failures = failures.saturating_add(1);
        proposal.push(Patch::SetDeath {
            actor: actor.clone(),
            death: DeathState {
                failures,
                ..target.death
            },
        });
        DeathSaveResult::Fail
    } else if d20 >= rules.death_save_critical && target.surges.remaining > 0 {
        let surge = spend_surge(proposal.state(), actor, 1, 0);
        proposal.extend(surge.patches);
        let healed = apply_healing(proposal.state(), actor, surge.healed, HealOptions::CAPPED);
        proposal.extend(healed);
        DeathSaveResult::Surge
    } else {
        DeathSaveResult::NoChange
    };
    proposal.log(LogRecord::new(
        LogKind::DeathSave,
        format!("{actor} death save ({d20}): {result}"),
        LogData::DeathSave {
            actor: actor.clone(),
            d20,
            result,
            failures,
        },
    ));

    if failures >= rules.death_failures_to_die {
        let hp = proposal.state().actor(actor).map_or(target.hp, |a| a.hp);
        let died = kill(proposal.state(), actor, hp, "failed death saves");
        proposal.extend(died);
    }
    proposal.finish()
}

/// `healer` tries to stabilize a dying `target` against the stabilize DC.
pub fn stabilize(
    state: &State,
    target: &ActorId,
    healer: &ActorId,
    force_d20: Option<i32>,
) -> Vec<Patch> {
    let Some(dying) = state.actor(target) else {
        return Vec::new();
    };
    if !dying.flags.dying || dying.flags.dead {
        return vec![Patch::log(LogRecord::message(
            LogKind::Stabilize,
            format!("{target} is not dying"),
        ))];
    }
    let dc = state.rules.stabilize_dc;
    let roll = roll_d20(state, force_d20);
    let d20 = roll.result;
    let success = d20 >= dc;

    let mut patches = roll.patches;
    if success {
        patches.push(Patch::SetDeath {
            actor: target.clone(),
            death: DeathState {
                stabilized: true,
                ..dying.death
            },
        });
    }
    let msg = if success {
        format!("{healer} stabilizes {target}")
    } else {
        format!("{healer} fails to stabilize {target}")
    };
    patches.push(Patch::log(LogRecord::new(
        LogKind::Stabilize,
        msg,
        LogData::Stabilize {
            target: target.clone(),
            healer: healer.clone(),
            dc,
            d20,
            success,
        },
    )));
    patches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::apply_damage;
    use crate::engine::apply_patches;
    use crate::state::{Actor, Board, DamageType, Position};

    fn solo(actor: Actor) -> State {
        State::new(5, Board::new(5, 5))
            .with_actor(actor, Position::new(2, 2))
            .with_actor(Actor::new("C", "heroes", 20), Position::new(2, 3))
    }

    fn run(state: &mut State, patches: Vec<Patch>) {
        let report = apply_patches(state, &patches);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn second_wind_once_per_encounter() {
        let id = ActorId::from("H");
        let mut state = solo(Actor::new("H", "heroes", 20).with_hp(5, 20).with_surges(2, 5));
        let patches = second_wind(&state, &id);
        run(&mut state, patches);
        let hero = state.actor(&id).expect("actor");
        assert_eq!(hero.hp.current, 10);
        assert_eq!(hero.surges.remaining, 1);
        assert_eq!(hero.flags.defense_bonus, 2);

        let patches = second_wind(&state, &id);
        run(&mut state, patches);
        let hero = state.actor(&id).expect("actor");
        assert_eq!(hero.surges.remaining, 1);
        assert_eq!(hero.hp.current, 10);
    }

    #[test]
    fn death_spiral() {
        let id = ActorId::from("H");
        let mut state = solo(Actor::new("H", "heroes", 20).with_hp(3, 20));
        let patches = apply_damage(&state, &id, 10, DamageType::Untyped);
        run(&mut state, patches);
        assert!(state.actor(&id).expect("actor").flags.dying);

        for _ in 0..3 {
            let patches = death_save(&state, &id, Some(5));
            run(&mut state, patches);
        }
        let hero = state.actor(&id).expect("actor");
        assert!(hero.flags.dead && !hero.flags.dying);
        assert!(state.log.iter().any(|e| e.kind == LogKind::Die));
    }

    #[test]
    fn natural_twenty_spends_a_surge() {
        let id = ActorId::from("H");
        let mut state = solo(Actor::new("H", "heroes", 20).with_hp(0, 20).with_surges(1, 5));
        let patches = death_save(&state, &id, Some(20));
        run(&mut state, patches);
        let hero = state.actor(&id).expect("actor");
        assert_eq!(hero.hp.current, 5);
        assert!(!hero.flags.dying);
        assert!(state.log.iter().any(|e| e.kind == LogKind::Revive));
    }

    #[test]
    fn surge_heal_without_surges_still_reaches_one() {
        let id = ActorId::from("H");
        let mut state = solo(Actor::new("H", "heroes", 20).with_hp(0, 20));
        let options = HealOptions {
            requires_surge: true,
            ..HealOptions::default()
        };
        let patches = apply_healing(&state, &id, 0, options);
        run(&mut state, patches);
        assert_eq!(state.actor(&id).expect("actor").hp.current, 1);
    }

    #[test]
    fn healing_lifts_negative_hp_to_zero_first() {
        let id = ActorId::from("H");
        let mut state = solo(Actor::new("H", "heroes", 20).with_hp(-4, 20));
        let patches = apply_healing(&state, &id, 3, HealOptions::default());
        run(&mut state, patches);
        assert_eq!(state.actor(&id).expect("actor").hp.current, 3);
    }

    #[test]
    fn temp_hp_keeps_the_larger_value() {
        let id = ActorId::from("H");
        let mut state = solo(Actor::new("H", "heroes", 20));
        let patches = gain_temp_hp(&state, &id, 6);
        run(&mut state, patches);
        let patches = gain_temp_hp(&state, &id, 4);
        run(&mut state, patches);
        assert_eq!(state.actor(&id).expect("actor").hp.temp, 6);
    }

    #[test]
    fn damage_breaks_stabilization() {
        let id = ActorId::from("H");
        let mut state = solo(Actor::new("H", "heroes", 20).with_hp(0, 20));
        let patches = stabilize(&state, &id, &"C".into(), Some(15));
        run(&mut state, patches);
        assert!(state.actor(&id).expect("actor").death.stabilized);
        assert!(death_save(&state, &id, Some(1)).is_empty());

        let patches = apply_damage(&state, &id, 2, DamageType::Untyped);
        run(&mut state, patches);
        let hero = state.actor(&id).expect("actor");
        assert!(!hero.death.stabilized);
        assert!(hero.flags.dying);
        assert_eq!(hero.death.failures, 1);
    }
}
