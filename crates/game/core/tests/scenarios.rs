//! End-to-end encounter scenarios driven through the engine.

use skirmish_core::action::{PowerAttack, PowerOutcome};
use skirmish_core::combat::DiceGroup;
use skirmish_core::engine::CommandResult;
use skirmish_core::state::{Ability, Defenses};
use skirmish_core::tactics::TargetChoices;
use skirmish_core::{
    ActorId, Actor, AttackOptions, AttackSpec, Board, Command, DamageSpec, Env, GameEngine,
    HitOutcome, LogKind, MoveMode, Patch, Position, PowerDefinition, PowerOracle, PowerOptions,
    PowerType, State, replay,
};

struct Catalog(Vec<PowerDefinition>);

impl PowerOracle for Catalog {
    fn power(&self, id: &str) -> Option<&PowerDefinition> {
        self.0.iter().find(|power| power.id == id)
    }

    fn power_ids(&self) -> Vec<String> {
        self.0.iter().map(|power| power.id.clone()).collect()
    }
}

fn id(name: &str) -> ActorId {
    ActorId::from(name)
}

fn skirmish() -> State {
    State::new(2024, Board::new(12, 12).with_blockers([Position::new(6, 3)]))
        .with_actor(
            Actor::new("fighter", "heroes", 30)
                .with_ability(Ability::Str, 3)
                .with_surges(3, 7)
                .with_defenses(Defenses::new(17, 15, 12, 12)),
            Position::new(2, 3),
        )
        .with_actor(
            Actor::new("wizard", "heroes", 22).with_ability(Ability::Int, 4),
            Position::new(1, 6),
        )
        .with_actor(
            Actor::new("orc", "monsters", 32).with_defenses(Defenses::new(15, 14, 12, 11)),
            Position::new(3, 3),
        )
}

fn cleave() -> PowerDefinition {
    PowerDefinition {
        power_type: PowerType::Encounter,
        attack: Some(PowerAttack::default()),
        hit: Some(PowerOutcome {
            damage: Some(DamageSpec {
                dice: vec![DiceGroup::new(1, 10)],
                ability: Some(Ability::Str),
                ..DamageSpec::default()
            }),
            ..PowerOutcome::default()
        }),
        ..PowerDefinition::new("cleave", "Cleave")
    }
}

fn script() -> Vec<Command> {
    vec![
        Command::SetInitiative {
            order: vec![id("fighter"), id("orc"), id("wizard")],
        },
        Command::UsePower {
            actor: id("fighter"),
            power: "cleave".into(),
            targets: Some(vec![id("orc")]),
            options: PowerOptions::default(),
        },
        Command::AdvanceTurn,
        Command::Attack {
            attacker: id("orc"),
            defenders: vec![id("fighter")],
            spec: AttackSpec::melee_basic(),
            options: AttackOptions::default(),
        },
        Command::AdvanceTurn,
        Command::Move {
            actor: id("wizard"),
            to: Position::new(1, 9),
            mode: MoveMode::Walk,
        },
        Command::AdvanceTurn,
    ]
}

fn run(state: &mut State, env: &Env<'_>, commands: &[Command]) -> Vec<Patch> {
    let mut engine = GameEngine::new(state);
    let mut stream = Vec::new();
    for command in commands {
        let outcome = engine.execute(env, command).expect("command");
        stream.extend(outcome.patches);
    }
    stream
}

#[test]
fn same_seed_and_commands_replay_to_the_same_digest() {
    let catalog = Catalog(vec![cleave()]);
    let env = Env::with_powers(&catalog);
    let initial = skirmish();

    let mut first = initial.clone();
    let stream = run(&mut first, &env, &script());
    let mut second = initial.clone();
    run(&mut second, &env, &script());

    assert_eq!(first, second);
    let digest = first.digest().expect("digest");
    assert_eq!(digest, second.digest().expect("digest"));
    assert_eq!(hex::encode(digest).len(), 64);

    let replayed = replay(&initial, &stream);
    assert_eq!(replayed, first);
}

#[test]
fn a_full_round_wraps_to_round_two() {
    let catalog = Catalog(vec![cleave()]);
    let env = Env::with_powers(&catalog);
    let mut state = skirmish();
    run(&mut state, &env, &script());

    assert_eq!(state.round, 2);
    assert_eq!(state.current_actor(), Some(&id("fighter")));
    let kinds: Vec<LogKind> = state.log.iter().map(|entry| entry.kind).collect();
    assert_eq!(kinds.iter().filter(|k| **k == LogKind::RoundBegin).count(), 2);
    assert!(kinds.contains(&LogKind::PowerUse));
    assert!(state
        .usage_of(&id("fighter"))
        .is_some_and(|usage| usage.encounter_powers.contains("cleave")));
}

#[test]
fn log_timestamps_strictly_increase() {
    let catalog = Catalog(vec![cleave()]);
    let env = Env::with_powers(&catalog);
    let mut state = skirmish();
    run(&mut state, &env, &script());
    assert!(state.log.windows(2).all(|pair| pair[0].ts < pair[1].ts));
    assert_eq!(state.log.last().map(|entry| entry.ts), Some(state.ts));
}

#[test]
fn critical_hit_maximizes_dice() {
    let mut state = skirmish();
    let outcome = GameEngine::new(&mut state)
        .execute(&Env::empty(), &Command::Attack {
            attacker: id("fighter"),
            defenders: vec![id("orc")],
            spec: AttackSpec::melee_basic(),
            options: AttackOptions { force_d20: Some(20) },
        })
        .expect("attack");

    assert_eq!(
        outcome.result,
        CommandResult::Attacks(vec![(id("orc"), HitOutcome::Crit)])
    );
    // d6 maximized plus STR 3.
    assert_eq!(state.actor(&id("orc")).map(|a| a.hp.current), Some(32 - 9));
}

#[test]
fn natural_one_misses_regardless_of_bonus() {
    let mut state = skirmish();
    let outcome = GameEngine::new(&mut state)
        .execute(&Env::empty(), &Command::Attack {
            attacker: id("fighter"),
            defenders: vec![id("orc")],
            spec: AttackSpec::melee_basic(),
            options: AttackOptions { force_d20: Some(1) },
        })
        .expect("attack");
    assert_eq!(
        outcome.result,
        CommandResult::Attacks(vec![(id("orc"), HitOutcome::Miss)])
    );
    assert_eq!(state.actor(&id("orc")).map(|a| a.hp.current), Some(32));
}

#[test]
fn temporary_hit_points_absorb_damage_first() {
    let mut state = skirmish();
    let mut engine = GameEngine::new(&mut state);
    let env = Env::empty();
    engine
        .execute(&env, &Command::GainTempHp {
            actor: id("fighter"),
            amount: 5,
        })
        .expect("temp");
    engine
        .execute(&env, &Command::Damage {
            actor: id("fighter"),
            amount: 8,
            damage_type: Default::default(),
        })
        .expect("damage");

    let hp = state.actor(&id("fighter")).map(|a| a.hp).expect("fighter");
    assert_eq!((hp.current, hp.temp), (27, 0));
}

#[test]
fn second_wind_heals_once_per_encounter() {
    let mut state = skirmish();
    state.actors.get_mut(&id("fighter")).expect("fighter").hp.current = 10;
    let mut engine = GameEngine::new(&mut state);
    let env = Env::empty();
    let command = Command::SecondWind {
        actor: id("fighter"),
    };
    engine.execute(&env, &command).expect("second wind");
    engine.execute(&env, &command).expect("denied second wind");

    let fighter = state.actor(&id("fighter")).expect("fighter");
    assert_eq!(fighter.hp.current, 17);
    assert_eq!(fighter.surges.remaining, 2);
    assert_eq!(fighter.flags.defense_bonus, 2);
    assert!(fighter.flags.used_second_wind);
}

#[test]
fn dying_actor_dies_after_three_failed_saves() {
    let mut state = skirmish();
    let env = Env::empty();
    let mut engine = GameEngine::new(&mut state);
    engine
        .execute(&env, &Command::Damage {
            actor: id("wizard"),
            amount: 25,
            damage_type: Default::default(),
        })
        .expect("damage");
    assert!(engine.state().actor(&id("wizard")).is_some_and(|a| a.flags.dying));

    for _ in 0..3 {
        engine
            .execute(&env, &Command::DeathSave {
                actor: id("wizard"),
                force_d20: Some(4),
            })
            .expect("death save");
    }
    let wizard = state.actor(&id("wizard")).expect("wizard");
    assert!(wizard.flags.dead);
    assert!(!wizard.flags.dying);
    assert_eq!(wizard.death.failures, 3);
    assert_eq!(state.log.iter().filter(|e| e.kind == LogKind::Die).count(), 1);
}

#[test]
fn massive_damage_kills_outright() {
    let mut state = skirmish();
    GameEngine::new(&mut state)
        .execute(&Env::empty(), &Command::Damage {
            actor: id("wizard"),
            amount: 33,
            damage_type: Default::default(),
        })
        .expect("damage");
    assert!(state.actor(&id("wizard")).is_some_and(|a| a.flags.dead));
}

#[test]
fn push_stops_short_of_the_blocker() {
    let mut state = skirmish();
    GameEngine::new(&mut state)
        .execute(&Env::empty(), &Command::Push {
            source: id("fighter"),
            target: id("orc"),
            squares: 4,
        })
        .expect("push");
    assert_eq!(state.position_of(&id("orc")), Some(Position::new(5, 3)));
}

#[test]
fn staged_targets_feed_the_next_power_use() {
    let catalog = Catalog(vec![cleave()]);
    let env = Env::with_powers(&catalog);
    let mut state = skirmish().with_turn_order(vec![id("fighter"), id("orc")]);
    let mut engine = GameEngine::new(&mut state);

    engine
        .execute(&env, &Command::StageTargeting {
            actor: id("fighter"),
            power: "cleave".into(),
            choices: TargetChoices::default(),
            targets: vec![id("orc")],
        })
        .expect("stage");
    assert!(engine.state().staging.is_some());

    engine
        .execute(&env, &Command::UsePower {
            actor: id("fighter"),
            power: "cleave".into(),
            targets: None,
            options: PowerOptions {
                force_d20: Some(15),
                ..PowerOptions::default()
            },
        })
        .expect("use power");

    assert!(state.staging.is_none());
    let orc = state.actor(&id("orc")).expect("orc");
    assert!(orc.hp.current < 32);
}
