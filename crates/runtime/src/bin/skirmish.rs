//! Headless match driver.
//!
//! Loads rules and powers from a content directory, sets up a match from a
//! TOML file (or a small built-in roster), and lets every combatant swing at
//! the nearest enemy until one team is left standing.
//!
//! Environment:
//! - `SKIRMISH_DATA_DIR`: content directory holding `rules.toml` and `powers.ron`
//! - `SKIRMISH_MATCH`: match setup TOML
//! - `SKIRMISH_LOG_OUT`: where to write the JSON-lines match log
//! - `SKIRMISH_MAX_ROUNDS`: round cap, 10 by default
//! - `RUST_LOG`: tracing filter

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use skirmish_content::ContentFactory;
use skirmish_core::tactics::chebyshev;
use skirmish_core::{ActorId, Command, PowerOptions, State};
use skirmish_runtime::{MatchConfig, MatchEvent, MatchHandle, MatchRuntime};

const DEFAULT_MATCH: &str = r#"
seed = 42

[board]
width = 10
height = 10
blockers = [{ x = 5, y = 5 }]

[[roster]]
id = "fighter"
team = "heroes"
hp = 30
at = { x = 3, y = 4 }
abilities = { Str = 4 }
defenses = { ac = 18, fortitude = 16, reflex = 13, will = 12 }
surges = [2, 7]

[[roster]]
id = "orc"
team = "monsters"
hp = 28
at = { x = 4, y = 4 }
abilities = { Str = 3 }
defenses = { ac = 15, fortitude = 14, reflex = 12, will = 11 }
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = setup_logging()?;

    let data_dir = std::env::var_os("SKIRMISH_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../game/content/data")));
    let factory = ContentFactory::new(&data_dir);
    let rules = factory.load_rules()?;
    let powers = factory.load_powers()?;

    let config = match std::env::var_os("SKIRMISH_MATCH") {
        Some(path) => MatchConfig::load(&PathBuf::from(&path))
            .with_context(|| format!("loading match {}", PathBuf::from(path).display()))?,
        None => MatchConfig::from_toml_str(DEFAULT_MATCH)?,
    };
    let max_rounds = std::env::var("SKIRMISH_MAX_ROUNDS")
        .ok()
        .map(|value| value.parse::<u32>())
        .transpose()
        .context("SKIRMISH_MAX_ROUNDS must be a number")?
        .unwrap_or(10);

    let order: Vec<ActorId> = config.roster.iter().map(|c| ActorId::from(c.id.as_str())).collect();
    let runtime = MatchRuntime::builder()
        .config(config)
        .rules(rules)
        .powers(powers)
        .build();
    let handle = runtime.handle();

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let MatchEvent::Logged(entry) = event {
                println!("[{:>4}] {:<18} {}", entry.ts, entry.kind.to_string(), entry.msg);
            }
        }
    });

    handle.execute(Command::SetInitiative { order }).await?;
    run_match(&handle, max_rounds).await?;

    let digest = handle.digest().await?;
    info!(digest = %hex::encode(digest), "match finished");

    if let Some(path) = std::env::var_os("SKIRMISH_LOG_OUT") {
        std::fs::write(&path, handle.export_log().await?)
            .with_context(|| format!("writing {}", PathBuf::from(path).display()))?;
    }

    drop(handle);
    runtime.shutdown().await?;
    printer.await?;
    Ok(())
}

async fn run_match(handle: &MatchHandle, max_rounds: u32) -> Result<()> {
    loop {
        let state = handle.snapshot().await?;
        if state.round > max_rounds {
            warn!(max_rounds, "round cap reached");
            return Ok(());
        }
        if let Some(team) = last_team_standing(&state) {
            info!(%team, round = state.round, "team wins");
            return Ok(());
        }

        if let Some(actor) = state.current_actor().cloned()
            && let Some(target) = nearest_enemy(&state, &actor)
        {
            handle
                .execute(Command::UsePower {
                    actor,
                    power: "basic-attack".into(),
                    targets: Some(vec![target]),
                    options: PowerOptions::default(),
                })
                .await?;
        }
        handle.execute(Command::AdvanceTurn).await?;
    }
}

fn nearest_enemy(state: &State, actor: &ActorId) -> Option<ActorId> {
    let from = state.position_of(actor)?;
    state
        .actors
        .values()
        .filter(|other| other.is_alive() && state.are_enemies(actor, &other.id))
        .filter_map(|other| Some((chebyshev(from, state.position_of(&other.id)?), &other.id)))
        .min()
        .map(|(_, id)| id.clone())
}

fn last_team_standing(state: &State) -> Option<String> {
    let mut teams = state
        .actors
        .values()
        .filter(|actor| actor.is_alive())
        .map(|actor| actor.team.as_str());
    let first = teams.next()?;
    teams.all(|team| team == first).then(|| first.to_owned())
}

/// Logs to stderr and to a file under the platform cache directory.
fn setup_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = directories::ProjectDirs::from("", "", "skirmish")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("skirmish"));
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "skirmish.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false),
        )
        .init();

    info!(log_dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}
