//! Match setup loaded from TOML.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use skirmish_core::state::{Ability, Defenses};
use skirmish_core::{Actor, Board, Position, RulesConfig, State};

use crate::error::Result;

/// Runtime configuration for a single match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub seed: u64,
    pub board: BoardConfig,
    pub roster: Vec<CombatantConfig>,
    /// Capacity of the worker's command queue.
    pub command_buffer_size: usize,
    /// Capacity of the event broadcast; slow subscribers lag past this.
    pub event_buffer_size: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            board: BoardConfig::default(),
            roster: Vec::new(),
            command_buffer_size: 32,
            event_buffer_size: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: i32,
    pub height: i32,
    pub blockers: Vec<Position>,
    pub difficult: Vec<Position>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 15,
            blockers: Vec::new(),
            difficult: Vec::new(),
        }
    }
}

/// One combatant placed on the board at match start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantConfig {
    pub id: String,
    pub team: String,
    pub hp: i32,
    pub at: Position,
    #[serde(default)]
    pub speed: Option<u32>,
    #[serde(default)]
    pub defenses: Option<Defenses>,
    #[serde(default)]
    pub abilities: BTreeMap<Ability, i32>,
    #[serde(default)]
    pub surges: Option<(u32, i32)>,
}

impl CombatantConfig {
    fn to_actor(&self) -> Actor {
        let mut actor = Actor::new(self.id.as_str(), self.team.as_str(), self.hp);
        if let Some(speed) = self.speed {
            actor = actor.with_speed(speed);
        }
        if let Some(defenses) = self.defenses {
            actor = actor.with_defenses(defenses);
        }
        if let Some((remaining, value)) = self.surges {
            actor = actor.with_surges(remaining, value);
        }
        for (&ability, &modifier) in &self.abilities {
            actor = actor.with_ability(ability, modifier);
        }
        actor
    }
}

impl MatchConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Builds the starting state for this match under `rules`.
    pub fn initial_state(&self, rules: RulesConfig) -> State {
        let board = Board::new(self.board.width, self.board.height)
            .with_blockers(self.board.blockers.iter().copied())
            .with_difficult(self.board.difficult.iter().copied());
        self.roster
            .iter()
            .fold(State::new(self.seed, board).with_rules(rules), |state, combatant| {
                state.with_actor(combatant.to_actor(), combatant.at)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::ActorId;

    const MATCH: &str = r#"
seed = 7
command_buffer_size = 4

[board]
width = 8
height = 8
blockers = [{ x = 4, y = 4 }]

[[roster]]
id = "fighter"
team = "heroes"
hp = 30
at = { x = 1, y = 1 }
abilities = { Str = 3 }

[[roster]]
id = "goblin"
team = "monsters"
hp = 12
at = { x = 2, y = 1 }
speed = 7
"#;

    #[test]
    fn parses_roster_and_builds_state() {
        let config = MatchConfig::from_toml_str(MATCH).expect("parse");
        assert_eq!(config.seed, 7);
        assert_eq!(config.command_buffer_size, 4);
        assert_eq!(config.event_buffer_size, 256);

        let state = config.initial_state(RulesConfig::default());
        assert_eq!(state.actors.len(), 2);
        assert_eq!(state.position_of(&ActorId::from("goblin")), Some(Position::new(2, 1)));
        assert!(state.are_enemies(&ActorId::from("fighter"), &ActorId::from("goblin")));
        assert_eq!(state.actor(&ActorId::from("goblin")).map(|a| a.speed), Some(7));
    }

    #[test]
    fn rejects_malformed_roster() {
        let error = MatchConfig::from_toml_str("[[roster]]\nid = \"x\"").expect_err("missing fields");
        assert!(matches!(error, crate::RuntimeError::Config(_)));
    }
}
