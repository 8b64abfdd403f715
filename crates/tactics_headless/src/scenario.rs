//! Scenario loading and configuration.
//!
//! Scenarios define the starting battle for headless runs: board size,
//! teams with their units and victory squares, scenery, the status and move
//! catalogs units draw from, and how the match ends.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tactics_core::prelude::*;
use std::result::Result;

use crate::roster::Roster;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// A unit refers to a move or status that is not in the catalog.
    #[error("Unit '{unit}' refers to unknown {kind} '{name}'")]
    UnknownReference {
        /// Unit name.
        unit: String,
        /// "move" or "status".
        kind: &'static str,
        /// Missing catalog entry.
        name: String,
    },
    /// The battle core rejected the setup.
    #[error("Invalid scenario: {0}")]
    Game(#[from] GameError),
}

/// A move as authored in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveData {
    /// Catalog key and display name.
    pub name: String,
    /// Damage multiplier in percent of the user's attack.
    pub power_percent: i32,
    /// Skill point cost.
    #[serde(default)]
    pub sp_cost: i32,
    /// Ignore defense.
    #[serde(default)]
    pub pierce: bool,
    /// Target offsets, authored facing up (`(-1, 0)` is straight ahead).
    pub shape: Vec<(i32, i32)>,
    /// Names of statuses added to each target.
    #[serde(default)]
    pub inflicts: Vec<String>,
    /// Extra per-target effect.
    #[serde(default)]
    pub misc_effect: Option<MiscEffect>,
}

/// A unit placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Display name.
    pub name: String,
    /// Single-character map symbol.
    pub glyph: char,
    /// Starting square `(row, col)`.
    pub at: (i32, i32),
    /// Maximum (and starting) hit points.
    pub hp: u32,
    /// Base attack.
    pub attack: i32,
    /// Base defense.
    pub defense: i32,
    /// Starting skill points.
    #[serde(default)]
    pub sp: i32,
    /// Squares per turn.
    pub speed: u32,
    /// Move names from the catalog.
    pub moves: Vec<String>,
    /// Statuses active at the start.
    #[serde(default)]
    pub statuses: Vec<String>,
}

/// Scenery that can be hit but belongs to nobody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPlacement {
    /// Display name.
    pub name: String,
    /// Single-character map symbol.
    pub glyph: char,
    /// Square `(row, col)`.
    pub at: (i32, i32),
    /// Hit points.
    pub hp: u32,
    /// Defense.
    #[serde(default)]
    pub defense: i32,
}

/// One team's setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSetup {
    /// Team name.
    pub name: String,
    /// Victory squares for this team.
    #[serde(default)]
    pub zones: Vec<(i32, i32)>,
    /// Let every unit act each turn instead of the single best one.
    #[serde(default)]
    pub plan_whole_team: bool,
    /// Computer player settings (tie-break seed is mixed with the match seed).
    #[serde(default)]
    pub ai: AiConfig,
    /// Starting units.
    pub units: Vec<UnitPlacement>,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Board dimensions `(rows, cols)`.
    pub board: (u32, u32),
    /// Teams in turn order.
    pub teams: Vec<TeamSetup>,
    /// Scenery.
    #[serde(default)]
    pub objects: Vec<ObjectPlacement>,
    /// Status catalog.
    #[serde(default)]
    pub statuses: Vec<StatusEffectInfo>,
    /// Move catalog.
    pub moves: Vec<MoveData>,
    /// Win conditions in the order they are checked.
    pub win_conditions: Vec<WinCondition>,
    /// Rounds before the match is called a draw.
    pub max_rounds: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Built-in two-team skirmish on a 7x7 board.
    #[must_use]
    pub fn skirmish() -> Self {
        let unit = |name: &str, glyph, at, moves: &[&str]| UnitPlacement {
            name: name.to_string(),
            glyph,
            at,
            hp: 24,
            attack: 7,
            defense: 2,
            sp: 3,
            speed: 2,
            moves: moves.iter().map(|m| (*m).to_string()).collect(),
            statuses: Vec::new(),
        };

        let skirmish_ai = AiConfig {
            tie_break: TieBreak::Seeded(0),
            require_affordable_moves: true,
        };

        Self {
            name: "Skirmish".to_string(),
            description: "Three against three across a rocky field".to_string(),
            board: (7, 7),
            teams: vec![
                TeamSetup {
                    name: "Azure".to_string(),
                    zones: Vec::new(),
                    plan_whole_team: false,
                    ai: skirmish_ai,
                    units: vec![
                        unit("Knight", 'K', (6, 1), &["Strike", "Lance"]),
                        unit("Pyro", 'P', (6, 3), &["Strike", "Firebrand"]),
                        unit("Cleric", 'C', (6, 5), &["Strike", "Mend"]),
                    ],
                },
                TeamSetup {
                    name: "Crimson".to_string(),
                    zones: Vec::new(),
                    plan_whole_team: false,
                    ai: skirmish_ai,
                    units: vec![
                        unit("Knight", 'k', (0, 5), &["Strike", "Lance"]),
                        unit("Pyro", 'p', (0, 3), &["Strike", "Firebrand"]),
                        unit("Cleric", 'c', (0, 1), &["Strike", "Mend"]),
                    ],
                },
            ],
            objects: vec![
                ObjectPlacement {
                    name: "Boulder".to_string(),
                    glyph: '#',
                    at: (3, 2),
                    hp: 30,
                    defense: 4,
                },
                ObjectPlacement {
                    name: "Boulder".to_string(),
                    glyph: '#',
                    at: (3, 4),
                    hp: 30,
                    defense: 4,
                },
            ],
            statuses: vec![StatusEffectInfo::new("Burn", 3).with_turn_effect(TurnEffect::Damage(2))],
            moves: vec![
                MoveData {
                    name: "Strike".to_string(),
                    power_percent: 100,
                    sp_cost: 0,
                    pierce: false,
                    shape: vec![(-1, 0)],
                    inflicts: Vec::new(),
                    misc_effect: None,
                },
                MoveData {
                    name: "Lance".to_string(),
                    power_percent: 80,
                    sp_cost: 2,
                    pierce: true,
                    shape: vec![(-1, 0), (-2, 0)],
                    inflicts: Vec::new(),
                    misc_effect: None,
                },
                MoveData {
                    name: "Firebrand".to_string(),
                    power_percent: 50,
                    sp_cost: 2,
                    pierce: false,
                    shape: vec![(-1, -1), (-1, 0), (-1, 1)],
                    inflicts: vec!["Burn".to_string()],
                    misc_effect: None,
                },
                MoveData {
                    name: "Mend".to_string(),
                    power_percent: 0,
                    sp_cost: 1,
                    pierce: false,
                    shape: vec![(-1, 0), (0, 1), (1, 0), (0, -1)],
                    inflicts: Vec::new(),
                    misc_effect: Some(MiscEffect::HealByAttackPercent(100)),
                },
            ],
            win_conditions: vec![WinCondition::AllDead],
            max_rounds: 40,
        }
    }

    /// Team count.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Name of a team, or `"team N"` if it has none.
    #[must_use]
    pub fn team_name(&self, team: TeamId) -> String {
        self.teams
            .get(team)
            .map_or_else(|| format!("team {team}"), |t| t.name.clone())
    }

    /// Board configuration shared by every board of this scenario.
    pub fn board_config(&self) -> Result<Arc<BoardConfig>, ScenarioError> {
        let (rows, cols) = self.board;
        let zones = if self.teams.iter().any(|t| !t.zones.is_empty()) {
            self.teams
                .iter()
                .map(|t| t.zones.iter().copied().map(Position::from).collect())
                .collect()
        } else {
            Vec::new()
        };
        let config = BoardConfig::with_zones(BoardSize::new(rows, cols), self.team_count(), zones)?;
        Ok(Arc::new(config))
    }

    /// Win conditions for this scenario's board.
    pub fn rules(&self) -> Result<Rules, ScenarioError> {
        let config = self.board_config()?;
        Ok(Rules::new(self.win_conditions.clone(), &config)?)
    }

    /// Status catalog keyed by name.
    #[must_use]
    pub fn status_catalog(&self) -> HashMap<&str, &StatusEffectInfo> {
        self.statuses.iter().map(|s| (s.name.as_str(), s)).collect()
    }

    /// Resolve a unit's statuses against the catalog.
    pub fn unit_statuses(&self, unit: &UnitPlacement) -> Result<Vec<StatusEffectInfo>, ScenarioError> {
        let catalog = self.status_catalog();
        unit.statuses
            .iter()
            .map(|name| self.lookup_status(&catalog, &unit.name, name))
            .collect()
    }

    /// Resolve a unit's moves against the catalog.
    pub fn unit_moves(&self, unit: &UnitPlacement) -> Result<Vec<MoveInfo>, ScenarioError> {
        let statuses = self.status_catalog();
        unit.moves
            .iter()
            .map(|name| {
                let data = self
                    .moves
                    .iter()
                    .find(|m| &m.name == name)
                    .ok_or_else(|| ScenarioError::UnknownReference {
                        unit: unit.name.clone(),
                        kind: "move",
                        name: name.clone(),
                    })?;

                let mut info = MoveInfo::new(
                    data.name.clone(),
                    tactics_core::math::percent(data.power_percent),
                    AttackShape::new(data.shape.clone()),
                )
                .with_cost(data.sp_cost);
                if data.pierce {
                    info = info.piercing();
                }
                if let Some(effect) = data.misc_effect {
                    info = info.with_misc_effect(effect);
                }
                for status in &data.inflicts {
                    info = info.inflicting(self.lookup_status(&statuses, &unit.name, status)?);
                }
                Ok(info)
            })
            .collect()
    }

    fn lookup_status(
        &self,
        catalog: &HashMap<&str, &StatusEffectInfo>,
        unit: &str,
        name: &str,
    ) -> Result<StatusEffectInfo, ScenarioError> {
        catalog
            .get(name)
            .map(|s| (*s).clone())
            .ok_or_else(|| ScenarioError::UnknownReference {
                unit: unit.to_string(),
                kind: "status",
                name: name.to_string(),
            })
    }

    /// Check that the scenario can be turned into a playable board.
    ///
    /// Builds the configuration, the rules and the starting board, so every
    /// error a match would hit at start-up is reported here.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.teams.is_empty() {
            return Err(GameError::InvalidConfiguration("scenario has no teams".to_string()).into());
        }
        if self.max_rounds == 0 {
            return Err(GameError::InvalidConfiguration("max_rounds must be positive".to_string()).into());
        }
        self.rules()?;
        let roster = Roster::from_scenario(self)?;
        let board = BoardState::from_live(self.board_config()?, roster.units())?;
        tracing::debug!(
            scenario = %self.name,
            entities = board.entities().len(),
            "Scenario validated"
        );
        Ok(())
    }
}
