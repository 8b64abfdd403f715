//! Win conditions and team turn order.

use serde::{Deserialize, Serialize};

use crate::board_state::{BoardConfig, BoardState};
use crate::entity::TeamId;
use crate::error::{GameError, Result};

/// Which zone squares count as a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneRule {
    /// A team wins by standing on one of its own victory squares.
    OwnZones,
    /// A team wins by standing on any team's victory square.
    AnyZone,
}

/// One way to end the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinCondition {
    /// The only team with surviving combatants wins.
    AllDead,
    /// A combatant standing on a zone square wins for its team.
    ZoneCapture(ZoneRule),
}

impl WinCondition {
    /// Winner under this condition alone.
    #[must_use]
    pub fn winner(self, board: &BoardState) -> Option<TeamId> {
        match self {
            Self::AllDead => {
                let mut alive = (0..board.config().team_count()).filter(|&t| board.live_count(t) > 0);
                match (alive.next(), alive.next()) {
                    (Some(team), None) => Some(team),
                    _ => None,
                }
            }
            Self::ZoneCapture(rule) => {
                let config = board.config();
                board
                    .entities()
                    .values()
                    .filter_map(|value| {
                        let team = value.team?;
                        let captured = match rule {
                            ZoneRule::OwnZones => config.is_zone_of(team, value.position()),
                            ZoneRule::AnyZone => config.is_any_zone(value.position()),
                        };
                        captured.then_some(team)
                    })
                    .min()
            }
        }
    }
}

/// Ordered set of win conditions for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    conditions: Vec<WinCondition>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            conditions: vec![WinCondition::AllDead],
        }
    }
}

impl Rules {
    /// Create rules for a board.
    ///
    /// # Errors
    ///
    /// Fails if no condition is given or if a zone condition is used on a
    /// board without zones.
    pub fn new(conditions: Vec<WinCondition>, config: &BoardConfig) -> Result<Self> {
        if conditions.is_empty() {
            return Err(GameError::InvalidConfiguration(
                "at least one win condition is required".to_string(),
            ));
        }
        let needs_zones = conditions
            .iter()
            .any(|c| matches!(c, WinCondition::ZoneCapture(_)));
        if needs_zones && !config.has_zones() {
            return Err(GameError::InvalidConfiguration(
                "zone capture requires a board with zones".to_string(),
            ));
        }
        Ok(Self { conditions })
    }

    /// Conditions in evaluation order.
    #[must_use]
    pub fn conditions(&self) -> &[WinCondition] {
        &self.conditions
    }

    /// First winner found, checking conditions in declared order.
    ///
    /// Ties within a condition go to the lowest team id.
    #[must_use]
    pub fn check_win_conditions(&self, board: &BoardState) -> Option<TeamId> {
        self.conditions
            .iter()
            .find_map(|condition| condition.winner(board))
    }
}

/// Round-robin over teams, skipping teams with no survivors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    team_count: usize,
    current: TeamId,
    round: u32,
}

impl TurnOrder {
    /// Start at team 0 in round 1.
    ///
    /// # Errors
    ///
    /// Fails if there are no teams.
    pub fn new(team_count: usize) -> Result<Self> {
        if team_count == 0 {
            return Err(GameError::InvalidConfiguration(
                "turn order needs at least one team".to_string(),
            ));
        }
        Ok(Self {
            team_count,
            current: 0,
            round: 1,
        })
    }

    /// Team whose turn it is.
    #[must_use]
    pub const fn current(&self) -> TeamId {
        self.current
    }

    /// Current round, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// The current team if it has survivors, otherwise the next one that does.
    pub fn start(&mut self, board: &BoardState) -> Option<TeamId> {
        if board.live_count(self.current) > 0 {
            Some(self.current)
        } else {
            self.advance(board)
        }
    }

    /// Pass the turn to the next team with survivors.
    ///
    /// Wrapping past the last team starts a new round. Returns `None` if no
    /// team has survivors.
    pub fn advance(&mut self, board: &BoardState) -> Option<TeamId> {
        for _ in 0..self.team_count {
            self.current += 1;
            if self.current >= self.team_count {
                self.current = 0;
                self.round += 1;
            }
            if board.live_count(self.current) > 0 {
                return Some(self.current);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entity::{EntityId, EntityValue};
    use crate::position::{BoardSize, Position};

    fn zoned(team_count: usize) -> Arc<BoardConfig> {
        let zones = (0..team_count)
            .map(|t| vec![Position::new(0, t as i32)])
            .collect();
        Arc::new(BoardConfig::with_zones(BoardSize::new(4, 4), team_count, zones).unwrap())
    }

    fn board_with(config: Arc<BoardConfig>, units: &[(u64, TeamId, (i32, i32))]) -> BoardState {
        BoardState::from_occupants(
            config,
            units.iter().map(|&(id, team, (row, col))| {
                (EntityId(id), Position::new(row, col), EntityValue::new(Some(team), 5))
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_rules_validation() {
        let plain = BoardConfig::new(BoardSize::new(3, 3), 2).unwrap();
        assert!(Rules::new(vec![], &plain).is_err());
        assert!(Rules::new(vec![WinCondition::ZoneCapture(ZoneRule::OwnZones)], &plain).is_err());
        assert!(Rules::new(vec![WinCondition::AllDead], &plain).is_ok());
    }

    #[test]
    fn test_all_dead_multi_team() {
        let config = zoned(3);
        let board = board_with(Arc::clone(&config), &[(1, 0, (3, 0)), (2, 2, (3, 3))]);
        assert_eq!(WinCondition::AllDead.winner(&board), None);

        let board = board_with(config, &[(1, 2, (3, 0))]);
        assert_eq!(WinCondition::AllDead.winner(&board), Some(2));
    }

    #[test]
    fn test_zone_capture_rules() {
        // Team 0 stands on team 1's square (0, 1)
        let board = board_with(zoned(2), &[(1, 0, (0, 1)), (2, 1, (3, 3))]);

        assert_eq!(WinCondition::ZoneCapture(ZoneRule::OwnZones).winner(&board), None);
        assert_eq!(WinCondition::ZoneCapture(ZoneRule::AnyZone).winner(&board), Some(0));
    }

    #[test]
    fn test_conditions_checked_in_order() {
        let config = zoned(2);
        // Team 1 is wiped out while team 0 holds nothing; team 1 zone empty
        let board = board_with(Arc::clone(&config), &[(1, 0, (2, 2))]);

        let rules = Rules::new(
            vec![WinCondition::ZoneCapture(ZoneRule::OwnZones), WinCondition::AllDead],
            &config,
        )
        .unwrap();
        assert_eq!(rules.check_win_conditions(&board), Some(0));

        let zone_only = Rules::new(vec![WinCondition::ZoneCapture(ZoneRule::OwnZones)], &config).unwrap();
        assert_eq!(zone_only.check_win_conditions(&board), None);
    }

    #[test]
    fn test_turn_order_skips_eliminated() {
        let board = board_with(zoned(3), &[(1, 0, (3, 0)), (2, 2, (3, 3))]);
        let mut order = TurnOrder::new(3).unwrap();

        assert_eq!(order.start(&board), Some(0));
        assert_eq!(order.advance(&board), Some(2));
        assert_eq!(order.round(), 1);
        assert_eq!(order.advance(&board), Some(0));
        assert_eq!(order.round(), 2);
    }

    #[test]
    fn test_turn_order_without_survivors() {
        let board = BoardState::new(zoned(2));
        let mut order = TurnOrder::new(2).unwrap();
        assert_eq!(order.start(&board), None);
        assert!(TurnOrder::new(0).is_err());
    }
}
