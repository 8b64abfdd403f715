//! Test fixtures and helpers.
//!
//! Pre-built boards, units and moves for consistent testing.

use std::sync::Arc;

use fixed::types::I32F32;
use tactics_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point multiplier from a percentage.
#[must_use]
pub fn pct(n: i32) -> Fixed {
    tactics_core::math::percent(n)
}

/// Three turns of 2 damage per turn.
#[must_use]
pub fn burn() -> StatusEffectInfo {
    StatusEffectInfo::new("Burn", 3).with_turn_effect(TurnEffect::Damage(2))
}

/// Two turns of -3 attack.
#[must_use]
pub fn weaken() -> StatusEffectInfo {
    StatusEffectInfo::new("Weaken", 2).with_modifiers(StatModifiers {
        attack: -3,
        ..StatModifiers::NONE
    })
}

/// Three turns of +2 hp per turn.
#[must_use]
pub fn regen() -> StatusEffectInfo {
    StatusEffectInfo::new("Regen", 3).with_turn_effect(TurnEffect::Heal(2))
}

/// Free single-square hit at full power.
#[must_use]
pub fn strike() -> MoveInfo {
    MoveInfo::new("Strike", fixed(1), AttackShape::melee())
}

/// Piercing two-square line at full power.
#[must_use]
pub fn lance() -> MoveInfo {
    MoveInfo::new("Lance", fixed(1), AttackShape::line(2))
        .piercing()
        .with_cost(3)
}

/// Weak hit that sets the target alight.
#[must_use]
pub fn firebrand() -> MoveInfo {
    MoveInfo::new("Firebrand", pct(50), AttackShape::melee())
        .with_cost(2)
        .inflicting(burn())
}

/// Heals the four neighbouring squares.
#[must_use]
pub fn mend() -> MoveInfo {
    MoveInfo::new(
        "Mend",
        Fixed::ZERO,
        AttackShape::new(vec![(-1, 0), (0, 1), (1, 0), (0, -1)]),
    )
    .with_cost(2)
    .with_misc_effect(MiscEffect::HealByAttackPercent(100))
}

/// A well-rounded combatant with every fixture move.
#[must_use]
pub fn soldier(team: TeamId) -> EntityValue {
    EntityValue::new(Some(team), 20)
        .with_stats(6, 2)
        .with_sp(4)
        .with_speed(2)
        .with_moves(vec![strike(), lance(), firebrand(), mend()])
}

/// An unaffiliated obstacle.
#[must_use]
pub fn rock() -> EntityValue {
    EntityValue::object(15, 3)
}

/// Builder for test boards.
///
/// # Example
///
/// ```ignore
/// let board = BoardBuilder::new(5, 5, 2)
///     .unit((4, 2), soldier(0))
///     .unit((0, 2), soldier(1))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct BoardBuilder {
    size: BoardSize,
    team_count: usize,
    zones: Vec<Vec<Position>>,
    weights: EvaluationWeights,
    ids: EntityIdAllocator,
    occupants: Vec<(EntityId, Position, EntityValue)>,
}

impl BoardBuilder {
    /// Start an empty board.
    #[must_use]
    pub fn new(rows: u32, cols: u32, team_count: usize) -> Self {
        Self {
            size: BoardSize::new(rows, cols),
            team_count,
            zones: Vec::new(),
            weights: EvaluationWeights::default(),
            ids: EntityIdAllocator::new(),
            occupants: Vec::new(),
        }
    }

    /// Set one zone list per team.
    #[must_use]
    pub fn zones(mut self, zones: Vec<Vec<(i32, i32)>>) -> Self {
        self.zones = zones
            .into_iter()
            .map(|zone| zone.into_iter().map(Position::from).collect())
            .collect();
        self
    }

    /// Override evaluation weights.
    #[must_use]
    pub fn weights(mut self, weights: EvaluationWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Add an occupant with the next free id.
    #[must_use]
    pub fn unit(mut self, at: (i32, i32), value: EntityValue) -> Self {
        let id = self.ids.mint();
        self.occupants.push((id, Position::from(at), value));
        self
    }

    /// Add an occupant unless its square is already taken or off the board.
    #[must_use]
    pub fn unit_if_free(self, at: (i32, i32), value: EntityValue) -> Self {
        let position = Position::from(at);
        let taken = self.occupants.iter().any(|(_, p, _)| *p == position);
        if taken || !self.size.contains(position) {
            self
        } else {
            self.unit(at, value)
        }
    }

    /// The shared configuration this builder would use.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    #[must_use]
    pub fn config(&self) -> Arc<BoardConfig> {
        let config = BoardConfig::with_zones(self.size, self.team_count, self.zones.clone())
            .expect("invalid fixture board configuration")
            .with_weights(self.weights);
        Arc::new(config)
    }

    /// Build the board.
    ///
    /// # Panics
    ///
    /// Panics if any occupant is rejected.
    #[must_use]
    pub fn build(self) -> BoardState {
        BoardState::from_occupants(self.config(), self.occupants)
            .expect("invalid fixture board occupant")
    }
}

/// Three soldiers per side on a 6x6 board with two rocks in the middle.
#[must_use]
pub fn skirmish_board() -> BoardState {
    BoardBuilder::new(6, 6, 2)
        .unit((5, 1), soldier(0))
        .unit((5, 3), soldier(0))
        .unit((5, 5), soldier(0))
        .unit((0, 0), soldier(1))
        .unit((0, 2), soldier(1))
        .unit((0, 4), soldier(1))
        .unit((2, 2), rock())
        .unit((3, 3), rock())
        .build()
}

/// A 5x5 board where each team wants the far corner.
#[must_use]
pub fn zone_race_board() -> BoardState {
    BoardBuilder::new(5, 5, 2)
        .zones(vec![vec![(0, 4)], vec![(4, 0)]])
        .unit((4, 4), soldier(0))
        .unit((0, 0), soldier(1))
        .build()
}

/// One full round: every team with survivors picks and applies its best
/// turn, then runs its end-of-turn effects.
pub fn ai_round(board: &mut BoardState, player: &ComputerPlayer) {
    for team in 0..board.config().team_count() {
        if board.live_count(team) == 0 {
            continue;
        }
        if let Some(best) = player.choose_turn(board, team) {
            board.apply_turn(&best.turn);
        }
        board.apply_turn_effects(team);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_mints_sequential_ids() {
        let board = BoardBuilder::new(3, 3, 2)
            .unit((0, 0), soldier(0))
            .unit((2, 2), soldier(1))
            .build();
        assert_eq!(board.entities().sorted_ids(), vec![EntityId(1), EntityId(2)]);
        assert_eq!(board.live_counts(), &[1, 1]);
    }

    #[test]
    fn test_unit_if_free_skips_conflicts() {
        let board = BoardBuilder::new(3, 3, 2)
            .unit_if_free((0, 0), soldier(0))
            .unit_if_free((0, 0), soldier(1))
            .unit_if_free((9, 9), soldier(1))
            .build();
        assert_eq!(board.entities().len(), 1);
    }

    #[test]
    fn test_skirmish_board_is_valid() {
        let board = skirmish_board();
        assert_eq!(board.live_counts(), &[3, 3]);
        assert_eq!(board.entities().len(), 8);
        assert!(board.verify_invariants());
    }

    #[test]
    fn test_zone_race_board_has_zones() {
        let board = zone_race_board();
        assert!(board.config().has_zones());
        assert!(board.config().is_zone_of(0, Position::new(0, 4)));
    }
}
