//! Computer player: candidate enumeration and one-ply search.
//!
//! Every candidate [`Turn`] is applied to a private clone of the board and
//! scored with [`BoardState::evaluate`]. The board passed in is never
//! mutated.
//!
//! Candidates are enumerated in a fixed order so that results are
//! reproducible:
//!
//! 1. Acting entities by ascending id
//! 2. Destinations in ascending [`Position`] order
//! 3. "No attack", then each move index
//! 4. Facings in [`Direction::ALL`] order

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::board_state::BoardState;
use crate::entity::{EntityId, EntityValue, TeamId};
use crate::moves::MoveInfo;
use crate::position::{Direction, Position};
use crate::turn::Turn;

/// How to pick between equally scored candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// Keep the first candidate in enumeration order.
    #[default]
    FirstSeen,
    /// Pick uniformly among tied candidates with a seeded generator.
    ///
    /// The generator is reseeded from the seed and the board hash on every
    /// search, so equal boards always produce equal choices.
    Seeded(u64),
}

/// Computer player settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// Tie-breaking strategy.
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Skip moves whose cost exceeds the actor's current skill points.
    #[serde(default)]
    pub require_affordable_moves: bool,
}

/// A candidate together with the score of the board it leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredTurn {
    /// The chosen turn.
    pub turn: Turn,
    /// `evaluate(team)` after applying it.
    pub score: i64,
}

/// Squares reachable from `origin` in at most `speed` orthogonal steps.
///
/// Depth-first walk that stops at the board edge and at occupied squares.
/// A square is only expanded again when it is reached with more steps left
/// than before. The origin itself is always included (standing still is a
/// valid destination).
#[must_use]
pub fn reachable_positions(board: &BoardState, origin: Position, speed: u32) -> BTreeSet<Position> {
    let mut steps_left = BTreeMap::new();
    steps_left.insert(origin, speed);
    explore(board, origin, speed, &mut steps_left);
    steps_left.into_keys().collect()
}

fn explore(
    board: &BoardState,
    at: Position,
    remaining: u32,
    steps_left: &mut BTreeMap<Position, u32>,
) {
    if remaining == 0 {
        return;
    }
    let left = remaining - 1;
    for direction in Direction::ALL {
        let next = at.step(direction);
        if !board.config().size().contains(next) || board.is_occupied(next) {
            continue;
        }
        if steps_left.get(&next).is_some_and(|&seen| seen >= left) {
            continue;
        }
        steps_left.insert(next, left);
        explore(board, next, left, steps_left);
    }
}

/// Splitmix-style generator for seeded tie-breaking.
struct TieRng {
    state: u64,
}

impl TieRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform-ish value in `0..bound`.
    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound.max(1)
    }
}

/// Picks turns for one team by exhaustive one-ply search.
#[derive(Debug, Clone, Default)]
pub struct ComputerPlayer {
    config: AiConfig,
}

impl ComputerPlayer {
    /// Create a player with the given settings.
    #[must_use]
    pub const fn new(config: AiConfig) -> Self {
        Self { config }
    }

    /// Player settings.
    #[must_use]
    pub const fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Every candidate turn for `team`, in enumeration order.
    #[must_use]
    pub fn candidate_turns(&self, board: &BoardState, team: TeamId) -> Vec<Turn> {
        board
            .team_members(team)
            .into_iter()
            .flat_map(|id| self.candidates_for(board, id))
            .collect()
    }

    /// Candidate turns for a single actor.
    #[must_use]
    pub fn candidates_for(&self, board: &BoardState, actor: EntityId) -> Vec<Turn> {
        let Some(value) = board.get(actor) else {
            return Vec::new();
        };

        let mut turns = Vec::new();
        for destination in reachable_positions(board, value.position(), value.modified_speed()) {
            turns.push(Turn::move_to(actor, destination));

            for (index, attack) in value.moves.iter().enumerate() {
                if self.config.require_affordable_moves && attack.sp_cost > value.sp {
                    continue;
                }
                for direction in viable_directions(board, actor, value, destination, attack) {
                    turns.push(Turn::attack(actor, destination, index, direction));
                }
            }
        }
        turns
    }

    /// Best turn for any member of `team`, or `None` if it has no members.
    #[must_use]
    pub fn choose_turn(&self, board: &BoardState, team: TeamId) -> Option<ScoredTurn> {
        let chosen = self.search(board, team, self.candidate_turns(board, team));
        if let Some(best) = &chosen {
            tracing::debug!(team, actor = %best.turn.actor, score = best.score, "Turn chosen");
        }
        chosen
    }

    /// Best turn for one actor, scored from `team`'s perspective.
    #[must_use]
    pub fn choose_turn_for(
        &self,
        board: &BoardState,
        team: TeamId,
        actor: EntityId,
    ) -> Option<ScoredTurn> {
        self.search(board, team, self.candidates_for(board, actor))
    }

    /// One turn per member of `team`, chosen in id order.
    ///
    /// Each pick is applied to a working clone before the next member
    /// chooses, so later picks see earlier results. Members removed by an
    /// earlier pick are skipped.
    #[must_use]
    pub fn plan_team(&self, board: &BoardState, team: TeamId) -> Vec<Turn> {
        let mut working = board.clone();
        let mut plan = Vec::new();

        for id in board.team_members(team) {
            if working.get(id).is_none() {
                continue;
            }
            if let Some(best) = self.choose_turn_for(&working, team, id) {
                working.apply_turn(&best.turn);
                plan.push(best.turn);
            }
        }

        tracing::debug!(team, turns = plan.len(), "Team plan ready");
        plan
    }

    fn search(&self, board: &BoardState, team: TeamId, candidates: Vec<Turn>) -> Option<ScoredTurn> {
        let mut rng = match self.config.tie_break {
            TieBreak::FirstSeen => None,
            TieBreak::Seeded(seed) => Some(TieRng::new(seed ^ board.state_hash() ^ team as u64)),
        };

        let mut best: Option<ScoredTurn> = None;
        let mut ties = 0_u64;

        for turn in candidates {
            let mut trial = board.clone();
            trial.apply_turn(&turn);
            let score = trial.evaluate(team);
            tracing::trace!(?turn, score, "Candidate scored");

            let candidate = ScoredTurn { turn, score };
            match best {
                Some(current) if score < current.score => {}
                Some(current) if score == current.score => {
                    ties += 1;
                    if let Some(rng) = rng.as_mut() {
                        if rng.below(ties) == 0 {
                            best = Some(candidate);
                        }
                    }
                }
                _ => {
                    best = Some(candidate);
                    ties = 1;
                }
            }
        }

        best
    }
}

/// Facings worth trying for `attack` used from `destination`.
///
/// Rotation-invariant shapes only need one facing. A facing is dropped if
/// none of its target squares would hold anyone once the actor has moved.
fn viable_directions(
    board: &BoardState,
    actor: EntityId,
    value: &EntityValue,
    destination: Position,
    attack: &MoveInfo,
) -> Vec<Direction> {
    let facings: &[Direction] = if attack.shape.is_rotation_invariant() {
        &[Direction::Up]
    } else {
        &Direction::ALL
    };

    let stays = destination == value.position();
    facings
        .iter()
        .copied()
        .filter(|&direction| {
            attack.shape.targets(destination, direction).any(|square| {
                match board.entities().id_at(square) {
                    Some(id) if id == actor => stays,
                    Some(_) => true,
                    None => square == destination && !stays,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::board_state::{BoardConfig, ZONE_SENTINEL};
    use crate::math::Fixed;
    use crate::moves::AttackShape;
    use crate::position::BoardSize;

    fn open_board(rows: u32, cols: u32) -> BoardState {
        BoardState::new(Arc::new(BoardConfig::new(BoardSize::new(rows, cols), 2).unwrap()))
    }

    fn lance() -> MoveInfo {
        MoveInfo::new("Lance", Fixed::ONE, AttackShape::melee())
            .piercing()
            .with_cost(3)
    }

    #[test]
    fn test_reachable_includes_origin() {
        let mut board = open_board(5, 5);
        board
            .place(EntityId(1), Position::new(2, 2), EntityValue::new(Some(0), 5))
            .unwrap();
        let reached = reachable_positions(&board, Position::new(2, 2), 0);
        assert_eq!(reached.into_iter().collect::<Vec<_>>(), vec![Position::new(2, 2)]);
    }

    #[test]
    fn test_reachable_open_diamond() {
        let board = open_board(7, 7);
        let center = Position::new(3, 3);

        assert_eq!(reachable_positions(&board, center, 1).len(), 5);
        let two = reachable_positions(&board, center, 2);
        assert_eq!(two.len(), 13);
        assert!(two.iter().all(|p| p.manhattan_distance(center) <= 2));
    }

    #[test]
    fn test_reachable_high_speed_full_diamond() {
        let board = open_board(41, 41);
        let center = Position::new(20, 20);

        let reached = reachable_positions(&board, center, 20);
        // 2 * 20 * 21 + 1 squares within distance 20
        assert_eq!(reached.len(), 841);
        assert!(reached.iter().all(|p| p.manhattan_distance(center) <= 20));

        let corner = reachable_positions(&board, Position::new(0, 0), 1000);
        assert_eq!(corner.len(), 41 * 41);
    }

    #[test]
    fn test_reachable_respects_bounds() {
        let board = open_board(3, 3);
        let reached = reachable_positions(&board, Position::new(0, 0), 1);
        let expected: BTreeSet<_> = [Position::new(0, 0), Position::new(0, 1), Position::new(1, 0)]
            .into_iter()
            .collect();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_reachable_stops_at_occupied_squares() {
        let mut board = open_board(1, 5);
        board
            .place(EntityId(1), Position::new(0, 0), EntityValue::new(Some(0), 5))
            .unwrap();
        board
            .place(EntityId(2), Position::new(0, 2), EntityValue::object(5, 0))
            .unwrap();

        let reached = reachable_positions(&board, Position::new(0, 0), 4);
        let expected: BTreeSet<_> = [Position::new(0, 0), Position::new(0, 1)].into_iter().collect();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_reachable_goes_around_blockers() {
        let mut board = open_board(3, 3);
        board
            .place(EntityId(2), Position::new(0, 1), EntityValue::object(5, 0))
            .unwrap();

        let reached = reachable_positions(&board, Position::new(0, 0), 4);
        assert!(reached.contains(&Position::new(0, 2)));
        assert!(!reached.contains(&Position::new(0, 1)));
    }

    #[test]
    fn test_choose_turn_takes_the_kill() {
        let mut board = open_board(5, 5);
        board
            .place(
                EntityId(1),
                Position::new(2, 1),
                EntityValue::new(Some(0), 20)
                    .with_stats(12, 0)
                    .with_sp(5)
                    .with_speed(1)
                    .with_moves(vec![lance()]),
            )
            .unwrap();
        board
            .place(EntityId(2), Position::new(1, 1), EntityValue::new(Some(1), 10))
            .unwrap();

        let before = board.clone();
        let best = ComputerPlayer::default().choose_turn(&board, 0).unwrap();

        assert_eq!(board, before);
        assert_eq!(best.turn.move_index, Some(0));
        let mut after = board.clone();
        after.apply_turn(&best.turn);
        assert!(after.get(EntityId(2)).is_none());
        assert_eq!(best.score, 100);
    }

    #[test]
    fn test_choose_turn_walks_into_zone() {
        let config = BoardConfig::with_zones(
            BoardSize::new(4, 4),
            2,
            vec![vec![Position::new(0, 3)], vec![Position::new(3, 0)]],
        )
        .unwrap();
        let mut board = BoardState::new(Arc::new(config));
        board
            .place(EntityId(1), Position::new(1, 3), EntityValue::new(Some(0), 10).with_speed(1))
            .unwrap();
        board
            .place(EntityId(2), Position::new(3, 3), EntityValue::new(Some(1), 10))
            .unwrap();

        let best = ComputerPlayer::default().choose_turn(&board, 0).unwrap();
        assert_eq!(best.turn.target, Position::new(0, 3));
        assert_eq!(best.score, ZONE_SENTINEL);
    }

    #[test]
    fn test_first_seen_tie_break() {
        let mut board = open_board(5, 5);
        board
            .place(EntityId(1), Position::new(2, 2), EntityValue::new(Some(0), 10).with_speed(1))
            .unwrap();

        let best = ComputerPlayer::default().choose_turn(&board, 0).unwrap();
        // Every destination scores the same; the smallest position wins.
        assert_eq!(best.turn, Turn::move_to(EntityId(1), Position::new(1, 2)));
    }

    #[test]
    fn test_seeded_tie_break_is_reproducible() {
        let mut board = open_board(5, 5);
        board
            .place(EntityId(1), Position::new(2, 2), EntityValue::new(Some(0), 10).with_speed(2))
            .unwrap();

        let player = ComputerPlayer::new(AiConfig {
            tie_break: TieBreak::Seeded(42),
            ..AiConfig::default()
        });
        let first = player.choose_turn(&board, 0).unwrap();
        let second = player.choose_turn(&board, 0).unwrap();

        assert_eq!(first, second);
        assert!(reachable_positions(&board, Position::new(2, 2), 2).contains(&first.turn.target));
    }

    #[test]
    fn test_no_members_no_turn() {
        let board = open_board(3, 3);
        assert!(ComputerPlayer::default().choose_turn(&board, 1).is_none());
        assert!(ComputerPlayer::default().plan_team(&board, 1).is_empty());
    }

    #[test]
    fn test_affordability_filter() {
        let mut board = open_board(3, 3);
        board
            .place(
                EntityId(1),
                Position::new(1, 1),
                EntityValue::new(Some(0), 10)
                    .with_stats(5, 0)
                    .with_sp(1)
                    .with_moves(vec![lance()]),
            )
            .unwrap();
        board
            .place(EntityId(2), Position::new(0, 1), EntityValue::new(Some(1), 10))
            .unwrap();

        let lenient = ComputerPlayer::default().candidates_for(&board, EntityId(1));
        assert!(lenient.iter().any(Turn::is_attack));

        let strict = ComputerPlayer::new(AiConfig {
            require_affordable_moves: true,
            ..AiConfig::default()
        })
        .candidates_for(&board, EntityId(1));
        assert!(!strict.iter().any(Turn::is_attack));
    }

    #[test]
    fn test_only_viable_directions_are_enumerated() {
        let mut board = open_board(3, 3);
        board
            .place(
                EntityId(1),
                Position::new(1, 1),
                EntityValue::new(Some(0), 10).with_moves(vec![lance()]),
            )
            .unwrap();
        board
            .place(EntityId(2), Position::new(1, 2), EntityValue::new(Some(1), 10))
            .unwrap();

        let candidates = ComputerPlayer::default().candidates_for(&board, EntityId(1));
        assert_eq!(
            candidates,
            vec![
                Turn::move_to(EntityId(1), Position::new(1, 1)),
                Turn::attack(EntityId(1), Position::new(1, 1), 0, Direction::Right),
            ]
        );
    }

    #[test]
    fn test_plan_team_sees_earlier_picks() {
        let mut board = open_board(4, 4);
        for (id, col) in [(1, 0), (3, 2)] {
            board
                .place(
                    EntityId(id),
                    Position::new(2, col),
                    EntityValue::new(Some(0), 10)
                        .with_stats(10, 0)
                        .with_speed(1)
                        .with_moves(vec![lance()]),
                )
                .unwrap();
        }
        board
            .place(EntityId(2), Position::new(1, 1), EntityValue::new(Some(1), 10))
            .unwrap();

        let plan = ComputerPlayer::default().plan_team(&board, 0);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].actor, EntityId(1));
        assert!(plan[0].is_attack());
        // The foe is gone by the time the second unit picks.
        assert!(!plan[1].is_attack());
    }
}
