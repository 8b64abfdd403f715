//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles produce identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Computer-player searches must be reproducible so that logged battles
//! replay exactly. Sources of non-determinism include:
//!
//! - **Floating-point math**: damage multipliers use
//!   [`tactics_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Anything order-sensitive walks sorted entity IDs.
//!
//! - **System randomness**: tie-breaking uses a seeded generator only.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual rules (damage, statuses, movement)
//! 2. **Property tests**: random boards and turns keep every invariant
//! 3. **Integration tests**: full computer-vs-computer battles reproduce
//! 4. **Parallel tests**: N battles run on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tactics_core::prelude::*;

use crate::fixtures::ai_round;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of rounds played.
    pub rounds: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Rounds: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.rounds,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final board hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of rounds each battle ran.
    pub rounds: u32,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Rounds: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_battles,
                self.rounds,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a battle multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the battle
/// * `rounds` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use tactics_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,  // Run 5 times
///     10, // 10 rounds each
///     skirmish_board,
///     |board| ai_round(board, &player),
///     BoardState::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    rounds: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..rounds {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(runs, rounds, hashes = ?hashes, "Runs diverged");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        rounds,
    }
}

/// Play `rounds` computer-vs-computer rounds twice from the same setup and
/// compare final board hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, player: &ComputerPlayer, rounds: u32) -> bool
where
    F: Fn() -> BoardState,
{
    let result = verify_determinism(
        2,
        rounds,
        &setup_fn,
        |board| ai_round(board, player),
        BoardState::state_hash,
    );
    result.is_deterministic
}

/// Run N battles on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// variations or different hasher seeds per thread.
pub fn run_parallel_battles_scoped<F>(
    setup_fn: F,
    player: &ComputerPlayer,
    num_battles: usize,
    rounds: u32,
) -> ParallelBattleResult
where
    F: Fn() -> BoardState + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut board = setup_fn();
                    for _ in 0..rounds {
                        ai_round(&mut board, player);
                    }
                    board.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    ParallelBattleResult {
        hashes,
        rounds,
        num_battles,
    }
}

/// Compare two battles round-by-round, finding the first divergence.
///
/// # Returns
///
/// `None` if the battles stay identical, `Some(round)` if they diverge at
/// that round (0 = the initial boards already differ).
pub fn find_first_divergence<F>(setup_fn: F, player: &ComputerPlayer, rounds: u32) -> Option<u32>
where
    F: Fn() -> BoardState,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for round in 1..=rounds {
        ai_round(&mut first, player);
        ai_round(&mut second, player);

        if first.state_hash() != second.state_hash() {
            tracing::warn!(
                round,
                first = first.state_hash(),
                second = second.state_hash(),
                "Battles diverged"
            );
            return Some(round);
        }
    }

    None
}

/// Verify that a serialization round-trip preserves the board exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, player: &ComputerPlayer, rounds: u32) -> bool
where
    F: Fn() -> BoardState,
{
    let mut board = setup_fn();
    for _ in 0..rounds {
        ai_round(&mut board, player);
    }

    let hash_before = board.state_hash();

    let bytes = match board.serialize() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Board failed to serialize");
            return false;
        }
    };
    let restored = match BoardState::deserialize(&bytes) {
        Ok(restored) => restored,
        Err(e) => {
            tracing::warn!(error = %e, "Board failed to deserialize");
            return false;
        }
    };

    restored.state_hash() == hash_before && restored == board
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible boards and turns for
/// property-based testing of the board invariants.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::prelude::*;

    use crate::fixtures::{burn, firebrand, lance, mend, regen, rock, strike, weaken, BoardBuilder};

    /// Generate a facing.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Right),
            Just(Direction::Down),
            Just(Direction::Left),
        ]
    }

    /// Generate a square, allowing a one-square margin off the board.
    pub fn arb_position(rows: u32, cols: u32) -> impl Strategy<Value = Position> {
        let rows = rows as i32;
        let cols = cols as i32;
        (-1..=rows, -1..=cols).prop_map(|(row, col)| Position::new(row, col))
    }

    /// Generate one of the fixture statuses.
    pub fn arb_status() -> impl Strategy<Value = StatusEffectInfo> {
        prop_oneof![Just(burn()), Just(weaken()), Just(regen())]
    }

    /// Generate a combatant (or, for `None`, an object).
    pub fn arb_entity_value(team_count: usize) -> impl Strategy<Value = EntityValue> {
        let combatant = (
            0..team_count,
            1u32..40,
            0i32..12,
            0i32..6,
            0i32..6,
            0u32..3,
            proptest::collection::vec(arb_status(), 0..3),
        )
            .prop_map(|(team, max_hp, attack, defense, sp, speed, statuses)| {
                let mut value = EntityValue::new(Some(team), max_hp)
                    .with_stats(attack, defense)
                    .with_sp(sp)
                    .with_speed(speed)
                    .with_moves(vec![strike(), lance(), firebrand(), mend()]);
                for status in statuses {
                    value.add_status(status);
                }
                value
            });
        prop_oneof![4 => combatant, 1 => Just(rock())]
    }

    /// Generate a small two-team board with up to `max_units` occupants.
    pub fn arb_board(max_units: usize) -> impl Strategy<Value = BoardState> {
        (3u32..7, 3u32..7).prop_flat_map(move |(rows, cols)| {
            proptest::collection::vec(
                ((0..rows as i32, 0..cols as i32), arb_entity_value(2)),
                1..max_units,
            )
            .prop_map(move |units| {
                units
                    .into_iter()
                    .fold(BoardBuilder::new(rows, cols, 2), |builder, (at, value)| {
                        builder.unit_if_free(at, value)
                    })
                    .build()
            })
        })
    }

    /// Generate a turn for an actor id in `1..=max_id` (possibly absent).
    pub fn arb_turn(max_id: u64, rows: u32, cols: u32) -> impl Strategy<Value = Turn> {
        (
            1..=max_id,
            arb_position(rows, cols),
            proptest::option::of(0usize..5),
            arb_direction(),
        )
            .prop_map(|(actor, target, move_index, direction)| Turn {
                actor: EntityId(actor),
                target,
                move_index,
                direction,
            })
    }

    /// Generate a board together with a sequence of turns for it.
    pub fn arb_board_and_turns(
        max_units: usize,
        max_turns: usize,
    ) -> impl Strategy<Value = (BoardState, Vec<Turn>)> {
        arb_board(max_units).prop_flat_map(move |board| {
            let size = board.config().size();
            let turns = proptest::collection::vec(
                arb_turn(max_units as u64 + 1, size.rows, size.cols),
                0..max_turns,
            );
            (Just(board), turns)
        })
    }
}
