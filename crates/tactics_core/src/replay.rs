//! Battle logs for recording and replaying matches.
//!
//! A log stores the serialized starting board and every committed turn.
//! Because turn resolution is deterministic, re-applying the turns (and the
//! end-of-team-turn effects between them) reproduces the final board
//! exactly, which [`BattleLog::replay`] checks against the recorded hash.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::board_state::BoardState;
use crate::entity::TeamId;
use crate::error::{GameError, Result};
use crate::turn::Turn;

/// Battle log file format version for compatibility.
pub const BATTLE_LOG_VERSION: u32 = 1;

/// A single committed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoggedTurn {
    /// Round the turn was played in.
    pub round: u32,
    /// Team that played it.
    pub team: TeamId,
    /// The turn itself.
    pub turn: Turn,
}

/// Complete record of one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleLog {
    /// Log format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Seed the match was played with.
    pub seed: u64,
    /// Serialized starting board.
    pub initial_state: Vec<u8>,
    /// Committed turns in play order.
    pub turns: Vec<LoggedTurn>,
    /// Last round played.
    pub final_round: u32,
    /// Final board hash for verification.
    pub final_hash: u64,
}

impl BattleLog {
    /// Start a log from the board the match begins with.
    ///
    /// # Errors
    ///
    /// Returns an error if the board cannot be serialized.
    pub fn new(scenario_id: impl Into<String>, seed: u64, initial_state: &BoardState) -> Result<Self> {
        Ok(Self {
            version: BATTLE_LOG_VERSION,
            scenario_id: scenario_id.into(),
            seed,
            initial_state: initial_state.serialize()?,
            turns: Vec::new(),
            final_round: 0,
            final_hash: 0,
        })
    }

    /// Record a committed turn.
    pub fn record(&mut self, round: u32, team: TeamId, turn: Turn) {
        self.turns.push(LoggedTurn { round, team, turn });
    }

    /// Close the log with the end-of-match state.
    pub fn finalize(&mut self, final_round: u32, final_hash: u64) {
        self.final_round = final_round;
        self.final_hash = final_hash;
    }

    /// Number of recorded turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Turns recorded in `round`.
    #[must_use]
    pub fn turns_in_round(&self, round: u32) -> Vec<&LoggedTurn> {
        self.turns.iter().filter(|t| t.round == round).collect()
    }

    /// Save the log to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize battle log: {e}")))?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Load a log from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file reading or deserialization fails, if the
    /// file was written by an incompatible version, or if the stored
    /// starting board is malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let log: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize battle log: {e}")))?;

        if log.version != BATTLE_LOG_VERSION {
            return Err(GameError::ReplayVersion {
                expected: BATTLE_LOG_VERSION,
                found: log.version,
            });
        }
        log.restore_initial_state()?;

        Ok(log)
    }

    /// The board the match started from.
    ///
    /// # Errors
    ///
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<BoardState> {
        BoardState::deserialize(&self.initial_state)
    }

    /// Re-play every turn and check the result against the recorded hash.
    ///
    /// End-of-turn effects for a team run whenever the next logged turn
    /// belongs to a different team or round, and after the last turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ReplayMismatch`] if the final board hash differs
    /// from the recorded one.
    pub fn replay(&self) -> Result<BoardState> {
        let mut board = self.restore_initial_state()?;

        let mut turns = self.turns.iter().peekable();
        while let Some(logged) = turns.next() {
            board.apply_turn(&logged.turn);
            let team_done = turns
                .peek()
                .map_or(true, |next| next.team != logged.team || next.round != logged.round);
            if team_done {
                board.apply_turn_effects(logged.team);
            }
        }

        let actual = board.state_hash();
        if actual != self.final_hash {
            tracing::warn!(expected = self.final_hash, actual, "Replay diverged");
            return Err(GameError::ReplayMismatch {
                expected: self.final_hash,
                actual,
            });
        }

        tracing::debug!(turns = self.turns.len(), hash = actual, "Replay verified");
        Ok(board)
    }
}
