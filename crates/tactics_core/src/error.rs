//! Error types for the battle core.
//!
//! Only structural problems surface here. Turn resolution itself never
//! fails: a missing actor, an occupied destination or an empty target square
//! are resolved as no-ops by [`BoardState`](crate::board_state::BoardState).

use thiserror::Error;

use crate::entity::{EntityId, TeamId};
use crate::position::Position;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all battle core errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A different entity already occupies the requested square.
    #[error("Position {position} is already occupied by entity {occupant}")]
    PositionOccupied {
        /// Contested square.
        position: Position,
        /// Entity currently standing there.
        occupant: EntityId,
    },

    /// A square lies outside the board.
    #[error("Position {0} is outside the board")]
    OutOfBounds(Position),

    /// An entity or zone refers to a team the board does not track.
    #[error("Unknown team {team} (board tracks {team_count} teams)")]
    UnknownTeam {
        /// Offending team id.
        team: TeamId,
        /// Number of teams declared by the board configuration.
        team_count: usize,
    },

    /// Team and zone declarations disagree.
    #[error("Malformed board configuration: {0}")]
    InvalidConfiguration(String),

    /// An occupant cannot be placed on a board (dead or otherwise invalid).
    #[error("Invalid occupant {id}: {reason}")]
    InvalidOccupant {
        /// Offending entity.
        id: EntityId,
        /// Why it was rejected.
        reason: String,
    },

    /// Binary (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A replay does not reproduce its recorded result.
    #[error("Replay mismatch: expected hash {expected}, got {actual}")]
    ReplayMismatch {
        /// Hash recorded when the log was finalized.
        expected: u64,
        /// Hash produced by playback.
        actual: u64,
    },

    /// A replay was written by an incompatible version.
    #[error("Replay version mismatch: expected {expected}, got {found}")]
    ReplayVersion {
        /// Version this build understands.
        expected: u32,
        /// Version stored in the file.
        found: u32,
    },

    /// Reading or writing a replay file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
