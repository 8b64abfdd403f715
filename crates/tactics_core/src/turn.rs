//! Proposed actions.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::position::{Direction, Position};

/// One proposed action: move `actor` to `target`, then optionally use the
/// move at `move_index` facing `direction`.
///
/// Turns are plain values. Whether they do anything is decided when they are
/// applied to a particular [`BoardState`](crate::board_state::BoardState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    /// Acting entity.
    pub actor: EntityId,
    /// Destination square (equal to the current square to stay put).
    pub target: Position,
    /// Index into the actor's move list, `None` for no attack.
    pub move_index: Option<usize>,
    /// Facing used to orient the move's shape.
    pub direction: Direction,
}

impl Turn {
    /// Stay put and do nothing.
    #[must_use]
    pub const fn wait(actor: EntityId, at: Position) -> Self {
        Self::move_to(actor, at)
    }

    /// Move without attacking.
    #[must_use]
    pub const fn move_to(actor: EntityId, target: Position) -> Self {
        Self {
            actor,
            target,
            move_index: None,
            direction: Direction::Up,
        }
    }

    /// Move, then attack.
    #[must_use]
    pub const fn attack(
        actor: EntityId,
        target: Position,
        move_index: usize,
        direction: Direction,
    ) -> Self {
        Self {
            actor,
            target,
            move_index: Some(move_index),
            direction,
        }
    }

    /// Whether this turn uses a move.
    #[must_use]
    pub const fn is_attack(&self) -> bool {
        self.move_index.is_some()
    }
}
