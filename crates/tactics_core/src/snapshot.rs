//! Translation from a live game into a [`BoardState`].
//!
//! The live game keeps whatever richer representation it likes (names,
//! sprites, AI personalities). It only has to expose each occupant through
//! [`LiveOccupant`] for the battle core to take a snapshot.

use std::sync::Arc;

use crate::board_state::{BoardConfig, BoardState};
use crate::entity::{EntityId, EntityValue};
use crate::error::Result;
use crate::position::Position;

/// An occupant of the authoritative board.
pub trait LiveOccupant {
    /// Stable identity, shared with the snapshot.
    fn identity(&self) -> EntityId;

    /// Current square.
    fn position(&self) -> Position;

    /// Combat values, or `None` for scenery without stats.
    fn combatant(&self) -> Option<EntityValue>;
}

impl BoardState {
    /// Snapshot every living, stat-bearing occupant.
    ///
    /// Occupants without stats and occupants already at zero hit points are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails fast if an occupant is off the board, shares a square with
    /// another, or belongs to a team the configuration does not track.
    pub fn from_live<'a, O, I>(config: Arc<BoardConfig>, occupants: I) -> Result<Self>
    where
        O: LiveOccupant + 'a,
        I: IntoIterator<Item = &'a O>,
    {
        let mut board = Self::new(config);
        let mut skipped = 0_usize;

        for occupant in occupants {
            let Some(value) = occupant.combatant().filter(EntityValue::is_alive) else {
                skipped += 1;
                continue;
            };
            board.place(occupant.identity(), occupant.position(), value)?;
        }

        tracing::debug!(
            entities = board.entities().len(),
            skipped,
            live = ?board.live_counts(),
            "Snapshot taken"
        );
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::position::BoardSize;

    struct Token {
        id: u64,
        at: Position,
        value: Option<EntityValue>,
    }

    impl LiveOccupant for Token {
        fn identity(&self) -> EntityId {
            EntityId(self.id)
        }

        fn position(&self) -> Position {
            self.at
        }

        fn combatant(&self) -> Option<EntityValue> {
            self.value.clone()
        }
    }

    fn config() -> Arc<BoardConfig> {
        Arc::new(BoardConfig::new(BoardSize::new(4, 4), 2).unwrap())
    }

    #[test]
    fn test_snapshot_skips_scenery_and_dead() {
        let live = vec![
            Token {
                id: 1,
                at: Position::new(0, 0),
                value: Some(EntityValue::new(Some(0), 10)),
            },
            Token {
                id: 2,
                at: Position::new(0, 1),
                value: None,
            },
            Token {
                id: 3,
                at: Position::new(0, 2),
                value: Some(EntityValue::new(Some(1), 10).with_hp(0)),
            },
            Token {
                id: 4,
                at: Position::new(3, 3),
                value: Some(EntityValue::object(5, 0)),
            },
        ];

        let board = BoardState::from_live(config(), &live).unwrap();

        assert_eq!(board.entities().len(), 2);
        assert_eq!(board.live_counts(), &[1, 0]);
        assert_eq!(board.get(EntityId(1)).unwrap().position(), Position::new(0, 0));
        assert!(!board.is_occupied(Position::new(0, 1)));
        assert!(board.verify_invariants());
    }

    #[test]
    fn test_snapshot_rejects_shared_square() {
        let live = vec![
            Token {
                id: 1,
                at: Position::new(1, 1),
                value: Some(EntityValue::new(Some(0), 10)),
            },
            Token {
                id: 2,
                at: Position::new(1, 1),
                value: Some(EntityValue::new(Some(1), 10)),
            },
        ];

        let result = BoardState::from_live(config(), &live);
        assert!(matches!(result, Err(GameError::PositionOccupied { .. })));
    }

    #[test]
    fn test_snapshot_rejects_unknown_team() {
        let live = [Token {
            id: 1,
            at: Position::new(1, 1),
            value: Some(EntityValue::new(Some(7), 10)),
        }];

        let result = BoardState::from_live(config(), &live);
        assert!(matches!(result, Err(GameError::UnknownTeam { team: 7, .. })));
    }
}
