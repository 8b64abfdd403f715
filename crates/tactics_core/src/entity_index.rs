//! Identity / position / value index for board occupants.
//!
//! The index keeps three views consistent:
//!
//! - identity -> value
//! - position -> identity (and through it, the value)
//! - value -> identity, resolved through the value's own position
//!
//! Every insert and removal goes through [`EntityIndex::put`] or one of the
//! `remove*` methods, which update all views together. Positions are unique
//! keys: at most one occupant per square.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityValue};
use crate::error::{GameError, Result};
use crate::position::Position;

/// Bidirectional association between identities, squares and values.
///
/// Uses `HashMap`s for O(1) lookup by any key, with deterministic iteration
/// via [`sorted_ids`](Self::sorted_ids) where order matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIndex {
    values: HashMap<EntityId, EntityValue>,
    positions: HashMap<Position, EntityId>,
}

impl EntityIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `id` at `position`.
    ///
    /// If `id` is already present it is moved to `position` and its old value
    /// is returned. The stored value's position is set to `position`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PositionOccupied`] without touching the index if a
    /// *different* entity stands on `position`. Callers replacing an occupant
    /// must remove it first.
    pub fn put(
        &mut self,
        id: EntityId,
        position: Position,
        mut value: EntityValue,
    ) -> Result<Option<EntityValue>> {
        if let Some(&occupant) = self.positions.get(&position) {
            if occupant != id {
                tracing::warn!(%id, %position, %occupant, "Rejected placement on occupied square");
                return Err(GameError::PositionOccupied { position, occupant });
            }
        }

        value.set_position(position);
        let previous = self.values.insert(id, value);
        if let Some(old) = &previous {
            if old.position() != position {
                self.positions.remove(&old.position());
            }
        }
        self.positions.insert(position, id);
        Ok(previous)
    }

    /// Move an existing entity to an empty square.
    ///
    /// Returns `false` (and changes nothing) if the entity is unknown or the
    /// square is held by someone else.
    pub fn relocate(&mut self, id: EntityId, to: Position) -> bool {
        match self.positions.get(&to) {
            Some(&occupant) if occupant != id => return false,
            _ => {}
        }
        let Some(value) = self.values.get_mut(&id) else {
            return false;
        };
        let from = value.position();
        value.set_position(to);
        self.positions.remove(&from);
        self.positions.insert(to, id);
        true
    }

    /// Look up a value by identity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntityValue> {
        self.values.get(&id)
    }

    /// Mutable lookup by identity.
    ///
    /// The value's position cannot be changed through this reference; use
    /// [`relocate`](Self::relocate).
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityValue> {
        self.values.get_mut(&id)
    }

    /// Look up the value standing on `position`.
    #[must_use]
    pub fn get_at(&self, position: Position) -> Option<&EntityValue> {
        self.positions
            .get(&position)
            .and_then(|id| self.values.get(id))
    }

    /// Identity of the occupant of `position`.
    #[must_use]
    pub fn id_at(&self, position: Position) -> Option<EntityId> {
        self.positions.get(&position).copied()
    }

    /// Identity of an indexed value.
    ///
    /// Resolved through the value's position; returns `None` if the value is
    /// not (or no longer) the one stored there.
    #[must_use]
    pub fn id_of(&self, value: &EntityValue) -> Option<EntityId> {
        let id = self.id_at(value.position())?;
        (self.values.get(&id)? == value).then_some(id)
    }

    /// Whether `id` is indexed.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.values.contains_key(&id)
    }

    /// Whether any entity stands on `position`.
    #[must_use]
    pub fn is_occupied(&self, position: Position) -> bool {
        self.positions.contains_key(&position)
    }

    /// Remove by identity.
    pub fn remove(&mut self, id: EntityId) -> Option<EntityValue> {
        let value = self.values.remove(&id)?;
        self.positions.remove(&value.position());
        Some(value)
    }

    /// Remove whatever stands on `position`.
    pub fn remove_at(&mut self, position: Position) -> Option<(EntityId, EntityValue)> {
        let id = self.positions.remove(&position)?;
        let value = self.values.remove(&id)?;
        Some((id, value))
    }

    /// Remove the entity holding an equal value.
    pub fn remove_value(&mut self, value: &EntityValue) -> Option<(EntityId, EntityValue)> {
        let id = self.id_of(value)?;
        self.remove(id).map(|removed| (id, removed))
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All values (not in deterministic order).
    pub fn values(&self) -> impl Iterator<Item = &EntityValue> {
        self.values.values()
    }

    /// All occupied squares (not in deterministic order).
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions.keys().copied()
    }

    /// All identities (not in deterministic order).
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.values.keys().copied()
    }

    /// Identity/value pairs (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityValue)> {
        self.values.iter().map(|(&id, value)| (id, value))
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.values.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Check that the views agree with each other.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.values.len() == self.positions.len()
            && self.positions.iter().all(|(position, id)| {
                self.values
                    .get(id)
                    .is_some_and(|value| value.position() == *position)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(team: usize) -> EntityValue {
        EntityValue::new(Some(team), 10).with_stats(5, 1)
    }

    #[test]
    fn test_put_and_lookup_by_every_key() {
        let mut index = EntityIndex::new();
        let id = EntityId(7);
        let pos = Position::new(1, 2);

        assert!(index.put(id, pos, unit(0)).unwrap().is_none());

        let by_id = index.get(id).unwrap();
        assert_eq!(by_id.position(), pos);
        assert_eq!(index.get_at(pos), Some(by_id));
        assert_eq!(index.id_of(by_id), Some(id));
        assert_eq!(index.id_at(pos), Some(id));
        assert!(index.is_consistent());
    }

    #[test]
    fn test_missing_lookups_return_none() {
        let index = EntityIndex::new();
        assert!(index.get(EntityId(1)).is_none());
        assert!(index.get_at(Position::new(0, 0)).is_none());
        assert!(index.get_at(Position::new(-5, 40)).is_none());
        assert!(index.id_of(&unit(0)).is_none());
    }

    #[test]
    fn test_put_on_occupied_square_is_rejected() {
        let mut index = EntityIndex::new();
        let pos = Position::new(0, 0);
        index.put(EntityId(1), pos, unit(0)).unwrap();

        let err = index.put(EntityId(2), pos, unit(1)).unwrap_err();
        assert!(matches!(
            err,
            GameError::PositionOccupied { occupant, .. } if occupant == EntityId(1)
        ));

        // Index untouched
        assert_eq!(index.len(), 1);
        assert!(!index.contains(EntityId(2)));
        assert_eq!(index.get_at(pos).unwrap().team, Some(0));
        assert!(index.is_consistent());
    }

    #[test]
    fn test_put_same_identity_moves_it() {
        let mut index = EntityIndex::new();
        let id = EntityId(1);
        index.put(id, Position::new(0, 0), unit(0)).unwrap();
        let previous = index.put(id, Position::new(2, 2), unit(0)).unwrap();

        assert_eq!(previous.unwrap().position(), Position::new(0, 0));
        assert!(!index.is_occupied(Position::new(0, 0)));
        assert!(index.is_occupied(Position::new(2, 2)));
        assert_eq!(index.len(), 1);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_relocate() {
        let mut index = EntityIndex::new();
        index.put(EntityId(1), Position::new(0, 0), unit(0)).unwrap();
        index.put(EntityId(2), Position::new(0, 1), unit(1)).unwrap();

        assert!(!index.relocate(EntityId(1), Position::new(0, 1)));
        assert!(!index.relocate(EntityId(9), Position::new(3, 3)));
        assert!(index.relocate(EntityId(1), Position::new(1, 0)));

        assert_eq!(index.id_at(Position::new(1, 0)), Some(EntityId(1)));
        assert!(!index.is_occupied(Position::new(0, 0)));
        assert!(index.is_consistent());
    }

    #[test]
    fn test_remove_through_each_view() {
        let mut index = EntityIndex::new();
        for (n, col) in (1..=3).zip(0..) {
            index.put(EntityId(n), Position::new(0, col), unit(0)).unwrap();
        }

        assert!(index.remove(EntityId(1)).is_some());
        assert!(!index.is_occupied(Position::new(0, 0)));

        let (id, _) = index.remove_at(Position::new(0, 1)).unwrap();
        assert_eq!(id, EntityId(2));
        assert!(!index.contains(EntityId(2)));

        let value = index.get(EntityId(3)).unwrap().clone();
        let (id, _) = index.remove_value(&value).unwrap();
        assert_eq!(id, EntityId(3));

        assert!(index.is_empty());
        assert_eq!(index.positions().count(), 0);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_remove_value_requires_matching_data() {
        let mut index = EntityIndex::new();
        index.put(EntityId(1), Position::new(0, 0), unit(0)).unwrap();

        let mut stale = index.get(EntityId(1)).unwrap().clone();
        stale.hp = 1;
        assert!(index.remove_value(&stale).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_sorted_ids() {
        let mut index = EntityIndex::new();
        index.put(EntityId(5), Position::new(0, 0), unit(0)).unwrap();
        index.put(EntityId(2), Position::new(0, 1), unit(0)).unwrap();
        index.put(EntityId(9), Position::new(0, 2), unit(1)).unwrap();
        assert_eq!(
            index.sorted_ids(),
            vec![EntityId(2), EntityId(5), EntityId(9)]
        );
    }
}
