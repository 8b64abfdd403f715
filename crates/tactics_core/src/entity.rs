//! Entity identities and combat values.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::moves::MoveSet;
use crate::position::Position;
use crate::status::StatusEffectInfo;

/// Team index. Boards track teams `0..team_count`.
pub type TeamId = usize;

/// Stable identity of a board occupant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints [`EntityId`]s.
///
/// The allocator is owned by whoever builds the live game (or a test), so
/// independent games never share an id space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    /// Create an allocator whose first id is `#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Mint the next id.
    pub fn mint(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Combat-relevant state of one board occupant.
///
/// `team == None` marks an unaffiliated object (rocks, crates): it can be hit
/// and destroyed but never counts toward a team. A `status_effects` of `None`
/// means the occupant cannot carry statuses at all.
///
/// The position is owned by the [`EntityIndex`](crate::entity_index::EntityIndex)
/// that stores the value and is only readable from outside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityValue {
    /// Owning team, `None` for objects.
    pub team: Option<TeamId>,
    /// Current hit points, `0..=max_hp` between operations.
    pub hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Skill points. May dip below zero after an expensive move.
    pub sp: i32,
    /// Attack before status modifiers.
    pub base_attack: i32,
    /// Defense before status modifiers.
    pub base_defense: i32,
    /// Squares per turn before status modifiers.
    pub speed: u32,
    /// Current square.
    position: Position,
    /// Active statuses in infliction order.
    pub status_effects: Option<Vec<StatusEffectInfo>>,
    /// Moves this occupant can use, shared between clones.
    pub moves: MoveSet,
}

impl EntityValue {
    /// Create a status-capable combatant at full health with no stats or moves.
    #[must_use]
    pub fn new(team: Option<TeamId>, max_hp: u32) -> Self {
        Self {
            team,
            hp: max_hp,
            max_hp,
            sp: 0,
            base_attack: 0,
            base_defense: 0,
            speed: 0,
            position: Position::UNPLACED,
            status_effects: Some(Vec::new()),
            moves: Arc::from(Vec::new()),
        }
    }

    /// Create an unaffiliated, immovable object.
    #[must_use]
    pub fn object(max_hp: u32, defense: i32) -> Self {
        Self {
            base_defense: defense,
            status_effects: None,
            ..Self::new(None, max_hp)
        }
    }

    /// Builder method to set attack and defense.
    #[must_use]
    pub fn with_stats(mut self, attack: i32, defense: i32) -> Self {
        self.base_attack = attack;
        self.base_defense = defense;
        self
    }

    /// Builder method to set skill points.
    #[must_use]
    pub fn with_sp(mut self, sp: i32) -> Self {
        self.sp = sp;
        self
    }

    /// Builder method to set movement speed.
    #[must_use]
    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    /// Builder method to set the move list.
    #[must_use]
    pub fn with_moves(mut self, moves: impl Into<MoveSet>) -> Self {
        self.moves = moves.into();
        self
    }

    /// Builder method to start with an active status.
    #[must_use]
    pub fn with_status(mut self, status: StatusEffectInfo) -> Self {
        self.add_status(status);
        self
    }

    /// Builder method to set current hit points (clamped).
    #[must_use]
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = hp;
        self.clamp_hp();
        self
    }

    /// Current square, or [`Position::UNPLACED`] outside an index.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Whether the occupant still has hit points.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether the occupant fights for a team.
    #[must_use]
    pub const fn is_combatant(&self) -> bool {
        self.team.is_some()
    }

    /// Force hit points back into `[0, max_hp]`.
    pub fn clamp_hp(&mut self) {
        self.hp = self.hp.min(self.max_hp);
    }

    /// Active statuses (empty for occupants that cannot carry any).
    #[must_use]
    pub fn statuses(&self) -> &[StatusEffectInfo] {
        self.status_effects.as_deref().unwrap_or(&[])
    }

    /// Whether a status with this name is active.
    #[must_use]
    pub fn has_status(&self, name: &str) -> bool {
        self.statuses().iter().any(|s| s.name == name)
    }

    /// Whether statuses can be inflicted on this occupant.
    #[must_use]
    pub const fn can_receive_status(&self) -> bool {
        self.status_effects.is_some()
    }

    /// Add a status unless one with the same name is already active.
    ///
    /// Returns `true` if the status was added.
    pub fn add_status(&mut self, status: StatusEffectInfo) -> bool {
        let Some(statuses) = self.status_effects.as_mut() else {
            return false;
        };
        if statuses.iter().any(|s| s.name == status.name) {
            return false;
        }
        statuses.push(status);
        true
    }

    /// Number of active statuses that work against the bearer.
    #[must_use]
    pub fn detrimental_status_count(&self) -> usize {
        self.statuses().iter().filter(|s| s.is_detrimental()).count()
    }

    /// Attack after status modifiers, never below zero.
    #[must_use]
    pub fn modified_attack(&self) -> i32 {
        let delta = self
            .statuses()
            .iter()
            .fold(0_i32, |sum, s| sum.saturating_add(s.modifiers.attack));
        self.base_attack.saturating_add(delta).max(0)
    }

    /// Defense after status modifiers, never below zero.
    #[must_use]
    pub fn modified_defense(&self) -> i32 {
        let delta = self
            .statuses()
            .iter()
            .fold(0_i32, |sum, s| sum.saturating_add(s.modifiers.defense));
        self.base_defense.saturating_add(delta).max(0)
    }

    /// Speed after status modifiers, never below zero.
    #[must_use]
    pub fn modified_speed(&self) -> u32 {
        let delta: i64 = self.statuses().iter().map(|s| i64::from(s.modifiers.speed)).sum();
        let speed = i64::from(self.speed) + delta;
        u32::try_from(speed.max(0)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatModifiers;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = EntityIdAllocator::new();
        let a = ids.mint();
        let b = ids.mint();
        assert_eq!(a, EntityId(1));
        assert!(b > a);
    }

    #[test]
    fn test_independent_allocators() {
        let mut first = EntityIdAllocator::new();
        let mut second = EntityIdAllocator::new();
        assert_eq!(first.mint(), second.mint());
    }

    #[test]
    fn test_modified_stats_include_statuses() {
        let value = EntityValue::new(Some(0), 20)
            .with_stats(10, 4)
            .with_speed(3)
            .with_status(StatusEffectInfo::new("Rage", 2).with_modifiers(StatModifiers {
                attack: 5,
                defense: -2,
                speed: 0,
            }))
            .with_status(StatusEffectInfo::new("Slow", 2).with_modifiers(StatModifiers {
                speed: -5,
                ..StatModifiers::NONE
            }));

        assert_eq!(value.modified_attack(), 15);
        assert_eq!(value.modified_defense(), 2);
        assert_eq!(value.modified_speed(), 0);
    }

    #[test]
    fn test_duplicate_status_rejected() {
        let mut value = EntityValue::new(Some(1), 10);
        assert!(value.add_status(StatusEffectInfo::new("Burn", 3)));
        assert!(!value.add_status(StatusEffectInfo::new("Burn", 5)));
        assert!(value.add_status(StatusEffectInfo::new("Poison", 3)));
        assert_eq!(value.statuses().len(), 2);
    }

    #[test]
    fn test_objects_cannot_carry_statuses() {
        let mut rock = EntityValue::object(30, 5);
        assert!(!rock.is_combatant());
        assert!(!rock.can_receive_status());
        assert!(!rock.add_status(StatusEffectInfo::new("Burn", 3)));
        assert!(rock.statuses().is_empty());
    }

    #[test]
    fn test_with_hp_clamps() {
        let value = EntityValue::new(Some(0), 10).with_hp(25);
        assert_eq!(value.hp, 10);
        assert_eq!(value.position(), Position::UNPLACED);
    }
}
