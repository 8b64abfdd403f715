//! The authoritative game's view of its units.
//!
//! The roster is the "live game" the battle core snapshots from. It keeps
//! display data (names, glyphs) and running statistics the core does not
//! care about, and mirrors committed turns back from the authoritative board.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tactics_core::prelude::*;
use std::result::Result;

use crate::scenario::{Scenario, ScenarioError};

/// Per-unit statistics gathered over a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Damage dealt to other occupants.
    pub damage_dealt: u64,
    /// Damage received from moves.
    pub damage_taken: u64,
    /// Occupants this unit removed.
    pub kills: u32,
    /// Turns in which this unit was the actor.
    pub turns_taken: u32,
}

/// One occupant of the live board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    /// Identity shared with every snapshot.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Map symbol.
    pub glyph: char,
    /// Current square.
    pub position: Position,
    /// Current combat values.
    pub value: EntityValue,
    /// Whether the unit is still on the board.
    pub alive: bool,
    /// Running statistics.
    pub stats: UnitStats,
}

impl UnitRecord {
    /// Owning team, `None` for scenery.
    #[must_use]
    pub fn team(&self) -> Option<TeamId> {
        self.value.team
    }
}

impl LiveOccupant for UnitRecord {
    fn identity(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn combatant(&self) -> Option<EntityValue> {
        self.alive.then(|| self.value.clone())
    }
}

/// Every unit and object of a match, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    units: BTreeMap<EntityId, UnitRecord>,
}

impl Roster {
    /// Build the starting roster of a scenario.
    ///
    /// Ids are minted in declaration order: team by team, then objects.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let mut ids = EntityIdAllocator::new();
        let mut units = BTreeMap::new();

        for (team, setup) in scenario.teams.iter().enumerate() {
            for placement in &setup.units {
                let mut value = EntityValue::new(Some(team), placement.hp)
                    .with_stats(placement.attack, placement.defense)
                    .with_sp(placement.sp)
                    .with_speed(placement.speed)
                    .with_moves(scenario.unit_moves(placement)?);
                for status in scenario.unit_statuses(placement)? {
                    value = value.with_status(status);
                }

                let id = ids.mint();
                units.insert(
                    id,
                    UnitRecord {
                        id,
                        name: placement.name.clone(),
                        glyph: placement.glyph,
                        position: Position::from(placement.at),
                        value,
                        alive: true,
                        stats: UnitStats::default(),
                    },
                );
            }
        }

        for object in &scenario.objects {
            let id = ids.mint();
            units.insert(
                id,
                UnitRecord {
                    id,
                    name: object.name.clone(),
                    glyph: object.glyph,
                    position: Position::from(object.at),
                    value: EntityValue::object(object.hp, object.defense),
                    alive: true,
                    stats: UnitStats::default(),
                },
            );
        }

        Ok(Self { units })
    }

    /// Units in id order, dead ones included.
    pub fn units(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units.values()
    }

    /// Look up a unit.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&UnitRecord> {
        self.units.get(&id)
    }

    /// Living unit on `position`, if any.
    #[must_use]
    pub fn unit_at(&self, position: Position) -> Option<&UnitRecord> {
        self.units.values().find(|u| u.alive && u.position == position)
    }

    /// Units that are still standing.
    pub fn survivors(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units.values().filter(|u| u.alive)
    }

    /// Fold a committed turn's events into the per-unit statistics.
    pub fn record_events(&mut self, events: &TurnEvents) {
        if !events.acted {
            return;
        }
        if let Some(actor) = self.units.get_mut(&events.actor) {
            actor.stats.turns_taken += 1;
        }

        for hit in &events.damage_events {
            let damage = u64::from(hit.damage.max(0).unsigned_abs());
            if let Some(attacker) = self.units.get_mut(&hit.attacker) {
                attacker.stats.damage_dealt += damage;
                if hit.killed {
                    attacker.stats.kills += 1;
                }
            }
            if let Some(target) = self.units.get_mut(&hit.target) {
                target.stats.damage_taken += damage;
            }
        }
    }

    /// Copy positions and combat values from the authoritative board.
    ///
    /// Units missing from the board are marked dead.
    pub fn sync(&mut self, board: &BoardState) {
        for unit in self.units.values_mut() {
            if !unit.alive {
                continue;
            }
            match board.get(unit.id) {
                Some(value) => {
                    unit.position = value.position();
                    unit.value = value.clone();
                }
                None => {
                    tracing::debug!(id = %unit.id, name = %unit.name, "Unit removed");
                    unit.alive = false;
                    unit.value.hp = 0;
                }
            }
        }
    }
}
