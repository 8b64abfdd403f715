//! Board state: turn resolution, end-of-turn effects and evaluation.
//!
//! A [`BoardState`] is a disposable snapshot. It is built once from the live
//! game (or cloned from another board), mutated in place by any number of
//! [`apply_turn`](BoardState::apply_turn) /
//! [`apply_turn_effects`](BoardState::apply_turn_effects) calls and then
//! dropped. There is no undo: keep a clone to roll back.
//!
//! # Determinism
//!
//! - Damage uses fixed-point multipliers ([`crate::math::Fixed`])
//! - Every ordered walk over entities uses sorted entity IDs
//! - Cloning deep-copies entity values and live counts; the board
//!   configuration is shared behind an [`Arc`] and never mutated

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityValue, TeamId};
use crate::entity_index::EntityIndex;
use crate::error::{GameError, Result};
use crate::position::{BoardSize, Position};
use crate::turn::Turn;

/// Score returned when a zone is held. Dwarfs any sum of per-entity values.
pub const ZONE_SENTINEL: i64 = 10_000_000;

/// Tunable weights for [`BoardState::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationWeights {
    /// Value of any surviving combatant.
    pub base_value: i64,
    /// Extra value at zero health, scaled linearly by missing health.
    pub danger_bonus: i64,
    /// Subtracted per active detrimental status.
    pub status_penalty: i64,
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self {
            base_value: 100,
            danger_bonus: 100,
            status_penalty: 25,
        }
    }
}

/// Immutable board configuration shared by a board and all of its clones.
///
/// Deserialized configurations pass through [`BoardConfig::with_zones`], so a
/// loaded snapshot is held to the same checks as a freshly built one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBoardConfig")]
pub struct BoardConfig {
    size: BoardSize,
    team_count: usize,
    /// `zones[t]` are the squares that win the game for team `t`.
    /// Empty when the board has no zones.
    zones: Vec<Vec<Position>>,
    weights: EvaluationWeights,
}

/// Unchecked wire form of [`BoardConfig`].
#[derive(Deserialize)]
struct RawBoardConfig {
    size: BoardSize,
    team_count: usize,
    zones: Vec<Vec<Position>>,
    weights: EvaluationWeights,
}

impl TryFrom<RawBoardConfig> for BoardConfig {
    type Error = GameError;

    fn try_from(raw: RawBoardConfig) -> Result<Self> {
        Ok(Self::with_zones(raw.size, raw.team_count, raw.zones)?.with_weights(raw.weights))
    }
}

impl BoardConfig {
    /// Create a configuration without victory zones.
    ///
    /// # Errors
    ///
    /// Fails if the board has no squares or no teams.
    pub fn new(size: BoardSize, team_count: usize) -> Result<Self> {
        Self::with_zones(size, team_count, Vec::new())
    }

    /// Create a configuration with one zone list per team.
    ///
    /// Pass an empty `zones` for a board without zones.
    ///
    /// # Errors
    ///
    /// Fails fast if the board has no squares or no teams, if `zones` is
    /// non-empty but does not hold exactly one list per team, or if a zone
    /// square lies off the board.
    pub fn with_zones(
        size: BoardSize,
        team_count: usize,
        zones: Vec<Vec<Position>>,
    ) -> Result<Self> {
        if size.rows == 0 || size.cols == 0 {
            return Err(GameError::InvalidConfiguration(format!(
                "board must have at least one square, got {}x{}",
                size.rows, size.cols
            )));
        }
        if team_count == 0 {
            return Err(GameError::InvalidConfiguration(
                "board must track at least one team".to_string(),
            ));
        }
        if !zones.is_empty() && zones.len() != team_count {
            return Err(GameError::InvalidConfiguration(format!(
                "{} zone lists declared for {} teams",
                zones.len(),
                team_count
            )));
        }
        if let Some(&outside) = zones.iter().flatten().find(|&&p| !size.contains(p)) {
            return Err(GameError::OutOfBounds(outside));
        }

        Ok(Self {
            size,
            team_count,
            zones,
            weights: EvaluationWeights::default(),
        })
    }

    /// Builder method to override evaluation weights.
    #[must_use]
    pub fn with_weights(mut self, weights: EvaluationWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Board dimensions.
    #[must_use]
    pub const fn size(&self) -> BoardSize {
        self.size
    }

    /// Number of tracked teams.
    #[must_use]
    pub const fn team_count(&self) -> usize {
        self.team_count
    }

    /// Evaluation weights.
    #[must_use]
    pub const fn weights(&self) -> &EvaluationWeights {
        &self.weights
    }

    /// Whether any zones are configured.
    #[must_use]
    pub fn has_zones(&self) -> bool {
        !self.zones.is_empty()
    }

    /// Victory squares for `team` (empty if none).
    #[must_use]
    pub fn zones_for(&self, team: TeamId) -> &[Position] {
        self.zones.get(team).map_or(&[], Vec::as_slice)
    }

    /// Whether `position` is one of `team`'s victory squares.
    #[must_use]
    pub fn is_zone_of(&self, team: TeamId, position: Position) -> bool {
        self.zones_for(team).contains(&position)
    }

    /// Whether `position` is a victory square for any team.
    #[must_use]
    pub fn is_any_zone(&self, position: Position) -> bool {
        self.zones.iter().any(|zone| zone.contains(&position))
    }
}

/// One target hit by a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Entity that used the move.
    pub attacker: EntityId,
    /// Entity that was hit.
    pub target: EntityId,
    /// Square the target stood on.
    pub position: Position,
    /// Damage after defense (before on-hit effects).
    pub damage: i32,
    /// Hit points left after all effects.
    pub hp_after: u32,
    /// Names of statuses newly added to the target.
    pub inflicted: Vec<String>,
    /// Whether the hit removed the target.
    pub killed: bool,
}

/// What a resolved turn did, for callers mirroring it onto the live game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEvents {
    /// Acting entity.
    pub actor: EntityId,
    /// `false` if the actor was not on the board (the turn was a no-op).
    pub acted: bool,
    /// `(from, to)` if the actor moved.
    pub moved: Option<(Position, Position)>,
    /// Move used, if any.
    pub move_used: Option<usize>,
    /// Skill points deducted.
    pub sp_spent: i32,
    /// Hits in shape order.
    pub damage_events: Vec<DamageEvent>,
    /// Entities removed this turn.
    pub deaths: Vec<EntityId>,
}

impl TurnEvents {
    fn new(actor: EntityId) -> Self {
        Self {
            actor,
            acted: false,
            moved: None,
            move_used: None,
            sp_spent: 0,
            damage_events: Vec::new(),
            deaths: Vec::new(),
        }
    }
}

/// What end-of-turn processing did for one team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectEvents {
    /// `(entity, status)` pairs whose recurring effect fired.
    pub fired: Vec<(EntityId, String)>,
    /// `(entity, status)` pairs that expired and were removed.
    pub expired: Vec<(EntityId, String)>,
    /// Entities killed by recurring effects.
    pub deaths: Vec<EntityId>,
}

/// Simplified, cloneable snapshot of every stat-bearing occupant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    entities: EntityIndex,
    /// `live_counts[t]` = number of indexed entities on team `t`.
    live_counts: Vec<u32>,
    config: Arc<BoardConfig>,
}

impl BoardState {
    /// Create an empty board.
    #[must_use]
    pub fn new(config: Arc<BoardConfig>) -> Self {
        Self {
            entities: EntityIndex::new(),
            live_counts: vec![0; config.team_count()],
            config,
        }
    }

    /// Build a board from `(identity, square, value)` triples.
    ///
    /// # Errors
    ///
    /// Fails on the first occupant [`place`](Self::place) rejects.
    pub fn from_occupants<I>(config: Arc<BoardConfig>, occupants: I) -> Result<Self>
    where
        I: IntoIterator<Item = (EntityId, Position, EntityValue)>,
    {
        let mut board = Self::new(config);
        for (id, position, value) in occupants {
            board.place(id, position, value)?;
        }
        Ok(board)
    }

    /// Add a living occupant.
    ///
    /// # Errors
    ///
    /// Fails if the square is off the board or taken, if the team is not
    /// tracked, if the occupant has no hit points, or if `id` is already
    /// placed.
    pub fn place(&mut self, id: EntityId, position: Position, mut value: EntityValue) -> Result<()> {
        if !self.config.size().contains(position) {
            return Err(GameError::OutOfBounds(position));
        }
        if let Some(team) = value.team {
            if team >= self.config.team_count() {
                return Err(GameError::UnknownTeam {
                    team,
                    team_count: self.config.team_count(),
                });
            }
        }
        if self.entities.contains(id) {
            return Err(GameError::InvalidOccupant {
                id,
                reason: "already placed".to_string(),
            });
        }
        value.clamp_hp();
        if !value.is_alive() {
            return Err(GameError::InvalidOccupant {
                id,
                reason: "no hit points remaining".to_string(),
            });
        }

        let team = value.team;
        self.entities.put(id, position, value)?;
        if let Some(team) = team {
            self.live_counts[team] += 1;
        }
        Ok(())
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<BoardConfig> {
        &self.config
    }

    /// The entity index.
    #[must_use]
    pub fn entities(&self) -> &EntityIndex {
        &self.entities
    }

    /// Look up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntityValue> {
        self.entities.get(id)
    }

    /// Whether any entity stands on `position`.
    #[must_use]
    pub fn is_occupied(&self, position: Position) -> bool {
        self.entities.is_occupied(position)
    }

    /// Live entity count per team.
    #[must_use]
    pub fn live_counts(&self) -> &[u32] {
        &self.live_counts
    }

    /// Live entity count for one team (0 for unknown teams).
    #[must_use]
    pub fn live_count(&self, team: TeamId) -> u32 {
        self.live_counts.get(team).copied().unwrap_or(0)
    }

    /// Sorted identities of `team`'s entities.
    #[must_use]
    pub fn team_members(&self, team: TeamId) -> Vec<EntityId> {
        self.entities
            .sorted_ids()
            .into_iter()
            .filter(|&id| self.entities.get(id).is_some_and(|v| v.team == Some(team)))
            .collect()
    }

    /// Apply `turn` in place and return `self` for chaining.
    pub fn apply_turn(&mut self, turn: &Turn) -> &mut Self {
        self.resolve_turn(turn);
        self
    }

    /// Apply `turn` in place and report what happened.
    ///
    /// # Resolution Order
    ///
    /// 1. Missing actor: nothing happens
    /// 2. Movement, skipped if the destination is off the board or occupied
    /// 3. Skill point cost (not floored at zero)
    /// 4. Each target square in shape order: damage, statuses, on-hit
    ///    effect, hp clamp, removal at zero hp
    pub fn resolve_turn(&mut self, turn: &Turn) -> TurnEvents {
        let mut events = TurnEvents::new(turn.actor);

        let Some(actor) = self.entities.get(turn.actor) else {
            tracing::trace!(actor = %turn.actor, "Turn skipped: actor not on board");
            return events;
        };
        events.acted = true;

        let from = actor.position();
        if turn.target != from {
            if !self.config.size().contains(turn.target) {
                tracing::trace!(actor = %turn.actor, to = %turn.target, "Move skipped: off board");
            } else if self.entities.relocate(turn.actor, turn.target) {
                events.moved = Some((from, turn.target));
            } else {
                tracing::trace!(actor = %turn.actor, to = %turn.target, "Move skipped: occupied");
            }
        }

        if let Some(move_index) = turn.move_index {
            self.resolve_attack(turn, move_index, &mut events);
        }

        tracing::trace!(
            actor = %turn.actor,
            moved = events.moved.is_some(),
            hits = events.damage_events.len(),
            deaths = events.deaths.len(),
            "Turn resolved"
        );

        #[cfg(feature = "debug-validation")]
        debug_assert!(self.verify_invariants(), "invariants broken after {turn:?}");

        events
    }

    fn resolve_attack(&mut self, turn: &Turn, move_index: usize, events: &mut TurnEvents) {
        let Some(actor) = self.entities.get_mut(turn.actor) else {
            return;
        };
        let moves = Arc::clone(&actor.moves);
        let Some(attack) = moves.get(move_index) else {
            tracing::trace!(actor = %turn.actor, move_index, "Attack skipped: no such move");
            return;
        };

        actor.sp = actor.sp.saturating_sub(attack.sp_cost);
        events.sp_spent = attack.sp_cost;
        events.move_used = Some(move_index);

        // The actor's stats are read once, after paying the cost.
        let source = actor.clone();
        let attack_power = source.modified_attack();

        for square in attack.shape.targets(source.position(), turn.direction) {
            let Some(target_id) = self.entities.id_at(square) else {
                continue;
            };
            let Some(target) = self.entities.get_mut(target_id) else {
                continue;
            };

            let damage = attack.effective_damage(attack_power, target.modified_defense());
            let hp = (i64::from(target.hp) - i64::from(damage)).clamp(0, i64::from(target.max_hp));
            target.hp = u32::try_from(hp).unwrap_or(0);

            let mut inflicted = Vec::new();
            for status in &attack.inflicts {
                if target.add_status(status.clone()) {
                    inflicted.push(status.name.clone());
                }
            }

            if let Some(effect) = attack.misc_effect {
                effect.apply(target, &source);
            }
            target.clamp_hp();

            let killed = !target.is_alive();
            events.damage_events.push(DamageEvent {
                attacker: turn.actor,
                target: target_id,
                position: square,
                damage,
                hp_after: target.hp,
                inflicted,
                killed,
            });

            if killed {
                self.remove_dead(target_id);
                events.deaths.push(target_id);
            }
        }
    }

    /// Remove a dead entity and decrement its team's live count exactly once.
    fn remove_dead(&mut self, id: EntityId) {
        if let Some(value) = self.entities.remove(id) {
            if let Some(team) = value.team {
                if let Some(count) = self.live_counts.get_mut(team) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }

    /// Run end-of-turn processing for `team` and return `self` for chaining.
    pub fn apply_turn_effects(&mut self, team: TeamId) -> &mut Self {
        self.resolve_turn_effects(team);
        self
    }

    /// Run end-of-turn processing for `team` and report what happened.
    ///
    /// Every entity of `team` carrying at least one status regains one skill
    /// point; then each of its statuses fires its recurring effect, ages by
    /// one turn and is dropped once expired. An entity brought to zero hp by
    /// a recurring effect is removed like a combat death.
    pub fn resolve_turn_effects(&mut self, team: TeamId) -> EffectEvents {
        let mut events = EffectEvents::default();

        for id in self.entities.sorted_ids() {
            let Some(value) = self.entities.get_mut(id) else {
                continue;
            };
            if value.team != Some(team) || value.statuses().is_empty() {
                continue;
            }

            value.sp = value.sp.saturating_add(1);

            // Take the list so statuses can be aged and dropped in one pass.
            let statuses = value.status_effects.take().unwrap_or_default();
            let mut kept = Vec::with_capacity(statuses.len());
            for mut status in statuses {
                if let Some(effect) = status.on_turn_end {
                    effect.apply(value);
                    events.fired.push((id, status.name.clone()));
                }
                status.elapsed_turns += 1;
                if status.is_expired() {
                    events.expired.push((id, status.name));
                } else {
                    kept.push(status);
                }
            }
            value.status_effects = Some(kept);

            if !value.is_alive() {
                self.remove_dead(id);
                events.deaths.push(id);
            }
        }

        if !events.deaths.is_empty() {
            tracing::trace!(team, deaths = events.deaths.len(), "Status effects killed entities");
        }

        events
    }

    /// Score the board from `perspective`'s point of view. Higher is better.
    ///
    /// A `perspective` entity standing on one of its own victory squares
    /// returns [`ZONE_SENTINEL`] immediately; otherwise any other team
    /// holding one of its squares returns `-ZONE_SENTINEL`. Without a zone
    /// capture, every surviving combatant contributes
    /// [`entity_value`](Self::entity_value), positive for `perspective` and
    /// negative for everyone else. Unaffiliated objects contribute nothing.
    #[must_use]
    pub fn evaluate(&self, perspective: TeamId) -> i64 {
        if self.config.has_zones() {
            if let Some(holder) = self.zone_holder(perspective) {
                return if holder == perspective {
                    ZONE_SENTINEL
                } else {
                    -ZONE_SENTINEL
                };
            }
        }

        self.entities
            .values()
            .filter_map(|value| {
                let team = value.team?;
                let contribution = self.entity_value(value);
                Some(if team == perspective {
                    contribution
                } else {
                    -contribution
                })
            })
            .sum()
    }

    /// Team holding one of its own zones, preferring `perspective`.
    fn zone_holder(&self, perspective: TeamId) -> Option<TeamId> {
        let mut opponent = None;
        for value in self.entities.values() {
            let Some(team) = value.team else {
                continue;
            };
            if !self.config.is_zone_of(team, value.position()) {
                continue;
            }
            if team == perspective {
                return Some(team);
            }
            opponent = Some(opponent.map_or(team, |t: TeamId| t.min(team)));
        }
        opponent
    }

    /// Unsigned value of one entity.
    ///
    /// Grows as the entity loses health (it is in danger, or its kill is
    /// urgent) and shrinks with each detrimental status it carries.
    #[must_use]
    pub fn entity_value(&self, value: &EntityValue) -> i64 {
        let weights = self.config.weights();
        let max_hp = i64::from(value.max_hp.max(1));
        let missing = max_hp - i64::from(value.hp.min(value.max_hp));
        let penalty = weights.status_penalty * value.detrimental_status_count() as i64;
        weights.base_value + weights.danger_bonus * missing / max_hp - penalty
    }

    /// Winner of a two-team game, if exactly one of teams 0 and 1 is wiped out.
    ///
    /// Only meaningful for two primary teams; use
    /// [`Rules`](crate::rules::Rules) for anything else.
    #[must_use]
    pub fn last_team_standing(&self) -> Option<TeamId> {
        if self.live_counts.len() < 2 {
            return None;
        }
        match (self.live_count(0) == 0, self.live_count(1) == 0) {
            (true, false) => Some(1),
            (false, true) => Some(0),
            _ => None,
        }
    }

    /// Recount live entities per team with a full scan.
    #[must_use]
    pub fn recount_live(&self) -> Vec<u32> {
        let mut counts = vec![0; self.config.team_count()];
        for value in self.entities.values() {
            if let Some(count) = value.team.and_then(|team| counts.get_mut(team)) {
                if value.is_alive() {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Check every structural invariant: index consistency, incremental live
    /// counts matching a recount, hit points in `(0, max_hp]`, on-board
    /// positions and known teams.
    #[must_use]
    pub fn verify_invariants(&self) -> bool {
        let team_count = self.config.team_count();
        self.entities.is_consistent()
            && self.recount_live() == self.live_counts
            && self.entities.values().all(|v| {
                v.is_alive()
                    && v.hp <= v.max_hp
                    && self.config.size().contains(v.position())
                    && v.team.map_or(true, |team| team < team_count)
            })
    }

    /// Compute a deterministic hash of the board.
    ///
    /// Used for determinism checks and replay verification.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.live_counts.hash(&mut hasher);

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(value) = self.entities.get(id) {
                id.hash(&mut hasher);
                value.hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize the board to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize board: {e}")))
    }

    /// Deserialize a board from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails, if the embedded
    /// configuration is malformed, or if the decoded board breaks a
    /// structural invariant.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let board: Self = bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize board: {e}")))?;
        if !board.verify_invariants() {
            return Err(GameError::InvalidConfiguration(format!(
                "decoded board is inconsistent: live counts {:?}, recount {:?}",
                board.live_counts,
                board.recount_live()
            )));
        }
        Ok(board)
    }
}
