//! # Tactics Core
//!
//! Deterministic battle-state simulation for a turn-based grid tactics game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No audio or UI
//! - No system randomness (seeded PRNG only)
//! - No floating-point math (uses fixed-point)
//!
//! A [`BoardState`](board_state::BoardState) is a cheap, disposable snapshot
//! of every stat-bearing occupant of the board. Hypothetical futures are
//! explored by cloning it, applying candidate [`Turn`](turn::Turn)s to the
//! clone and scoring the result. The authoritative game never observes those
//! explorations until the caller commits a turn.
//!
//! ## Crate Structure
//!
//! - [`position`] - Grid coordinates, directions and board bounds
//! - [`status`] - Timed status effects
//! - [`entity`] - Entity identities and combat values
//! - [`entity_index`] - Identity/position/value index
//! - [`moves`] - Attack descriptors and shapes
//! - [`turn`] - Proposed actions
//! - [`board_state`] - Turn resolution and evaluation
//! - [`rules`] - Win conditions and turn order
//! - [`ai`] - Computer player search
//! - [`replay`] - Battle logs for deterministic playback
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod board_state;
pub mod entity;
pub mod entity_index;
pub mod error;
pub mod math;
pub mod moves;
pub mod position;
pub mod replay;
pub mod rules;
pub mod snapshot;
pub mod status;
pub mod turn;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiConfig, ComputerPlayer, ScoredTurn, TieBreak};
    pub use crate::board_state::{
        BoardConfig, BoardState, DamageEvent, EffectEvents, EvaluationWeights, TurnEvents,
        ZONE_SENTINEL,
    };
    pub use crate::entity::{EntityId, EntityIdAllocator, EntityValue, TeamId};
    pub use crate::entity_index::EntityIndex;
    pub use crate::error::{GameError, Result};
    pub use crate::math::Fixed;
    pub use crate::moves::{AttackShape, MiscEffect, MoveInfo, MoveSet};
    pub use crate::position::{BoardSize, Direction, Position};
    pub use crate::replay::BattleLog;
    pub use crate::rules::{Rules, TurnOrder, WinCondition, ZoneRule};
    pub use crate::snapshot::LiveOccupant;
    pub use crate::status::{StatModifiers, StatusEffectInfo, TurnEffect};
    pub use crate::turn::Turn;
}
