//! Timed status effects.
//!
//! A status is identified by its name alone: two statuses with the same name
//! are the same effect regardless of how long either has left to run.

use serde::{Deserialize, Serialize};

use crate::entity::EntityValue;

/// Additive stat deltas granted while a status is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatModifiers {
    /// Delta to attack.
    #[serde(default)]
    pub attack: i32,
    /// Delta to defense.
    #[serde(default)]
    pub defense: i32,
    /// Delta to movement speed.
    #[serde(default)]
    pub speed: i32,
}

impl StatModifiers {
    /// No change to any stat.
    pub const NONE: Self = Self {
        attack: 0,
        defense: 0,
        speed: 0,
    };

    /// Sum of all deltas, used to judge whether a status hurts its bearer.
    #[must_use]
    pub const fn net(&self) -> i32 {
        self.attack + self.defense + self.speed
    }
}

/// Recurring effect fired once at the end of each of the bearer's team turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnEffect {
    /// Lose hit points (poison, burn).
    Damage(u32),
    /// Regain hit points (regeneration).
    Heal(u32),
    /// Regain skill points.
    RestoreSp(i32),
    /// Lose skill points.
    DrainSp(i32),
}

impl TurnEffect {
    /// Apply the effect to its bearer. Hit points are clamped to
    /// `[0, max_hp]`; skill points are not clamped.
    pub fn apply(self, target: &mut EntityValue) {
        match self {
            Self::Damage(amount) => target.hp = target.hp.saturating_sub(amount),
            Self::Heal(amount) => target.hp = target.hp.saturating_add(amount),
            Self::RestoreSp(amount) => target.sp = target.sp.saturating_add(amount),
            Self::DrainSp(amount) => target.sp = target.sp.saturating_sub(amount),
        }
        target.clamp_hp();
    }

    /// Whether the effect works against its bearer.
    #[must_use]
    pub const fn is_harmful(self) -> bool {
        matches!(self, Self::Damage(_) | Self::DrainSp(_))
    }
}

/// An active (or template) status effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffectInfo {
    /// Identity key.
    pub name: String,
    /// Number of end-of-turn ticks before the status expires.
    pub duration: u32,
    /// End-of-turn ticks already elapsed. Never decreases.
    #[serde(default)]
    pub elapsed_turns: u32,
    /// Stat deltas while active.
    #[serde(default)]
    pub modifiers: StatModifiers,
    /// Optional recurring effect.
    #[serde(default)]
    pub on_turn_end: Option<TurnEffect>,
}

impl StatusEffectInfo {
    /// Create a status with no modifiers and no recurring effect.
    #[must_use]
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            duration,
            elapsed_turns: 0,
            modifiers: StatModifiers::NONE,
            on_turn_end: None,
        }
    }

    /// Builder method to set stat modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: StatModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Builder method to set the recurring effect.
    #[must_use]
    pub fn with_turn_effect(mut self, effect: TurnEffect) -> Self {
        self.on_turn_end = Some(effect);
        self
    }

    /// Whether the status has run its full course.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.elapsed_turns >= self.duration
    }

    /// Turns left before expiry.
    #[must_use]
    pub const fn remaining_turns(&self) -> u32 {
        self.duration.saturating_sub(self.elapsed_turns)
    }

    /// Whether the status hurts its bearer overall.
    #[must_use]
    pub fn is_detrimental(&self) -> bool {
        self.modifiers.net() < 0 || self.on_turn_end.is_some_and(TurnEffect::is_harmful)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityValue;

    #[test]
    fn test_expiry() {
        let mut status = StatusEffectInfo::new("Burn", 2);
        assert!(!status.is_expired());
        assert_eq!(status.remaining_turns(), 2);

        status.elapsed_turns = 2;
        assert!(status.is_expired());
        assert_eq!(status.remaining_turns(), 0);
    }

    #[test]
    fn test_zero_duration_is_expired_immediately() {
        assert!(StatusEffectInfo::new("Flinch", 0).is_expired());
    }

    #[test]
    fn test_detrimental_classification() {
        let burn = StatusEffectInfo::new("Burn", 3).with_turn_effect(TurnEffect::Damage(2));
        assert!(burn.is_detrimental());

        let weaken = StatusEffectInfo::new("Weaken", 2).with_modifiers(StatModifiers {
            attack: -3,
            ..StatModifiers::NONE
        });
        assert!(weaken.is_detrimental());

        let guard = StatusEffectInfo::new("Guard", 2).with_modifiers(StatModifiers {
            defense: 4,
            ..StatModifiers::NONE
        });
        assert!(!guard.is_detrimental());

        let regen = StatusEffectInfo::new("Regen", 2).with_turn_effect(TurnEffect::Heal(3));
        assert!(!regen.is_detrimental());
    }

    #[test]
    fn test_turn_effects_clamp_hp() {
        let mut value = EntityValue::new(Some(0), 10);
        value.hp = 3;

        TurnEffect::Damage(5).apply(&mut value);
        assert_eq!(value.hp, 0);

        TurnEffect::Heal(50).apply(&mut value);
        assert_eq!(value.hp, 10);

        TurnEffect::DrainSp(4).apply(&mut value);
        assert_eq!(value.sp, -4);
    }
}
