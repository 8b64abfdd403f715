//! Attack descriptors as seen by the battle core.
//!
//! A [`MoveInfo`] carries only what turn resolution and the computer player
//! need: cost, damage multiplier, pierce flag, inflicted statuses, a
//! relative target shape and an optional on-hit effect. Names, animations
//! and sounds live with whoever authors the content.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::EntityValue;
use crate::math::{fixed_serde, percent, scale_floor, Fixed};
use crate::position::{Direction, Position};
use crate::status::StatusEffectInfo;

/// Upper bound on damage from a single non-piercing hit.
pub const MAX_DAMAGE: i32 = 999;

/// Moves shared between an entity and all of its clones.
pub type MoveSet = Arc<[MoveInfo]>;

/// Target squares relative to the attacker, authored facing [`Direction::Up`].
///
/// `(-1, 0)` is the square directly in front of the attacker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttackShape {
    offsets: Vec<(i32, i32)>,
}

impl AttackShape {
    /// Create a shape from relative (row, column) offsets.
    #[must_use]
    pub fn new(offsets: Vec<(i32, i32)>) -> Self {
        Self { offsets }
    }

    /// The single square in front of the attacker.
    #[must_use]
    pub fn melee() -> Self {
        Self::new(vec![(-1, 0)])
    }

    /// A straight line of `length` squares in front of the attacker.
    #[must_use]
    pub fn line(length: i32) -> Self {
        Self::new((1..=length).map(|n| (-n, 0)).collect())
    }

    /// Offsets as authored.
    #[must_use]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Absolute target squares for an attacker at `origin` facing `direction`,
    /// in authored order. Squares may lie off the board.
    pub fn targets(
        &self,
        origin: Position,
        direction: Direction,
    ) -> impl Iterator<Item = Position> + '_ {
        self.offsets.iter().map(move |&offset| {
            let (d_row, d_col) = direction.rotate(offset);
            origin.offset(d_row, d_col)
        })
    }

    /// Whether every offset is symmetric under rotation, so that only one
    /// facing needs to be considered.
    #[must_use]
    pub fn is_rotation_invariant(&self) -> bool {
        Direction::ALL.iter().all(|&direction| {
            let mut rotated: Vec<_> = self.offsets.iter().map(|&o| direction.rotate(o)).collect();
            let mut original = self.offsets.clone();
            rotated.sort_unstable();
            original.sort_unstable();
            rotated == original
        })
    }
}

/// Extra effect applied to each occupied target after damage.
///
/// The acting entity parameterizes the effect but is never modified by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MiscEffect {
    /// Restore a flat amount of hit points.
    Heal(u32),
    /// Remove skill points.
    DrainSp(i32),
    /// Restore hit points equal to a percentage of the actor's attack.
    HealByAttackPercent(i32),
    /// Permanently raise base attack.
    BuffAttack(i32),
}

impl MiscEffect {
    /// Apply the effect to `target` on behalf of `source`.
    pub fn apply(self, target: &mut EntityValue, source: &EntityValue) {
        match self {
            Self::Heal(amount) => target.hp = target.hp.saturating_add(amount),
            Self::DrainSp(amount) => target.sp = target.sp.saturating_sub(amount),
            Self::HealByAttackPercent(pct) => {
                let amount = scale_floor(percent(pct), source.modified_attack()).max(0);
                target.hp = target.hp.saturating_add(amount.unsigned_abs());
            }
            Self::BuffAttack(amount) => {
                target.base_attack = target.base_attack.saturating_add(amount);
            }
        }
    }
}

/// Everything the battle core needs to know about a move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveInfo {
    /// Display name.
    pub name: String,
    /// Skill points spent on use.
    pub sp_cost: i32,
    /// Ignore the target's defense entirely.
    pub pierce: bool,
    /// Multiplier applied to the actor's modified attack.
    #[serde(with = "fixed_serde")]
    pub power: Fixed,
    /// Statuses added to each eligible target.
    pub inflicts: Vec<StatusEffectInfo>,
    /// Squares hit, relative to the actor.
    pub shape: AttackShape,
    /// Extra per-target effect.
    pub misc_effect: Option<MiscEffect>,
}

impl MoveInfo {
    /// Create a non-piercing move with no side effects.
    #[must_use]
    pub fn new(name: impl Into<String>, power: Fixed, shape: AttackShape) -> Self {
        Self {
            name: name.into(),
            sp_cost: 0,
            pierce: false,
            power,
            inflicts: Vec::new(),
            shape,
            misc_effect: None,
        }
    }

    /// Builder method to set the skill point cost.
    #[must_use]
    pub fn with_cost(mut self, sp_cost: i32) -> Self {
        self.sp_cost = sp_cost;
        self
    }

    /// Builder method to make the move ignore defense.
    #[must_use]
    pub fn piercing(mut self) -> Self {
        self.pierce = true;
        self
    }

    /// Builder method to add an inflicted status.
    #[must_use]
    pub fn inflicting(mut self, status: StatusEffectInfo) -> Self {
        self.inflicts.push(status);
        self
    }

    /// Builder method to set the on-hit effect.
    #[must_use]
    pub fn with_misc_effect(mut self, effect: MiscEffect) -> Self {
        self.misc_effect = Some(effect);
        self
    }

    /// Damage before defense: `floor(power * attack)`.
    #[must_use]
    pub fn raw_damage(&self, modified_attack: i32) -> i32 {
        scale_floor(self.power, modified_attack)
    }

    /// Damage dealt to a target with `target_defense`.
    ///
    /// Piercing moves skip defense; other moves are clamped to
    /// `[0, MAX_DAMAGE]` after subtracting it.
    #[must_use]
    pub fn effective_damage(&self, modified_attack: i32, target_defense: i32) -> i32 {
        let raw = self.raw_damage(modified_attack);
        if self.pierce {
            raw
        } else {
            raw.saturating_sub(target_defense).clamp(0, MAX_DAMAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_targets_follow_facing() {
        let shape = AttackShape::line(2);
        let origin = Position::new(3, 3);

        let up: Vec<_> = shape.targets(origin, Direction::Up).collect();
        assert_eq!(up, vec![Position::new(2, 3), Position::new(1, 3)]);

        let right: Vec<_> = shape.targets(origin, Direction::Right).collect();
        assert_eq!(right, vec![Position::new(3, 4), Position::new(3, 5)]);

        let left: Vec<_> = shape.targets(origin, Direction::Left).collect();
        assert_eq!(left, vec![Position::new(3, 2), Position::new(3, 1)]);
    }

    #[test]
    fn test_rotation_invariance() {
        let ring = AttackShape::new(vec![(-1, 0), (0, 1), (1, 0), (0, -1)]);
        assert!(ring.is_rotation_invariant());
        assert!(!AttackShape::melee().is_rotation_invariant());
    }

    #[test]
    fn test_non_piercing_damage_clamps_at_zero() {
        let strike = MoveInfo::new("Strike", Fixed::ONE, AttackShape::melee());
        assert_eq!(strike.effective_damage(3, 5), 0);
        assert_eq!(strike.effective_damage(12, 5), 7);
    }

    #[test]
    fn test_non_piercing_damage_caps() {
        let nuke = MoveInfo::new("Nuke", percent(1000), AttackShape::melee());
        assert_eq!(nuke.effective_damage(500, 0), MAX_DAMAGE);
    }

    #[test]
    fn test_piercing_ignores_defense() {
        let lance = MoveInfo::new("Lance", Fixed::ONE, AttackShape::melee()).piercing();
        assert_eq!(lance.effective_damage(12, 50), 12);
    }

    #[test]
    fn test_huge_stats_saturate() {
        let big = MoveInfo::new("Big", percent(300), AttackShape::melee());
        assert_eq!(big.effective_damage(1_000_000_000, 0), MAX_DAMAGE);
        assert_eq!(big.clone().piercing().effective_damage(1_000_000_000, 0), i32::MAX);

        let source = EntityValue::new(Some(0), 10).with_stats(1_000_000_000, 0);
        let mut target = EntityValue::new(Some(1), 10).with_hp(1);
        MiscEffect::HealByAttackPercent(300).apply(&mut target, &source);
        assert_eq!(target.hp, i32::MAX.unsigned_abs() + 1);
        MiscEffect::BuffAttack(i32::MAX).apply(&mut target, &source);
        MiscEffect::BuffAttack(i32::MAX).apply(&mut target, &source);
        assert_eq!(target.base_attack, i32::MAX);
    }

    #[test]
    fn test_raw_damage_floors() {
        let slash = MoveInfo::new("Slash", percent(150), AttackShape::melee());
        assert_eq!(slash.raw_damage(5), 7);
    }

    #[test]
    fn test_misc_effects() {
        let source = EntityValue::new(Some(0), 10).with_stats(10, 0);
        let mut target = EntityValue::new(Some(1), 20).with_hp(5).with_sp(3);

        MiscEffect::HealByAttackPercent(50).apply(&mut target, &source);
        assert_eq!(target.hp, 10);

        MiscEffect::DrainSp(5).apply(&mut target, &source);
        assert_eq!(target.sp, -2);

        MiscEffect::BuffAttack(2).apply(&mut target, &source);
        assert_eq!(target.base_attack, 2);
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn prop_non_piercing_damage_stays_in_range(
                power in -1000i32..1000,
                attack in any::<i32>(),
                defense in any::<i32>(),
            ) {
                let strike = MoveInfo::new("Strike", percent(power), AttackShape::melee());
                let damage = strike.effective_damage(attack, defense);
                prop_assert!((0..=MAX_DAMAGE).contains(&damage));
            }

            #[test]
            fn prop_piercing_damage_is_raw_damage(
                power in -1000i32..1000,
                attack in any::<i32>(),
                defense in any::<i32>(),
            ) {
                let lance = MoveInfo::new("Lance", percent(power), AttackShape::melee()).piercing();
                prop_assert_eq!(lance.effective_damage(attack, defense), lance.raw_damage(attack));
            }
        }
    }
}
