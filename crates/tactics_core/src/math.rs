//! Fixed-point math utilities for deterministic simulation.
//!
//! Damage multipliers are fixed-point so that the same move resolves to
//! the same damage on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Build a fixed-point ratio from a whole percentage (`150` -> `1.5`).
#[must_use]
pub fn percent(value: i32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Multiply an integer stat by a fixed-point factor and round toward
/// negative infinity.
///
/// Saturates at the `i32` range instead of overflowing.
#[must_use]
pub fn scale_floor(factor: Fixed, value: i32) -> i32 {
    factor
        .saturating_mul(Fixed::from_num(value))
        .floor()
        .saturating_to_num::<i32>()
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}
