//! Non-negative quantities and rounding policies.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Values this close (relative) to an integer snap to it before truncate or
/// ceiling, so `0.29 * 100.0 = 28.999999999999996` still counts 29. Half-up
/// snaps to the nearest half instead.
const SNAP_EPSILON: f64 = 1e-9;

/// A count or a length. Always finite and `>= 0`.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Quantity(f64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0.0);

    /// Returns `None` for negative, NaN or infinite input.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            // normalizes -0.0
            Some(Self(value + 0.0))
        } else {
            None
        }
    }

    /// Clamp a raw formula result into range. The flag is true when the raw
    /// value was negative (or not finite) and had to be replaced by zero.
    pub fn clamped(value: f64) -> (Self, bool) {
        match Self::new(value) {
            Some(q) => (q, false),
            None => (Self::ZERO, true),
        }
    }

    pub fn count(n: u64) -> Self {
        Self(n as f64)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quantity({})", self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Quantity::new(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("quantity must be >= 0, got {raw}")))
    }
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Toward zero.
    Truncate,
    /// Nearest integer, ties away from zero.
    HalfUp,
    Ceiling,
    None,
}

impl Rounding {
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Self::Truncate => snap(raw).trunc(),
            Self::HalfUp => snap_half(raw).round(),
            Self::Ceiling => snap(raw).ceil(),
            Self::None => raw,
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncate => write!(f, "truncate"),
            Self::HalfUp => write!(f, "half_up"),
            Self::Ceiling => write!(f, "ceiling"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Ties are decided on the half-unit grid, so `6.25 * 9.2 = 57.49999999999999`
/// still rounds as 57.5.
fn snap_half(raw: f64) -> f64 {
    snap(raw * 2.0) / 2.0
}

fn snap(raw: f64) -> f64 {
    let nearest = raw.round();
    if (raw - nearest).abs() <= SNAP_EPSILON * nearest.abs().max(1.0) {
        nearest
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(Quantity::new(-0.5).is_none());
        assert!(Quantity::new(f64::NAN).is_none());
        assert!(Quantity::new(f64::INFINITY).is_none());
        assert_eq!(Quantity::new(0.0), Some(Quantity::ZERO));
    }

    #[test]
    fn negative_zero_normalizes() {
        let q = Quantity::new(-0.0).unwrap();
        assert!(q.value().is_sign_positive());
    }

    #[test]
    fn clamped_flags_negative() {
        assert_eq!(Quantity::clamped(-3.0), (Quantity::ZERO, true));
        assert_eq!(Quantity::clamped(3.0), (Quantity::count(3), false));
    }

    #[test]
    fn truncate_toward_zero() {
        assert_eq!(Rounding::Truncate.apply(14.06), 14.0);
        assert_eq!(Rounding::Truncate.apply(14.99), 14.0);
    }

    #[test]
    fn truncate_snaps_representation_noise() {
        let raw = 0.29 * 100.0;
        assert!(raw < 29.0);
        assert_eq!(Rounding::Truncate.apply(raw), 29.0);
    }

    #[test]
    fn half_up_ties_away_from_zero() {
        assert_eq!(Rounding::HalfUp.apply(2.5), 3.0);
        assert_eq!(Rounding::HalfUp.apply(116.963), 117.0);
        assert_eq!(Rounding::HalfUp.apply(396.165), 396.0);
    }

    #[test]
    fn half_up_snaps_ties_below_half() {
        // 625 ft at 9.2 per 100 ft
        let raw = 625.0 / 100.0 * 9.2;
        assert!(raw < 57.5);
        assert_eq!(Rounding::HalfUp.apply(raw), 58.0);
        assert_eq!(Rounding::HalfUp.apply(57.49), 57.0);
        assert_eq!(Rounding::HalfUp.apply(0.29 * 100.0), 29.0);
    }

    #[test]
    fn ceiling_and_none() {
        assert_eq!(Rounding::Ceiling.apply(12.01), 13.0);
        assert_eq!(Rounding::Ceiling.apply(12.0), 12.0);
        assert_eq!(Rounding::None.apply(12.25), 12.25);
    }

    #[test]
    fn display_drops_integral_fraction() {
        assert_eq!(Quantity::count(920).to_string(), "920");
        assert_eq!(Quantity::new(2.5).unwrap().to_string(), "2.5");
    }
}
