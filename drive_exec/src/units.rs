//! # Physical quantities
//!
//! Strongly typed scalars used where the library meets sensors and other
//! collaborators. Internally everything is SI `f64` with the unit carried in
//! the field name (`_m`, `_rad`, `_s`).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Metres in one inch.
pub const M_PER_IN: f64 = 0.0254;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A length, stored in metres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Length(f64);

/// An angle, stored in radians.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Angle(f64);

/// A duration, stored in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Time(f64);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Length {
    pub const fn from_m(m: f64) -> Self {
        Self(m)
    }

    pub fn from_in(inches: f64) -> Self {
        Self(inches * M_PER_IN)
    }

    pub const fn as_m(self) -> f64 {
        self.0
    }

    pub fn as_in(self) -> f64 {
        self.0 / M_PER_IN
    }
}

impl Angle {
    pub const fn from_rad(rad: f64) -> Self {
        Self(rad)
    }

    pub fn from_deg(deg: f64) -> Self {
        Self(deg.to_radians())
    }

    pub const fn as_rad(self) -> f64 {
        self.0
    }

    pub fn as_deg(self) -> f64 {
        self.0.to_degrees()
    }
}

impl Time {
    pub const fn from_s(s: f64) -> Self {
        Self(s)
    }

    pub const fn as_s(self) -> f64 {
        self.0
    }
}

/// Implements the arithmetic shared by all the quantity types.
macro_rules! impl_quantity_ops {
    ($t:ident) => {
        impl $t {
            /// True if the underlying value is neither infinite nor NaN.
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }

        impl Add for $t {
            type Output = $t;
            fn add(self, rhs: $t) -> $t {
                $t(self.0 + rhs.0)
            }
        }

        impl AddAssign for $t {
            fn add_assign(&mut self, rhs: $t) {
                self.0 += rhs.0
            }
        }

        impl Sub for $t {
            type Output = $t;
            fn sub(self, rhs: $t) -> $t {
                $t(self.0 - rhs.0)
            }
        }

        impl Neg for $t {
            type Output = $t;
            fn neg(self) -> $t {
                $t(-self.0)
            }
        }

        impl Mul<f64> for $t {
            type Output = $t;
            fn mul(self, rhs: f64) -> $t {
                $t(self.0 * rhs)
            }
        }

        impl Div<f64> for $t {
            type Output = $t;
            fn div(self, rhs: f64) -> $t {
                $t(self.0 / rhs)
            }
        }
    };
}

impl_quantity_ops!(Length);
impl_quantity_ops!(Angle);
impl_quantity_ops!(Time);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_conversions() {
        assert!((Length::from_in(24.0).as_m() - 0.6096).abs() < 1e-12);
        assert!((Length::from_m(0.0254).as_in() - 1.0).abs() < 1e-12);
        assert!((Angle::from_deg(180.0).as_rad() - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_ops() {
        let a = Length::from_m(1.0) + Length::from_m(0.5) - Length::from_m(0.25);
        assert_eq!(a.as_m(), 1.25);
        assert_eq!((-a * 2.0).as_m(), -2.5);
        assert!(!Angle::from_rad(f64::NAN).is_finite());
    }
}
