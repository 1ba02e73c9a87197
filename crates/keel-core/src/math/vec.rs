// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Fixed-point 2D and 3D vectors.
//!
//! Squared magnitudes are accumulated in `i64` Q16.16 space so that
//! comparisons (broad-phase radii, sleep thresholds) never overflow the
//! 32-bit scalar; only the final root is narrowed.

use core::ops::{Add, Neg, Sub};

use super::fixed::{sqrt_q16, Fx};

/// 2D vector with deterministic fixed-point operations.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: Fx,
    /// Vertical component.
    pub y: Fx,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self {
        x: Fx::ZERO,
        y: Fx::ZERO,
    };

    /// Creates a vector from components.
    #[must_use]
    pub const fn new(x: Fx, y: Fx) -> Self {
        Self { x, y }
    }

    /// Scales the vector by a scalar.
    #[must_use]
    pub fn scale(self, scalar: Fx) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// Dot product with another vector.
    #[must_use]
    pub fn dot(self, other: Self) -> Fx {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross).
    #[must_use]
    pub fn cross(self, other: Self) -> Fx {
        self.x * other.y - self.y * other.x
    }

    /// Squared length in `i64` Q16.16 space (never overflows).
    #[must_use]
    pub fn length_squared(self) -> i64 {
        let x = i64::from(self.x.raw());
        let y = i64::from(self.y.raw());
        (x * x + y * y) >> super::fixed::FRAC_BITS
    }

    /// Vector length (magnitude).
    #[must_use]
    pub fn length(self) -> Fx {
        Fx::from_raw(sqrt_q16(self.length_squared()) as i32)
    }

    /// Normalises the vector; the zero vector stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len.is_zero() {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Counter-clockwise perpendicular vector.
    #[must_use]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Returns `true` when both components are exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// 3D vector with deterministic fixed-point operations.
///
/// The 2D kernel does not consume this type; it is the seam for the 3D
/// physics mirror, which adds a rotational axis but shares the numeric layer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Vec3 {
    /// X component.
    pub x: Fx,
    /// Y component.
    pub y: Fx,
    /// Z component.
    pub z: Fx,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self {
        x: Fx::ZERO,
        y: Fx::ZERO,
        z: Fx::ZERO,
    };

    /// Creates a vector from components.
    #[must_use]
    pub const fn new(x: Fx, y: Fx, z: Fx) -> Self {
        Self { x, y, z }
    }

    /// Scales the vector by a scalar.
    #[must_use]
    pub fn scale(self, scalar: Fx) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }

    /// Dot product with another vector.
    #[must_use]
    pub fn dot(self, other: Self) -> Fx {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product with another vector.
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared length in `i64` Q16.16 space (never overflows).
    #[must_use]
    pub fn length_squared(self) -> i64 {
        let x = i64::from(self.x.raw());
        let y = i64::from(self.y.raw());
        let z = i64::from(self.z.raw());
        (x * x + y * y + z * z) >> super::fixed::FRAC_BITS
    }

    /// Vector length (magnitude).
    #[must_use]
    pub fn length(self) -> Fx {
        Fx::from_raw(sqrt_q16(self.length_squared()) as i32)
    }

    /// Normalises the vector; the zero vector stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len.is_zero() {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
