// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Fixed-point quaternion.
//!
//! Reserved for the 3D physics mirror; the 2D kernel represents rotation as a
//! plain angle. Kept in the numeric layer so both variants share one
//! deterministic math surface.

use super::fixed::Fx;
use super::trig;
use super::vec::Vec3;

/// Quaternion stored as (x, y, z, w) in Q16.16.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Quat {
    /// X (i) component.
    pub x: Fx,
    /// Y (j) component.
    pub y: Fx,
    /// Z (k) component.
    pub z: Fx,
    /// Scalar component.
    pub w: Fx,
}

impl Quat {
    /// Creates a quaternion from components.
    #[must_use]
    pub const fn new(x: Fx, y: Fx, z: Fx, w: Fx) -> Self {
        Self { x, y, z, w }
    }

    /// Returns the identity quaternion.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(Fx::ZERO, Fx::ZERO, Fx::ZERO, Fx::ONE)
    }

    /// Constructs a quaternion from a rotation axis and an angle in radians.
    ///
    /// The axis is normalised internally; a zero axis yields the identity.
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: Fx) -> Self {
        let norm = axis.normalize();
        if norm == Vec3::ZERO {
            return Self::identity();
        }
        let half = Fx::from_raw(angle.raw() / 2);
        let s = trig::sin(half);
        let c = trig::cos(half);
        let scaled = norm.scale(s);
        Self::new(scaled.x, scaled.y, scaled.z, c)
    }

    /// Multiplies two quaternions (`self * other`).
    #[must_use]
    pub fn multiply(self, other: Self) -> Self {
        let Self {
            x: ax,
            y: ay,
            z: az,
            w: aw,
        } = self;
        let Self {
            x: bx,
            y: by,
            z: bz,
            w: bw,
        } = other;
        Self::new(
            aw * bx + ax * bw + ay * bz - az * by,
            aw * by - ax * bz + ay * bw + az * bx,
            aw * bz + ax * by - ay * bx + az * bw,
            aw * bw - ax * bx - ay * by - az * bz,
        )
    }

    /// Normalises the quaternion; returns the identity when the norm is zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let v = Vec3::new(self.x, self.y, self.z);
        let w2 = i64::from(self.w.raw()) * i64::from(self.w.raw()) >> 16;
        let len = Fx::from_raw(super::fixed::sqrt_q16(v.length_squared() + w2) as i32);
        if len.is_zero() {
            return Self::identity();
        }
        Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }

    /// Rotates a vector by this quaternion (`q · v · q⁻¹` for unit `q`).
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // t = 2 · (q.xyz × v); v' = v + w·t + q.xyz × t
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v).scale(Fx::from_int(2));
        v + t.scale(self.w) + u.cross(t)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn identity_leaves_vectors_unchanged() {
        let v = Vec3::new(Fx::from_int(1), Fx::from_int(-2), Fx::from_int(3));
        assert_eq!(Quat::identity().rotate(v), v);
    }

    #[test]
    fn zero_axis_yields_identity() {
        assert_eq!(
            Quat::from_axis_angle(Vec3::ZERO, trig::HALF_PI),
            Quat::identity()
        );
    }

    #[test]
    fn quarter_turn_about_z_moves_x_toward_y() {
        let q = Quat::from_axis_angle(
            Vec3::new(Fx::ZERO, Fx::ZERO, Fx::ONE),
            trig::HALF_PI,
        );
        let r = q.rotate(Vec3::new(Fx::ONE, Fx::ZERO, Fx::ZERO));
        assert!((r.x).abs() < Fx::from_num(0.01));
        assert!((r.y - Fx::ONE).abs() < Fx::from_num(0.01));
        assert!(r.z.abs() < Fx::from_num(0.01));
    }

    #[test]
    fn multiply_identity_is_neutral() {
        let q = Quat::from_axis_angle(
            Vec3::new(Fx::ZERO, Fx::ONE, Fx::ZERO),
            Fx::from_num(0.5),
        );
        assert_eq!(q.multiply(Quat::identity()), q);
        assert_eq!(Quat::identity().multiply(q), q);
    }
}
