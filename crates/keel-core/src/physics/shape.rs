// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Collision shapes and axis-aligned bounding boxes.

use crate::math::{cos, sin, Fx, Vec2};

/// Collision shape attached to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Circle with a radius.
    Circle {
        /// Radius in world units.
        radius: Fx,
    },
    /// Axis-aligned box described by half extents. Rotation affects only the
    /// swept AABB; the narrow phase treats boxes as axis-aligned.
    Rect {
        /// Half width.
        half_w: Fx,
        /// Half height.
        half_h: Fx,
    },
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Aabb {
    /// Returns `true` when two boxes overlap (touching counts).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

impl Shape {
    /// Bounding box at a position and rotation.
    ///
    /// A rotated box uses the `|half·cosθ| + |half·sinθ|` extent; an
    /// unrotated box and a circle are analytic.
    #[must_use]
    pub fn aabb(&self, position: Vec2, rotation: Fx) -> Aabb {
        match *self {
            Self::Circle { radius } => Aabb {
                min: Vec2::new(position.x - radius, position.y - radius),
                max: Vec2::new(position.x + radius, position.y + radius),
            },
            Self::Rect { half_w, half_h } => {
                let (ex, ey) = if rotation.is_zero() {
                    (half_w, half_h)
                } else {
                    let c = cos(rotation).abs();
                    let s = sin(rotation).abs();
                    (half_w * c + half_h * s, half_w * s + half_h * c)
                };
                Aabb {
                    min: Vec2::new(position.x - ex, position.y - ey),
                    max: Vec2::new(position.x + ex, position.y + ey),
                }
            }
        }
    }

    /// Radius of the circumscribing circle, used for broad-phase cell
    /// placement.
    #[must_use]
    pub fn bounding_radius(&self) -> Fx {
        match *self {
            Self::Circle { radius } => radius,
            Self::Rect { half_w, half_h } => Vec2::new(half_w, half_h).length(),
        }
    }
}
