// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Narrow-phase collision tests: circle-circle, box-box, circle-box.
//!
//! Boxes are treated as axis-aligned here; rotation influences only the
//! broad-phase AABB. Contact normals always point from body A toward body B.

use crate::math::{Fx, Vec2};

use super::body::Body;
use super::shape::Shape;

/// A narrow-phase contact. `normal` points from A to B; `depth` is the
/// penetration along it; `point` is the representative contact position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Unit normal from A toward B.
    pub normal: Vec2,
    /// Penetration depth, positive when overlapping.
    pub depth: Fx,
    /// Contact point in world space.
    pub point: Vec2,
}

/// Tests two bodies for contact.
#[must_use]
pub fn collide(a: &Body, b: &Body) -> Option<Contact> {
    match (a.shape(), b.shape()) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position(), ra, b.position(), rb)
        }
        (
            Shape::Rect {
                half_w: aw,
                half_h: ah,
            },
            Shape::Rect {
                half_w: bw,
                half_h: bh,
            },
        ) => rect_rect(a.position(), aw, ah, b.position(), bw, bh),
        (Shape::Circle { radius }, Shape::Rect { half_w, half_h }) => {
            circle_rect(a.position(), radius, b.position(), half_w, half_h)
        }
        (Shape::Rect { half_w, half_h }, Shape::Circle { radius }) => {
            circle_rect(b.position(), radius, a.position(), half_w, half_h).map(|c| Contact {
                normal: -c.normal,
                ..c
            })
        }
    }
}

fn circle_circle(pa: Vec2, ra: Fx, pb: Vec2, rb: Fx) -> Option<Contact> {
    let delta = pb - pa;
    let sum = ra + rb;
    let dist2 = delta.length_squared();
    let sum2 = (i64::from(sum.raw()) * i64::from(sum.raw())) >> 16;
    if dist2 > sum2 {
        return None;
    }
    let dist = delta.length();
    // Coincident centres: arbitrary but fixed axis.
    let normal = if dist.is_zero() {
        Vec2::new(Fx::ONE, Fx::ZERO)
    } else {
        Vec2::new(delta.x / dist, delta.y / dist)
    };
    Some(Contact {
        normal,
        depth: sum - dist,
        point: pa + normal.scale(ra),
    })
}

fn rect_rect(pa: Vec2, aw: Fx, ah: Fx, pb: Vec2, bw: Fx, bh: Fx) -> Option<Contact> {
    let dx = pb.x - pa.x;
    let dy = pb.y - pa.y;
    let px = (aw + bw) - dx.abs();
    if px <= Fx::ZERO {
        return None;
    }
    let py = (ah + bh) - dy.abs();
    if py <= Fx::ZERO {
        return None;
    }

    let point = Vec2::new(pa.x + dx * Fx::HALF, pa.y + dy * Fx::HALF);

    // Contact axis is the one with the smaller overlap.
    if px < py {
        let sign = if dx.is_negative() { -Fx::ONE } else { Fx::ONE };
        Some(Contact {
            normal: Vec2::new(sign, Fx::ZERO),
            depth: px,
            point,
        })
    } else {
        let sign = if dy.is_negative() { -Fx::ONE } else { Fx::ONE };
        Some(Contact {
            normal: Vec2::new(Fx::ZERO, sign),
            depth: py,
            point,
        })
    }
}

/// Circle (A) against axis-aligned box (B).
fn circle_rect(pc: Vec2, radius: Fx, pr: Vec2, hw: Fx, hh: Fx) -> Option<Contact> {
    let local = pc - pr;
    let clamped = Vec2::new(local.x.clamp(-hw, hw), local.y.clamp(-hh, hh));

    if clamped != local {
        // Centre outside the box: closest-point test.
        let delta = local - clamped;
        let dist2 = delta.length_squared();
        let r2 = (i64::from(radius.raw()) * i64::from(radius.raw())) >> 16;
        if dist2 > r2 {
            return None;
        }
        let dist = delta.length();
        let outward = if dist.is_zero() {
            Vec2::new(Fx::ONE, Fx::ZERO)
        } else {
            Vec2::new(delta.x / dist, delta.y / dist)
        };
        return Some(Contact {
            // A→B points from the circle into the box.
            normal: -outward,
            depth: radius - dist,
            point: pr + clamped,
        });
    }

    // Centre inside the box: pick the axis with the smallest exit distance
    // and eject past the face. The added radius is intentional; ejecting
    // only to the face makes a deeply penetrated body chatter.
    let ex = hw - local.x.abs();
    let ey = hh - local.y.abs();
    let (outward, depth) = if ex < ey {
        let sign = if local.x.is_negative() { -Fx::ONE } else { Fx::ONE };
        (Vec2::new(sign, Fx::ZERO), ex + radius)
    } else {
        let sign = if local.y.is_negative() { -Fx::ONE } else { Fx::ONE };
        (Vec2::new(Fx::ZERO, sign), ey + radius)
    };
    Some(Contact {
        normal: -outward,
        depth,
        point: pc,
    })
}
