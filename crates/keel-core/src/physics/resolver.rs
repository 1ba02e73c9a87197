// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Contact resolution: positional correction plus restitution/friction
//! impulses.
//!
//! Sensors never reach this module; the world reports their contacts without
//! resolving them. Kinematic bodies move under positional correction but
//! carry zero inverse mass, so the impulse pass leaves them untouched.

use crate::math::{Fx, Vec2};

use super::body::{Body, BodyKind};
use super::narrowphase::Contact;

/// Splits two distinct mutable body borrows out of one slice.
pub(crate) fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    debug_assert!(a < b);
    let (head, tail) = bodies.split_at_mut(b);
    (&mut head[a], &mut tail[0])
}

/// Positional correction with slop.
///
/// The overlap is shrunk by `slop` first; resting contacts inside the slop
/// band are left alone to avoid jitter. What remains is split by movability:
/// both movable → half each, one movable → the full correction.
pub(crate) fn correct_positions(a: &mut Body, b: &mut Body, contact: &Contact, slop: Fx) {
    let a_movable = a.kind != BodyKind::Static;
    let b_movable = b.kind != BodyKind::Static;
    if !a_movable && !b_movable {
        return;
    }
    let depth = contact.depth - slop;
    if depth <= Fx::ZERO {
        return;
    }

    if a_movable && b_movable {
        let half = contact.normal.scale(depth * Fx::HALF);
        a.position = a.position - half;
        b.position = b.position + half;
    } else if a_movable {
        a.position = a.position - contact.normal.scale(depth);
    } else {
        b.position = b.position + contact.normal.scale(depth);
    }
}

/// Restitution + friction impulse along the contact normal.
pub(crate) fn apply_impulses(a: &mut Body, b: &mut Body, contact: &Contact) {
    let inv_sum = a.inv_mass + b.inv_mass;
    if inv_sum.is_zero() {
        return;
    }

    let rel = b.velocity - a.velocity;
    let vn = rel.dot(contact.normal);
    // Separating already; nothing to absorb.
    if vn > Fx::ZERO {
        return;
    }

    let e = a.restitution.min(b.restitution);
    let j = -(Fx::ONE + e) * vn / inv_sum;

    let impulse = contact.normal.scale(j);
    if !j.is_zero() {
        wake_dynamic(a);
        wake_dynamic(b);
    }
    a.velocity = a.velocity - impulse.scale(a.inv_mass);
    b.velocity = b.velocity + impulse.scale(b.inv_mass);

    // Coulomb friction on the tangent plane, clamped by |j|·μ with μ the
    // product of the per-body coefficients.
    let rel = b.velocity - a.velocity;
    let tangent = rel - contact.normal.scale(rel.dot(contact.normal));
    let tangent_len = tangent.length();
    if tangent_len.is_zero() {
        return;
    }
    let tangent = Vec2::new(tangent.x / tangent_len, tangent.y / tangent_len);
    let mu = a.friction * b.friction;
    if mu.is_zero() {
        return;
    }
    let jt_raw = -rel.dot(tangent) / inv_sum;
    let limit = j.abs() * mu;
    let jt = jt_raw.clamp(-limit, limit);
    if jt.is_zero() {
        return;
    }

    let friction_impulse = tangent.scale(jt);
    wake_dynamic(a);
    wake_dynamic(b);
    a.velocity = a.velocity - friction_impulse.scale(a.inv_mass);
    b.velocity = b.velocity + friction_impulse.scale(b.inv_mass);
}

fn wake_dynamic(body: &mut Body) {
    if !body.inv_mass.is_zero() {
        body.wake();
    }
}
