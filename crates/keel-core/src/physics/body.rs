// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Rigid bodies.
//!
//! Per-body state machine: `awake → sleeping` after the configured run of
//! below-threshold frames; `sleeping → awake` on any impulse, force, direct
//! velocity write, or snapshot restore. Velocities of a sleeping body are
//! forced to zero.

use crate::ident::Entity;
use crate::math::{Fx, Vec2};

use super::shape::Shape;

/// Simulation role of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves; never takes correction or impulse.
    Static,
    /// Moves only under direct velocity writes and positional correction;
    /// takes no impulse from dynamic bodies.
    Kinematic,
    /// Fully simulated.
    Dynamic,
}

/// Monotonically assigned body identifier.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) u32);

impl BodyId {
    /// Raw identifier value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Construction parameters for a body.
#[derive(Debug, Clone, Copy)]
pub struct BodyDef {
    /// Simulation role.
    pub kind: BodyKind,
    /// Collision shape.
    pub shape: Shape,
    /// Initial position.
    pub position: Vec2,
    /// Initial velocity.
    pub velocity: Vec2,
    /// Initial rotation in radians.
    pub rotation: Fx,
    /// Initial angular velocity in radians per second.
    pub angular_velocity: Fx,
    /// Mass; ignored for static/kinematic bodies.
    pub mass: Fx,
    /// Coefficient of restitution in `[0, 1]`.
    pub restitution: Fx,
    /// Friction coefficient.
    pub friction: Fx,
    /// 16-bit collision layer bits.
    pub layer: u16,
    /// 16-bit collision mask bits.
    pub mask: u16,
    /// Sensor bodies detect but never resolve.
    pub sensor: bool,
    /// Locks the angle against angular integration.
    pub fixed_rotation: bool,
    /// Owning entity back-reference.
    pub entity: Entity,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape: Shape::Circle { radius: Fx::ONE },
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: Fx::ZERO,
            angular_velocity: Fx::ZERO,
            mass: Fx::ONE,
            restitution: Fx::ZERO,
            friction: Fx::ZERO,
            layer: 1,
            mask: 0xFFFF,
            sensor: false,
            fixed_rotation: false,
            entity: Entity::from_raw(0),
        }
    }
}

/// A rigid body in the physics world.
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) id: BodyId,
    /// Zero-padded hex of the owning entity id; lexicographic label order is
    /// numeric entity order, which pins step iteration after a restore.
    pub(crate) label: String,
    pub(crate) kind: BodyKind,
    pub(crate) shape: Shape,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) rotation: Fx,
    pub(crate) angular_velocity: Fx,
    pub(crate) mass: Fx,
    pub(crate) inv_mass: Fx,
    pub(crate) inertia: Fx,
    pub(crate) inv_inertia: Fx,
    pub(crate) restitution: Fx,
    pub(crate) friction: Fx,
    pub(crate) layer: u16,
    pub(crate) mask: u16,
    pub(crate) sensor: bool,
    pub(crate) fixed_rotation: bool,
    pub(crate) sleeping: bool,
    pub(crate) sleep_frames: u16,
    pub(crate) force: Vec2,
    pub(crate) entity: Entity,
    pub(crate) bounding_radius: Fx,
}

impl Body {
    pub(crate) fn new(id: BodyId, def: BodyDef) -> Self {
        let dynamic = def.kind == BodyKind::Dynamic;
        let mass = if dynamic { def.mass.max(Fx::ZERO) } else { Fx::ZERO };
        let inv_mass = if dynamic && !mass.is_zero() {
            Fx::ONE / mass
        } else {
            Fx::ZERO
        };
        let inertia = if dynamic { shape_inertia(def.shape, mass) } else { Fx::ZERO };
        let inv_inertia = if dynamic && !def.fixed_rotation && !inertia.is_zero() {
            Fx::ONE / inertia
        } else {
            Fx::ZERO
        };
        Self {
            id,
            label: format!("{:08x}", def.entity.raw()),
            kind: def.kind,
            shape: def.shape,
            position: def.position,
            velocity: def.velocity,
            rotation: def.rotation,
            angular_velocity: def.angular_velocity,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            restitution: def.restitution,
            friction: def.friction,
            layer: def.layer,
            mask: def.mask,
            sensor: def.sensor,
            fixed_rotation: def.fixed_rotation,
            sleeping: false,
            sleep_frames: 0,
            force: Vec2::ZERO,
            entity: def.entity,
            bounding_radius: def.shape.bounding_radius(),
        }
    }

    /// Body identifier.
    #[must_use]
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Owning entity.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Simulation role.
    #[must_use]
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Collision shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Teleports the body. Does not wake it; teleporting sleeping scenery is
    /// a legitimate authoring operation.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Current velocity.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Writes the velocity. Any change to a non-zero value wakes the body.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        if velocity != self.velocity && !velocity.is_zero() {
            self.wake();
        }
        self.velocity = velocity;
    }

    /// Current rotation in radians.
    #[must_use]
    pub fn rotation(&self) -> Fx {
        self.rotation
    }

    /// Sets the rotation.
    pub fn set_rotation(&mut self, rotation: Fx) {
        self.rotation = rotation;
    }

    /// Current angular velocity.
    #[must_use]
    pub fn angular_velocity(&self) -> Fx {
        self.angular_velocity
    }

    /// Writes the angular velocity; a change to non-zero wakes the body.
    pub fn set_angular_velocity(&mut self, omega: Fx) {
        if omega != self.angular_velocity && !omega.is_zero() {
            self.wake();
        }
        self.angular_velocity = omega;
    }

    /// Mass; zero for static and kinematic bodies.
    #[must_use]
    pub fn mass(&self) -> Fx {
        self.mass
    }

    /// Reciprocal mass; zero for static and kinematic bodies.
    #[must_use]
    pub fn inv_mass(&self) -> Fx {
        self.inv_mass
    }

    /// Moment of inertia; zero for non-dynamic bodies.
    #[must_use]
    pub fn inertia(&self) -> Fx {
        self.inertia
    }

    /// Reciprocal inertia; zero for non-dynamic or rotation-locked bodies.
    #[must_use]
    pub fn inv_inertia(&self) -> Fx {
        self.inv_inertia
    }

    /// Restitution coefficient.
    #[must_use]
    pub fn restitution(&self) -> Fx {
        self.restitution
    }

    /// Friction coefficient.
    #[must_use]
    pub fn friction(&self) -> Fx {
        self.friction
    }

    /// Collision layer bits.
    #[must_use]
    pub fn layer(&self) -> u16 {
        self.layer
    }

    /// Collision mask bits.
    #[must_use]
    pub fn mask(&self) -> u16 {
        self.mask
    }

    /// Whether the body is a sensor.
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Whether the body is currently asleep.
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Deterministic iteration label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Applies an instantaneous impulse to a dynamic body and wakes it.
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if self.inv_mass.is_zero() || impulse.is_zero() {
            return;
        }
        self.wake();
        self.velocity = self.velocity + impulse.scale(self.inv_mass);
    }

    /// Accumulates a force for the next integration step and wakes the body.
    pub fn apply_force(&mut self, force: Vec2) {
        if self.inv_mass.is_zero() || force.is_zero() {
            return;
        }
        self.wake();
        self.force = self.force + force;
    }

    /// Clears the sleep flag and counter.
    pub fn wake(&mut self) {
        self.sleeping = false;
        self.sleep_frames = 0;
    }
}

fn shape_inertia(shape: Shape, mass: Fx) -> Fx {
    match shape {
        // Solid disc: m·r²/2.
        Shape::Circle { radius } => mass * radius * radius / Fx::from_int(2),
        // Solid rectangle: m·(w² + h²)/12 over full extents.
        Shape::Rect { half_w, half_h } => {
            let w = half_w + half_w;
            let h = half_h + half_h;
            mass * (w * w + h * h) / Fx::from_int(12)
        }
    }
}
