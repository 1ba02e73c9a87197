// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! The 2D physics world and its step loop.
//!
//! Ordering determinism:
//! - At the start of each step the body list is stably sorted by label
//!   (zero-padded entity hex), so iteration order survives restores.
//! - Candidate pairs are processed in grid emission order.
//! - Contact events are sorted by `(label_a, label_b)` before exposure;
//!   because pairs are slot-normalised and slots are label-sorted, that is a
//!   plain `(slot_a, slot_b)` sort.

use rustc_hash::FxHashMap;

use crate::ident::Entity;
use crate::math::{Fx, Vec2};

use super::body::{Body, BodyDef, BodyId, BodyKind};
use super::broadphase::SpatialHash;
use super::narrowphase::{collide, Contact};
use super::resolver::{apply_impulses, correct_positions, pair_mut};

/// Physics tuning parameters.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// World gravity in units per second squared.
    pub gravity: Vec2,
    /// Broad-phase cell size in world units.
    pub cell_size: Fx,
    /// Linear velocity decay factor per tick.
    pub linear_damping: Fx,
    /// Angular velocity decay factor per tick.
    pub angular_damping: Fx,
    /// Penetration allowance under which positional correction is skipped.
    pub slop: Fx,
    /// Linear speed below which velocity snaps to zero.
    pub velocity_clamp: Fx,
    /// Linear/angular speed below which the sleep counter runs.
    pub sleep_threshold: Fx,
    /// Consecutive below-threshold frames before a body sleeps.
    pub sleep_frames: u16,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(Fx::ZERO, Fx::from_int(-10)),
            cell_size: Fx::from_int(64),
            linear_damping: Fx::from_num(0.1),
            angular_damping: Fx::from_num(0.1),
            slop: Fx::from_num(0.01),
            velocity_clamp: Fx::from_num(0.05),
            sleep_threshold: Fx::from_num(0.12),
            sleep_frames: 20,
        }
    }
}

/// A contact reported to game handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEvent {
    /// First body, lower label.
    pub body_a: BodyId,
    /// Second body, higher label.
    pub body_b: BodyId,
    /// Entity owning body A.
    pub entity_a: Entity,
    /// Entity owning body B.
    pub entity_b: Entity,
    /// Contact normal from A toward B.
    pub normal: Vec2,
    /// Contact point.
    pub point: Vec2,
    /// Penetration depth at detection time.
    pub depth: Fx,
    /// `true` when either body is a sensor; such contacts are reported but
    /// never resolved.
    pub sensor: bool,
}

/// Deterministic 2D physics world.
#[derive(Debug)]
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: Vec<Body>,
    next_id: u32,
    index: FxHashMap<BodyId, usize>,
    entity_index: FxHashMap<u32, BodyId>,
    grid: SpatialHash,
    pair_buf: Vec<(usize, usize)>,
    events: Vec<ContactEvent>,
}

impl PhysicsWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(config: PhysicsConfig) -> Self {
        let grid = SpatialHash::new(config.cell_size);
        Self {
            config,
            bodies: Vec::new(),
            next_id: 1,
            index: FxHashMap::default(),
            entity_index: FxHashMap::default(),
            grid,
            pair_buf: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Current tuning parameters.
    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Inserts a body and returns its id.
    pub fn insert(&mut self, def: BodyDef) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        let body = Body::new(id, def);
        self.entity_index.insert(body.entity.raw(), id);
        self.index.insert(id, self.bodies.len());
        self.bodies.push(body);
        id
    }

    /// Removes a body. Returns `false` when the id is unknown.
    pub fn remove(&mut self, id: BodyId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        let body = self.bodies.swap_remove(slot);
        self.entity_index.remove(&body.entity.raw());
        if let Some(moved) = self.bodies.get(slot) {
            self.index.insert(moved.id, slot);
        }
        true
    }

    /// Shared access to a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.index.get(&id).map(|&slot| &self.bodies[slot])
    }

    /// Mutable access to a body.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let slot = *self.index.get(&id)?;
        Some(&mut self.bodies[slot])
    }

    /// The body owned by an entity, when one exists.
    #[must_use]
    pub fn body_for_entity(&self, entity: Entity) -> Option<BodyId> {
        self.entity_index.get(&entity.raw()).copied()
    }

    /// Iterates bodies in current storage order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns `true` when the world holds no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Wakes every body.
    ///
    /// Called after a snapshot restore: a receiver that kept a body asleep
    /// while the authority set it moving would silently diverge.
    pub fn wake_all(&mut self) {
        for body in &mut self.bodies {
            body.wake();
        }
    }

    /// Contact events produced by the last step, `(label_a, label_b)`
    /// sorted.
    #[must_use]
    pub fn events(&self) -> &[ContactEvent] {
        &self.events
    }

    /// Drains the last step's contact events.
    pub fn take_events(&mut self) -> Vec<ContactEvent> {
        core::mem::take(&mut self.events)
    }

    /// Advances the world by one fixed timestep.
    pub fn step(&mut self, dt: Fx) {
        self.sort_bodies();
        self.integrate_forces(dt);
        self.collide_and_resolve();
        self.integrate_positions(dt);
        self.clamp_and_sleep();
    }

    /// Stable label sort; rebuilds the id → slot map.
    fn sort_bodies(&mut self) {
        self.bodies.sort_by(|a, b| a.label.cmp(&b.label));
        self.index.clear();
        for (slot, body) in self.bodies.iter().enumerate() {
            self.index.insert(body.id, slot);
        }
    }

    fn integrate_forces(&mut self, dt: Fx) {
        let gravity = self.config.gravity;
        let lin_keep = Fx::ONE - self.config.linear_damping;
        let ang_keep = Fx::ONE - self.config.angular_damping;
        for body in &mut self.bodies {
            if body.kind != BodyKind::Dynamic || body.sleeping {
                body.force = Vec2::ZERO;
                continue;
            }
            let accel = gravity + body.force.scale(body.inv_mass);
            body.velocity = body.velocity + accel.scale(dt);
            body.velocity = body.velocity.scale(lin_keep);
            body.angular_velocity = body.angular_velocity * ang_keep;
            body.force = Vec2::ZERO;
        }
    }

    fn collide_and_resolve(&mut self) {
        let placements: Vec<(Vec2, Fx)> = self
            .bodies
            .iter()
            .map(|b| (b.position, b.bounding_radius))
            .collect();
        self.grid.rebuild(&placements);
        let mut pairs = core::mem::take(&mut self.pair_buf);
        self.grid.pairs(&mut pairs);

        let mut staged: Vec<((usize, usize), ContactEvent)> = Vec::new();
        for &(i, j) in &pairs {
            let (a, b) = (&self.bodies[i], &self.bodies[j]);
            if a.kind == BodyKind::Static && b.kind == BodyKind::Static {
                continue;
            }
            if (a.mask & b.layer) == 0 || (b.mask & a.layer) == 0 {
                continue;
            }
            let Some(contact) = collide(a, b) else {
                continue;
            };
            let sensor = a.sensor || b.sensor;
            staged.push(((i, j), make_event(a, b, &contact, sensor)));
            if sensor {
                continue;
            }
            let slop = self.config.slop;
            let (a, b) = pair_mut(&mut self.bodies, i, j);
            correct_positions(a, b, &contact, slop);
            apply_impulses(a, b, &contact);
        }
        self.pair_buf = pairs;

        // Slot order is label order, so a slot-pair sort is the
        // (label_a, label_b) sort the dispatch contract asks for.
        staged.sort_by_key(|&(key, _)| key);
        self.events = staged.into_iter().map(|(_, event)| event).collect();
    }

    fn integrate_positions(&mut self, dt: Fx) {
        for body in &mut self.bodies {
            if body.kind == BodyKind::Static || body.sleeping {
                continue;
            }
            body.position = body.position + body.velocity.scale(dt);
            if !body.fixed_rotation {
                body.rotation = body.rotation + body.angular_velocity * dt;
            }
        }
    }

    fn clamp_and_sleep(&mut self) {
        let clamp = self.config.velocity_clamp;
        let clamp2 = (i64::from(clamp.raw()) * i64::from(clamp.raw())) >> 16;
        let thr = self.config.sleep_threshold;
        let thr2 = (i64::from(thr.raw()) * i64::from(thr.raw())) >> 16;
        let limit = self.config.sleep_frames;

        for body in &mut self.bodies {
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            if !body.velocity.is_zero() && body.velocity.length_squared() < clamp2 {
                body.velocity = Vec2::ZERO;
            }

            let omega2 =
                (i64::from(body.angular_velocity.raw()) * i64::from(body.angular_velocity.raw()))
                    >> 16;
            if body.velocity.length_squared() < thr2 && omega2 < thr2 {
                body.sleep_frames = body.sleep_frames.saturating_add(1);
                if body.sleep_frames >= limit && !body.sleeping {
                    body.sleeping = true;
                    body.velocity = Vec2::ZERO;
                    body.angular_velocity = Fx::ZERO;
                }
            } else {
                body.sleep_frames = 0;
            }
        }
    }
}

fn make_event(a: &Body, b: &Body, contact: &Contact, sensor: bool) -> ContactEvent {
    ContactEvent {
        body_a: a.id,
        body_b: b.id,
        entity_a: a.entity,
        entity_b: b.entity,
        normal: contact.normal,
        point: contact.point,
        depth: contact.depth,
        sensor,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::physics::shape::Shape;

    fn fx(v: f64) -> Fx {
        Fx::from_num(v)
    }

    fn no_gravity() -> PhysicsConfig {
        PhysicsConfig {
            gravity: Vec2::ZERO,
            linear_damping: Fx::ZERO,
            angular_damping: Fx::ZERO,
            ..PhysicsConfig::default()
        }
    }

    fn circle(world: &mut PhysicsWorld, entity: u32, x: f64, y: f64, vx: f64) -> BodyId {
        world.insert(BodyDef {
            shape: Shape::Circle { radius: fx(0.5) },
            position: Vec2::new(fx(x), fx(y)),
            velocity: Vec2::new(fx(vx), Fx::ZERO),
            mass: Fx::ONE,
            entity: Entity::from_raw(entity),
            ..BodyDef::default()
        })
    }

    fn static_square(world: &mut PhysicsWorld, entity: u32, x: f64, y: f64, half: f64) -> BodyId {
        world.insert(BodyDef {
            kind: BodyKind::Static,
            shape: Shape::Rect {
                half_w: fx(half),
                half_h: fx(half),
            },
            position: Vec2::new(fx(x), fx(y)),
            entity: Entity::from_raw(entity),
            ..BodyDef::default()
        })
    }

    #[test]
    fn circle_against_static_box_does_not_tunnel() {
        let mut world = PhysicsWorld::new(no_gravity());
        static_square(&mut world, 1, 0.0, 0.0, 2.0);
        let ball = circle(&mut world, 2, 2.5, 0.0, -1.0);

        world.step(Fx::ONE / Fx::from_int(60));

        let b = world.body(ball).unwrap();
        // Velocity along the face normal must not keep approaching.
        assert!(b.velocity().x >= Fx::ZERO, "vx = {}", b.velocity().x);
        // Remaining penetration stays within slop.
        let penetration = fx(2.5) - b.position().x;
        assert!(penetration <= world.config().slop, "pen {penetration}");
    }

    #[test]
    fn sensors_never_move_or_take_velocity() {
        let mut world = PhysicsWorld::new(no_gravity());
        let sensor = world.insert(BodyDef {
            shape: Shape::Circle { radius: fx(1.0) },
            position: Vec2::new(fx(0.4), Fx::ZERO),
            sensor: true,
            mass: Fx::ONE,
            entity: Entity::from_raw(1),
            ..BodyDef::default()
        });
        let mover = circle(&mut world, 2, -0.4, 0.0, 1.0);

        world.step(Fx::ONE / Fx::from_int(60));

        let s = world.body(sensor).unwrap();
        assert_eq!(s.position(), Vec2::new(fx(0.4), Fx::ZERO));
        assert_eq!(s.velocity(), Vec2::ZERO);
        let m = world.body(mover).unwrap();
        assert_eq!(m.velocity().x, Fx::ONE, "sensor absorbs nothing");

        let events = world.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].sensor);
    }

    #[test]
    fn resting_body_sleeps_after_the_threshold_run() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        static_square(&mut world, 1, 0.0, 0.0, 1.0);
        let ball = world.insert(BodyDef {
            shape: Shape::Circle { radius: fx(1.0) },
            position: Vec2::new(Fx::ZERO, fx(5.0)),
            mass: Fx::ONE,
            entity: Entity::from_raw(2),
            ..BodyDef::default()
        });

        let dt = Fx::ONE / Fx::from_int(60);
        for _ in 0..300 {
            world.step(dt);
        }

        let b = world.body(ball).unwrap();
        assert!(b.is_sleeping(), "body rests after 300 steps");
        assert_eq!(b.velocity(), Vec2::ZERO);
        assert!(b.position().y > Fx::ONE && b.position().y < Fx::from_int(3));
    }

    #[test]
    fn wake_all_clears_sleep_state() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        static_square(&mut world, 1, 0.0, 0.0, 1.0);
        let ball = world.insert(BodyDef {
            shape: Shape::Circle { radius: fx(1.0) },
            position: Vec2::new(Fx::ZERO, fx(2.0)),
            mass: Fx::ONE,
            entity: Entity::from_raw(2),
            ..BodyDef::default()
        });
        let dt = Fx::ONE / Fx::from_int(60);
        for _ in 0..120 {
            world.step(dt);
        }
        assert!(world.body(ball).unwrap().is_sleeping());

        world.wake_all();
        assert!(!world.body(ball).unwrap().is_sleeping());
    }

    #[test]
    fn layer_mask_filters_pairs() {
        let mut world = PhysicsWorld::new(no_gravity());
        world.insert(BodyDef {
            shape: Shape::Circle { radius: fx(1.0) },
            position: Vec2::ZERO,
            layer: 0b01,
            mask: 0b01,
            mass: Fx::ONE,
            entity: Entity::from_raw(1),
            ..BodyDef::default()
        });
        world.insert(BodyDef {
            shape: Shape::Circle { radius: fx(1.0) },
            position: Vec2::new(fx(0.5), Fx::ZERO),
            layer: 0b10,
            mask: 0b10,
            mass: Fx::ONE,
            entity: Entity::from_raw(2),
            ..BodyDef::default()
        });

        world.step(Fx::ONE / Fx::from_int(60));
        assert!(world.events().is_empty(), "masked-out pair produces nothing");
    }

    #[test]
    fn events_are_label_sorted() {
        let mut world = PhysicsWorld::new(no_gravity());
        // Three overlapping circles; entity ids fix the label order.
        circle(&mut world, 30, 0.0, 0.0, 0.0);
        circle(&mut world, 10, 0.3, 0.0, 0.0);
        circle(&mut world, 20, -0.3, 0.0, 0.0);

        world.step(Fx::ONE / Fx::from_int(60));
        let events = world.events();
        assert_eq!(events.len(), 3);
        let mut keys: Vec<(u32, u32)> = events
            .iter()
            .map(|e| (e.entity_a.raw(), e.entity_b.raw()))
            .collect();
        let sorted = {
            let mut s = keys.clone();
            s.sort_unstable();
            s
        };
        assert_eq!(keys, sorted);
        keys.dedup();
        assert_eq!(keys.len(), 3, "each pair reported once");
    }
}
