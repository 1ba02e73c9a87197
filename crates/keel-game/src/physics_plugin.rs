// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Physics plugin: keeps physics bodies mirrored against `rigid_body`
//! components and dispatches collision events to gameplay handlers.
//!
//! Three systems, one per phase:
//! - `prePhysics` — create bodies for new entities, drop bodies whose entity
//!   died, and mirror authored transform/velocity changes in. Mirror-in
//!   writes only when the value actually changed, so resting bodies are not
//!   woken by the copy itself.
//! - `physics` — step the world by the fixed tick delta.
//! - `postPhysics` — mirror positions and velocities out to the store, then
//!   dispatch the step's label-sorted contact events.

use keel_core::ident::Entity;
use keel_core::math::{Fx, Vec2};
use keel_core::physics::{BodyDef, BodyId, BodyKind, Shape};
use keel_core::scheduler::{Phase, Scheduler};
use keel_core::store::{ComponentId, ComponentStore, StoreError};
use keel_core::World;

use crate::collision::CollisionHandlers;
use crate::components::{body_kind, shape_kind, CoreComponents};

#[derive(Debug, Clone, Copy)]
struct TransformSlots {
    x: usize,
    y: usize,
    angle: usize,
}

#[derive(Debug, Clone, Copy)]
struct BodySlots {
    radius: usize,
    half_w: usize,
    half_h: usize,
    mass: usize,
    restitution: usize,
    friction: usize,
    vx: usize,
    vy: usize,
    angular_velocity: usize,
    layer: usize,
    mask: usize,
}

fn slot(
    store: &ComponentStore,
    component: ComponentId,
    field: &str,
) -> Result<usize, StoreError> {
    store
        .component_def(component)
        .field_index(field)
        .ok_or_else(|| StoreError::UnknownField {
            component: store.component_def(component).name().to_owned(),
            field: field.to_owned(),
        })
}

/// Installs the three physics systems onto the scheduler.
///
/// `handlers` moves into the `postPhysics` system; collision responses must
/// be registered before installation so they replay during resimulation.
pub fn install_physics(
    scheduler: &mut Scheduler,
    store: &ComponentStore,
    components: CoreComponents,
    mut handlers: CollisionHandlers,
) -> Result<(), StoreError> {
    let transform = components.transform;
    let rigid_body = components.rigid_body;
    let t = TransformSlots {
        x: slot(store, transform, "x")?,
        y: slot(store, transform, "y")?,
        angle: slot(store, transform, "angle")?,
    };
    let b = BodySlots {
        radius: slot(store, rigid_body, "radius")?,
        half_w: slot(store, rigid_body, "half_w")?,
        half_h: slot(store, rigid_body, "half_h")?,
        mass: slot(store, rigid_body, "mass")?,
        restitution: slot(store, rigid_body, "restitution")?,
        friction: slot(store, rigid_body, "friction")?,
        vx: slot(store, rigid_body, "vx")?,
        vy: slot(store, rigid_body, "vy")?,
        angular_velocity: slot(store, rigid_body, "angular_velocity")?,
        layer: slot(store, rigid_body, "layer")?,
        mask: slot(store, rigid_body, "mask")?,
    };

    scheduler.add_system(Phase::PrePhysics, "mirror_bodies_in", move |world| {
        mirror_in(world, transform, rigid_body, t, b)
    });

    scheduler.add_system(Phase::Physics, "step_physics", |world| {
        let dt = world.dt();
        world.physics.step(dt);
        Ok(())
    });

    scheduler.add_system(Phase::PostPhysics, "mirror_bodies_out", move |world| {
        mirror_out(world, transform, rigid_body, t, b)?;
        for event in world.physics.take_events() {
            handlers.dispatch(world, &event);
        }
        Ok(())
    });

    Ok(())
}

fn mirror_in(
    world: &mut World,
    transform: ComponentId,
    rigid_body: ComponentId,
    t: TransformSlots,
    b: BodySlots,
) -> Result<(), keel_core::StepError> {
    // Bodies whose entity died since the last tick go away first.
    let dead: Vec<BodyId> = world
        .physics
        .bodies()
        .filter(|body| !world.store.is_live(body.entity()))
        .map(keel_core::physics::Body::id)
        .collect();
    for id in dead {
        world.physics.remove(id);
    }

    for entity in world.store.query(&[rigid_body, transform]) {
        let position = Vec2::new(
            world.store.fixed_at(entity, transform, t.x)?,
            world.store.fixed_at(entity, transform, t.y)?,
        );
        let rotation = world.store.fixed_at(entity, transform, t.angle)?;
        let velocity = Vec2::new(
            world.store.fixed_at(entity, rigid_body, b.vx)?,
            world.store.fixed_at(entity, rigid_body, b.vy)?,
        );
        let omega = world.store.fixed_at(entity, rigid_body, b.angular_velocity)?;

        match world.physics.body_for_entity(entity) {
            None => {
                let def = body_def_from_store(world, entity, rigid_body, b, position, rotation)?;
                world.physics.insert(BodyDef {
                    velocity,
                    angular_velocity: omega,
                    ..def
                });
            }
            Some(id) => {
                if let Some(body) = world.physics.body_mut(id) {
                    if body.position() != position {
                        body.set_position(position);
                    }
                    if body.rotation() != rotation {
                        body.set_rotation(rotation);
                    }
                    body.set_velocity(velocity);
                    body.set_angular_velocity(omega);
                }
            }
        }
    }
    Ok(())
}

fn body_def_from_store(
    world: &World,
    entity: Entity,
    rigid_body: ComponentId,
    b: BodySlots,
    position: Vec2,
    rotation: Fx,
) -> Result<BodyDef, keel_core::StepError> {
    let kind = match world.store.byte(entity, rigid_body, "kind")? {
        body_kind::STATIC => BodyKind::Static,
        body_kind::KINEMATIC => BodyKind::Kinematic,
        _ => BodyKind::Dynamic,
    };
    let shape = if world.store.byte(entity, rigid_body, "shape")? == shape_kind::RECT {
        Shape::Rect {
            half_w: world.store.fixed_at(entity, rigid_body, b.half_w)?,
            half_h: world.store.fixed_at(entity, rigid_body, b.half_h)?,
        }
    } else {
        Shape::Circle {
            radius: world.store.fixed_at(entity, rigid_body, b.radius)?,
        }
    };
    Ok(BodyDef {
        kind,
        shape,
        position,
        rotation,
        mass: world.store.fixed_at(entity, rigid_body, b.mass)?,
        restitution: world.store.fixed_at(entity, rigid_body, b.restitution)?,
        friction: world.store.fixed_at(entity, rigid_body, b.friction)?,
        layer: world.store.fixed_at(entity, rigid_body, b.layer)?.to_int() as u16,
        mask: world.store.fixed_at(entity, rigid_body, b.mask)?.to_int() as u16,
        sensor: world.store.flag(entity, rigid_body, "sensor")?,
        fixed_rotation: world.store.flag(entity, rigid_body, "fixed_rotation")?,
        entity,
        ..BodyDef::default()
    })
}

fn mirror_out(
    world: &mut World,
    transform: ComponentId,
    rigid_body: ComponentId,
    t: TransformSlots,
    b: BodySlots,
) -> Result<(), keel_core::StepError> {
    for entity in world.store.query(&[rigid_body, transform]) {
        let Some(id) = world.physics.body_for_entity(entity) else {
            continue;
        };
        let Some(body) = world.physics.body(id) else {
            continue;
        };
        let position = body.position();
        let rotation = body.rotation();
        let velocity = body.velocity();
        let omega = body.angular_velocity();

        world.store.set_fixed_at(entity, transform, t.x, position.x)?;
        world.store.set_fixed_at(entity, transform, t.y, position.y)?;
        world.store.set_fixed_at(entity, transform, t.angle, rotation)?;
        world.store.set_fixed_at(entity, rigid_body, b.vx, velocity.x)?;
        world.store.set_fixed_at(entity, rigid_body, b.vy, velocity.y)?;
        world
            .store
            .set_fixed_at(entity, rigid_body, b.angular_velocity, omega)?;
    }
    Ok(())
}
