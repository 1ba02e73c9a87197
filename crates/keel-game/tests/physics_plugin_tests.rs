// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;

use keel_core::math::{Fx, Vec2};
use keel_core::physics::PhysicsConfig;
use keel_core::scheduler::Scheduler;
use keel_core::store::{ComponentStore, EntityTypeId, FieldValue};
use keel_core::{World, WorldConfig};
use keel_game::{install_physics, register_components, CollisionHandlers, CoreComponents};

struct Rig {
    world: World,
    scheduler: Scheduler,
    components: CoreComponents,
    ball: EntityTypeId,
    wall: EntityTypeId,
}

fn rig(handlers: CollisionHandlers) -> Rig {
    let mut world = World::new(WorldConfig {
        physics: PhysicsConfig {
            gravity: Vec2::ZERO,
            linear_damping: Fx::ZERO,
            angular_damping: Fx::ZERO,
            ..PhysicsConfig::default()
        },
        ..WorldConfig::default()
    });
    let components = register_components(&mut world.store).unwrap();
    let ball = ComponentStore::define_entity("ball")
        .component(components.transform)
        .component(components.rigid_body)
        .register(&mut world.store)
        .unwrap();
    let wall = ComponentStore::define_entity("wall")
        .component(components.transform)
        .component(components.rigid_body)
        .register(&mut world.store)
        .unwrap();

    let mut scheduler = Scheduler::new();
    install_physics(&mut scheduler, &world.store, components, handlers).unwrap();

    Rig {
        world,
        scheduler,
        components,
        ball,
        wall,
    }
}

fn spawn_ball(rig: &mut Rig, x: f64, vx: f64) -> keel_core::ident::Entity {
    rig.world
        .store
        .spawn(
            rig.ball,
            &[
                ("transform2d", "x", FieldValue::Num(x)),
                ("rigid_body", "vx", FieldValue::Num(vx)),
                ("rigid_body", "radius", FieldValue::Num(0.5)),
            ],
        )
        .unwrap()
}

fn spawn_wall(rig: &mut Rig, x: f64) -> keel_core::ident::Entity {
    rig.world
        .store
        .spawn(
            rig.wall,
            &[
                ("transform2d", "x", FieldValue::Num(x)),
                ("rigid_body", "kind", FieldValue::U8(0)),
                ("rigid_body", "shape", FieldValue::U8(1)),
                ("rigid_body", "half_w", FieldValue::Num(1.0)),
                ("rigid_body", "half_h", FieldValue::Num(4.0)),
            ],
        )
        .unwrap()
}

#[test]
fn bodies_are_created_and_positions_mirror_out() {
    let mut rig = rig(CollisionHandlers::new());
    let ball = spawn_ball(&mut rig, 0.0, 1.0);

    rig.scheduler.run_tick(&mut rig.world).unwrap();

    let body = rig.world.physics.body_for_entity(ball).unwrap();
    assert!(rig.world.physics.body(body).is_some());

    // One tick at 30 Hz moves the ball 1/30 along +x, and the store sees it.
    let x = rig
        .world
        .store
        .fixed(ball, rig.components.transform, "x")
        .unwrap();
    assert_eq!(x, Fx::ONE / Fx::from_int(30));
}

#[test]
fn dead_entities_lose_their_bodies() {
    let mut rig = rig(CollisionHandlers::new());
    let ball = spawn_ball(&mut rig, 0.0, 0.0);
    rig.scheduler.run_tick(&mut rig.world).unwrap();
    assert!(rig.world.physics.body_for_entity(ball).is_some());

    rig.world.store.destroy(ball);
    rig.scheduler.run_tick(&mut rig.world).unwrap();
    assert!(rig.world.physics.body_for_entity(ball).is_none());
    assert!(rig.world.physics.is_empty());
}

#[test]
fn cross_type_handlers_fire_once_per_direction() {
    let log: Rc<RefCell<Vec<(&'static str, u32, u32)>>> = Rc::new(RefCell::new(Vec::new()));

    let mut handlers = CollisionHandlers::new();
    {
        let log = Rc::clone(&log);
        // Register after types exist: build a rig first to learn ids, then
        // rebuild with the handler attached.
        let probe = rig(CollisionHandlers::new());
        let (ball_t, wall_t) = (probe.ball, probe.wall);
        handlers.register(ball_t, wall_t, move |_world, a, b, _event| {
            log.borrow_mut().push(("ball-wall", a.raw(), b.raw()));
        });
    }

    let mut rig = rig(handlers);
    let ball = spawn_ball(&mut rig, 1.2, -1.0);
    let wall = spawn_wall(&mut rig, 0.0);

    rig.scheduler.run_tick(&mut rig.world).unwrap();

    let calls = log.borrow();
    assert_eq!(calls.len(), 1, "directional key fires once");
    assert_eq!(calls[0], ("ball-wall", ball.raw(), wall.raw()));
}

#[test]
fn same_type_handlers_fire_twice_with_swapped_arguments() {
    let log: Rc<RefCell<Vec<(u32, u32)>>> = Rc::new(RefCell::new(Vec::new()));

    let mut handlers = CollisionHandlers::new();
    {
        let log = Rc::clone(&log);
        let probe = rig(CollisionHandlers::new());
        let ball_t = probe.ball;
        handlers.register(ball_t, ball_t, move |_world, a, b, _event| {
            log.borrow_mut().push((a.raw(), b.raw()));
        });
    }

    let mut rig = rig(handlers);
    let a = spawn_ball(&mut rig, 0.0, 0.0);
    let b = spawn_ball(&mut rig, 0.6, 0.0);

    rig.scheduler.run_tick(&mut rig.world).unwrap();

    let calls = log.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], (a.raw(), b.raw()));
    assert_eq!(calls[1], (b.raw(), a.raw()));
}

#[test]
fn sensors_report_without_resolving() {
    let log: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));

    let mut handlers = CollisionHandlers::new();
    {
        let log = Rc::clone(&log);
        let probe = rig(CollisionHandlers::new());
        let ball_t = probe.ball;
        handlers.register(ball_t, ball_t, move |_world, _a, _b, event| {
            log.borrow_mut().push(event.sensor);
        });
    }

    let mut rig = rig(handlers);
    let sensor = rig
        .world
        .store
        .spawn(
            rig.ball,
            &[
                ("transform2d", "x", FieldValue::Num(0.0)),
                ("rigid_body", "sensor", FieldValue::Bool(true)),
            ],
        )
        .unwrap();
    spawn_ball(&mut rig, 0.4, 0.0);

    rig.scheduler.run_tick(&mut rig.world).unwrap();

    assert_eq!(*log.borrow(), vec![true, true], "both swapped calls see a sensor contact");
    // The sensor itself never moved.
    let x = rig
        .world
        .store
        .fixed(sensor, rig.components.transform, "x")
        .unwrap();
    assert_eq!(x, Fx::ZERO);
}
