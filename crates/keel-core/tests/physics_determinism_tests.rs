// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

use keel_core::ident::Entity;
use keel_core::math::{Fx, Vec2};
use keel_core::physics::{BodyDef, BodyKind, PhysicsConfig, PhysicsWorld, Shape, SpatialHash};
use proptest::prelude::*;

fn fxn(v: f64) -> Fx {
    Fx::from_num(v)
}

fn falling_stack() -> PhysicsWorld {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    world.insert(BodyDef {
        kind: BodyKind::Static,
        shape: Shape::Rect {
            half_w: fxn(20.0),
            half_h: fxn(1.0),
        },
        position: Vec2::new(Fx::ZERO, fxn(-1.0)),
        entity: Entity::from_raw(1),
        ..BodyDef::default()
    });
    for i in 0..6_u32 {
        world.insert(BodyDef {
            shape: Shape::Circle { radius: fxn(0.5) },
            position: Vec2::new(
                fxn(f64::from(i % 3) * 0.9 - 1.0),
                fxn(f64::from(i / 3) * 1.5 + 2.0),
            ),
            mass: Fx::ONE,
            restitution: fxn(0.3),
            friction: fxn(0.2),
            entity: Entity::from_raw(10 + i),
            ..BodyDef::default()
        });
    }
    world
}

#[test]
fn identical_worlds_stay_bit_identical() {
    let mut a = falling_stack();
    let mut b = falling_stack();
    let dt = Fx::ONE / Fx::from_int(60);

    for step in 0..240 {
        a.step(dt);
        b.step(dt);
        for (ba, bb) in a.bodies().zip(b.bodies()) {
            assert_eq!(ba.position(), bb.position(), "step {step}");
            assert_eq!(ba.velocity(), bb.velocity(), "step {step}");
            assert_eq!(ba.rotation(), bb.rotation(), "step {step}");
            assert_eq!(ba.is_sleeping(), bb.is_sleeping(), "step {step}");
        }
    }
}

#[test]
fn events_are_identical_across_twin_runs() {
    let mut a = falling_stack();
    let mut b = falling_stack();
    let dt = Fx::ONE / Fx::from_int(60);
    for _ in 0..120 {
        a.step(dt);
        b.step(dt);
        assert_eq!(a.events(), b.events());
    }
}

proptest! {
    /// Invariant: the broad phase visits each pair at most once, for any
    /// body configuration and any cell size.
    #[test]
    fn broad_phase_emits_each_pair_exactly_once(
        positions in proptest::collection::vec((-2000.0_f64..2000.0, -2000.0_f64..2000.0), 1..40),
        radii in proptest::collection::vec(0.5_f64..150.0, 40),
        cell in 8.0_f64..128.0,
    ) {
        let mut grid = SpatialHash::new(Fx::from_num(cell));
        let bodies: Vec<(Vec2, Fx)> = positions
            .iter()
            .zip(&radii)
            .map(|(&(x, y), &r)| (Vec2::new(Fx::from_num(x), Fx::from_num(y)), Fx::from_num(r)))
            .collect();
        grid.rebuild(&bodies);

        let mut pairs = Vec::new();
        grid.pairs(&mut pairs);

        let mut seen = std::collections::BTreeSet::new();
        for &(a, b) in &pairs {
            prop_assert!(a != b, "self pair");
            let key = (a.min(b), a.max(b));
            prop_assert!(seen.insert(key), "duplicate pair {key:?}");
        }
    }

    /// Neighbouring bodies are always offered to the narrow phase: any two
    /// regular bodies within one cell of each other appear as a candidate.
    #[test]
    fn broad_phase_never_misses_adjacent_bodies(
        ax in -500.0_f64..500.0, ay in -500.0_f64..500.0,
        dx in -60.0_f64..60.0, dy in -60.0_f64..60.0,
    ) {
        let cell = Fx::from_int(64);
        let mut grid = SpatialHash::new(cell);
        let bodies = vec![
            (Vec2::new(Fx::from_num(ax), Fx::from_num(ay)), Fx::ONE),
            (Vec2::new(Fx::from_num(ax + dx), Fx::from_num(ay + dy)), Fx::ONE),
        ];
        grid.rebuild(&bodies);
        let mut pairs = Vec::new();
        grid.pairs(&mut pairs);
        prop_assert_eq!(pairs, vec![(0, 1)]);
    }
}
