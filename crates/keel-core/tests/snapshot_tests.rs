// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{fixture, input};
use keel_core::ident::Entity;
use keel_core::math::{Fx, Vec2};
use keel_core::physics::{BodyDef, Shape};
use keel_core::snapshot::SnapshotError;
use keel_core::store::{ComponentStore, FieldDef, FieldValue};
use keel_core::{World, WorldConfig};

#[test]
fn sparse_snapshot_restores_ids_in_order() {
    // Build a world whose live ids are sparse, encode, decode into a fresh
    // world with the same definitions, and expect identical ids and values.
    let mut fx = fixture();
    let mut kept = Vec::new();
    let mut spawned = Vec::new();
    for i in 0..8 {
        let e = fx
            .world
            .store
            .spawn(
                fx.crate_type,
                &[("transform2d", "x", FieldValue::Num(f64::from(i)))],
            )
            .unwrap();
        spawned.push(e);
    }
    for (i, &e) in spawned.iter().enumerate() {
        if [1, 3, 7].contains(&i) {
            kept.push(e);
        } else {
            fx.world.store.destroy(e);
        }
    }

    let snapshot = fx.world.snapshot();

    let mut other = fixture();
    other.world.restore(&snapshot).unwrap();

    let hits = other.world.store.query(&[other.transform]);
    assert_eq!(hits, kept, "ascending id order with the original ids");
    for (i, &e) in hits.iter().enumerate() {
        let expected = [1.0, 3.0, 7.0][i];
        assert_eq!(
            other.world.store.fixed(e, other.transform, "x").unwrap(),
            Fx::from_num(expected)
        );
    }
}

#[test]
fn encode_decode_encode_is_byte_identical() {
    let mut fx = fixture();
    fx.spawn_player("alice", 1.5);
    fx.spawn_player("bob", -4.0);
    fx.world
        .store
        .spawn(fx.crate_type, &[("transform2d", "y", FieldValue::Num(9.0))])
        .unwrap();
    for _ in 0..5 {
        fx.tick();
    }

    let first = fx.world.snapshot();

    let mut other = fixture();
    other.world.restore(&first).unwrap();
    let second = other.world.snapshot();

    assert_eq!(first, second);
}

#[test]
fn state_hash_survives_the_round_trip() {
    let mut fx = fixture();
    fx.spawn_player("alice", 0.0);
    let sym = fx.intern_client("alice");
    for _ in 0..4 {
        fx.world.inputs.set(sym, input(1));
        fx.tick();
    }
    let hash = fx.world.state_hash();

    let snapshot = fx.world.snapshot();
    let mut other = fixture();
    other.world.restore(&snapshot).unwrap();

    assert_eq!(other.world.state_hash(), hash);
    assert_eq!(other.world.frame(), fx.world.frame());
}

#[test]
fn restore_replays_the_prng_tail_identically() {
    let mut fx = fixture();
    fx.spawn_player("alice", 0.0);
    for _ in 0..3 {
        fx.tick();
    }
    let snapshot = fx.world.snapshot();

    // Advance the original; then bring a second world to the same point via
    // the snapshot. Their futures must agree.
    let mut other = fixture();
    other.world.restore(&snapshot).unwrap();
    for _ in 0..10 {
        fx.tick();
        other.scheduler.run_tick(&mut other.world).unwrap();
        assert_eq!(other.world.state_hash(), fx.world.state_hash());
    }
}

#[test]
fn unknown_entity_type_is_skipped_not_fatal() {
    let mut fx = fixture();
    fx.world.store.spawn(fx.crate_type, &[]).unwrap();

    // The sender also has a "ghost" type the receiver never registers.
    let ghost = ComponentStore::define_entity("ghost")
        .component(fx.transform)
        .register(&mut fx.world.store)
        .unwrap();
    fx.world
        .store
        .spawn(ghost, &[("transform2d", "x", FieldValue::Num(5.0))])
        .unwrap();

    let snapshot = fx.world.snapshot();

    let mut receiver = fixture();
    receiver.world.restore(&snapshot).unwrap();

    // The crate made it; the ghost did not.
    assert_eq!(receiver.world.store.query(&[receiver.transform]).len(), 1);
    // The divergence is visible through the hash, not through an error.
    assert_ne!(receiver.world.state_hash(), fx.world.state_hash());
}

#[test]
fn sync_allow_list_filters_fields() {
    fn build() -> (World, keel_core::store::ComponentId, keel_core::store::EntityTypeId) {
        let mut world = World::new(WorldConfig::default());
        let stats = world
            .store
            .define_component(
                "stats",
                true,
                vec![FieldDef::fixed("score", 0.0), FieldDef::fixed("scratch", 0.0)],
            )
            .unwrap();
        let t = ComponentStore::define_entity("pawn")
            .component(stats)
            .sync_fields(stats, &["score"])
            .register(&mut world.store)
            .unwrap();
        (world, stats, t)
    }

    let (mut world, stats, pawn) = build();
    world
        .store
        .spawn(
            pawn,
            &[
                ("stats", "score", FieldValue::Num(7.0)),
                ("stats", "scratch", FieldValue::Num(99.0)),
            ],
        )
        .unwrap();

    let snapshot = world.snapshot();
    let (mut receiver, r_stats, _) = build();
    receiver.restore(&snapshot).unwrap();

    let e = receiver.store.query(&[r_stats])[0];
    assert_eq!(
        receiver.store.fixed(e, r_stats, "score").unwrap(),
        Fx::from_int(7)
    );
    assert_eq!(
        receiver.store.fixed(e, r_stats, "scratch").unwrap(),
        Fx::ZERO,
        "non-allow-listed field stays at its default"
    );

    // The hash must agree even though `scratch` differs, because the hash
    // covers exactly the snapshot field set.
    assert_eq!(receiver.state_hash(), world.state_hash());
}

#[test]
fn non_sync_components_never_reach_the_wire() {
    let mut world = World::new(WorldConfig::default());
    let visible = world
        .store
        .define_component("visible", true, vec![FieldDef::fixed("v", 1.0)])
        .unwrap();
    let local = world
        .store
        .define_component("local_fx", false, vec![FieldDef::f32("glow", 0.5)])
        .unwrap();
    let t = ComponentStore::define_entity("sprite_holder")
        .component(visible)
        .component(local)
        .register(&mut world.store)
        .unwrap();
    let e = world.store.spawn(t, &[]).unwrap();
    world.store.set_float(e, local, "glow", 3.25).unwrap();

    let snapshot = world.snapshot();

    let mut receiver = World::new(WorldConfig::default());
    let r_visible = receiver
        .store
        .define_component("visible", true, vec![FieldDef::fixed("v", 1.0)])
        .unwrap();
    let r_local = receiver
        .store
        .define_component("local_fx", false, vec![FieldDef::f32("glow", 0.5)])
        .unwrap();
    ComponentStore::define_entity("sprite_holder")
        .component(r_visible)
        .component(r_local)
        .register(&mut receiver.store)
        .unwrap();
    receiver.restore(&snapshot).unwrap();

    let r_e = receiver.store.query(&[r_visible])[0];
    assert_eq!(
        receiver.store.float(r_e, r_local, "glow").unwrap(),
        0.5,
        "client-local state keeps its default"
    );
}

#[test]
fn restore_hooks_rebuild_render_state_and_bodies_wake() {
    fn sync_prev(store: &mut keel_core::store::ComponentStore, entity: Entity) {
        let render = store.component_id("render_prev").unwrap();
        let pos = store.component_id("pos").unwrap();
        let x = store.fixed(entity, pos, "x").unwrap();
        store.set_float(entity, render, "prev_x", x.to_f32()).unwrap();
    }

    fn build() -> (World, keel_core::store::EntityTypeId) {
        let mut world = World::new(WorldConfig {
            physics: keel_core::physics::PhysicsConfig {
                gravity: Vec2::ZERO,
                ..keel_core::physics::PhysicsConfig::default()
            },
            ..WorldConfig::default()
        });
        let pos = world
            .store
            .define_component("pos", true, vec![FieldDef::fixed("x", 0.0)])
            .unwrap();
        let render = world
            .store
            .define_component("render_prev", false, vec![FieldDef::f32("prev_x", 0.0)])
            .unwrap();
        let t = ComponentStore::define_entity("mover")
            .component(pos)
            .component(render)
            .on_restore(sync_prev)
            .register(&mut world.store)
            .unwrap();
        (world, t)
    }

    let (mut world, t) = build();
    let e = world
        .store
        .spawn(t, &[("pos", "x", FieldValue::Num(12.5))])
        .unwrap();
    let snapshot_source = world.snapshot();

    // Receiver with a body that has gone to sleep.
    let (mut receiver, _t) = build();
    let r_body = receiver.physics.insert(BodyDef {
        shape: Shape::Circle { radius: Fx::ONE },
        position: Vec2::ZERO,
        entity: e,
        ..BodyDef::default()
    });
    let dt = Fx::ONE / Fx::from_int(60);
    for _ in 0..60 {
        receiver.physics.step(dt);
    }
    assert!(receiver.physics.body(r_body).unwrap().is_sleeping());

    receiver.restore(&snapshot_source).unwrap();

    // The hook rebuilt the render-only field from synced state.
    let render = receiver.store.component_id("render_prev").unwrap();
    let r_e = receiver.store.query(&[render])[0];
    assert_eq!(receiver.store.float(r_e, render, "prev_x").unwrap(), 12.5);

    // Every body woke.
    assert!(!receiver.physics.body(r_body).unwrap().is_sleeping());
}

#[test]
fn malformed_framing_is_rejected_before_mutation() {
    let mut fx = fixture();
    fx.spawn_player("alice", 3.0);
    let hash = fx.world.state_hash();

    let err = fx.world.restore(&[1, 2, 3]).unwrap_err();
    assert!(matches!(err, SnapshotError::Truncated));
    assert_eq!(fx.world.state_hash(), hash, "world untouched");

    let garbage = vec![8, 0, 0, 0, 9, 9, 9, 9, 9, 9, 9, 9, 0, 0, 0, 0];
    let err = fx.world.restore(&garbage).unwrap_err();
    assert!(matches!(err, SnapshotError::Meta(_)));
    assert_eq!(fx.world.state_hash(), hash, "world untouched");
}
