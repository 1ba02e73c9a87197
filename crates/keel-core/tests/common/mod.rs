// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Shared fixture: a small world with movement driven by per-client inputs
//! and a PRNG-stirred angle, enough to exercise queries, snapshots, and
//! rollback end to end.

#![allow(missing_docs, dead_code, clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use keel_core::ident::Entity;
use keel_core::interner::{Namespace, Sym};
use keel_core::math::Fx;
use keel_core::scheduler::{Phase, Scheduler};
use keel_core::store::{ComponentId, ComponentStore, EntityTypeId, FieldDef, FieldValue};
use keel_core::{World, WorldConfig};

pub struct Fixture {
    pub world: World,
    pub scheduler: Scheduler,
    pub transform: ComponentId,
    pub motion: ComponentId,
    pub player: EntityTypeId,
    pub crate_type: EntityTypeId,
}

/// Input payload: byte 0 is a direction code (0 stop, 1 right, 2 left).
pub fn input(dir: u8) -> Bytes {
    Bytes::copy_from_slice(&[dir])
}

pub fn fixture() -> Fixture {
    fixture_with_seed(7)
}

pub fn fixture_with_seed(seed: u32) -> Fixture {
    let mut world = World::new(WorldConfig {
        seed,
        ..WorldConfig::default()
    });

    let transform = world
        .store
        .define_component(
            "transform2d",
            true,
            vec![
                FieldDef::fixed("x", 0.0),
                FieldDef::fixed("y", 0.0),
                FieldDef::fixed("angle", 0.0),
            ],
        )
        .unwrap();
    let motion = world
        .store
        .define_component(
            "motion",
            true,
            vec![FieldDef::fixed("vx", 0.0), FieldDef::fixed("vy", 0.0)],
        )
        .unwrap();

    let player = ComponentStore::define_entity("player")
        .component(transform)
        .component(motion)
        .register(&mut world.store)
        .unwrap();
    let crate_type = ComponentStore::define_entity("crate")
        .component(transform)
        .register(&mut world.store)
        .unwrap();

    let mut scheduler = Scheduler::new();

    // Inputs set a velocity; byte 1 moves right, byte 2 moves left.
    let motion_id = motion;
    scheduler.add_system(Phase::Input, "apply_inputs", move |world| {
        let targets: Vec<(Entity, i32)> = world
            .store
            .query(&[motion_id])
            .into_iter()
            .filter_map(|e| {
                world.input_for(e).map(|bytes| {
                    let dir = match bytes.first() {
                        Some(1) => 1,
                        Some(2) => -1,
                        _ => 0,
                    };
                    (e, dir)
                })
            })
            .collect();
        for (e, dir) in targets {
            world
                .store
                .set_fixed(e, motion_id, "vx", Fx::from_int(dir))?;
        }
        Ok(())
    });

    // Integrate positions and stir the PRNG into the angle so that PRNG
    // state is observable through the state hash.
    let t = transform;
    let m = motion;
    scheduler.add_system(Phase::Update, "integrate", move |world| {
        for e in world.store.query(&[t, m]) {
            let vx = world.store.fixed(e, m, "vx")?;
            let x = world.store.fixed(e, t, "x")?;
            world.store.set_fixed(e, t, "x", x + vx)?;
            let jitter = Fx::from_raw((world.prng.next_u32() & 0xFF) as i32);
            let angle = world.store.fixed(e, t, "angle")?;
            world.store.set_fixed(e, t, "angle", angle + jitter)?;
        }
        Ok(())
    });

    Fixture {
        world,
        scheduler,
        transform,
        motion,
        player,
        crate_type,
    }
}

impl Fixture {
    pub fn intern_client(&mut self, name: &str) -> Sym {
        self.world
            .store
            .interner_mut()
            .intern(Namespace::Client, name)
    }

    pub fn spawn_player(&mut self, client: &str, x: f64) -> Entity {
        let sym = self.intern_client(client);
        let entity = self
            .world
            .store
            .spawn(
                self.player,
                &[("transform2d", "x", FieldValue::Num(x))],
            )
            .unwrap();
        self.world.store.bind_client(entity, sym).unwrap();
        entity
    }

    pub fn tick(&mut self) {
        self.scheduler.run_tick(&mut self.world).unwrap();
    }

    pub fn x_of(&self, entity: Entity) -> Fx {
        self.world.store.fixed(entity, self.transform, "x").unwrap()
    }
}
