// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! The world aggregate: store, physics, inputs, PRNG, and the frame counter.
//!
//! A `World` is everything the rollback controller snapshots and rewinds.
//! Two independent worlds in one process share none of this state.

use bytes::Bytes;
use thiserror::Error;

use crate::hash::{state_hash, StateHash};
use crate::ident::DEFAULT_CAPACITY;
use crate::math::{Fx, Prng};
use crate::physics::{PhysicsConfig, PhysicsWorld};
use crate::snapshot::{self, SnapshotError};
use crate::store::{ComponentStore, InputRegistry, StoreError};

/// What kind of host drives this world. Only clients run the `render` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRole {
    /// Interactive client with a renderer attached.
    Client,
    /// Headless host (relay, tooling, tests).
    Headless,
}

/// World construction parameters.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Operational entity cap.
    pub capacity: u32,
    /// PRNG seed; zero is coerced to 1 by the generator.
    pub seed: u32,
    /// Fixed tick rate in Hz (nominally 20–60).
    pub tick_rate: u32,
    /// Host role; gates the `render` phase.
    pub role: HostRole,
    /// Physics tuning.
    pub physics: PhysicsConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            seed: 1,
            tick_rate: 30,
            role: HostRole::Client,
            physics: PhysicsConfig::default(),
        }
    }
}

/// Error from running a tick. Structural conditions (capacity, storage) are
/// fatal to the tick and propagate to the driver; systems surface their own
/// recoverable conditions locally instead of returning them here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// Store failure escalated by a system.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A system reported an unrecoverable condition.
    #[error("system {system} failed: {message}")]
    System {
        /// Registered system name.
        system: &'static str,
        /// Failure description.
        message: String,
    },
}

/// Deterministic simulation world.
#[derive(Debug)]
pub struct World {
    /// Entity store with schema, columns, and query indices.
    pub store: ComponentStore,
    /// 2D physics world.
    pub physics: PhysicsWorld,
    /// Per-tick input registry.
    pub inputs: InputRegistry,
    /// Simulation PRNG; its state rides in snapshots.
    pub prng: Prng,
    role: HostRole,
    tick_rate: u32,
    frame: u32,
    confirmed_seq: u32,
}

impl World {
    /// Creates a world from a config.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        Self {
            store: ComponentStore::new(config.capacity),
            physics: PhysicsWorld::new(config.physics),
            inputs: InputRegistry::new(),
            prng: Prng::from_seed(config.seed),
            role: config.role,
            tick_rate: config.tick_rate.clamp(1, 240),
            frame: 0,
            confirmed_seq: 0,
        }
    }

    /// Host role.
    #[must_use]
    pub fn role(&self) -> HostRole {
        self.role
    }

    /// Current frame counter.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Configured tick rate in Hz.
    #[must_use]
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Fixed tick delta in seconds, `1 / tick_rate`.
    #[must_use]
    pub fn dt(&self) -> Fx {
        Fx::ONE / Fx::from_int(self.tick_rate as i32)
    }

    /// Highest confirmed input sequence number.
    #[must_use]
    pub fn confirmed_seq(&self) -> u32 {
        self.confirmed_seq
    }

    /// Records a confirmed input sequence number (monotonic).
    pub fn mark_confirmed(&mut self, seq: u32) {
        if seq > self.confirmed_seq {
            self.confirmed_seq = seq;
        }
    }

    /// The per-tick input routed to an entity via its bound client, if any.
    #[must_use]
    pub fn input_for(&self, entity: crate::ident::Entity) -> Option<&Bytes> {
        let client = self.store.client_of(entity)?;
        self.inputs.get(client)
    }

    /// Encodes a sparse snapshot of the world.
    #[must_use]
    pub fn snapshot(&self) -> Bytes {
        snapshot::encode(self)
    }

    /// Restores the world from a snapshot produced by [`World::snapshot`].
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        snapshot::decode(self, bytes)
    }

    /// Deterministic drift-detection hash of the synchronised state.
    #[must_use]
    pub fn state_hash(&self) -> StateHash {
        state_hash(self)
    }

    /// End-of-tick bookkeeping: clear per-tick inputs, advance the frame.
    pub(crate) fn end_tick(&mut self) {
        self.inputs.clear();
        self.frame = self.frame.wrapping_add(1);
    }

    /// Overwrites the frame and confirmation counters (snapshot restore).
    pub(crate) fn restore_counters(&mut self, frame: u32, confirmed_seq: u32) {
        self.frame = frame;
        self.confirmed_seq = confirmed_seq;
    }
}
