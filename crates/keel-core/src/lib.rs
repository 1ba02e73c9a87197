// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! keel-core: deterministic lockstep simulation kernel.
//!
//! The kernel produces bit-identical world state on every participant given
//! the same sequence of per-frame inputs, and recovers from misprediction by
//! rewinding and resimulating. Everything on the simulation path is integer
//! arithmetic over Q16.16 fixed point; wall-clock time, system RNG, and
//! platform floats are banned inside a tick.
//!
//! Layering, leaf-first:
//! - [`math`] — fixed-point scalar, vectors, quaternion, trig tables, PRNG.
//! - [`ident`] / [`interner`] — generational entity handles and the
//!   name-spaced string interner.
//! - [`store`] — structure-of-arrays component columns with indexed queries.
//! - [`scheduler`] — six-phase synchronous system scheduler.
//! - [`physics`] — 2D fixed-point physics world (spatial hash, circle/box
//!   narrow phase, impulse resolver, sleeping, sensors).
//! - [`snapshot`] / [`hash`] — sparse binary snapshots and the drift hash.
//! - [`rollback`] — input history, snapshot ring, prediction/confirmation.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

/// Deterministic math subsystem (fixed point, Vec2/Vec3, Quat, trig, PRNG).
pub mod math;

/// Generational entity identifiers and the index allocator.
pub mod ident;

/// Name-spaced string interner.
pub mod interner;

/// Component columns, schema registration, queries, and input routing.
pub mod store;

/// Six-phase deterministic system scheduler.
pub mod scheduler;

/// 2D fixed-point physics world.
pub mod physics;

/// Sparse world snapshots and their binary framing.
pub mod snapshot;

/// Deterministic state hash used for drift detection.
pub mod hash;

/// Input history, rollback buffer, and the resimulation controller.
pub mod rollback;

mod telemetry;
mod world;

pub use world::{HostRole, StepError, World, WorldConfig};
