// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Deterministic 2D physics built on the fixed-point numeric layer.
//!
//! The world is driven by the rollback controller, so every part of a step —
//! broad-phase pair emission, narrow-phase tests, resolution order, sleep
//! bookkeeping — must be a pure function of body state. There is no
//! randomness, no allocation-order dependence, and no hash-set iteration
//! anywhere in the step.

mod body;
mod broadphase;
mod narrowphase;
mod resolver;
mod shape;
mod world;

pub use body::{Body, BodyDef, BodyId, BodyKind};
pub use broadphase::SpatialHash;
pub use narrowphase::{collide, Contact};
pub use shape::{Aabb, Shape};
pub use world::{ContactEvent, PhysicsConfig, PhysicsWorld};
