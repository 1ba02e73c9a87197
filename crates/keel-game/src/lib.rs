// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! keel-game: the thin assembly on top of the deterministic kernel.
//!
//! Standard component registration, a prefab registry, the physics plugin
//! (store ↔ body mirroring plus collision dispatch), authority election, and
//! the session driver that wraps the rollback controller and talks to the
//! transport collaborator.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

pub mod authority;
pub mod collision;
pub mod components;
pub mod physics_plugin;
pub mod prefab;
pub mod session;

pub use authority::elect_authority;
pub use collision::CollisionHandlers;
pub use components::{register_components, sync_render_prev, CoreComponents};
pub use physics_plugin::install_physics;
pub use prefab::PrefabRegistry;
pub use session::{Session, SessionConfig, SessionError, Transport};
