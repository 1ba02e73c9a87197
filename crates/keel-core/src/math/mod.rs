// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Deterministic math for the simulation kernel.
//!
//! Everything here is a pure function of its integer inputs. The only stateful
//! member is [`Prng`], which exposes explicit save/load so its state can ride
//! in snapshots. No platform transcendentals, no wall-clock, no system RNG.

mod fixed;
mod prng;
mod quat;
mod trig;
mod vec;

pub use fixed::Fx;
pub use prng::Prng;
pub use quat::Quat;
pub use trig::{atan2, cos, sin, HALF_PI, PI, QUARTER_PI, TAU};
pub use vec::{Vec2, Vec3};
