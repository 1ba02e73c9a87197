// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Rollback netcode: bounded input history, a snapshot ring, and the
//! prediction/confirmation controller.

mod buffer;
mod controller;
mod history;

pub use buffer::{RollbackBuffer, DEFAULT_BUFFER_FRAMES};
pub use controller::{
    Prediction, RollbackConfig, RollbackController, RollbackError, ServerTickOutcome,
};
pub use history::{FrameInputs, InputHistory, DEFAULT_HISTORY_FRAMES};
