// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Prediction, confirmation, and resimulation.
//!
//! The controller wraps the tick loop: it snapshots the world before every
//! advance, records local inputs as unconfirmed predictions, verifies each
//! authority-confirmed frame against the prediction made for it, and rewinds
//! plus resimulates when they disagree. Because the kernel never suspends
//! inside a tick, resimulated frames replay the original interleaving
//! exactly; the only degrees of freedom are the inputs.

use std::collections::{BTreeMap, VecDeque};

use bytes::Bytes;
use thiserror::Error;

use crate::hash::StateHash;
use crate::interner::Sym;
use crate::scheduler::Scheduler;
use crate::snapshot::SnapshotError;
use crate::world::{StepError, World};

use super::buffer::{RollbackBuffer, DEFAULT_BUFFER_FRAMES};
use super::history::{InputHistory, DEFAULT_HISTORY_FRAMES};

/// Controller bounds.
#[derive(Debug, Clone)]
pub struct RollbackConfig {
    /// Frames of input history retained.
    pub history_frames: usize,
    /// Snapshots retained.
    pub buffer_frames: usize,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            history_frames: DEFAULT_HISTORY_FRAMES,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

/// A locally predicted frame awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    /// Frame the prediction simulated.
    pub frame: u32,
    /// Post-tick state hash under the predicted inputs.
    pub hash: StateHash,
}

/// Result of processing an authority tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerTickOutcome {
    /// No local prediction existed; the confirmed inputs simply drove the
    /// world forward.
    Followed,
    /// The prediction matched the confirmed simulation.
    Confirmed,
    /// The prediction disagreed; the world was rewound and resimulated.
    Mispredicted {
        /// Hash the local prediction produced.
        predicted: StateHash,
        /// Hash the confirmed inputs produce.
        actual: StateHash,
    },
}

/// Errors from rollback operations.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// No snapshot is retained for the frame a rewind needs.
    #[error("no snapshot retained for frame {0}")]
    MissingSnapshot(u32),

    /// A resimulated tick failed.
    #[error(transparent)]
    Step(#[from] StepError),

    /// A retained snapshot failed to restore.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Rollback controller wrapping a world + scheduler pair.
#[derive(Debug)]
pub struct RollbackController {
    history: InputHistory,
    buffer: RollbackBuffer,
    pending: VecDeque<Prediction>,
    local_pending: bool,
}

impl RollbackController {
    /// Creates a controller with the given bounds.
    #[must_use]
    pub fn new(config: &RollbackConfig) -> Self {
        Self {
            history: InputHistory::new(config.history_frames),
            buffer: RollbackBuffer::new(config.buffer_frames),
            pending: VecDeque::new(),
            local_pending: false,
        }
    }

    /// The retained input history.
    #[must_use]
    pub fn history(&self) -> &InputHistory {
        &self.history
    }

    /// Mutable input history access (late-joiner load).
    pub fn history_mut(&mut self) -> &mut InputHistory {
        &mut self.history
    }

    /// Predictions not yet confirmed, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = Prediction> + '_ {
        self.pending.iter().copied()
    }

    /// Applies a local input immediately and records it as unconfirmed.
    ///
    /// The matching prediction hash is captured by the next [`Self::advance`]
    /// once the frame has actually simulated.
    pub fn set_local_input(&mut self, world: &mut World, client: Sym, input: Bytes) {
        world.inputs.set(client, input.clone());
        self.history.set_input(world.frame(), client, input);
        self.local_pending = true;
    }

    /// Snapshots the current frame, then advances one tick.
    pub fn advance(
        &mut self,
        world: &mut World,
        scheduler: &mut Scheduler,
    ) -> Result<(), RollbackError> {
        let frame = world.frame();
        self.buffer.save(frame, world.snapshot());
        scheduler.run_tick(world)?;
        if self.local_pending {
            self.local_pending = false;
            self.pending.push_back(Prediction {
                frame,
                hash: world.state_hash(),
            });
        }
        Ok(())
    }

    /// Processes an authority tick for `server_frame` with its confirmed
    /// input map.
    pub fn on_server_tick(
        &mut self,
        world: &mut World,
        scheduler: &mut Scheduler,
        server_frame: u32,
        inputs: &BTreeMap<Sym, Bytes>,
    ) -> Result<ServerTickOutcome, RollbackError> {
        let current = world.frame();
        self.buffer.save(current, world.snapshot());
        self.history.confirm_frame(server_frame, inputs.clone());

        let predicted = self
            .pending
            .iter()
            .find(|p| p.frame == server_frame)
            .map(|p| p.hash);

        let Some(predicted) = predicted else {
            // Pure follower for this frame: the confirmed inputs drive the
            // world forward directly.
            world.inputs.replace(inputs);
            scheduler.run_tick(world)?;
            return Ok(ServerTickOutcome::Followed);
        };

        // Rewind to the pre-simulation state of the confirmed frame and
        // re-run it under the authority's inputs.
        let snapshot = self
            .buffer
            .get(server_frame)
            .cloned()
            .ok_or(RollbackError::MissingSnapshot(server_frame))?;
        world.restore(&snapshot)?;
        world.inputs.replace(inputs);
        scheduler.run_tick(world)?;
        let actual = world.state_hash();

        // Everything at or before the confirmed frame is settled now.
        self.pending.retain(|p| p.frame > server_frame);

        if actual == predicted {
            // The speculative timeline was right; return to it.
            let back = self
                .buffer
                .get(current)
                .cloned()
                .ok_or(RollbackError::MissingSnapshot(current))?;
            world.restore(&back)?;
            return Ok(ServerTickOutcome::Confirmed);
        }

        self.resimulate_to(world, scheduler, current)?;
        Ok(ServerTickOutcome::Mispredicted {
            predicted,
            actual,
        })
    }

    /// Replays history inputs until the world is back at `target`'s
    /// pre-simulation state, so caller-visible frame numbering is unchanged
    /// by the rewind.
    fn resimulate_to(
        &mut self,
        world: &mut World,
        scheduler: &mut Scheduler,
        target: u32,
    ) -> Result<(), RollbackError> {
        while world.frame() < target {
            let frame = world.frame();
            if let Some(recorded) = self.history.get(frame) {
                world.inputs.replace(recorded.inputs());
            } else {
                world.inputs.clear();
            }
            self.buffer.save(frame, world.snapshot());
            scheduler.run_tick(world)?;
        }
        Ok(())
    }
}

impl Default for RollbackController {
    fn default() -> Self {
        Self::new(&RollbackConfig::default())
    }
}
