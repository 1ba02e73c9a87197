// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Bounded ring of encoded world snapshots keyed by frame.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Default bound on retained snapshots.
pub const DEFAULT_BUFFER_FRAMES: usize = 60;

/// Bounded map `frame → snapshot bytes`.
#[derive(Debug, Clone)]
pub struct RollbackBuffer {
    snapshots: BTreeMap<u32, Bytes>,
    bound: usize,
}

impl RollbackBuffer {
    /// Creates a buffer bounded to `bound` snapshots.
    #[must_use]
    pub fn new(bound: usize) -> Self {
        Self {
            snapshots: BTreeMap::new(),
            bound: bound.max(1),
        }
    }

    /// Stores a snapshot for a frame and prunes to
    /// `frame ≥ current − bound + 1`.
    pub fn save(&mut self, frame: u32, snapshot: Bytes) {
        self.snapshots.insert(frame, snapshot);
        let keep_from = frame.saturating_sub(self.bound as u32 - 1);
        self.prune(keep_from);
    }

    /// The snapshot stored for a frame, when retained.
    #[must_use]
    pub fn get(&self, frame: u32) -> Option<&Bytes> {
        self.snapshots.get(&frame)
    }

    /// The newest retained snapshot at or before a frame.
    #[must_use]
    pub fn latest_at_or_before(&self, frame: u32) -> Option<(u32, &Bytes)> {
        self.snapshots
            .range(..=frame)
            .next_back()
            .map(|(&f, s)| (f, s))
    }

    /// Drops every snapshot strictly below `before`.
    pub fn prune(&mut self, before: u32) {
        self.snapshots = self.snapshots.split_off(&before);
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for RollbackBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_FRAMES)
    }
}
