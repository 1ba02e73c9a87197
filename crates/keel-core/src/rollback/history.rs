// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Bounded per-frame input history.
//!
//! The serialisation contract here is what rollback leans on hardest: frames
//! iterate in ascending order and, within a frame, inputs iterate in
//! ascending client order. A late joiner that reloads the history must walk
//! it exactly as the authority wrote it.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::interner::Sym;

/// Default bound on retained frames.
pub const DEFAULT_HISTORY_FRAMES: usize = 120;

/// Inputs recorded for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInputs {
    inputs: BTreeMap<Sym, Bytes>,
    confirmed: bool,
}

impl FrameInputs {
    /// Client inputs, iterated in ascending client order.
    #[must_use]
    pub fn inputs(&self) -> &BTreeMap<Sym, Bytes> {
        &self.inputs
    }

    /// Whether this frame's inputs came from the authority.
    #[must_use]
    pub fn confirmed(&self) -> bool {
        self.confirmed
    }
}

/// Bounded map `frame → (inputs, confirmed)`.
#[derive(Debug, Clone)]
pub struct InputHistory {
    frames: BTreeMap<u32, FrameInputs>,
    bound: usize,
}

impl InputHistory {
    /// Creates a history bounded to `bound` frames.
    #[must_use]
    pub fn new(bound: usize) -> Self {
        Self {
            frames: BTreeMap::new(),
            bound: bound.max(1),
        }
    }

    /// Records an unconfirmed (local or speculative) input.
    ///
    /// A frame already confirmed by the authority is left untouched;
    /// speculation never overwrites truth.
    pub fn set_input(&mut self, frame: u32, client: Sym, input: Bytes) {
        let entry = self.frames.entry(frame).or_default();
        if entry.confirmed {
            return;
        }
        entry.inputs.insert(client, input);
        self.trim();
    }

    /// Replaces a frame with the authority's confirmed input map.
    pub fn confirm_frame(&mut self, frame: u32, inputs: BTreeMap<Sym, Bytes>) {
        self.frames.insert(
            frame,
            FrameInputs {
                inputs,
                confirmed: true,
            },
        );
        self.trim();
    }

    /// The recorded inputs for a frame, when retained.
    #[must_use]
    pub fn get(&self, frame: u32) -> Option<&FrameInputs> {
        self.frames.get(&frame)
    }

    /// Frames in the inclusive `[from, to]` interval, ascending.
    pub fn range(&self, from: u32, to: u32) -> impl Iterator<Item = (u32, &FrameInputs)> {
        self.frames.range(from..=to).map(|(&f, i)| (f, i))
    }

    /// Drops every frame strictly below `before`.
    pub fn prune(&mut self, before: u32) {
        self.frames = self.frames.split_off(&before);
    }

    /// All retained frames in ascending order (serialisation walk).
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FrameInputs)> {
        self.frames.iter().map(|(&f, i)| (f, i))
    }

    /// Number of retained frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` when no frame is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Loads a serialised history (late join), replacing current contents.
    pub fn load(&mut self, frames: impl IntoIterator<Item = (u32, BTreeMap<Sym, Bytes>, bool)>) {
        self.frames.clear();
        for (frame, inputs, confirmed) in frames {
            self.frames.insert(frame, FrameInputs { inputs, confirmed });
        }
        self.trim();
    }

    fn trim(&mut self) {
        while self.frames.len() > self.bound {
            if let Some((&oldest, _)) = self.frames.iter().next() {
                self.frames.remove(&oldest);
            }
        }
    }
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::interner::{Interner, Namespace};

    fn clients() -> (Sym, Sym) {
        let mut i = Interner::new();
        (
            i.intern(Namespace::Client, "a"),
            i.intern(Namespace::Client, "b"),
        )
    }

    #[test]
    fn range_is_ascending_and_inclusive() {
        let (a, _) = clients();
        let mut h = InputHistory::new(16);
        for f in [5_u32, 3, 9, 7] {
            h.set_input(f, a, Bytes::from_static(b"i"));
        }
        let frames: Vec<u32> = h.range(3, 7).map(|(f, _)| f).collect();
        assert_eq!(frames, vec![3, 5, 7]);
    }

    #[test]
    fn inputs_iterate_in_ascending_client_order() {
        let (a, b) = clients();
        let mut h = InputHistory::new(16);
        h.set_input(1, b, Bytes::from_static(b"b"));
        h.set_input(1, a, Bytes::from_static(b"a"));
        let order: Vec<Sym> = h.get(1).unwrap().inputs().keys().copied().collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn confirm_replaces_speculation() {
        let (a, b) = clients();
        let mut h = InputHistory::new(16);
        h.set_input(4, a, Bytes::from_static(b"guess"));

        let mut confirmed = BTreeMap::new();
        confirmed.insert(b, Bytes::from_static(b"truth"));
        h.confirm_frame(4, confirmed);

        let frame = h.get(4).unwrap();
        assert!(frame.confirmed());
        assert_eq!(frame.inputs().get(&a), None);
        assert_eq!(frame.inputs().get(&b), Some(&Bytes::from_static(b"truth")));
    }

    #[test]
    fn speculation_never_overwrites_truth() {
        let (a, _) = clients();
        let mut h = InputHistory::new(16);
        h.confirm_frame(4, BTreeMap::new());
        h.set_input(4, a, Bytes::from_static(b"late guess"));
        assert!(h.get(4).unwrap().inputs().is_empty());
    }

    #[test]
    fn bound_evicts_oldest_frames() {
        let (a, _) = clients();
        let mut h = InputHistory::new(3);
        for f in 0..5_u32 {
            h.set_input(f, a, Bytes::from_static(b"i"));
        }
        assert_eq!(h.len(), 3);
        assert!(h.get(0).is_none());
        assert!(h.get(1).is_none());
        assert!(h.get(4).is_some());
    }

    #[test]
    fn prune_drops_everything_below() {
        let (a, _) = clients();
        let mut h = InputHistory::new(16);
        for f in 0..6_u32 {
            h.set_input(f, a, Bytes::from_static(b"i"));
        }
        h.prune(4);
        let frames: Vec<u32> = h.iter().map(|(f, _)| f).collect();
        assert_eq!(frames, vec![4, 5]);
    }
}
