// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Per-tick input registry.
//!
//! Inputs are opaque byte payloads keyed by interned client id. The registry
//! is populated before a tick (locally predicted or network-confirmed) and
//! cleared when the tick ends; iteration is ascending client id so every
//! participant consumes inputs in the same order.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::interner::Sym;

/// Per-tick `client → input` mapping.
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    current: BTreeMap<Sym, Bytes>,
}

impl InputRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a client's input for the current tick, replacing any prior
    /// entry.
    pub fn set(&mut self, client: Sym, input: Bytes) {
        self.current.insert(client, input);
    }

    /// The input recorded for a client this tick, when any.
    #[must_use]
    pub fn get(&self, client: Sym) -> Option<&Bytes> {
        self.current.get(&client)
    }

    /// Replaces the whole registry with a confirmed input map.
    pub fn replace(&mut self, inputs: &BTreeMap<Sym, Bytes>) {
        self.current = inputs.clone();
    }

    /// Removes every per-tick entry. Called by the scheduler at end of tick.
    pub fn clear(&mut self) {
        self.current.clear();
    }

    /// Iterates `(client, input)` pairs in ascending client order.
    pub fn iter(&self) -> impl Iterator<Item = (Sym, &Bytes)> {
        self.current.iter().map(|(&c, b)| (c, b))
    }

    /// Number of inputs recorded this tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns `true` when no input has been recorded this tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
