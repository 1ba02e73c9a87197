// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Client-id hashing.
//!
//! String client ids are abbreviated on the wire as a 32-bit FNV-1a hash;
//! each peer keeps a reverse table so incoming hashes resolve back to the
//! full id. Collisions are theoretically possible and surface as a resolve
//! to the wrong string; session vocabularies are far too small for that to
//! matter in practice.

use rustc_hash::FxHashMap;

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the id's UTF-8 bytes.
#[must_use]
pub fn client_hash(id: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in id.as_bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Per-peer reverse lookup table `hash → client id`.
#[derive(Debug, Clone, Default)]
pub struct ClientHashRegistry {
    map: FxHashMap<u32, String>,
}

impl ClientHashRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client id, returning its hash.
    pub fn insert(&mut self, id: &str) -> u32 {
        let hash = client_hash(id);
        self.map.entry(hash).or_insert_with(|| id.to_owned());
        hash
    }

    /// Resolves a wire hash back to the full client id.
    #[must_use]
    pub fn resolve(&self, hash: u32) -> Option<&str> {
        self.map.get(&hash).map(String::as_str)
    }

    /// Number of known clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when no client is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
