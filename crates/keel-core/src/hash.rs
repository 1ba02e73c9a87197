// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Deterministic drift-detection hash.
//!
//! The fold is fixed by the wire contract: over entities in ascending id
//! order, `h ← h·31 + id`, then for each sync component in registration
//! order and each of its fields in name-sorted order (render-only `F32`
//! fields and fields outside the type's sync allow-list excluded),
//! `h ← h·31 + raw_value`. The low 32 bits render as an eight-character hex
//! string.
//!
//! The field set covered here is exactly the snapshot field set, so hash
//! equality and snapshot equality cannot disagree.

use crate::store::FieldKind;
use crate::world::World;

/// 32-bit state hash, rendered as eight hex characters on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(u32);

impl StateHash {
    /// Wraps a raw hash value (decoded from the wire).
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw 32-bit value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Lowercase eight-character hex rendering.
    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl core::fmt::Display for StateHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[inline]
fn fold(h: u32, value: u32) -> u32 {
    h.wrapping_mul(31).wrapping_add(value)
}

/// Computes the drift hash of a world's synchronised state.
#[must_use]
pub fn state_hash(world: &World) -> StateHash {
    let store = &world.store;
    let mut h: u32 = 0;

    for entity in store.live_entities() {
        h = fold(h, entity.raw());
        let Ok(type_id) = store.type_of(entity) else {
            continue;
        };
        let type_def = store.entity_type_def(type_id);
        let row = entity.index() as usize;

        for (component, def) in store.components() {
            if !def.sync() || !store.has(entity, component) {
                continue;
            }
            let mask = type_def.allow_mask(component);
            let set = store.column_set(component);
            for &field in &def.name_sorted {
                if def.fields()[field].kind() == FieldKind::F32 {
                    continue;
                }
                if !mask.map_or(true, |m| m[field]) {
                    continue;
                }
                h = fold(h, set.fields[field].raw_u32(row));
            }
        }
    }

    StateHash(h)
}
