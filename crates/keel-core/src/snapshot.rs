// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Sparse world snapshots and their binary framing.
//!
//! Layout: `[meta_len u32-LE][meta CBOR][bitmap_len u32-LE][bitmap]
//! [column bytes…]`. The CBOR meta enumerates entity metadata in ascending
//! id order, the sync component order, per-type component sets and sync
//! allow-lists, the allocator state, the interner state, the PRNG state, and
//! the frame/confirmation counters — everything the column bytes need to be
//! self-describing.
//!
//! Determinism contract:
//! - Entities are enumerated in ascending id order everywhere.
//! - Column bytes are the concatenation, per sync component and per
//!   non-`F32` field in declaration order, of each member entity's raw value
//!   in little-endian at the field's native width.
//! - Membership is the entity type's declared component set; the sync
//!   allow-list filters fields per type. Both ride in the meta so a receiver
//!   can walk the bytes even for entity types it has not registered.
//! - `encode(decode(encode(w)))` is byte-identical to `encode(w)`.
//!
//! Restore overwrites the allocator, interner, PRNG, and counters wholesale,
//! re-attaches entities with forced generations, skips unknown entity types
//! with a warning (partial restore is legal; the mismatch surfaces as hash
//! drift), runs per-type restore hooks, and wakes every physics body.

use bytes::{BufMut, Bytes, BytesMut};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::Entity;
use crate::interner::Sym;
use crate::store::{ColumnData, ComponentId, FieldKind, StoreError};
use crate::telemetry;
use crate::world::World;

/// Errors from snapshot decoding.
///
/// Framing and meta errors are detected before the world is touched, so a
/// malformed message can simply be discarded. Store errors can surface
/// mid-restore and leave a partial world; the caller should treat the world
/// as divergent (the state hash will say so).
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The byte stream ended before the framing said it would.
    #[error("snapshot truncated")]
    Truncated,

    /// The CBOR meta blob failed to parse.
    #[error("snapshot meta: {0}")]
    Meta(String),

    /// The allocator state in the meta is inconsistent.
    #[error("snapshot allocator state malformed")]
    AllocatorState,

    /// The snapshot references a component this peer has not registered.
    #[error("unknown component in snapshot: {0}")]
    UnknownComponent(String),

    /// An entity's type is missing from the snapshot's own type table.
    #[error("snapshot type table missing entry for {0}")]
    TypeTable(String),

    /// The column byte run does not match the size implied by the meta.
    #[error("snapshot column data length mismatch")]
    ColumnData,

    /// A store operation failed while re-attaching entities.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMeta {
    frame: u32,
    confirmed_seq: u32,
    prng: [u64; 2],
    next_index: u32,
    free_list: Vec<u32>,
    generations: Vec<u16>,
    interner: Vec<(u8, String)>,
    types: Vec<TypeEntry>,
    entities: Vec<EntityEntry>,
    components: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TypeEntry {
    name: String,
    components: Vec<String>,
    /// `(component, allowed fields)`; a component with no entry syncs all
    /// fields.
    allows: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntityEntry {
    id: u32,
    type_name: String,
    client: Option<u32>,
}

impl TypeEntry {
    fn declares(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }

    fn allows(&self, component: &str, field: &str) -> bool {
        self.allows
            .iter()
            .find(|(c, _)| c == component)
            .map_or(true, |(_, fields)| fields.iter().any(|f| f == field))
    }
}

/// Encodes a sparse snapshot of the world.
#[must_use]
pub fn encode(world: &World) -> Bytes {
    let store = &world.store;
    let live = store.live_entities();

    // Types present among the live set, in registration order.
    let mut present = Vec::new();
    for entity in &live {
        if let Ok(type_id) = store.type_of(*entity) {
            if !present.contains(&type_id) {
                present.push(type_id);
            }
        }
    }
    present.sort_unstable();

    let types: Vec<TypeEntry> = present
        .iter()
        .map(|&type_id| {
            let def = store.entity_type_def(type_id);
            let components: Vec<String> = def
                .components()
                .iter()
                .map(|&c| store.component_def(c).name().to_owned())
                .collect();
            let mut allows = Vec::new();
            for &component in def.components() {
                if let Some(mask) = def.allow_mask(component) {
                    let cdef = store.component_def(component);
                    let fields = cdef
                        .fields()
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| mask[i])
                        .map(|(_, f)| f.name().to_owned())
                        .collect();
                    allows.push((cdef.name().to_owned(), fields));
                }
            }
            TypeEntry {
                name: def.name().to_owned(),
                components,
                allows,
            }
        })
        .collect();

    let entities: Vec<EntityEntry> = live
        .iter()
        .map(|&entity| EntityEntry {
            id: entity.raw(),
            type_name: store
                .type_of(entity)
                .map(|t| store.entity_type_def(t).name().to_owned())
                .unwrap_or_default(),
            client: store.client_of(entity).map(Sym::raw),
        })
        .collect();

    let components: Vec<String> = store
        .components()
        .filter(|(_, def)| def.sync())
        .map(|(_, def)| def.name().to_owned())
        .collect();

    let allocator = store.allocator();
    let meta = SnapshotMeta {
        frame: world.frame(),
        confirmed_seq: world.confirmed_seq(),
        prng: world.prng.save(),
        next_index: allocator.next_index(),
        free_list: allocator.free_list().to_vec(),
        generations: allocator.generations().to_vec(),
        interner: store.interner().export(),
        types,
        entities,
        components,
    };

    let mut meta_buf = Vec::new();
    if ciborium::into_writer(&meta, &mut meta_buf).is_err() {
        debug_assert!(false, "snapshot meta serialisation failed");
        meta_buf.clear();
    }

    // Capacity-sized liveness bitmap over entity indices.
    let mut bitmap = vec![0_u8; store.capacity().div_ceil(8)];
    for entity in &live {
        let index = entity.index() as usize;
        bitmap[index / 8] |= 1 << (index % 8);
    }

    // Packed columns.
    let mut columns = BytesMut::new();
    for (component, def) in store.components().filter(|(_, d)| d.sync()) {
        let set = store.column_set(component);
        for (field, fdef) in def.fields().iter().enumerate() {
            if fdef.kind() == FieldKind::F32 {
                continue;
            }
            for &entity in &live {
                let Ok(type_id) = store.type_of(entity) else {
                    continue;
                };
                let tdef = store.entity_type_def(type_id);
                if !tdef.components().contains(&component) {
                    continue;
                }
                if !tdef.allow_mask(component).map_or(true, |m| m[field]) {
                    continue;
                }
                let row = entity.index() as usize;
                match &set.fields[field] {
                    ColumnData::Fixed(v) => columns.put_i32_le(v[row]),
                    ColumnData::U8(v) | ColumnData::Bool(v) => columns.put_u8(v[row]),
                    ColumnData::F32(_) => {}
                }
            }
        }
    }

    let mut out = BytesMut::with_capacity(8 + meta_buf.len() + bitmap.len() + columns.len());
    out.put_u32_le(meta_buf.len() as u32);
    out.put_slice(&meta_buf);
    out.put_u32_le(bitmap.len() as u32);
    out.put_slice(&bitmap);
    out.put_slice(&columns);
    out.freeze()
}

/// Restores a world from snapshot bytes.
pub fn decode(world: &mut World, bytes: &[u8]) -> Result<(), SnapshotError> {
    // ── Parse and validate everything before mutating. ─────────────
    let (meta_bytes, rest) = split_len_prefixed(bytes)?;
    // The liveness bitmap is advisory; the entity list drives the restore.
    let (_bitmap, columns) = split_len_prefixed(rest)?;

    let meta: SnapshotMeta = ciborium::from_reader(meta_bytes).map_err(|e| {
        telemetry::warn("snapshot_decode", "meta parse failed");
        SnapshotError::Meta(e.to_string())
    })?;

    if meta.generations.len() != meta.next_index as usize {
        return Err(SnapshotError::AllocatorState);
    }

    let store = &world.store;
    let component_ids: Vec<ComponentId> = meta
        .components
        .iter()
        .map(|name| {
            store
                .component_id(name)
                .ok_or_else(|| SnapshotError::UnknownComponent(name.clone()))
        })
        .collect::<Result<_, _>>()?;

    let type_table: FxHashMap<&str, &TypeEntry> = meta
        .types
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect();

    struct Pending<'a> {
        entity: Entity,
        entry: &'a TypeEntry,
        local: Option<crate::store::EntityTypeId>,
        client: Option<Sym>,
    }

    let mut pending = Vec::with_capacity(meta.entities.len());
    for entry in &meta.entities {
        let type_entry = type_table
            .get(entry.type_name.as_str())
            .ok_or_else(|| SnapshotError::TypeTable(entry.type_name.clone()))?;
        pending.push(Pending {
            entity: Entity::from_raw(entry.id),
            entry: type_entry,
            local: store.entity_type_id(&entry.type_name),
            client: entry.client.and_then(Sym::from_raw),
        });
    }

    // Expected column run length, walked exactly like the encoder.
    let mut expected = 0_usize;
    for (name, &component) in meta.components.iter().zip(&component_ids) {
        let def = store.component_def(component);
        for fdef in def.fields() {
            if fdef.kind() == FieldKind::F32 {
                continue;
            }
            for p in &pending {
                if p.entry.declares(name) && p.entry.allows(name, fdef.name()) {
                    expected += fdef.kind().width();
                }
            }
        }
    }
    if columns.len() != expected {
        telemetry::warn("snapshot_decode", "column length mismatch");
        return Err(SnapshotError::ColumnData);
    }

    // ── Mutate. ────────────────────────────────────────────────────
    let store = &mut world.store;
    store.clear_live();
    store
        .allocator_mut()
        .restore_state(meta.next_index, meta.free_list.clone(), meta.generations.clone());
    store.interner_mut().restore(&meta.interner);
    world.prng.load(meta.prng);
    world.restore_counters(meta.frame, meta.confirmed_seq);
    // Per-tick inputs are transient; a restored world starts its frame
    // with whatever the caller applies next.
    world.inputs.clear();

    for p in &pending {
        match p.local {
            Some(type_id) => {
                world.store.restore_entity(p.entity, type_id, p.client)?;
            }
            None => {
                // Partial restore is acceptable; the divergence will surface
                // through the state hash, not through a failed restore.
                telemetry::warn("unknown_entity_type", &p.entry.name);
            }
        }
    }

    // Unpack columns, consuming bytes for unknown-type entities too.
    let mut cursor = 0_usize;
    for (name, &component) in meta.components.iter().zip(&component_ids) {
        let field_count = world.store.component_def(component).fields().len();
        for field in 0..field_count {
            let (kind, fname) = {
                let fdef = &world.store.component_def(component).fields()[field];
                (fdef.kind(), fdef.name().to_owned())
            };
            if kind == FieldKind::F32 {
                continue;
            }
            let width = kind.width();
            for p in &pending {
                if !p.entry.declares(name) || !p.entry.allows(name, &fname) {
                    continue;
                }
                let value = columns
                    .get(cursor..cursor + width)
                    .ok_or(SnapshotError::ColumnData)?;
                cursor += width;
                if p.local.is_none() || !world.store.has(p.entity, component) {
                    continue;
                }
                let row = p.entity.index() as usize;
                match &mut world.store.column_set_mut(component).fields[field] {
                    ColumnData::Fixed(v) => {
                        v[row] = i32::from_le_bytes([value[0], value[1], value[2], value[3]]);
                    }
                    ColumnData::U8(v) | ColumnData::Bool(v) => v[row] = value[0],
                    ColumnData::F32(_) => {}
                }
            }
        }
    }

    // Per-type restore hooks rebuild non-synced (render-only) state.
    for p in &pending {
        if let Some(type_id) = p.local {
            if let Some(hook) = world.store.restore_hook(type_id) {
                hook(&mut world.store, p.entity);
            }
        }
    }

    // A receiver that kept a body asleep while the authority set it moving
    // would silently diverge.
    world.physics.wake_all();
    Ok(())
}

fn split_len_prefixed(bytes: &[u8]) -> Result<(&[u8], &[u8]), SnapshotError> {
    if bytes.len() < 4 {
        return Err(SnapshotError::Truncated);
    }
    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let rest = &bytes[4..];
    if rest.len() < len {
        return Err(SnapshotError::Truncated);
    }
    Ok((&rest[..len], &rest[len..]))
}
