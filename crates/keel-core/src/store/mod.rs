// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Entity store: schema registration, column storage, queries, and input
//! routing.
//!
//! Determinism contract:
//! - Query iteration order is the ascending sort of entity ids, always.
//! - The three query indices (`type → ids`, `component → ids`,
//!   `client → id`) are maintained incrementally on spawn / destroy /
//!   add-component / remove-component, never rebuilt by scan.
//! - A presence bit is set iff the entity is in the component's index set.
//! - Client bindings are unique; a second binding for the same client is an
//!   error rather than last-write-wins.

mod column;
mod input;
mod schema;

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ident::{CapacityExceeded, Entity, IdAllocator};
use crate::interner::{Interner, Namespace, Sym};
use crate::math::Fx;
use crate::telemetry;

pub use input::InputRegistry;
pub use schema::{
    ComponentDef, ComponentId, EntityTypeBuilder, EntityTypeDef, EntityTypeId, FieldDef,
    FieldKind, FieldValue, RestoreHook,
};

pub(crate) use column::{ColumnData, ColumnSet};

/// Errors surfaced by store operations.
///
/// Registration-time conditions (`DuplicateComponent`, `DuplicateEntityType`)
/// are startup-fatal; handle conditions (`StaleHandle`, `MissingComponent`)
/// are local to the call and typically surfaced to the system that made it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Entity allocation hit the operational cap. Fatal to the tick.
    #[error(transparent)]
    Capacity(#[from] CapacityExceeded),

    /// The handle's generation no longer matches its slot.
    #[error("stale entity handle {0:?}")]
    StaleHandle(Entity),

    /// The entity does not carry the requested component.
    #[error("entity {entity:?} has no component {component}")]
    MissingComponent {
        /// Handle that was accessed.
        entity: Entity,
        /// Component name.
        component: String,
    },

    /// A component name was registered twice.
    #[error("duplicate component: {0}")]
    DuplicateComponent(String),

    /// An entity type name was registered twice.
    #[error("duplicate entity type: {0}")]
    DuplicateEntityType(String),

    /// Reference to an entity type this store has not registered.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Reference to a component this store has not registered.
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// Reference to a field the component does not declare.
    #[error("component {component} has no field {field}")]
    UnknownField {
        /// Component name.
        component: String,
        /// Field name.
        field: String,
    },

    /// A value did not match the declared field kind.
    #[error("field {component}.{field} is not {expected}")]
    FieldType {
        /// Component name.
        component: String,
        /// Field name.
        field: String,
        /// Expected kind.
        expected: &'static str,
    },

    /// The client id is already bound to a different live entity.
    #[error("client id already bound to a live entity")]
    DuplicateClientBinding,
}

/// Per-slot entity record, valid only while the slot is live.
#[derive(Debug, Clone, Copy, Default)]
struct SlotMeta {
    type_id: u16,
    client: Option<Sym>,
}

/// Archetype-free entity store with structure-of-arrays columns.
#[derive(Debug)]
pub struct ComponentStore {
    capacity: usize,
    allocator: IdAllocator,
    interner: Interner,
    components: Vec<ComponentDef>,
    component_lookup: FxHashMap<Sym, ComponentId>,
    columns: Vec<ColumnSet>,
    types: Vec<EntityTypeDef>,
    type_lookup: FxHashMap<Sym, EntityTypeId>,
    slots: Vec<SlotMeta>,
    by_type: Vec<BTreeSet<Entity>>,
    by_component: Vec<BTreeSet<Entity>>,
    by_client: FxHashMap<Sym, Entity>,
}

impl ComponentStore {
    /// Creates an empty store with the given entity capacity.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity: capacity as usize,
            allocator: IdAllocator::new(capacity),
            interner: Interner::new(),
            components: Vec::new(),
            component_lookup: FxHashMap::default(),
            columns: Vec::new(),
            types: Vec::new(),
            type_lookup: FxHashMap::default(),
            slots: vec![SlotMeta::default(); capacity as usize],
            by_type: Vec::new(),
            by_component: Vec::new(),
            by_client: FxHashMap::default(),
        }
    }

    /// Entity capacity this store was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shared access to the interner.
    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Mutable access to the interner (client registration, tooling).
    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    // ── Registration ───────────────────────────────────────────────

    /// Registers a named component with its field schema.
    ///
    /// `sync` marks the component as part of synchronised state; `false`
    /// makes it client-local, excluded from snapshots and the state hash.
    pub fn define_component(
        &mut self,
        name: &str,
        sync: bool,
        fields: Vec<FieldDef>,
    ) -> Result<ComponentId, StoreError> {
        let sym = self.interner.intern(Namespace::Component, name);
        if self.component_lookup.contains_key(&sym) {
            return Err(StoreError::DuplicateComponent(name.to_owned()));
        }
        if sync && fields.iter().any(|f| f.kind == FieldKind::F32) {
            telemetry::warn("f32_in_sync_component", name);
        }
        for field in &fields {
            self.interner.intern(Namespace::Field, &field.name);
            check_default(name, field)?;
        }

        let mut name_sorted: Vec<usize> = (0..fields.len()).collect();
        name_sorted.sort_by(|&a, &b| fields[a].name.cmp(&fields[b].name));

        let id = ComponentId(self.components.len() as u16);
        self.columns.push(ColumnSet::new(&fields, self.capacity));
        self.components.push(ComponentDef {
            name: name.to_owned(),
            sync,
            fields,
            name_sorted,
        });
        self.component_lookup.insert(sym, id);
        self.by_component.push(BTreeSet::new());
        Ok(id)
    }

    /// Begins an entity type definition; publish with
    /// [`EntityTypeBuilder::register`].
    #[must_use]
    pub fn define_entity(name: &str) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
    }

    pub(crate) fn register_entity_type(
        &mut self,
        builder: EntityTypeBuilder,
    ) -> Result<EntityTypeId, StoreError> {
        let sym = self.interner.intern(Namespace::EntityType, &builder.name);
        if self.type_lookup.contains_key(&sym) {
            return Err(StoreError::DuplicateEntityType(builder.name));
        }

        let mut allow = FxHashMap::default();
        for (component, field_names) in &builder.allows {
            let def = self
                .components
                .get(component.index())
                .ok_or_else(|| StoreError::UnknownComponent(format!("#{}", component.0)))?;
            let mut mask = vec![false; def.fields.len()];
            for field in field_names {
                let idx = def.field_index(field).ok_or_else(|| StoreError::UnknownField {
                    component: def.name.clone(),
                    field: field.clone(),
                })?;
                mask[idx] = true;
            }
            allow.insert(component.0, mask);
        }
        for component in &builder.components {
            if component.index() >= self.components.len() {
                return Err(StoreError::UnknownComponent(format!("#{}", component.0)));
            }
        }

        let id = EntityTypeId(self.types.len() as u16);
        self.types.push(EntityTypeDef {
            name: builder.name,
            components: builder.components,
            allow,
            on_restore: builder.on_restore,
        });
        self.type_lookup.insert(sym, id);
        self.by_type.push(BTreeSet::new());
        Ok(id)
    }

    /// Looks up a component id by name.
    #[must_use]
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        let sym = self.interner.lookup(Namespace::Component, name)?;
        self.component_lookup.get(&sym).copied()
    }

    /// Looks up an entity type id by name.
    #[must_use]
    pub fn entity_type_id(&self, name: &str) -> Option<EntityTypeId> {
        let sym = self.interner.lookup(Namespace::EntityType, name)?;
        self.type_lookup.get(&sym).copied()
    }

    /// Definition of a registered component.
    #[must_use]
    pub fn component_def(&self, id: ComponentId) -> &ComponentDef {
        &self.components[id.index()]
    }

    /// Definition of a registered entity type.
    #[must_use]
    pub fn entity_type_def(&self, id: EntityTypeId) -> &EntityTypeDef {
        &self.types[id.index()]
    }

    /// Registered components in registration order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &ComponentDef)> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, def)| (ComponentId(i as u16), def))
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Spawns an entity of a registered type.
    ///
    /// Defaults are written first, then `overrides` as
    /// `(component, field, value)` triples; `FieldValue::Num` values are
    /// converted once here.
    pub fn spawn(
        &mut self,
        type_id: EntityTypeId,
        overrides: &[(&str, &str, FieldValue)],
    ) -> Result<Entity, StoreError> {
        let entity = self.allocator.alloc()?;
        self.attach(entity, type_id);
        self.apply_overrides(entity, overrides)?;
        Ok(entity)
    }

    /// Spawns an entity with an externally chosen id (snapshot restore,
    /// authority-directed spawns).
    pub fn spawn_with_id(
        &mut self,
        type_id: EntityTypeId,
        entity: Entity,
        overrides: &[(&str, &str, FieldValue)],
    ) -> Result<(), StoreError> {
        if let Some(existing) = self.allocator.live_at(entity.index()) {
            if existing != entity {
                self.destroy(existing);
            }
        }
        self.allocator.alloc_at(entity)?;
        self.attach(entity, type_id);
        self.apply_overrides(entity, overrides)?;
        Ok(())
    }

    fn attach(&mut self, entity: Entity, type_id: EntityTypeId) {
        let row = entity.index() as usize;
        self.slots[row] = SlotMeta {
            type_id: type_id.0,
            client: None,
        };
        let components = self.types[type_id.index()].components.clone();
        for component in components {
            self.attach_component(entity, component);
        }
        self.by_type[type_id.index()].insert(entity);
    }

    fn attach_component(&mut self, entity: Entity, component: ComponentId) {
        let row = entity.index() as usize;
        self.columns[component.index()].set_present(row);
        for idx in 0..self.components[component.index()].fields.len() {
            // Defaults were validated at registration; the write cannot fail.
            let _ = write_value(
                &mut self.columns[component.index()].fields[idx],
                row,
                &self.components[component.index()].fields[idx].name,
                &self.components[component.index()].name,
                &self.components[component.index()].fields[idx].default,
            );
        }
        self.by_component[component.index()].insert(entity);
    }

    fn apply_overrides(
        &mut self,
        entity: Entity,
        overrides: &[(&str, &str, FieldValue)],
    ) -> Result<(), StoreError> {
        for (component, field, value) in overrides {
            let id = self
                .component_id(component)
                .ok_or_else(|| StoreError::UnknownComponent((*component).to_owned()))?;
            let def = &self.components[id.index()];
            let idx = def.field_index(field).ok_or_else(|| StoreError::UnknownField {
                component: def.name.clone(),
                field: (*field).to_owned(),
            })?;
            if !self.columns[id.index()].present(entity.index() as usize) {
                return Err(StoreError::MissingComponent {
                    entity,
                    component: (*component).to_owned(),
                });
            }
            write_value(
                &mut self.columns[id.index()].fields[idx],
                entity.index() as usize,
                &self.components[id.index()].fields[idx].name,
                &self.components[id.index()].name,
                value,
            )?;
        }
        Ok(())
    }

    /// Destroys an entity: clears presence bits, removes it from all query
    /// indices, unbinds its client, and returns the id to the allocator.
    ///
    /// Idempotent — destroying a stale handle is a no-op returning `false`.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_live(entity) {
            return false;
        }
        let row = entity.index() as usize;
        let meta = self.slots[row];
        let type_id = EntityTypeId(meta.type_id);
        // Sweep every column: dynamically added components may not be in the
        // type's declared set.
        for (idx, set) in self.columns.iter_mut().enumerate() {
            if set.present(row) {
                set.clear_present(row);
                self.by_component[idx].remove(&entity);
            }
        }
        self.by_type[type_id.index()].remove(&entity);
        if let Some(client) = meta.client {
            self.by_client.remove(&client);
        }
        self.slots[row] = SlotMeta::default();
        self.allocator.free(entity)
    }

    /// Returns `true` when the handle refers to a live entity.
    #[must_use]
    pub fn is_live(&self, entity: Entity) -> bool {
        self.allocator.is_live(entity)
    }

    /// Entity type of a live entity.
    pub fn type_of(&self, entity: Entity) -> Result<EntityTypeId, StoreError> {
        if !self.allocator.is_live(entity) {
            return Err(StoreError::StaleHandle(entity));
        }
        Ok(EntityTypeId(self.slots[entity.index() as usize].type_id))
    }

    /// Live entities in ascending id order.
    #[must_use]
    pub fn live_entities(&self) -> Vec<Entity> {
        let mut live: Vec<Entity> = self.allocator.iter_live().collect();
        live.sort_by_key(|e| e.raw());
        live
    }

    /// Count of live entities.
    #[must_use]
    pub fn live_count(&self) -> u32 {
        self.allocator.live_count()
    }

    // ── Component membership ───────────────────────────────────────

    /// Returns `true` when a live entity carries the component.
    #[must_use]
    pub fn has(&self, entity: Entity, component: ComponentId) -> bool {
        self.allocator.is_live(entity)
            && self.columns[component.index()].present(entity.index() as usize)
    }

    /// Adds a component (with defaults) to a live entity.
    pub fn add_component(
        &mut self,
        entity: Entity,
        component: ComponentId,
    ) -> Result<(), StoreError> {
        if !self.allocator.is_live(entity) {
            return Err(StoreError::StaleHandle(entity));
        }
        if !self.columns[component.index()].present(entity.index() as usize) {
            self.attach_component(entity, component);
        }
        Ok(())
    }

    /// Removes a component from a live entity.
    pub fn remove_component(
        &mut self,
        entity: Entity,
        component: ComponentId,
    ) -> Result<(), StoreError> {
        if !self.allocator.is_live(entity) {
            return Err(StoreError::StaleHandle(entity));
        }
        let row = entity.index() as usize;
        if self.columns[component.index()].present(row) {
            self.columns[component.index()].clear_present(row);
            self.by_component[component.index()].remove(&entity);
        }
        Ok(())
    }

    // ── Client bindings ────────────────────────────────────────────

    /// Binds an interned client id to a live entity.
    ///
    /// Bindings are single-valued: binding a client that already points at a
    /// different live entity is an error, never last-write-wins.
    pub fn bind_client(&mut self, entity: Entity, client: Sym) -> Result<(), StoreError> {
        if !self.allocator.is_live(entity) {
            return Err(StoreError::StaleHandle(entity));
        }
        if let Some(&existing) = self.by_client.get(&client) {
            if existing != entity {
                return Err(StoreError::DuplicateClientBinding);
            }
            return Ok(());
        }
        self.slots[entity.index() as usize].client = Some(client);
        self.by_client.insert(client, entity);
        Ok(())
    }

    /// O(1) lookup of the entity owned by a client.
    #[must_use]
    pub fn entity_for_client(&self, client: Sym) -> Option<Entity> {
        self.by_client.get(&client).copied()
    }

    /// Client bound to an entity, when any.
    #[must_use]
    pub fn client_of(&self, entity: Entity) -> Option<Sym> {
        if !self.allocator.is_live(entity) {
            return None;
        }
        self.slots[entity.index() as usize].client
    }

    // ── Typed accessors ────────────────────────────────────────────

    /// Reads a fixed-point field.
    pub fn fixed(
        &self,
        entity: Entity,
        component: ComponentId,
        field: &str,
    ) -> Result<Fx, StoreError> {
        let idx = self.resolve_field(component, field)?;
        self.fixed_at(entity, component, idx)
    }

    /// Writes a fixed-point field.
    pub fn set_fixed(
        &mut self,
        entity: Entity,
        component: ComponentId,
        field: &str,
        value: Fx,
    ) -> Result<(), StoreError> {
        let idx = self.resolve_field(component, field)?;
        self.set_fixed_at(entity, component, idx, value)
    }

    /// Reads a fixed-point field by resolved index (hot path).
    pub fn fixed_at(
        &self,
        entity: Entity,
        component: ComponentId,
        field: usize,
    ) -> Result<Fx, StoreError> {
        let row = self.check_present(entity, component)?;
        match &self.columns[component.index()].fields[field] {
            ColumnData::Fixed(v) => Ok(Fx::from_raw(v[row])),
            _ => Err(self.field_type_error(component, field, "fixed")),
        }
    }

    /// Writes a fixed-point field by resolved index (hot path).
    pub fn set_fixed_at(
        &mut self,
        entity: Entity,
        component: ComponentId,
        field: usize,
        value: Fx,
    ) -> Result<(), StoreError> {
        let row = self.check_present(entity, component)?;
        match &mut self.columns[component.index()].fields[field] {
            ColumnData::Fixed(v) => {
                v[row] = value.raw();
                Ok(())
            }
            _ => Err(self.field_type_error(component, field, "fixed")),
        }
    }

    /// Reads a byte field.
    pub fn byte(
        &self,
        entity: Entity,
        component: ComponentId,
        field: &str,
    ) -> Result<u8, StoreError> {
        let idx = self.resolve_field(component, field)?;
        let row = self.check_present(entity, component)?;
        match &self.columns[component.index()].fields[idx] {
            ColumnData::U8(v) => Ok(v[row]),
            _ => Err(self.field_type_error(component, idx, "u8")),
        }
    }

    /// Writes a byte field.
    pub fn set_byte(
        &mut self,
        entity: Entity,
        component: ComponentId,
        field: &str,
        value: u8,
    ) -> Result<(), StoreError> {
        let idx = self.resolve_field(component, field)?;
        let row = self.check_present(entity, component)?;
        match &mut self.columns[component.index()].fields[idx] {
            ColumnData::U8(v) => {
                v[row] = value;
                Ok(())
            }
            _ => Err(self.field_type_error(component, idx, "u8")),
        }
    }

    /// Reads a boolean field.
    pub fn flag(
        &self,
        entity: Entity,
        component: ComponentId,
        field: &str,
    ) -> Result<bool, StoreError> {
        let idx = self.resolve_field(component, field)?;
        let row = self.check_present(entity, component)?;
        match &self.columns[component.index()].fields[idx] {
            ColumnData::Bool(v) => Ok(v[row] != 0),
            _ => Err(self.field_type_error(component, idx, "bool")),
        }
    }

    /// Writes a boolean field.
    pub fn set_flag(
        &mut self,
        entity: Entity,
        component: ComponentId,
        field: &str,
        value: bool,
    ) -> Result<(), StoreError> {
        let idx = self.resolve_field(component, field)?;
        let row = self.check_present(entity, component)?;
        match &mut self.columns[component.index()].fields[idx] {
            ColumnData::Bool(v) => {
                v[row] = u8::from(value);
                Ok(())
            }
            _ => Err(self.field_type_error(component, idx, "bool")),
        }
    }

    /// Reads a render-only float field.
    pub fn float(
        &self,
        entity: Entity,
        component: ComponentId,
        field: &str,
    ) -> Result<f32, StoreError> {
        let idx = self.resolve_field(component, field)?;
        let row = self.check_present(entity, component)?;
        match &self.columns[component.index()].fields[idx] {
            ColumnData::F32(v) => Ok(v[row]),
            _ => Err(self.field_type_error(component, idx, "f32")),
        }
    }

    /// Writes a render-only float field.
    pub fn set_float(
        &mut self,
        entity: Entity,
        component: ComponentId,
        field: &str,
        value: f32,
    ) -> Result<(), StoreError> {
        let idx = self.resolve_field(component, field)?;
        let row = self.check_present(entity, component)?;
        match &mut self.columns[component.index()].fields[idx] {
            ColumnData::F32(v) => {
                v[row] = value;
                Ok(())
            }
            _ => Err(self.field_type_error(component, idx, "f32")),
        }
    }

    fn resolve_field(&self, component: ComponentId, field: &str) -> Result<usize, StoreError> {
        let def = &self.components[component.index()];
        def.field_index(field).ok_or_else(|| StoreError::UnknownField {
            component: def.name.clone(),
            field: field.to_owned(),
        })
    }

    fn check_present(&self, entity: Entity, component: ComponentId) -> Result<usize, StoreError> {
        if !self.allocator.is_live(entity) {
            return Err(StoreError::StaleHandle(entity));
        }
        let row = entity.index() as usize;
        if !self.columns[component.index()].present(row) {
            return Err(StoreError::MissingComponent {
                entity,
                component: self.components[component.index()].name.clone(),
            });
        }
        Ok(row)
    }

    fn field_type_error(
        &self,
        component: ComponentId,
        field: usize,
        expected: &'static str,
    ) -> StoreError {
        let def = &self.components[component.index()];
        StoreError::FieldType {
            component: def.name.clone(),
            field: def.fields[field].name.clone(),
            expected,
        }
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Entities carrying every listed component, ascending id order.
    ///
    /// The candidate list is captured up front; callers that destroy entities
    /// mid-iteration observe `StaleHandle` on access rather than a skewed
    /// iteration.
    #[must_use]
    pub fn query(&self, components: &[ComponentId]) -> Vec<Entity> {
        let Some(probe) = components
            .iter()
            .min_by_key(|c| self.by_component[c.index()].len())
        else {
            return Vec::new();
        };
        self.by_component[probe.index()]
            .iter()
            .copied()
            .filter(|&e| {
                components
                    .iter()
                    .all(|c| self.columns[c.index()].present(e.index() as usize))
            })
            .collect()
    }

    /// Entities of a type, intersected with every listed component,
    /// ascending id order.
    #[must_use]
    pub fn query_type(&self, type_id: EntityTypeId, components: &[ComponentId]) -> Vec<Entity> {
        let type_set = &self.by_type[type_id.index()];
        let smaller_component = components
            .iter()
            .min_by_key(|c| self.by_component[c.index()].len());

        let probe: &BTreeSet<Entity> = match smaller_component {
            Some(c) if self.by_component[c.index()].len() < type_set.len() => {
                &self.by_component[c.index()]
            }
            _ => type_set,
        };

        probe
            .iter()
            .copied()
            .filter(|&e| {
                self.slots[e.index() as usize].type_id == type_id.0
                    && type_set.contains(&e)
                    && components
                        .iter()
                        .all(|c| self.columns[c.index()].present(e.index() as usize))
            })
            .collect()
    }

    // ── Restore support (crate-internal) ───────────────────────────

    pub(crate) fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    pub(crate) fn allocator_mut(&mut self) -> &mut IdAllocator {
        &mut self.allocator
    }

    pub(crate) fn column_set(&self, component: ComponentId) -> &ColumnSet {
        &self.columns[component.index()]
    }

    pub(crate) fn column_set_mut(&mut self, component: ComponentId) -> &mut ColumnSet {
        &mut self.columns[component.index()]
    }

    /// Clears every live entity's presence bits, indices, and client binding
    /// without touching the allocator.
    pub(crate) fn clear_live(&mut self) {
        let live: Vec<Entity> = self.allocator.iter_live().collect();
        for entity in live {
            let row = entity.index() as usize;
            for (idx, set) in self.columns.iter_mut().enumerate() {
                if set.present(row) {
                    set.clear_present(row);
                    self.by_component[idx].remove(&entity);
                }
            }
            let type_id = self.slots[row].type_id as usize;
            if type_id < self.by_type.len() {
                self.by_type[type_id].remove(&entity);
            }
            if let Some(client) = self.slots[row].client {
                self.by_client.remove(&client);
            }
            self.slots[row] = SlotMeta::default();
        }
    }

    /// Re-attaches an entity whose slot the restored allocator already marks
    /// occupied: metadata, presence bits, defaults, and indices.
    pub(crate) fn restore_entity(
        &mut self,
        entity: Entity,
        type_id: EntityTypeId,
        client: Option<Sym>,
    ) -> Result<(), StoreError> {
        self.attach(entity, type_id);
        if let Some(client) = client {
            self.bind_client(entity, client)?;
        }
        Ok(())
    }

    /// Restore hook registered for a type, when any.
    pub(crate) fn restore_hook(&self, type_id: EntityTypeId) -> Option<RestoreHook> {
        self.types[type_id.index()].on_restore
    }
}

fn check_default(component: &str, field: &FieldDef) -> Result<(), StoreError> {
    let ok = matches!(
        (field.kind, &field.default),
        (FieldKind::Fixed, FieldValue::Fixed(_) | FieldValue::Num(_))
            | (FieldKind::U8, FieldValue::U8(_) | FieldValue::Num(_))
            | (FieldKind::Bool, FieldValue::Bool(_))
            | (FieldKind::F32, FieldValue::F32(_) | FieldValue::Num(_))
    );
    if ok {
        Ok(())
    } else {
        Err(StoreError::FieldType {
            component: component.to_owned(),
            field: field.name.clone(),
            expected: kind_name(field.kind),
        })
    }
}

const fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Fixed => "fixed",
        FieldKind::U8 => "u8",
        FieldKind::Bool => "bool",
        FieldKind::F32 => "f32",
    }
}

fn write_value(
    column: &mut ColumnData,
    row: usize,
    field: &str,
    component: &str,
    value: &FieldValue,
) -> Result<(), StoreError> {
    match (column, value) {
        (ColumnData::Fixed(v), FieldValue::Fixed(fx)) => {
            v[row] = fx.raw();
            Ok(())
        }
        (ColumnData::Fixed(v), FieldValue::Num(n)) => {
            v[row] = Fx::from_num(*n).raw();
            Ok(())
        }
        (ColumnData::U8(v), FieldValue::U8(b)) => {
            v[row] = *b;
            Ok(())
        }
        (ColumnData::U8(v), FieldValue::Num(n)) => {
            v[row] = n.round().clamp(0.0, 255.0) as u8;
            Ok(())
        }
        (ColumnData::Bool(v), FieldValue::Bool(b)) => {
            v[row] = u8::from(*b);
            Ok(())
        }
        (ColumnData::F32(v), FieldValue::F32(f)) => {
            v[row] = *f;
            Ok(())
        }
        (ColumnData::F32(v), FieldValue::Num(n)) => {
            v[row] = *n as f32;
            Ok(())
        }
        (column, _) => Err(StoreError::FieldType {
            component: component.to_owned(),
            field: field.to_owned(),
            expected: match column {
                ColumnData::Fixed(_) => "fixed",
                ColumnData::U8(_) => "u8",
                ColumnData::Bool(_) => "bool",
                ColumnData::F32(_) => "f32",
            },
        }),
    }
}
