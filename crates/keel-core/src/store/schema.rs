// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Component and entity-type schema definitions.
//!
//! Field types are the closed semantic set `{Fixed, U8, Bool, F32}`. `F32`
//! is reserved for render-only state: it must never appear in synchronised
//! state, is excluded from snapshots and the state hash, and declaring one on
//! a sync component raises a telemetry warning.

use rustc_hash::FxHashMap;

use crate::ident::Entity;
use crate::math::Fx;

use super::ComponentStore;

/// Semantic type of a component field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Q16.16 fixed-point scalar stored as its raw `i32`.
    Fixed,
    /// Unsigned byte.
    U8,
    /// Boolean stored as one byte.
    Bool,
    /// Render-only binary32 float; never synchronised.
    F32,
}

impl FieldKind {
    /// Packed element width in bytes for the snapshot codec.
    ///
    /// `F32` never reaches the codec; its nominal width is still defined so
    /// tooling can size raw columns.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Fixed | Self::F32 => 4,
            Self::U8 | Self::Bool => 1,
        }
    }
}

/// A field value used for defaults and spawn overrides.
///
/// `Num` carries a native float accepted at the boundary and converted once
/// (at registration or spawn) according to the field's [`FieldKind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Exact fixed-point value.
    Fixed(Fx),
    /// Boundary float, converted per field kind.
    Num(f64),
    /// Byte value.
    U8(u8),
    /// Boolean value.
    Bool(bool),
    /// Render-only float value.
    F32(f32),
}

/// Definition of a single component field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) default: FieldValue,
}

impl FieldDef {
    /// A Q16.16 field with a numeric default.
    #[must_use]
    pub fn fixed(name: &str, default: f64) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::Fixed,
            default: FieldValue::Num(default),
        }
    }

    /// A byte field.
    #[must_use]
    pub fn u8(name: &str, default: u8) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::U8,
            default: FieldValue::U8(default),
        }
    }

    /// A boolean field.
    #[must_use]
    pub fn flag(name: &str, default: bool) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::Bool,
            default: FieldValue::Bool(default),
        }
    }

    /// A render-only float field.
    #[must_use]
    pub fn f32(name: &str, default: f32) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::F32,
            default: FieldValue::F32(default),
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// Compact handle for a registered component.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u16);

impl ComponentId {
    /// Index into the registration table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Compact handle for a registered entity type.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityTypeId(pub(crate) u16);

impl EntityTypeId {
    /// Index into the registration table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registered component: name, sync policy, and field layout.
#[derive(Debug, Clone)]
pub struct ComponentDef {
    pub(crate) name: String,
    pub(crate) sync: bool,
    pub(crate) fields: Vec<FieldDef>,
    /// Field indices sorted by field name; the state-hash fold order.
    pub(crate) name_sorted: Vec<usize>,
}

impl ComponentDef {
    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the component participates in snapshots and the state hash.
    #[must_use]
    pub fn sync(&self) -> bool {
        self.sync
    }

    /// Field definitions in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Position of a field by name.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Per-type restore hook, invoked after a snapshot restore to rebuild
/// non-synced (render-only) fields.
pub type RestoreHook = fn(&mut ComponentStore, Entity);

/// Registered entity type: its component set and sync allow-lists.
#[derive(Debug, Clone)]
pub struct EntityTypeDef {
    pub(crate) name: String,
    pub(crate) components: Vec<ComponentId>,
    /// Per-component sync mask aligned to field order; absent means all
    /// fields sync.
    pub(crate) allow: FxHashMap<u16, Vec<bool>>,
    pub(crate) on_restore: Option<RestoreHook>,
}

impl EntityTypeDef {
    /// Entity type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component set in declaration order.
    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Sync mask for a component, when an allow-list was declared.
    #[must_use]
    pub fn allow_mask(&self, component: ComponentId) -> Option<&[bool]> {
        self.allow.get(&component.0).map(Vec::as_slice)
    }
}

/// Builder that accumulates an entity type definition before publication.
#[derive(Debug)]
pub struct EntityTypeBuilder {
    pub(crate) name: String,
    pub(crate) components: Vec<ComponentId>,
    pub(crate) allows: Vec<(ComponentId, Vec<String>)>,
    pub(crate) on_restore: Option<RestoreHook>,
}

impl EntityTypeBuilder {
    /// Starts a definition for the named entity type.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            components: Vec::new(),
            allows: Vec::new(),
            on_restore: None,
        }
    }

    /// Adds a component to the type.
    #[must_use]
    pub fn component(mut self, component: ComponentId) -> Self {
        self.components.push(component);
        self
    }

    /// Restricts which of a component's fields synchronise for this type.
    #[must_use]
    pub fn sync_fields(mut self, component: ComponentId, fields: &[&str]) -> Self {
        self.allows.push((
            component,
            fields.iter().map(|f| (*f).to_owned()).collect(),
        ));
        self
    }

    /// Installs a post-restore hook for rebuilding non-synced fields.
    #[must_use]
    pub fn on_restore(mut self, hook: RestoreHook) -> Self {
        self.on_restore = Some(hook);
        self
    }

    /// Publishes the definition into the store.
    pub fn register(
        self,
        store: &mut ComponentStore,
    ) -> Result<EntityTypeId, super::StoreError> {
        store.register_entity_type(self)
    }
}
