// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Collision handler registry.
//!
//! Handlers are keyed by `(entity type, entity type)` and dispatched in the
//! physics world's label-sorted event order, so gameplay responses replay
//! identically during resimulation. Same-type handlers fire twice with
//! swapped arguments; cross-type keys fire once per registered direction.

use keel_core::ident::Entity;
use keel_core::physics::ContactEvent;
use keel_core::store::EntityTypeId;
use keel_core::World;
use rustc_hash::FxHashMap;

/// A gameplay collision response.
pub type CollisionHandler = Box<dyn FnMut(&mut World, Entity, Entity, &ContactEvent)>;

/// Registry of collision handlers keyed by entity-type pair.
#[derive(Default)]
pub struct CollisionHandlers {
    map: FxHashMap<(EntityTypeId, EntityTypeId), CollisionHandler>,
}

impl CollisionHandlers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for contacts between two entity types.
    ///
    /// Registration order is the caller's concern; the key is directional,
    /// so `(a, b)` and `(b, a)` may hold distinct handlers.
    pub fn register(
        &mut self,
        a: EntityTypeId,
        b: EntityTypeId,
        handler: impl FnMut(&mut World, Entity, Entity, &ContactEvent) + 'static,
    ) {
        self.map.insert((a, b), Box::new(handler));
    }

    /// Number of registered handler keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Dispatches one event to the matching handlers.
    ///
    /// Same-type contacts invoke the handler twice with swapped arguments.
    pub fn dispatch(&mut self, world: &mut World, event: &ContactEvent) {
        let (Ok(type_a), Ok(type_b)) = (
            world.store.type_of(event.entity_a),
            world.store.type_of(event.entity_b),
        ) else {
            return;
        };

        if type_a == type_b {
            if let Some(handler) = self.map.get_mut(&(type_a, type_a)) {
                handler(world, event.entity_a, event.entity_b, event);
                handler(world, event.entity_b, event.entity_a, event);
            }
            return;
        }

        if let Some(handler) = self.map.get_mut(&(type_a, type_b)) {
            handler(world, event.entity_a, event.entity_b, event);
        }
        if let Some(handler) = self.map.get_mut(&(type_b, type_a)) {
            handler(world, event.entity_b, event.entity_a, event);
        }
    }
}

impl core::fmt::Debug for CollisionHandlers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollisionHandlers")
            .field("keys", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}
