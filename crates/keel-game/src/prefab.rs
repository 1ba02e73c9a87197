// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Prefab registry: named entity builders.

use keel_core::ident::Entity;
use keel_core::store::StoreError;
use keel_core::World;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// A named builder that spawns a fully configured entity.
pub type PrefabFn = Box<dyn Fn(&mut World) -> Result<Entity, StoreError>>;

/// Errors from prefab operations.
#[derive(Debug, Error)]
pub enum PrefabError {
    /// A prefab name was registered twice.
    #[error("duplicate prefab: {0}")]
    Duplicate(String),
    /// Spawn of an unregistered prefab name.
    #[error("unknown prefab: {0}")]
    Unknown(String),
    /// The builder itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registry `name → builder`.
#[derive(Default)]
pub struct PrefabRegistry {
    map: FxHashMap<String, PrefabFn>,
}

impl PrefabRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prefab builder under a name.
    pub fn register(
        &mut self,
        name: &str,
        build: impl Fn(&mut World) -> Result<Entity, StoreError> + 'static,
    ) -> Result<(), PrefabError> {
        if self.map.contains_key(name) {
            return Err(PrefabError::Duplicate(name.to_owned()));
        }
        self.map.insert(name.to_owned(), Box::new(build));
        Ok(())
    }

    /// Spawns a prefab into the world.
    pub fn spawn(&self, world: &mut World, name: &str) -> Result<Entity, PrefabError> {
        let build = self
            .map
            .get(name)
            .ok_or_else(|| PrefabError::Unknown(name.to_owned()))?;
        Ok(build(world)?)
    }

    /// Registered prefab names in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl core::fmt::Debug for PrefabRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrefabRegistry")
            .field("names", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}
