//! Registry of entity constructors keyed by kind.

use std::collections::BTreeMap;

use lionengine_core::{EntityId, EntityKind, TileRect};

use crate::{Entity, WorldError};

type Constructor = Box<dyn Fn(EntityId, EntityKind, TileRect) -> Entity>;

/// Maps entity kinds to the closures that build them.
///
/// Kinds are allocated in registration order, starting at zero.
#[derive(Default)]
pub struct Factory {
    kinds: BTreeMap<String, EntityKind>,
    entries: Vec<FactoryEntry>,
}

struct FactoryEntry {
    name: String,
    constructor: Constructor,
}

impl Factory {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under `name`, returning the allocated kind.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        constructor: F,
    ) -> Result<EntityKind, WorldError>
    where
        F: Fn(EntityId, EntityKind, TileRect) -> Entity + 'static,
    {
        let name = name.into();
        if self.kinds.contains_key(&name) {
            return Err(WorldError::DuplicateKind(name));
        }
        let raw = u32::try_from(self.entries.len())
            .map_err(|_| WorldError::DuplicateKind(name.clone()))?;
        let kind = EntityKind::new(raw);
        let _ = self.kinds.insert(name.clone(), kind);
        self.entries.push(FactoryEntry {
            name,
            constructor: Box::new(constructor),
        });
        Ok(kind)
    }

    /// Registers a kind whose entities start with `life` points.
    pub fn register_unit(
        &mut self,
        name: impl Into<String>,
        life: u32,
    ) -> Result<EntityKind, WorldError> {
        self.register(name, move |id, kind, footprint| {
            Entity::new(id, kind, footprint, life)
        })
    }

    /// Kind registered under `name`.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<EntityKind> {
        self.kinds.get(name).copied()
    }

    /// Name a kind was registered under.
    #[must_use]
    pub fn name(&self, kind: EntityKind) -> Option<&str> {
        self.entry(kind).map(|entry| entry.name.as_str())
    }

    /// Builds an entity of `kind`.
    pub fn create(
        &self,
        kind: EntityKind,
        id: EntityId,
        footprint: TileRect,
    ) -> Result<Entity, WorldError> {
        let entry = self.entry(kind).ok_or(WorldError::UnknownKind(kind))?;
        Ok((entry.constructor)(id, kind, footprint))
    }

    fn entry(&self, kind: EntityKind) -> Option<&FactoryEntry> {
        usize::try_from(kind.get())
            .ok()
            .and_then(|index| self.entries.get(index))
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory").field("kinds", &self.kinds).finish()
    }
}
