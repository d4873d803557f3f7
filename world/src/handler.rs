//! Entity storage and identifier allocation.

use std::collections::BTreeMap;

use lionengine_core::{EntityId, EntityKind, PlayerId, TileRect};

/// Entity stored inside the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    footprint: TileRect,
    life: u32,
    owner: Option<PlayerId>,
    active: bool,
}

impl Entity {
    /// Creates an inactive, unowned entity.
    #[must_use]
    pub const fn new(id: EntityId, kind: EntityKind, footprint: TileRect, life: u32) -> Self {
        Self {
            id,
            kind,
            footprint,
            life,
            owner: None,
            active: false,
        }
    }

    /// Identifier allocated by the handler.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Kind the entity was built from.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Tiles covered by the entity.
    #[must_use]
    pub const fn footprint(&self) -> TileRect {
        self.footprint
    }

    /// Remaining life points.
    #[must_use]
    pub const fn life(&self) -> u32 {
        self.life
    }

    /// Player owning the entity once activated.
    #[must_use]
    pub const fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    /// Inactive entities exist but do not take part in the simulation yet.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Alive entities still have life points.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.life > 0
    }
}

/// Registry that stores entities and manages identifier allocation.
#[derive(Debug)]
pub struct Handler {
    entries: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler {
    /// Creates an empty handler with a reset identifier counter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: EntityId::new(0),
        }
    }

    /// Reserves the identifier the next inserted entity will use.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id = EntityId::new(id.get().saturating_add(1));
        id
    }

    /// Stores an entity built with an identifier from
    /// [`Handler::allocate_id`].
    pub fn insert(&mut self, entity: Entity) {
        let _ = self.entries.insert(entity.id(), entity);
    }

    /// Activates the entity and assigns its owner. Returns `false` when the
    /// entity does not exist.
    pub fn activate(&mut self, id: EntityId, owner: PlayerId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entity) => {
                entity.active = true;
                entity.owner = Some(owner);
                true
            }
            None => false,
        }
    }

    /// Moves the entity onto `footprint`. Returns `false` when the entity
    /// does not exist.
    pub fn relocate(&mut self, id: EntityId, footprint: TileRect) -> bool {
        match self.entries.get_mut(&id) {
            Some(entity) => {
                entity.footprint = footprint;
                true
            }
            None => false,
        }
    }

    /// Removes the entity, returning it.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entries.remove(&id)
    }

    /// Subtracts `amount` life points, returning the life left.
    pub fn damage(&mut self, id: EntityId, amount: u32) -> Option<u32> {
        let entity = self.entries.get_mut(&id)?;
        entity.life = entity.life.saturating_sub(amount);
        Some(entity.life)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entries.get(&id)
    }

    /// Iterator over every entity in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.values()
    }

    /// Number of stored entities, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the handler holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
