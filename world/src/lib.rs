#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the LionEngine simulation core.
//!
//! The world owns the tile map and every entity. Map edits arrive as
//! [`Command`] values through [`apply`] between ticks; entity lifecycle calls
//! come from the production glue, which needs the spawned identifier back
//! immediately.

mod config;
mod factory;
mod handler;
mod map;

use lionengine_core::{
    Command, ConfigError, EntityId, EntityKind, Event, PlacementError, PlayerId, TileCoord,
    TileRect,
};
use log::{debug, warn};
use thiserror::Error;

pub use config::{
    CategoryConfig, CollisionConfig, CollisionSet, ConstraintConfig, FormulaConfig,
    FunctionConfig, GroupConfig, LegendEntry, MapConfig, RangeConfig,
};
pub use factory::Factory;
pub use handler::{Entity, Handler};
pub use map::{Tile, TileMap};

/// Errors raised by world construction and entity lifecycle calls.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A map was requested with a zero dimension.
    #[error("map dimensions must be non-zero")]
    ZeroDimension,
    /// A kind name was registered twice.
    #[error("entity kind '{0}' is already registered")]
    DuplicateKind(String),
    /// No constructor is registered for the kind.
    #[error("no constructor registered for entity kind {0:?}")]
    UnknownKind(EntityKind),
}

/// Errors raised while loading definitions from text.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The text is not valid TOML for the expected layout.
    #[error("could not parse definitions: {0}")]
    Toml(#[from] toml::de::Error),
    /// A definition failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The map could not be built.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The layout does not fit the grid index range.
    #[error("map layout is too large")]
    LayoutTooLarge,
    /// The layout uses a character missing from the legend.
    #[error("layout symbol '{0}' is not in the legend")]
    UnknownSymbol(char),
    /// A tile from the layout could not be placed.
    #[error("could not place tile at {coord:?}: {reason:?}")]
    Placement {
        /// Location of the tile.
        coord: TileCoord,
        /// Reason reported by the map.
        reason: PlacementError,
    },
}

/// Represents the authoritative world state.
#[derive(Debug)]
pub struct World {
    map: TileMap,
    handler: Handler,
    factory: Factory,
}

impl World {
    /// Creates a world around an existing map and entity factory.
    #[must_use]
    pub fn new(map: TileMap, factory: Factory) -> Self {
        Self {
            map,
            handler: Handler::new(),
            factory,
        }
    }

    /// Builds an inactive entity of `kind` covering `footprint`.
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        footprint: TileRect,
    ) -> Result<EntityId, WorldError> {
        let id = self.handler.allocate_id();
        let entity = self.factory.create(kind, id, footprint)?;
        self.handler.insert(entity);
        debug!("spawned inactive entity {} of kind {}", id.get(), kind.get());
        Ok(id)
    }

    /// Activates an entity and hands it to `owner`.
    pub fn activate(&mut self, id: EntityId, owner: PlayerId) -> bool {
        self.handler.activate(id, owner)
    }

    /// Moves an entity onto `footprint`.
    pub fn relocate(&mut self, id: EntityId, footprint: TileRect) -> bool {
        let moved = self.handler.relocate(id, footprint);
        if moved {
            debug!("moved entity {} to {:?}", id.get(), footprint.origin());
        }
        moved
    }

    /// Removes an entity from the world.
    pub fn discard(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.handler.remove(id);
        if removed.is_some() {
            debug!("discarded entity {}", id.get());
        }
        removed
    }

    /// Applies damages to an entity, returning its remaining life.
    pub fn damage(&mut self, id: EntityId, amount: u32) -> Option<u32> {
        self.handler.damage(id, amount)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PlaceTile {
            coord,
            sheet,
            number,
            group,
        } => {
            if let Some(group) = group.as_deref() {
                let violation = world.map.constraint_violations(coord, group).into_iter().next();
                if let Some(reason) = violation {
                    warn!("tile placement at {coord:?} rejected: {reason:?}");
                    out_events.push(Event::TilePlacementRejected { coord, reason });
                    return;
                }
            }
            match world.map.place(Tile::new(coord, sheet, number, group)) {
                Ok(_) => out_events.push(Event::TilePlaced { coord }),
                Err(reason) => {
                    warn!("tile placement at {coord:?} rejected: {reason:?}");
                    out_events.push(Event::TilePlacementRejected { coord, reason });
                }
            }
        }
        Command::RemoveTile { coord } => {
            if world.map.remove(coord).is_some() {
                out_events.push(Event::TileRemoved { coord });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use lionengine_core::{EntityId, EntityKind};

    use super::{Entity, TileMap, World};

    /// Provides read-only access to the tile map.
    #[must_use]
    pub fn map(world: &World) -> &TileMap {
        &world.map
    }

    /// Looks up an entity, active or not.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<&Entity> {
        world.handler.get(id)
    }

    /// Iterator over every entity in identifier order.
    pub fn entities(world: &World) -> impl Iterator<Item = &Entity> {
        world.handler.iter()
    }

    /// Reports whether the entity exists, is active and still has life.
    #[must_use]
    pub fn is_alive(world: &World, id: EntityId) -> bool {
        world
            .handler
            .get(id)
            .is_some_and(|entity| entity.is_active() && entity.is_alive())
    }

    /// Tile distance between the footprints of two entities.
    #[must_use]
    pub fn distance_in_tiles(world: &World, from: EntityId, to: EntityId) -> Option<u32> {
        let from = world.handler.get(from)?;
        let to = world.handler.get(to)?;
        Some(from.footprint().distance_in_tiles(&to.footprint()))
    }

    /// Kind registered under `name`.
    #[must_use]
    pub fn kind(world: &World, name: &str) -> Option<EntityKind> {
        world.factory.kind(name)
    }

    /// Name of a registered kind.
    #[must_use]
    pub fn kind_name(world: &World, kind: EntityKind) -> Option<&str> {
        world.factory.name(kind)
    }
}
