#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the LionEngine simulation core.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the per-tick systems and embedding applications. The world owns tiles and
//! entities, systems advance their state machines once per tick and report
//! what happened as [`Event`] values, and applications fan those events out
//! through an [`EventBus`] to whatever reacts to them.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bus;
pub mod collision;
pub mod map;

pub use bus::{EventBus, Subscriber};
pub use collision::{
    CollisionCategory, CollisionConstraint, CollisionFormula, CollisionFunction, CollisionGroup,
    CollisionRange,
};
pub use map::TileMapView;

/// Lowest frame index an animation may reference.
pub const MINIMUM_FRAME: u32 = 1;

/// Unique identifier assigned to an entity by the world handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of the player owning an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Type of entity a factory knows how to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKind(u32);

impl EntityKind {
    /// Creates a new kind identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the kind.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single map tile expressed as column and row indices.
///
/// Rows grow upwards: row zero is the bottom of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the neighbouring coordinate in the provided orientation, if it
    /// does not underflow the grid origin.
    #[must_use]
    pub fn neighbor(self, orientation: Orientation) -> Option<TileCoord> {
        let (dx, dy) = orientation.offset();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(TileCoord::new(column, row))
    }
}

/// Size of a [`TileRect`] measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSize {
    width: u32,
    height: u32,
}

impl TileSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Axis-aligned rectangle expressed in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    origin: TileCoord,
    size: TileSize,
}

impl TileRect {
    /// Constructs a rectangle from its bottom-left tile and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: TileCoord, size: TileSize) -> Self {
        Self { origin, size }
    }

    /// Bottom-left tile that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> TileCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole tiles.
    #[must_use]
    pub const fn size(&self) -> TileSize {
        self.size
    }

    /// Distance in tiles between the closest tiles of two footprints.
    ///
    /// Overlapping footprints report zero and adjacent ones one; otherwise the
    /// larger of the horizontal and vertical column or row differences is
    /// returned.
    #[must_use]
    pub fn distance_in_tiles(&self, other: &TileRect) -> u32 {
        let gap_x = axis_gap(
            self.origin.column,
            self.size.width,
            other.origin.column,
            other.size.width,
        );
        let gap_y = axis_gap(
            self.origin.row,
            self.size.height,
            other.origin.row,
            other.size.height,
        );
        gap_x.max(gap_y)
    }
}

fn axis_gap(start_a: u32, len_a: u32, start_b: u32, len_b: u32) -> u32 {
    let end_a = start_a.saturating_add(len_a.max(1) - 1);
    let end_b = start_b.saturating_add(len_b.max(1) - 1);
    if end_a < start_b {
        start_b - end_a
    } else if end_b < start_a {
        start_a - end_b
    } else {
        0
    }
}

/// Axis tested by a collision formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal axis.
    X,
    /// Vertical axis, growing upwards.
    Y,
}

/// Compass orientation of a neighbouring tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Tile above.
    North,
    /// Tile above and to the right.
    NorthEast,
    /// Tile to the right.
    East,
    /// Tile below and to the right.
    SouthEast,
    /// Tile below.
    South,
    /// Tile below and to the left.
    SouthWest,
    /// Tile to the left.
    West,
    /// Tile above and to the left.
    NorthWest,
}

impl Orientation {
    /// Every orientation in clockwise order starting from north.
    pub const ALL: [Orientation; 8] = [
        Orientation::North,
        Orientation::NorthEast,
        Orientation::East,
        Orientation::SouthEast,
        Orientation::South,
        Orientation::SouthWest,
        Orientation::West,
        Orientation::NorthWest,
    ];

    /// Tile offset `(columns, rows)` towards the neighbour.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::NorthEast => (1, 1),
            Self::East => (1, 0),
            Self::SouthEast => (1, -1),
            Self::South => (0, -1),
            Self::SouthWest => (-1, -1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, 1),
        }
    }

    /// Orientation pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Orientation {
        match self {
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::NorthWest,
            Self::South => Self::North,
            Self::SouthWest => Self::NorthEast,
            Self::West => Self::East,
            Self::NorthWest => Self::SouthEast,
        }
    }
}

/// Inclusive integer interval used for attack distances and damages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct Range {
    min: u32,
    max: u32,
}

#[derive(Deserialize)]
struct RangeBounds {
    min: u32,
    max: u32,
}

impl TryFrom<RangeBounds> for Range {
    type Error = ConfigError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Range::new(bounds.min, bounds.max)
    }
}

impl Range {
    /// Creates a new range, rejecting `min > max`.
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound, inclusive.
    #[must_use]
    pub const fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound, inclusive.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Reports whether the value lies within the range, bounds included.
    #[must_use]
    pub const fn includes(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Draws a uniformly distributed value within the range, bounds included.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Playback state of an animator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimState {
    /// No animation is playing.
    Stopped,
    /// Frames advance towards the last frame.
    Playing,
    /// Frames run backwards towards the first frame.
    Reversing,
    /// The animation reached its end and will not advance further.
    Finished,
}

/// Monotonic tick counter consulted by cooldown-driven systems.
pub trait Clock {
    /// Current tick.
    fn now(&self) -> u64;
}

/// Clock advanced explicitly by the game loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickClock {
    tick: u64,
}

impl TickClock {
    /// Creates a clock starting at tick zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Creates a clock starting at the provided tick.
    #[must_use]
    pub const fn starting_at(tick: u64) -> Self {
        Self { tick }
    }

    /// Advances the clock by a single tick.
    pub fn advance(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }
}

impl Clock for TickClock {
    fn now(&self) -> u64 {
        self.tick
    }
}

/// Commands that express the map mutations allowed between ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Places a tile, replacing any tile already at the coordinate.
    PlaceTile {
        /// Location of the tile.
        coord: TileCoord,
        /// Sheet the tile graphic belongs to.
        sheet: u32,
        /// Index of the tile graphic within its sheet.
        number: u32,
        /// Collision group of the tile, if it collides at all.
        group: Option<String>,
    },
    /// Removes the tile at the coordinate.
    RemoveTile {
        /// Location of the tile.
        coord: TileCoord,
    },
}

/// Events reported by the world and systems after each update.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a tile was placed on the map.
    TilePlaced {
        /// Location of the new tile.
        coord: TileCoord,
    },
    /// Confirms that a tile was removed from the map.
    TileRemoved {
        /// Location of the removed tile.
        coord: TileCoord,
    },
    /// Reports that a tile placement request was rejected.
    TilePlacementRejected {
        /// Location provided in the request.
        coord: TileCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// The producer could not start the head of its queue yet.
    ProductionBlocked {
        /// Entity owning the production queue.
        producer: EntityId,
        /// Kind waiting for production.
        kind: EntityKind,
    },
    /// Production of a new entity started.
    ProductionStarted {
        /// Entity owning the production queue.
        producer: EntityId,
        /// Kind under production.
        kind: EntityKind,
        /// Inactive entity spawned for the production.
        entity: EntityId,
        /// Tile the entity will occupy once produced.
        location: TileCoord,
    },
    /// Production advanced during the tick.
    ProductionProgress {
        /// Entity owning the production queue.
        producer: EntityId,
        /// Entity under production.
        entity: EntityId,
        /// Completion percentage in `0..=100`.
        percent: i32,
    },
    /// Production finished and the entity became active.
    ProductionCompleted {
        /// Entity owning the production queue.
        producer: EntityId,
        /// Kind that was produced.
        kind: EntityKind,
        /// Entity that became active.
        entity: EntityId,
    },
    /// The current production was abandoned.
    ProductionSkipped {
        /// Entity owning the production queue.
        producer: EntityId,
        /// Kind that was abandoned.
        kind: EntityKind,
        /// Discarded entity, when one had already been spawned.
        entity: Option<EntityId>,
    },
    /// The attacker is out of range and should move closer.
    ReachingTarget {
        /// Entity attacking.
        attacker: EntityId,
        /// Entity being attacked.
        target: EntityId,
    },
    /// The attack animation should start.
    AttackStarted {
        /// Entity attacking.
        attacker: EntityId,
        /// Entity being attacked.
        target: EntityId,
    },
    /// The attack animation is winding up towards the hit frame.
    PreparingAttack {
        /// Entity attacking.
        attacker: EntityId,
        /// Entity being attacked.
        target: EntityId,
    },
    /// The hit frame was reached and damages must be applied.
    AttackEnded {
        /// Entity attacking.
        attacker: EntityId,
        /// Entity being attacked.
        target: EntityId,
        /// Damages drawn for this hit.
        damages: u32,
    },
    /// The attack animation finished.
    AttackAnimEnded {
        /// Entity attacking.
        attacker: EntityId,
        /// Entity being attacked.
        target: EntityId,
    },
}

/// Reasons a tile placement request may be rejected by the world.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested tile lies outside the map.
    OutOfBounds,
    /// The requested group is not registered.
    UnknownGroup(String),
    /// A neighbour's group is disallowed next to the placed tile.
    ConstraintViolation {
        /// Direction of the offending neighbour.
        orientation: Orientation,
        /// Group of the offending neighbour.
        group: String,
    },
}

/// Invalid configuration detected while constructing core values.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A range declared a minimum above its maximum.
    #[error("range minimum {min} exceeds maximum {max}")]
    InvertedRange {
        /// Declared minimum.
        min: u32,
        /// Declared maximum.
        max: u32,
    },
    /// A collision range declared a minimum above its maximum on an axis.
    #[error("collision range on {axis:?} has minimum {min} above maximum {max}")]
    MalformedCollisionRange {
        /// Axis of the faulty bounds.
        axis: Axis,
        /// Declared minimum.
        min: f64,
        /// Declared maximum.
        max: f64,
    },
    /// A numeric parameter was NaN or infinite.
    #[error("parameter '{name}' must be finite, got {value}")]
    NonFinite {
        /// Name of the parameter.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A formula name was declared twice.
    #[error("collision formula '{0}' is declared more than once")]
    DuplicateFormula(String),
    /// A group referenced a formula that does not exist.
    #[error("collision group '{group}' references unknown formula '{formula}'")]
    UnknownFormula {
        /// Group holding the reference.
        group: String,
        /// Missing formula name.
        formula: String,
    },
    /// A group name was declared twice.
    #[error("collision group '{0}' is declared more than once")]
    DuplicateGroup(String),
}
