//! Tile grid and collision group storage.

use std::collections::BTreeMap;

use lionengine_core::{
    CollisionGroup, ConfigError, Orientation, PlacementError, TileCoord, TileMapView,
};

use crate::WorldError;

/// Single map cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    coord: TileCoord,
    sheet: u32,
    number: u32,
    group: Option<String>,
}

impl Tile {
    /// Creates a tile at `coord` showing graphic `number` of `sheet`.
    #[must_use]
    pub fn new(coord: TileCoord, sheet: u32, number: u32, group: Option<String>) -> Self {
        Self {
            coord,
            sheet,
            number,
            group,
        }
    }

    /// Location of the tile.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Sheet the tile graphic belongs to.
    #[must_use]
    pub const fn sheet(&self) -> u32 {
        self.sheet
    }

    /// Index of the tile graphic within its sheet.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Collision group of the tile.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

/// Dense grid of tiles plus the collision groups they reference.
#[derive(Clone, Debug)]
pub struct TileMap {
    columns: u32,
    rows: u32,
    tile_width: u32,
    tile_height: u32,
    tiles: Vec<Option<Tile>>,
    groups: BTreeMap<String, CollisionGroup>,
}

impl TileMap {
    /// Creates an empty map. Every dimension must be non-zero.
    pub fn new(
        columns: u32,
        rows: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self, WorldError> {
        if columns == 0 || rows == 0 || tile_width == 0 || tile_height == 0 {
            return Err(WorldError::ZeroDimension);
        }
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows))
            .map_err(|_| WorldError::ZeroDimension)?;
        Ok(Self {
            columns,
            rows,
            tile_width,
            tile_height,
            tiles: vec![None; capacity],
            groups: BTreeMap::new(),
        })
    }

    /// Registers a collision group so tiles may reference it.
    pub fn register_group(&mut self, group: CollisionGroup) -> Result<(), ConfigError> {
        if self.groups.contains_key(group.name()) {
            return Err(ConfigError::DuplicateGroup(group.name().to_owned()));
        }
        let _ = self.groups.insert(group.name().to_owned(), group);
        Ok(())
    }

    /// Looks up a registered group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&CollisionGroup> {
        self.groups.get(name)
    }

    /// Tile placed at `coord`, if any.
    #[must_use]
    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord)
            .and_then(|index| self.tiles.get(index))
            .and_then(Option::as_ref)
    }

    /// Iterator over every placed tile in row-major order, bottom row first.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().flatten()
    }

    /// Pixel position of the bottom-left corner of `coord`.
    #[must_use]
    pub fn tile_origin(&self, coord: TileCoord) -> (f64, f64) {
        (
            f64::from(coord.column()) * f64::from(self.tile_width),
            f64::from(coord.row()) * f64::from(self.tile_height),
        )
    }

    /// Reports whether `coord` lies inside the grid.
    #[must_use]
    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.column() < self.columns && coord.row() < self.rows
    }

    /// Places `tile`, returning the tile it replaced.
    ///
    /// Rejects tiles outside the grid and tiles referencing unknown groups.
    /// Neighbour constraints are not checked here; see
    /// [`TileMap::constraint_violations`].
    pub fn place(&mut self, tile: Tile) -> Result<Option<Tile>, PlacementError> {
        let index = self
            .index(tile.coord())
            .ok_or(PlacementError::OutOfBounds)?;
        if let Some(group) = tile.group() {
            if !self.groups.contains_key(group) {
                return Err(PlacementError::UnknownGroup(group.to_owned()));
            }
        }
        Ok(self.tiles[index].replace(tile))
    }

    /// Removes the tile at `coord`, returning it.
    pub fn remove(&mut self, coord: TileCoord) -> Option<Tile> {
        let index = self.index(coord)?;
        self.tiles[index].take()
    }

    /// Neighbour constraints broken if a tile of `group` sat at `coord`.
    ///
    /// Both directions are checked: the formulas of `group` refusing a
    /// neighbour, and a neighbour's formulas refusing `group` from the
    /// opposite side. Each violation names the orientation of the offending
    /// neighbour and the group it belongs to.
    #[must_use]
    pub fn constraint_violations(&self, coord: TileCoord, group: &str) -> Vec<PlacementError> {
        let mut violations = Vec::new();
        let own = self.groups.get(group);

        for orientation in Orientation::ALL {
            let Some(neighbor) = coord.neighbor(orientation) else {
                continue;
            };
            let Some(neighbor_group) = self.tile(neighbor).and_then(Tile::group) else {
                continue;
            };

            let refused_by_own = own.is_some_and(|own| {
                own.formulas()
                    .iter()
                    .any(|formula| !formula.constraint().allows(orientation, neighbor_group))
            });
            let refused_by_neighbor = self.groups.get(neighbor_group).is_some_and(|other| {
                other
                    .formulas()
                    .iter()
                    .any(|formula| !formula.constraint().allows(orientation.opposite(), group))
            });

            if refused_by_own || refused_by_neighbor {
                violations.push(PlacementError::ConstraintViolation {
                    orientation,
                    group: neighbor_group.to_owned(),
                });
            }
        }

        violations
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }
}

impl TileMapView for TileMap {
    fn tile_width(&self) -> u32 {
        self.tile_width
    }

    fn tile_height(&self) -> u32 {
        self.tile_height
    }

    fn columns(&self) -> u32 {
        self.columns
    }

    fn rows(&self) -> u32 {
        self.rows
    }

    fn collision_group(&self, coord: TileCoord) -> Option<&CollisionGroup> {
        self.tile(coord)
            .and_then(Tile::group)
            .and_then(|name| self.groups.get(name))
    }

    fn tiles_hit(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<TileCoord> {
        let mut hit = Vec::new();
        let Some([x0, y0, x1, y1]) = self.clip_segment(x0, y0, x1, y1) else {
            return hit;
        };

        let width = f64::from(self.tile_width);
        let height = f64::from(self.tile_height);
        let (fx0, fy0) = (x0 / width, y0 / height);
        let (fx1, fy1) = (x1 / width, y1 / height);

        let mut column = fx0.floor() as i64;
        let mut row = fy0.floor() as i64;
        let end_column = fx1.floor() as i64;
        let end_row = fy1.floor() as i64;

        let (step_x, mut t_max_x, t_delta_x) = traversal(fx0, fx1);
        let (step_y, mut t_max_y, t_delta_y) = traversal(fy0, fy1);

        let visits = (end_column - column).abs() + (end_row - row).abs() + 1;
        for _ in 0..visits {
            if let (Ok(c), Ok(r)) = (u32::try_from(column), u32::try_from(row)) {
                let coord = TileCoord::new(c, r);
                if self.contains(coord) {
                    hit.push(coord);
                }
            }
            if column == end_column && row == end_row {
                break;
            }
            if t_max_x < t_max_y {
                column += step_x;
                t_max_x += t_delta_x;
            } else {
                row += step_y;
                t_max_y += t_delta_y;
            }
        }

        hit
    }
}

/// Step direction, parametric distance to the first boundary and parametric
/// distance between boundaries along one axis.
fn traversal(start: f64, end: f64) -> (i64, f64, f64) {
    let delta = end - start;
    if delta > 0.0 {
        (1, (start.floor() + 1.0 - start) / delta, 1.0 / delta)
    } else if delta < 0.0 {
        (-1, (start - start.floor()) / -delta, -1.0 / delta)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lionengine_core::{
        Axis, CollisionConstraint, CollisionFormula, CollisionFunction, CollisionRange,
    };

    fn group(name: &str, constraint: CollisionConstraint) -> CollisionGroup {
        CollisionGroup::new(
            name,
            vec![CollisionFormula::new(
                format!("{name}-top"),
                CollisionRange::new(Axis::Y, 0.0, 15.0, 0.0, 15.0).expect("range"),
                CollisionFunction::linear(0.0, 15.0).expect("function"),
                constraint,
            )],
        )
    }

    fn map() -> TileMap {
        let mut map = TileMap::new(4, 3, 16, 16).expect("map");
        map.register_group(group("block", CollisionConstraint::new()))
            .expect("group");
        map
    }

    #[test]
    fn zero_sized_maps_are_rejected() {
        assert!(matches!(
            TileMap::new(0, 3, 16, 16),
            Err(WorldError::ZeroDimension)
        ));
    }

    #[test]
    fn tile_at_maps_pixels_to_tiles() {
        let map = map();
        assert_eq!(map.tile_at(0.0, 0.0), Some(TileCoord::new(0, 0)));
        assert_eq!(map.tile_at(16.0, 31.9), Some(TileCoord::new(1, 1)));
        assert_eq!(map.tile_at(-0.1, 4.0), None);
        assert_eq!(map.tile_at(64.0, 4.0), None);
    }

    #[test]
    fn placement_rejects_unknown_groups_and_bounds() {
        let mut map = map();
        assert_eq!(
            map.place(Tile::new(TileCoord::new(9, 0), 0, 0, None)),
            Err(PlacementError::OutOfBounds)
        );
        assert_eq!(
            map.place(Tile::new(TileCoord::new(1, 0), 0, 0, Some("lava".into()))),
            Err(PlacementError::UnknownGroup("lava".into()))
        );
        assert_eq!(
            map.place(Tile::new(TileCoord::new(1, 0), 0, 3, Some("block".into()))),
            Ok(None)
        );
        assert!(map.collision_group(TileCoord::new(1, 0)).is_some());
        assert_eq!(map.remove(TileCoord::new(1, 0)).map(|tile| tile.number()), Some(3));
        assert!(map.collision_group(TileCoord::new(1, 0)).is_none());
    }

    #[test]
    fn tiles_hit_walks_a_diagonal_segment() {
        let map = map();
        let hit = map.tiles_hit(2.0, 2.0, 40.0, 20.0);
        assert_eq!(hit.first(), Some(&TileCoord::new(0, 0)));
        assert_eq!(hit.last(), Some(&TileCoord::new(2, 1)));
        for pair in hit.windows(2) {
            let dc = pair[0].column().abs_diff(pair[1].column());
            let dr = pair[0].row().abs_diff(pair[1].row());
            assert_eq!(dc + dr, 1, "consecutive tiles must be edge neighbours");
        }
    }

    #[test]
    fn tiles_hit_ignores_the_segment_beyond_the_map() {
        let map = map();
        let hit = map.tiles_hit(-1.0e12, 8.0, 1.0e12, 8.0);
        assert_eq!(
            hit,
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(1, 0),
                TileCoord::new(2, 0),
                TileCoord::new(3, 0)
            ]
        );
        assert!(map.tiles_hit(-1.0e12, -5.0, 1.0e12, -5.0).is_empty());
        assert!(map.tiles_hit(f64::NAN, 0.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn tiles_hit_walks_backwards() {
        let map = map();
        let hit = map.tiles_hit(40.0, 8.0, 2.0, 8.0);
        assert_eq!(
            hit,
            vec![
                TileCoord::new(2, 0),
                TileCoord::new(1, 0),
                TileCoord::new(0, 0)
            ]
        );
    }

    #[test]
    fn constraints_are_checked_from_both_sides() {
        let mut map = map();
        map.register_group(group(
            "water",
            CollisionConstraint::new().disallow(Orientation::South, "block"),
        ))
        .expect("group");
        let _ = map
            .place(Tile::new(TileCoord::new(1, 0), 0, 0, Some("block".into())))
            .expect("placed");

        let from_above = map.constraint_violations(TileCoord::new(1, 1), "water");
        assert_eq!(
            from_above,
            vec![PlacementError::ConstraintViolation {
                orientation: Orientation::South,
                group: "block".into(),
            }]
        );

        let _ = map
            .place(Tile::new(TileCoord::new(2, 2), 0, 0, Some("water".into())))
            .expect("placed");
        let below_water = map.constraint_violations(TileCoord::new(2, 1), "block");
        assert_eq!(
            below_water,
            vec![PlacementError::ConstraintViolation {
                orientation: Orientation::North,
                group: "water".into(),
            }]
        );
    }
}
