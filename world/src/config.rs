//! TOML definitions of maps, collision formulas, groups and categories.
//!
//! The raw serde structures mirror the file layout; [`CollisionConfig::build`]
//! and [`MapConfig::build`] run every value through the validating
//! constructors so a malformed file fails before the simulation starts.

use std::collections::BTreeMap;

use lionengine_core::{
    Axis, CollisionCategory, CollisionConstraint, CollisionFormula, CollisionFunction,
    CollisionGroup, CollisionRange, ConfigError, Orientation, TileCoord,
};
use serde::Deserialize;

use crate::{LoadError, Tile, TileMap};

/// Formula, group and category definitions.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CollisionConfig {
    /// Formula definitions, referenced by name from groups.
    #[serde(default)]
    pub formulas: Vec<FormulaConfig>,
    /// Group definitions, referenced by name from tiles.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    /// Collision probes attached to entities.
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

/// Raw formula definition.
#[derive(Clone, Debug, Deserialize)]
pub struct FormulaConfig {
    /// Unique formula name.
    pub name: String,
    /// Tile-local area the formula applies to.
    pub range: RangeConfig,
    /// Function evaluated inside the range.
    pub function: FunctionConfig,
    /// Neighbour groups refused per orientation.
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
}

/// Neighbour groups refused in one orientation.
#[derive(Clone, Debug, Deserialize)]
pub struct ConstraintConfig {
    /// Direction of the neighbour.
    pub orientation: Orientation,
    /// Groups refused in that direction.
    pub groups: Vec<String>,
}

/// Raw collision range.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RangeConfig {
    /// Axis computed by the formula.
    pub axis: Axis,
    /// Lowest tile-local x, inclusive.
    pub min_x: f64,
    /// Highest tile-local x, inclusive.
    pub max_x: f64,
    /// Lowest tile-local y, inclusive.
    pub min_y: f64,
    /// Highest tile-local y, inclusive.
    pub max_y: f64,
}

/// Raw collision function.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FunctionConfig {
    /// `a * input + b`.
    Linear {
        /// Slope.
        a: f64,
        /// Offset.
        b: f64,
    },
}

/// Raw group definition.
#[derive(Clone, Debug, Deserialize)]
pub struct GroupConfig {
    /// Unique group name.
    pub name: String,
    /// Formula names in evaluation order.
    pub formulas: Vec<String>,
}

/// Raw category definition.
#[derive(Clone, Debug, Deserialize)]
pub struct CategoryConfig {
    /// Probe name.
    pub name: String,
    /// Axis tested by the probe.
    pub axis: Axis,
    /// Horizontal offset from the entity position.
    #[serde(default)]
    pub offset_x: f64,
    /// Vertical offset from the entity position.
    #[serde(default)]
    pub offset_y: f64,
    /// Groups the probe collides with; empty means every group.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Validated collision definitions.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionSet {
    /// Groups with their formulas resolved.
    pub groups: Vec<CollisionGroup>,
    /// Probes in declaration order.
    pub categories: Vec<CollisionCategory>,
}

impl CollisionConfig {
    /// Parses the definitions from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(text)?)
    }

    /// Validates every definition and resolves group references.
    pub fn build(&self) -> Result<CollisionSet, ConfigError> {
        let mut formulas = BTreeMap::new();
        for raw in &self.formulas {
            let formula = raw.build()?;
            if formulas.insert(raw.name.clone(), formula).is_some() {
                return Err(ConfigError::DuplicateFormula(raw.name.clone()));
            }
        }

        let mut groups: Vec<CollisionGroup> = Vec::with_capacity(self.groups.len());
        for raw in &self.groups {
            if groups.iter().any(|group| group.name() == raw.name) {
                return Err(ConfigError::DuplicateGroup(raw.name.clone()));
            }
            groups.push(CollisionGroup::from_names(
                raw.name.clone(),
                &raw.formulas,
                &formulas,
            )?);
        }

        let categories = self
            .categories
            .iter()
            .map(|raw| {
                CollisionCategory::new(
                    raw.name.clone(),
                    raw.axis,
                    raw.offset_x,
                    raw.offset_y,
                    raw.groups.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CollisionSet { groups, categories })
    }
}

impl FormulaConfig {
    fn build(&self) -> Result<CollisionFormula, ConfigError> {
        let range = CollisionRange::new(
            self.range.axis,
            self.range.min_x,
            self.range.max_x,
            self.range.min_y,
            self.range.max_y,
        )?;
        let function = match self.function {
            FunctionConfig::Linear { a, b } => CollisionFunction::linear(a, b)?,
        };
        let mut constraint = CollisionConstraint::new();
        for entry in &self.constraints {
            for group in &entry.groups {
                constraint = constraint.disallow(entry.orientation, group.clone());
            }
        }
        Ok(CollisionFormula::new(
            self.name.clone(),
            range,
            function,
            constraint,
        ))
    }
}

/// Map layout drawn as text, one line per row with the top row first.
#[derive(Clone, Debug, Deserialize)]
pub struct MapConfig {
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Rows of legend characters, top row first.
    pub layout: Vec<String>,
    /// Tile placed for each character; unknown characters other than `.`
    /// and space are rejected.
    #[serde(default)]
    pub legend: BTreeMap<char, LegendEntry>,
}

/// Tile placed for a legend character.
#[derive(Clone, Debug, Deserialize)]
pub struct LegendEntry {
    /// Sheet of the tile graphic.
    #[serde(default)]
    pub sheet: u32,
    /// Graphic index within the sheet.
    #[serde(default)]
    pub number: u32,
    /// Collision group of the tile.
    #[serde(default)]
    pub group: Option<String>,
}

impl MapConfig {
    /// Builds the map, registering `groups` before placing tiles.
    pub fn build(&self, groups: &[CollisionGroup]) -> Result<TileMap, LoadError> {
        let rows = u32::try_from(self.layout.len()).map_err(|_| LoadError::LayoutTooLarge)?;
        let widest = self
            .layout
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let columns = u32::try_from(widest).map_err(|_| LoadError::LayoutTooLarge)?;

        let mut map = TileMap::new(columns, rows, self.tile_width, self.tile_height)?;
        for group in groups {
            map.register_group(group.clone())?;
        }

        for (line_index, line) in self.layout.iter().enumerate() {
            let row = rows - 1 - line_index as u32;
            for (column, symbol) in line.chars().enumerate() {
                let Some(entry) = self.legend.get(&symbol) else {
                    if symbol == '.' || symbol == ' ' {
                        continue;
                    }
                    return Err(LoadError::UnknownSymbol(symbol));
                };
                let coord = TileCoord::new(column as u32, row);
                let tile = Tile::new(coord, entry.sheet, entry.number, entry.group.clone());
                let _ = map
                    .place(tile)
                    .map_err(|reason| LoadError::Placement { coord, reason })?;
            }
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lionengine_core::TileMapView;

    const DEFINITIONS: &str = r#"
        [[formulas]]
        name = "top"
        range = { axis = "y", min_x = 0, max_x = 15, min_y = 0, max_y = 15 }
        function = { type = "linear", a = 0.0, b = 15.0 }
        constraints = [{ orientation = "north", groups = ["water"] }]

        [[formulas]]
        name = "slope"
        range = { axis = "y", min_x = 0, max_x = 15, min_y = 0, max_y = 15 }
        function = { type = "linear", a = 1.0, b = 0.0 }

        [[groups]]
        name = "block"
        formulas = ["top"]

        [[groups]]
        name = "ramp"
        formulas = ["slope"]

        [[categories]]
        name = "legs"
        axis = "y"
        offset_y = -1.0
        groups = ["block", "ramp"]
    "#;

    #[test]
    fn definitions_build_into_groups_and_categories() {
        let config = CollisionConfig::from_toml_str(DEFINITIONS).expect("parse");
        let set = config.build().expect("valid definitions");

        assert_eq!(set.groups.len(), 2);
        let block = &set.groups[0];
        assert_eq!(block.name(), "block");
        assert!(!block.formulas()[0]
            .constraint()
            .allows(Orientation::North, "water"));
        assert_eq!(set.categories[0].offset(), (0.0, -1.0));
    }

    #[test]
    fn duplicate_formula_names_fail() {
        let text = format!(
            "{DEFINITIONS}\n[[formulas]]\nname = \"top\"\nrange = {{ axis = \"x\", min_x = 0, max_x = 1, min_y = 0, max_y = 1 }}\nfunction = {{ type = \"linear\", a = 0.0, b = 0.0 }}\n"
        );
        let config = CollisionConfig::from_toml_str(&text).expect("parse");
        assert_eq!(
            config.build(),
            Err(ConfigError::DuplicateFormula("top".to_owned()))
        );
    }

    #[test]
    fn malformed_toml_is_a_load_error() {
        assert!(matches!(
            CollisionConfig::from_toml_str("formulas = 3"),
            Err(LoadError::Toml(_))
        ));
    }

    #[test]
    fn layout_places_tiles_with_top_line_as_highest_row() {
        let set = CollisionConfig::from_toml_str(DEFINITIONS)
            .expect("parse")
            .build()
            .expect("valid definitions");
        let map_config: MapConfig = toml::from_str(
            r#####"
            tile_width = 16
            tile_height = 16
            layout = [
                "....",
                "#..#",
                "####",
            ]
            [legend]
            "#" = { group = "block", number = 4 }
            "#####,
        )
        .expect("parse map");

        let map = map_config.build(&set.groups).expect("map");
        assert_eq!((map.columns(), map.rows()), (4, 3));
        assert!(map.tile(TileCoord::new(0, 0)).is_some());
        assert!(map.tile(TileCoord::new(1, 1)).is_none());
        assert!(map.tile(TileCoord::new(3, 1)).is_some());
        assert!(map.tile(TileCoord::new(0, 2)).is_none());
        assert_eq!(
            map.collision_group(TileCoord::new(2, 0)).map(|group| group.name()),
            Some("block")
        );
    }

    #[test]
    fn unknown_layout_symbols_are_rejected() {
        let map_config = MapConfig {
            tile_width: 16,
            tile_height: 16,
            layout: vec!["#?".to_owned()],
            legend: BTreeMap::new(),
        };
        assert!(matches!(
            map_config.build(&[]),
            Err(LoadError::UnknownSymbol('#'))
        ));
    }
}
