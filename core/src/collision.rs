//! Collision formulas describing tile surfaces.
//!
//! A [`CollisionFormula`] maps a tile-local coordinate on one axis to the
//! expected surface coordinate on the other axis, restricted to the area
//! described by its [`CollisionRange`]. Formulas are grouped by terrain
//! category into [`CollisionGroup`] values which tiles reference by name.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Axis, ConfigError, Orientation};

/// Function evaluated to obtain a surface coordinate from a tile-local input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CollisionFunction {
    /// Straight line `a * input + b`.
    Linear {
        /// Slope.
        a: f64,
        /// Offset.
        b: f64,
    },
}

impl CollisionFunction {
    /// Creates a linear function, rejecting non-finite parameters.
    pub fn linear(a: f64, b: f64) -> Result<Self, ConfigError> {
        ensure_finite("a", a)?;
        ensure_finite("b", b)?;
        Ok(Self::Linear { a, b })
    }

    /// Evaluates the function for the provided input.
    #[must_use]
    pub fn compute(&self, input: f64) -> f64 {
        match *self {
            Self::Linear { a, b } => a * input + b,
        }
    }
}

/// Tile-local area a formula applies to, and the axis it outputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionRange {
    axis: Axis,
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl CollisionRange {
    /// Creates a new range. Both intervals are inclusive and must not be
    /// inverted.
    pub fn new(
        axis: Axis,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    ) -> Result<Self, ConfigError> {
        ensure_finite("min_x", min_x)?;
        ensure_finite("max_x", max_x)?;
        ensure_finite("min_y", min_y)?;
        ensure_finite("max_y", max_y)?;
        if min_x > max_x {
            return Err(ConfigError::MalformedCollisionRange {
                axis: Axis::X,
                min: min_x,
                max: max_x,
            });
        }
        if min_y > max_y {
            return Err(ConfigError::MalformedCollisionRange {
                axis: Axis::Y,
                min: min_y,
                max: max_y,
            });
        }
        Ok(Self {
            axis,
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Axis whose coordinate the formula computes.
    #[must_use]
    pub const fn axis(&self) -> Axis {
        self.axis
    }

    /// Horizontal bounds `(min, max)`.
    #[must_use]
    pub const fn x_bounds(&self) -> (f64, f64) {
        (self.min_x, self.max_x)
    }

    /// Vertical bounds `(min, max)`.
    #[must_use]
    pub const fn y_bounds(&self) -> (f64, f64) {
        (self.min_y, self.max_y)
    }

    /// Reports whether the tile-local point lies inside the range.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Neighbouring groups a tile refuses, per orientation.
///
/// Only consulted while editing maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionConstraint {
    disallowed: BTreeMap<Orientation, BTreeSet<String>>,
}

impl CollisionConstraint {
    /// Creates a constraint that allows every neighbour.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disallows `group` as the neighbour in `orientation`.
    #[must_use]
    pub fn disallow(mut self, orientation: Orientation, group: impl Into<String>) -> Self {
        let _ = self
            .disallowed
            .entry(orientation)
            .or_default()
            .insert(group.into());
        self
    }

    /// Reports whether `group` may neighbour the tile in `orientation`.
    #[must_use]
    pub fn allows(&self, orientation: Orientation, group: &str) -> bool {
        self.disallowed
            .get(&orientation)
            .map_or(true, |groups| !groups.contains(group))
    }

    /// Groups refused in the provided orientation.
    pub fn disallowed(&self, orientation: Orientation) -> impl Iterator<Item = &str> {
        self.disallowed
            .get(&orientation)
            .into_iter()
            .flat_map(|groups| groups.iter().map(String::as_str))
    }

    /// Reports whether the constraint refuses nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disallowed.values().all(BTreeSet::is_empty)
    }
}

/// Named function plus the range it applies to.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionFormula {
    name: String,
    range: CollisionRange,
    function: CollisionFunction,
    constraint: CollisionConstraint,
}

impl CollisionFormula {
    /// Creates a new formula.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        range: CollisionRange,
        function: CollisionFunction,
        constraint: CollisionConstraint,
    ) -> Self {
        Self {
            name: name.into(),
            range,
            function,
            constraint,
        }
    }

    /// Name used to reference the formula from groups.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Area the formula applies to.
    #[must_use]
    pub const fn range(&self) -> &CollisionRange {
        &self.range
    }

    /// Function evaluated inside the range.
    #[must_use]
    pub const fn function(&self) -> &CollisionFunction {
        &self.function
    }

    /// Neighbour restrictions used by map editing.
    #[must_use]
    pub const fn constraint(&self) -> &CollisionConstraint {
        &self.constraint
    }

    /// Evaluates the surface for the tile-local point when it lies inside the
    /// range on the requested axis.
    ///
    /// The input of the function is the coordinate perpendicular to the
    /// formula's axis.
    #[must_use]
    pub fn evaluate(&self, axis: Axis, x: f64, y: f64) -> Option<f64> {
        if self.range.axis() != axis || !self.range.contains(x, y) {
            return None;
        }
        let input = match axis {
            Axis::X => y,
            Axis::Y => x,
        };
        Some(self.function.compute(input))
    }
}

/// Terrain category mapping to an ordered list of formulas.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionGroup {
    name: String,
    formulas: Vec<CollisionFormula>,
}

impl CollisionGroup {
    /// Creates a group from formulas kept in declaration order.
    #[must_use]
    pub fn new(name: impl Into<String>, formulas: Vec<CollisionFormula>) -> Self {
        Self {
            name: name.into(),
            formulas,
        }
    }

    /// Resolves formula names against the provided definitions.
    pub fn from_names<S: AsRef<str>>(
        name: impl Into<String>,
        formula_names: &[S],
        definitions: &BTreeMap<String, CollisionFormula>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let mut formulas = Vec::with_capacity(formula_names.len());
        for formula in formula_names {
            let formula = formula.as_ref();
            let definition =
                definitions
                    .get(formula)
                    .ok_or_else(|| ConfigError::UnknownFormula {
                        group: name.clone(),
                        formula: formula.to_owned(),
                    })?;
            formulas.push(definition.clone());
        }
        Ok(Self { name, formulas })
    }

    /// Name tiles use to reference the group.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formulas in declaration order.
    #[must_use]
    pub fn formulas(&self) -> &[CollisionFormula] {
        &self.formulas
    }

    /// Reports whether any formula outputs the provided axis.
    #[must_use]
    pub fn has_axis(&self, axis: Axis) -> bool {
        self.formulas
            .iter()
            .any(|formula| formula.range().axis() == axis)
    }

    /// First formula whose range contains the tile-local point on `axis`.
    #[must_use]
    pub fn first_match(&self, axis: Axis, x: f64, y: f64) -> Option<&CollisionFormula> {
        self.formulas
            .iter()
            .find(|formula| formula.evaluate(axis, x, y).is_some())
    }
}

/// Collision probe attached to an entity.
///
/// The probe sits at `offset` from the entity position, tests a single axis
/// and only collides with the listed groups; an empty list accepts every
/// group.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionCategory {
    name: String,
    axis: Axis,
    offset_x: f64,
    offset_y: f64,
    groups: Vec<String>,
}

impl CollisionCategory {
    /// Creates a new category, rejecting non-finite offsets.
    pub fn new(
        name: impl Into<String>,
        axis: Axis,
        offset_x: f64,
        offset_y: f64,
        groups: Vec<String>,
    ) -> Result<Self, ConfigError> {
        ensure_finite("offset_x", offset_x)?;
        ensure_finite("offset_y", offset_y)?;
        Ok(Self {
            name: name.into(),
            axis,
            offset_x,
            offset_y,
            groups,
        })
    }

    /// Name of the probe.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axis tested by the probe.
    #[must_use]
    pub const fn axis(&self) -> Axis {
        self.axis
    }

    /// Offset `(x, y)` of the probe relative to the entity position.
    #[must_use]
    pub const fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Reports whether the probe collides with tiles of `group`.
    #[must_use]
    pub fn accepts(&self, group: &str) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|name| name == group)
    }
}

fn ensure_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> CollisionFormula {
        CollisionFormula::new(
            "ground",
            CollisionRange::new(Axis::Y, 0.0, 15.0, 0.0, 15.0).expect("range"),
            CollisionFunction::linear(0.0, 15.0).expect("function"),
            CollisionConstraint::new(),
        )
    }

    #[test]
    fn linear_function_applies_slope_and_offset() {
        let function = CollisionFunction::linear(0.5, 2.0).expect("function");
        assert_eq!(function.compute(4.0), 4.0);
    }

    #[test]
    fn non_finite_parameters_fail_fast() {
        assert!(matches!(
            CollisionFunction::linear(f64::NAN, 0.0),
            Err(ConfigError::NonFinite { name: "a", .. })
        ));
    }

    #[test]
    fn inverted_range_is_malformed() {
        assert!(matches!(
            CollisionRange::new(Axis::Y, 0.0, 15.0, 8.0, 2.0),
            Err(ConfigError::MalformedCollisionRange { axis: Axis::Y, .. })
        ));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = CollisionRange::new(Axis::Y, 0.0, 15.0, 0.0, 15.0).expect("range");
        assert!(range.contains(0.0, 0.0));
        assert!(range.contains(15.0, 15.0));
        assert!(!range.contains(15.5, 3.0));
    }

    #[test]
    fn formula_ignores_other_axis() {
        let formula = ground();
        assert_eq!(formula.evaluate(Axis::Y, 3.0, 10.0), Some(15.0));
        assert_eq!(formula.evaluate(Axis::X, 3.0, 10.0), None);
    }

    #[test]
    fn group_resolution_reports_unknown_formula() {
        let mut definitions = BTreeMap::new();
        let _ = definitions.insert("ground".to_owned(), ground());

        let group = CollisionGroup::from_names("block", &["ground"], &definitions)
            .expect("known formula");
        assert_eq!(group.formulas().len(), 1);
        assert!(group.has_axis(Axis::Y));

        let missing = CollisionGroup::from_names("block", &["ground", "slope"], &definitions);
        assert_eq!(
            missing,
            Err(ConfigError::UnknownFormula {
                group: "block".to_owned(),
                formula: "slope".to_owned(),
            })
        );
    }

    #[test]
    fn constraint_refuses_listed_neighbours_only() {
        let constraint = CollisionConstraint::new().disallow(Orientation::North, "water");
        assert!(!constraint.allows(Orientation::North, "water"));
        assert!(constraint.allows(Orientation::South, "water"));
        assert!(constraint.allows(Orientation::North, "grass"));
        assert_eq!(
            constraint.disallowed(Orientation::North).collect::<Vec<_>>(),
            vec!["water"]
        );
    }

    #[test]
    fn category_with_empty_groups_accepts_everything() {
        let open = CollisionCategory::new("legs", Axis::Y, 0.0, 0.0, Vec::new()).expect("category");
        assert!(open.accepts("anything"));

        let picky = CollisionCategory::new("legs", Axis::Y, 0.0, 0.0, vec!["block".to_owned()])
            .expect("category");
        assert!(picky.accepts("block"));
        assert!(!picky.accepts("water"));
    }
}
