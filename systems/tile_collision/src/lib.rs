#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Axis-separated sweep that clips entity movement to tile surfaces.
//!
//! Each [`CollisionCategory`] is a probe at a fixed offset from the entity
//! position. A probe walks from the previous position to the candidate one
//! in unit-pixel steps and stops on the first formula surface it crosses.
//! Horizontal probes run first; vertical probes then sweep from the
//! horizontally corrected position.

use glam::DVec2;
use lionengine_core::{
    Axis, CollisionCategory, CollisionFormula, CollisionGroup, TileCoord, TileMapView,
};
use log::trace;

/// Previous and candidate positions of an entity for the current tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    old: DVec2,
    current: DVec2,
}

impl Transform {
    /// Creates a transform moving from `old` to `current`.
    #[must_use]
    pub const fn new(old: DVec2, current: DVec2) -> Self {
        Self { old, current }
    }

    /// Position committed on the previous tick.
    #[must_use]
    pub const fn old(&self) -> DVec2 {
        self.old
    }

    /// Position the entity moved to freely during this tick.
    #[must_use]
    pub const fn current(&self) -> DVec2 {
        self.current
    }
}

/// Surface crossed by a probe.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionHit {
    axis: Axis,
    tile: TileCoord,
    formula: String,
    corrected: f64,
}

impl CollisionHit {
    /// Axis the correction applies to.
    #[must_use]
    pub const fn axis(&self) -> Axis {
        self.axis
    }

    /// Tile owning the crossed surface.
    #[must_use]
    pub const fn tile(&self) -> TileCoord {
        self.tile
    }

    /// Name of the formula describing the surface.
    #[must_use]
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Entity coordinate on [`CollisionHit::axis`] that rests the probe on
    /// the surface.
    #[must_use]
    pub const fn corrected(&self) -> f64 {
        self.corrected
    }
}

/// Outcome of resolving both axes for one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    position: DVec2,
    horizontal: Option<CollisionHit>,
    vertical: Option<CollisionHit>,
    grounded: bool,
}

impl Resolution {
    /// Position after applying every correction.
    #[must_use]
    pub const fn position(&self) -> DVec2 {
        self.position
    }

    /// Correction applied on the x axis, if any.
    #[must_use]
    pub const fn horizontal(&self) -> Option<&CollisionHit> {
        self.horizontal.as_ref()
    }

    /// Correction applied on the y axis, if any.
    #[must_use]
    pub const fn vertical(&self) -> Option<&CollisionHit> {
        self.vertical.as_ref()
    }

    /// Reports whether the entity landed on a surface while falling. The
    /// caller resets gravity and jump force when set.
    #[must_use]
    pub const fn grounded(&self) -> bool {
        self.grounded
    }
}

/// Resolves entity movement against the tiles of a map.
#[derive(Clone, Debug, Default)]
pub struct TileCollision {
    categories: Vec<CollisionCategory>,
}

impl TileCollision {
    /// Creates a resolver using `categories` as probes, in declaration order.
    #[must_use]
    pub fn new(categories: Vec<CollisionCategory>) -> Self {
        Self { categories }
    }

    /// Probes attached to resolved entities.
    #[must_use]
    pub fn categories(&self) -> &[CollisionCategory] {
        &self.categories
    }

    /// Clips the movement described by `transform` to the map surfaces.
    pub fn resolve<M>(&self, map: &M, transform: &Transform) -> Resolution
    where
        M: TileMapView + ?Sized,
    {
        let old = transform.old();
        let new = transform.current();
        let side = new.x - old.x;
        let mut position = new;

        let horizontal = self.first_hit(map, Axis::X, old, DVec2::new(new.x, old.y), side);
        if let Some(hit) = &horizontal {
            position.x = hit.corrected();
        }

        let vertical = self.first_hit(
            map,
            Axis::Y,
            DVec2::new(position.x, old.y),
            DVec2::new(position.x, new.y),
            side,
        );
        if let Some(hit) = &vertical {
            position.y = hit.corrected();
        }

        Resolution {
            position,
            grounded: vertical.is_some() && new.y < old.y,
            horizontal,
            vertical,
        }
    }

    fn first_hit<M>(
        &self,
        map: &M,
        axis: Axis,
        old: DVec2,
        new: DVec2,
        side: f64,
    ) -> Option<CollisionHit>
    where
        M: TileMapView + ?Sized,
    {
        self.categories
            .iter()
            .filter(|category| category.axis() == axis)
            .find_map(|category| resolve_axis(map, old, new, category, side))
    }
}

/// Sweeps a single probe from `old` to `new` and returns the first surface
/// it crosses on the probe's axis.
///
/// `side` is the sign of the horizontal movement. When several formulas of
/// one tile contain the sample, a non-negative side picks the first formula
/// of the group and a negative side the last.
pub fn resolve_axis<M>(
    map: &M,
    old: DVec2,
    new: DVec2,
    category: &CollisionCategory,
    side: f64,
) -> Option<CollisionHit>
where
    M: TileMapView + ?Sized,
{
    let axis = category.axis();
    let offset = probe_offset(category);
    let movement = along(axis, new - old);
    if movement == 0.0 || !(new - old).is_finite() {
        return None;
    }
    let (start, end) = (old + offset, new + offset);
    let [x0, y0, x1, y1] = map.clip_segment(start.x, start.y, end.x, end.y)?;
    let (start, end) = (DVec2::new(x0, y0), DVec2::new(x1, y1));
    let delta = end - start;

    let crossed = map.tiles_hit(start.x, start.y, end.x, end.y);
    let reachable = crossed.iter().any(|&coord| {
        accepted_group(map, coord, category).is_some_and(|group| group.has_axis(axis))
    });
    if !reachable {
        return None;
    }

    let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0);
    let step = delta / steps;
    let count = steps as u64;

    let mut previous = start;
    for index in 1..=count {
        let sample = if index == count {
            end
        } else {
            start + step * index as f64
        };
        if let Some(hit) = probe(map, category, previous, sample, movement, side) {
            return Some(hit);
        }
        previous = sample;
    }
    None
}

fn probe<M>(
    map: &M,
    category: &CollisionCategory,
    previous: DVec2,
    sample: DVec2,
    movement: f64,
    side: f64,
) -> Option<CollisionHit>
where
    M: TileMapView + ?Sized,
{
    let axis = category.axis();
    let tile = sample_tile(map, sample, axis, movement)?;
    let group = accepted_group(map, tile, category)?;

    let origin = DVec2::new(
        f64::from(tile.column()) * f64::from(map.tile_width()),
        f64::from(tile.row()) * f64::from(map.tile_height()),
    );
    let local = sample - origin;
    let formula = select_formula(group, axis, local, side)?;
    let surface = along(axis, origin) + formula.evaluate(axis, local.x, local.y)?;

    let before = along(axis, previous);
    let after = along(axis, sample);
    let crossed = if movement < 0.0 {
        before >= surface && surface >= after
    } else {
        before <= surface && surface <= after
    };
    if !crossed {
        return None;
    }

    let corrected = surface - along(axis, probe_offset(category));
    trace!(
        "probe '{}' crossed '{}' of tile {:?} at {surface}",
        category.name(),
        formula.name(),
        tile
    );
    Some(CollisionHit {
        axis,
        tile,
        formula: formula.name().to_owned(),
        corrected,
    })
}

fn select_formula(
    group: &CollisionGroup,
    axis: Axis,
    local: DVec2,
    side: f64,
) -> Option<&CollisionFormula> {
    if side < 0.0 {
        group
            .formulas()
            .iter()
            .rev()
            .find(|formula| formula.evaluate(axis, local.x, local.y).is_some())
    } else {
        group.first_match(axis, local.x, local.y)
    }
}

fn accepted_group<'m, M>(
    map: &'m M,
    coord: TileCoord,
    category: &CollisionCategory,
) -> Option<&'m CollisionGroup>
where
    M: TileMapView + ?Sized,
{
    map.collision_group(coord)
        .filter(|group| category.accepts(group.name()))
}

/// Tile under `sample`. Samples on a boundary of the tested axis belong to
/// the tile the probe is leaving.
fn sample_tile<M>(map: &M, sample: DVec2, axis: Axis, movement: f64) -> Option<TileCoord>
where
    M: TileMapView + ?Sized,
{
    let rising = movement > 0.0;
    let column = cell(sample.x, map.tile_width(), axis == Axis::X && rising)?;
    let row = cell(sample.y, map.tile_height(), axis == Axis::Y && rising)?;
    (column < map.columns() && row < map.rows()).then(|| TileCoord::new(column, row))
}

fn cell(value: f64, size: u32, boundary_below: bool) -> Option<u32> {
    let scaled = value / f64::from(size);
    let index = if boundary_below && scaled.fract() == 0.0 {
        scaled - 1.0
    } else {
        scaled.floor()
    };
    if !index.is_finite() || index < 0.0 || index > f64::from(u32::MAX) {
        return None;
    }
    Some(index as u32)
}

fn probe_offset(category: &CollisionCategory) -> DVec2 {
    let (x, y) = category.offset();
    DVec2::new(x, y)
}

fn along(axis: Axis, vector: DVec2) -> f64 {
    match axis {
        Axis::X => vector.x,
        Axis::Y => vector.y,
    }
}
