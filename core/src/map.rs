//! Read-only map queries consumed by the collision systems.

use crate::{CollisionGroup, TileCoord};

/// Read-only view of a tile map.
///
/// Tile `(column, row)` covers the pixels
/// `[column * width, (column + 1) * width) x [row * height, (row + 1) * height)`
/// with y growing upwards.
pub trait TileMapView {
    /// Width of a single tile in pixels.
    fn tile_width(&self) -> u32;

    /// Height of a single tile in pixels.
    fn tile_height(&self) -> u32;

    /// Number of tile columns.
    fn columns(&self) -> u32;

    /// Number of tile rows.
    fn rows(&self) -> u32;

    /// Collision group of the tile at `coord`, if a tile with a known group
    /// is placed there.
    fn collision_group(&self, coord: TileCoord) -> Option<&CollisionGroup>;

    /// Tile covering the pixel position, if it lies inside the map.
    fn tile_at(&self, x: f64, y: f64) -> Option<TileCoord> {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        let column = (x / f64::from(self.tile_width())).floor();
        let row = (y / f64::from(self.tile_height())).floor();
        if column >= f64::from(self.columns()) || row >= f64::from(self.rows()) {
            return None;
        }
        Some(TileCoord::new(column as u32, row as u32))
    }

    /// Tiles intersected by the segment from `(x0, y0)` to `(x1, y1)`, in the
    /// order the segment enters them.
    fn tiles_hit(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<TileCoord>;

    /// Part of the segment from `(x0, y0)` to `(x1, y1)` lying within the map
    /// pixel bounds, or `None` when the segment misses the map.
    ///
    /// Endpoints already inside the map are returned unchanged.
    fn clip_segment(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<[f64; 4]> {
        if ![x0, y0, x1, y1].iter().all(|value| value.is_finite()) {
            return None;
        }
        let width = f64::from(self.columns()) * f64::from(self.tile_width());
        let height = f64::from(self.rows()) * f64::from(self.tile_height());
        let (dx, dy) = (x1 - x0, y1 - y0);

        let mut enter = 0.0_f64;
        let mut leave = 1.0_f64;
        for (p, q) in [(-dx, x0), (dx, width - x0), (-dy, y0), (dy, height - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let ratio = q / p;
            if p < 0.0 {
                if ratio > leave {
                    return None;
                }
                enter = enter.max(ratio);
            } else {
                if ratio < enter {
                    return None;
                }
                leave = leave.min(ratio);
            }
        }

        let (start_x, start_y) = if enter > 0.0 {
            (x0 + enter * dx, y0 + enter * dy)
        } else {
            (x0, y0)
        };
        let (end_x, end_y) = if leave < 1.0 {
            (x0 + leave * dx, y0 + leave * dy)
        } else {
            (x1, y1)
        };
        Some([start_x, start_y, end_x, end_y])
    }
}
