use std::f64::consts::PI;

use crate::projection::{MercatorExtent, EARTH_RADIUS_M};

/// Edge length of a slippy-map tile in pixels
pub const TILE_SIZE: u32 = 256;

/// Highest zoom level requested from any provider
pub const MAX_ZOOM: u32 = 19;

/// Half the width of the Web Mercator plane in metres
const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS_M;

/// Zoom at which the box spans roughly two tiles in its longer direction.
///
/// `min(ceil(log2(720 / lon_span)), ceil(log2(720 / lat_span)))`
pub fn calculate_zoom(west: f64, south: f64, east: f64, north: f64) -> i32 {
    let lon_length = (east - west).abs();
    let lat_length = (north - south).abs();
    let zoom_lon = (360.0 * 2.0 / lon_length).log2().ceil();
    let zoom_lat = (360.0 * 2.0 / lat_length).log2().ceil();
    zoom_lon.min(zoom_lat) as i32
}

/// Global pixel coordinates of a projected point at `zoom`, origin top-left
fn global_pixel(x: f64, y: f64, zoom: u32) -> (f64, f64) {
    let world = TILE_SIZE as f64 * 2f64.powi(zoom as i32);
    let px = (x + ORIGIN_SHIFT) / (2.0 * ORIGIN_SHIFT) * world;
    let py = (ORIGIN_SHIFT - y) / (2.0 * ORIGIN_SHIFT) * world;
    (px, py)
}

/// Inclusive range of tiles covering an extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u32,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

/// Sub-rectangle of the stitched tile mosaic, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelWindow {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl TileRange {
    pub fn covering(extent: &MercatorExtent, zoom: u32) -> Self {
        let last = 2u32.pow(zoom) - 1;
        let (left, top) = global_pixel(extent.x_min, extent.y_max, zoom);
        let (right, bottom) = global_pixel(extent.x_max, extent.y_min, zoom);

        let tile = |pixel: f64| ((pixel / TILE_SIZE as f64).floor().max(0.0) as u32).min(last);
        // The far edges are exclusive: an edge exactly on a tile boundary needs no extra tile
        let tile_end = |pixel: f64| {
            let t = (pixel / TILE_SIZE as f64).ceil() - 1.0;
            (t.max(0.0) as u32).min(last)
        };

        let x_min = tile(left);
        let y_min = tile(top);
        Self {
            zoom,
            x_min,
            x_max: tile_end(right).max(x_min),
            y_min,
            y_max: tile_end(bottom).max(y_min),
        }
    }

    pub fn columns(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn rows(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn count(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Tile coordinates row by row, north to south
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y_min..=self.y_max).flat_map(move |y| (self.x_min..=self.x_max).map(move |x| (x, y)))
    }

    /// Where the extent sits inside the stitched mosaic of this range
    pub fn window(&self, extent: &MercatorExtent) -> PixelWindow {
        let (left, top) = global_pixel(extent.x_min, extent.y_max, self.zoom);
        let (right, bottom) = global_pixel(extent.x_max, extent.y_min, self.zoom);
        let origin_x = (self.x_min * TILE_SIZE) as f64;
        let origin_y = (self.y_min * TILE_SIZE) as f64;
        PixelWindow {
            left: left - origin_x,
            top: top - origin_y,
            width: right - left,
            height: bottom - top,
        }
    }
}
