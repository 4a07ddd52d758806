//! Background tile layer: provider catalogue, zoom choice, download and stitching.

mod background;
mod fetcher;
mod grid;

pub use background::{Background, TileCatalog, TileSource, STAMEN_API_KEY_VAR, STAMEN_SIGNUP_URL};
pub use fetcher::{crop_to_window, stitch_tiles, TileFetcher};
pub use grid::{calculate_zoom, PixelWindow, TileRange, MAX_ZOOM, TILE_SIZE};
