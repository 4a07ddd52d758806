use std::time::Duration;

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImage, RgbaImage};
use reqwest::Client;
use tracing::{debug, info, warn};

use super::{PixelWindow, TileRange, TileSource, TILE_SIZE};
use crate::projection::MercatorExtent;

/// Upper bound on tiles fetched for one map; zoom is lowered until it fits
const MAX_TILES_PER_MAP: usize = 256;

/// Downloads slippy-map tiles and assembles them into one background image
pub struct TileFetcher {
    client: Client,
    source: TileSource,
}

impl TileFetcher {
    pub fn new(source: TileSource, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, source })
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    /// Download a single tile
    pub async fn download_tile(&self, z: u32, x: u32, y: u32) -> Result<DynamicImage> {
        let url = self.source.tile_url(z, x, y);
        debug!("Downloading {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Tile request {}/{}/{} failed", z, x, y))?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to download tile {}/{}/{}: HTTP {}",
                z,
                x,
                y,
                response.status()
            );
        }

        let bytes = response.bytes().await?;
        let tile = image::load_from_memory(&bytes)
            .with_context(|| format!("Tile {}/{}/{} is not a readable image", z, x, y))?;
        Ok(tile)
    }

    /// Background image for `extent`, scaled to `width` x `height` pixels
    pub async fn fetch_background(
        &self,
        extent: &MercatorExtent,
        zoom: u32,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage> {
        let requested_zoom = zoom;
        let mut zoom = zoom;
        let mut range = TileRange::covering(extent, zoom);
        while range.count() > MAX_TILES_PER_MAP && zoom > 0 {
            zoom -= 1;
            range = TileRange::covering(extent, zoom);
        }
        if zoom < requested_zoom {
            warn!(
                "Lowered tile zoom from {} to {} to stay under {} tiles",
                requested_zoom, zoom, MAX_TILES_PER_MAP
            );
        }
        info!(
            "Fetching {} {} tiles at zoom {}",
            range.count(),
            self.source.background,
            zoom
        );

        let mut tiles = Vec::with_capacity(range.count());
        for (x, y) in range.iter() {
            tiles.push(self.download_tile(zoom, x, y).await?);
        }

        let mosaic = stitch_tiles(&range, &tiles)?;
        let cropped = crop_to_window(&mosaic, &range.window(extent));
        if cropped.width() < width / 2 {
            warn!(
                "Background is {} px wide for a {} px map; tiles will look soft",
                cropped.width(),
                width
            );
        }

        Ok(imageops::resize(&cropped, width, height, FilterType::Triangle))
    }
}

/// Lay tiles out row by row (as yielded by `TileRange::iter`) in one image
pub fn stitch_tiles(range: &TileRange, tiles: &[DynamicImage]) -> Result<RgbaImage> {
    if tiles.len() != range.count() {
        anyhow::bail!(
            "Expected {} tiles for stitching, got {}",
            range.count(),
            tiles.len()
        );
    }

    let mut mosaic = RgbaImage::new(range.columns() * TILE_SIZE, range.rows() * TILE_SIZE);
    for (index, tile) in tiles.iter().enumerate() {
        let column = index as u32 % range.columns();
        let row = index as u32 / range.columns();

        // High-DPI providers serve 512 px tiles
        let tile = if tile.width() != TILE_SIZE || tile.height() != TILE_SIZE {
            tile.resize_exact(TILE_SIZE, TILE_SIZE, FilterType::Triangle)
        } else {
            tile.clone()
        };

        mosaic
            .copy_from(&tile.to_rgba8(), column * TILE_SIZE, row * TILE_SIZE)
            .context("Failed to place tile in mosaic")?;
    }
    Ok(mosaic)
}

/// Cut the window out of the mosaic, clamped to its bounds
pub fn crop_to_window(mosaic: &RgbaImage, window: &PixelWindow) -> RgbaImage {
    let left = (window.left.round().max(0.0) as u32).min(mosaic.width().saturating_sub(1));
    let top = (window.top.round().max(0.0) as u32).min(mosaic.height().saturating_sub(1));
    let width = (window.width.round().max(1.0) as u32).min(mosaic.width() - left);
    let height = (window.height.round().max(1.0) as u32).min(mosaic.height() - top);
    imageops::crop_imm(mosaic, left, top, width, height).to_image()
}
