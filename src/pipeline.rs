//! One map per place: features, background tiles, render, save.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Settings;
use crate::models::Place;
use crate::overpass::{OverpassClient, TagQuery};
use crate::projection::MercatorExtent;
use crate::render::{MapRenderer, Typeface, MAX_CANVAS_PIXELS};
use crate::style::TagStyles;
use crate::tiles::{calculate_zoom, Background, TileCatalog, TileFetcher, TileSource, MAX_ZOOM};

/// The JSON inputs that shape every map
#[derive(Debug, Clone)]
pub struct MapInputs {
    pub tag_query: TagQuery,
    pub tag_styles: TagStyles,
    pub tile_catalog: TileCatalog,
}

pub struct MapMaker {
    overpass: OverpassClient,
    tiles: TileFetcher,
    tag_query: TagQuery,
    renderer: MapRenderer,
    output_dir: PathBuf,
    zoom_bump: i32,
}

impl MapMaker {
    /// `dim` is the longer printed side in inches.
    ///
    /// The Stamen API key is read from the environment here.
    pub fn new(
        settings: &Settings,
        dim: f64,
        background: Background,
        inputs: MapInputs,
    ) -> Result<Self> {
        if !(dim.is_finite() && dim > 0.0) {
            anyhow::bail!("Map dimension must be a positive number of inches, got {}", dim);
        }
        // A square box gives the largest canvas for a given dimension
        let side_px = dim * settings.output.dpi;
        if side_px * side_px > MAX_CANVAS_PIXELS as f64 {
            anyhow::bail!(
                "A {} in map at {} dpi needs up to {:.0} x {:.0} pixels, more than the {} pixel limit",
                dim,
                settings.output.dpi,
                side_px,
                side_px,
                MAX_CANVAS_PIXELS
            );
        }

        let source = TileSource::from_env(background, &inputs.tile_catalog)?;
        info!("Selected background: {}", source.background);

        let typeface = Typeface::load(settings.render.font.as_deref())?;
        let renderer = MapRenderer::new(dim, settings.output.dpi, inputs.tag_styles, typeface)?;

        let overpass = OverpassClient::new(
            settings.overpass_endpoint()?,
            &settings.tiles.user_agent,
            settings.overpass.timeout_secs,
            settings.overpass.max_attempts,
        )?
        .with_retry_delay(Duration::from_secs(settings.overpass.retry_delay_secs));
        let tiles = TileFetcher::new(source, &settings.tiles.user_agent)?;

        Ok(Self {
            overpass,
            tiles,
            tag_query: inputs.tag_query,
            renderer,
            output_dir: settings.output.dir.clone(),
            zoom_bump: settings.tiles.zoom_bump,
        })
    }

    pub fn background(&self) -> Background {
        self.tiles.source().background
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output dir>/<name without spaces>.png`
    pub fn output_path(&self, place: &Place) -> PathBuf {
        self.output_dir.join(format!("{}.png", place.file_stem()))
    }

    /// Build and save the map for one place, returning the written path
    pub async fn make_map(&self, place: &Place) -> Result<PathBuf> {
        place.validate()?;
        info!("Making map for: {}", place);

        let extent = MercatorExtent::from_place(place);
        let (width, height) = self.renderer.canvas_size(&extent);
        let zoom = tile_zoom(place, self.zoom_bump);

        let features = self
            .overpass
            .fetch_features(place, &self.tag_query)
            .await
            .with_context(|| format!("Failed to fetch OSM features for '{}'", place.name))?;

        let background = self
            .tiles
            .fetch_background(&extent, zoom, width, height)
            .await
            .with_context(|| format!("Failed to fetch background tiles for '{}'", place.name))?;

        let canvas = self.renderer.render(place, Some(background), &features);

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;
        let path = self.output_path(place);
        canvas.save(&path)?;
        info!("Map saved to {}", path.display());

        Ok(path)
    }
}

/// Tile zoom for a place: one step past the two-tile fit by default, within provider limits
pub fn tile_zoom(place: &Place, bump: i32) -> u32 {
    let zoom = calculate_zoom(place.west, place.south, place.east, place.north) + bump;
    zoom.clamp(0, MAX_ZOOM as i32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_tag_query, load_tag_styles, load_tile_catalog};

    fn inputs() -> MapInputs {
        MapInputs {
            tag_query: load_tag_query(None).unwrap(),
            tag_styles: load_tag_styles(None).unwrap(),
            tile_catalog: load_tile_catalog(None).unwrap(),
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.output.dir = PathBuf::from("out/maps");
        settings
    }

    #[test]
    fn test_tile_zoom() {
        let place = Place::new("Nation Lakes", 55.2, 54.9, -124.9, -125.6);
        assert_eq!(tile_zoom(&place, 0), 11);
        assert_eq!(tile_zoom(&place, 1), 12);

        let tiny = Place::new("Pond", 50.00001, 50.0, -120.0, -120.00001);
        assert_eq!(tile_zoom(&tiny, 1), MAX_ZOOM);

        let world = Place::new("World", 85.0, -85.0, 180.0, -180.0);
        assert_eq!(tile_zoom(&world, -3), 0);
    }

    #[test]
    fn test_output_path_strips_spaces() {
        let maker =
            MapMaker::new(&settings(), 10.0, Background::GoogleMaps, inputs()).unwrap();
        let place = Place::new("Nation Lakes East", 55.2, 54.9, -124.9, -125.6);
        assert_eq!(
            maker.output_path(&place),
            PathBuf::from("out/maps/NationLakesEast.png")
        );
        assert_eq!(maker.background(), Background::GoogleMaps);
    }

    #[test]
    fn test_bad_dimension_rejected() {
        for dim in [0.0, -4.0, f64::NAN] {
            assert!(MapMaker::new(&settings(), dim, Background::GoogleMaps, inputs()).is_err());
        }
    }

    #[test]
    fn test_oversized_canvas_rejected() {
        let err = MapMaker::new(&settings(), 1000.0, Background::GoogleMaps, inputs())
            .err()
            .unwrap();
        assert!(err.to_string().contains("pixel limit"), "{}", err);

        let mut sharp = settings();
        sharp.output.dpi = 20_000.0;
        assert!(MapMaker::new(&sharp, 10.0, Background::GoogleMaps, inputs()).is_err());

        // A3 poster at 600 dpi still fits
        let mut poster = settings();
        poster.output.dpi = 600.0;
        assert!(MapMaker::new(&poster, 16.5, Background::GoogleMaps, inputs()).is_ok());
    }

    #[test]
    fn test_unknown_style_rejected() {
        let mut inputs = inputs();
        inputs.tag_styles =
            TagStyles::from_json_str(r#"{"waterway": {"rapids": "whitewater"}}"#).unwrap();
        assert!(MapMaker::new(&settings(), 10.0, Background::EsriSatellite, inputs).is_err());
    }

    #[tokio::test]
    async fn test_invalid_place_fails_before_fetching() {
        let maker =
            MapMaker::new(&settings(), 10.0, Background::GoogleMaps, inputs()).unwrap();
        let flipped = Place::new("Flipped", 54.0, 55.0, -124.9, -125.6);
        assert!(maker.make_map(&flipped).await.is_err());
    }
}
