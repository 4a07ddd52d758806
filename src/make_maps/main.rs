//! Printable canoe-trip maps.
//!
//! Reads a list of bounding boxes, fetches OSM features and background tiles
//! for each, and writes one PNG per place.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use canoemap::config::{load_places, load_tag_query, load_tag_styles, load_tile_catalog, Settings};
use canoemap::pipeline::MapInputs;
use canoemap::tiles::Background;
use canoemap::MapMaker;

#[derive(Parser, Debug)]
#[command(name = "make-maps")]
#[command(about = "Make printable canoe-trip maps from OpenStreetMap data")]
struct Args {
    /// Maximum dimension (inches) of the map when printed
    #[arg(long, default_value = "10")]
    dim: f64,

    /// JSON file with the places to map
    #[arg(long, default_value = "nation_lakes.json")]
    places: PathBuf,

    /// Background tiles: StamenToner, StamenTonerLite, StamenTerrain, StamenWatercolor,
    /// GoogleMaps, GoogleSatellite, GoogleSatelliteHybrid or EsriSatellite
    #[arg(long, default_value = "StamenTonerLite")]
    bg: Background,

    /// JSON file with the OSM tags to fetch (built-in set if omitted)
    #[arg(long)]
    tags: Option<PathBuf>,

    /// JSON file mapping tags to styles (built-in table if omitted)
    #[arg(long)]
    styles: Option<PathBuf>,

    /// JSON file with background tile URLs (built-in catalog if omitted)
    #[arg(long)]
    tiles: Option<PathBuf>,

    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory, overrides the settings file
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output resolution, overrides the settings file
    #[arg(long)]
    dpi: Option<f64>,

    /// TrueType/OpenType font for labels, overrides the settings file
    #[arg(long)]
    font: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(out) = args.out {
        settings.output.dir = out;
    }
    if let Some(dpi) = args.dpi {
        if !(dpi.is_finite() && dpi > 0.0) {
            anyhow::bail!("--dpi must be positive, got {}", dpi);
        }
        settings.output.dpi = dpi;
    }
    if args.font.is_some() {
        settings.render.font = args.font;
    }

    let places = load_places(&args.places)?;
    info!("Loaded {} places from {}", places.len(), args.places.display());

    let inputs = MapInputs {
        tag_query: load_tag_query(args.tags.as_deref())?,
        tag_styles: load_tag_styles(args.styles.as_deref())?,
        tile_catalog: load_tile_catalog(args.tiles.as_deref())?,
    };
    let maker = MapMaker::new(&settings, args.dim, args.bg, inputs)?;

    let pb = ProgressBar::new(places.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    for place in &places {
        pb.set_message(place.name.clone());
        maker
            .make_map(place)
            .await
            .with_context(|| format!("Failed to make map for '{}'", place.name))?;
        pb.inc(1);
    }
    pb.finish_with_message("done");

    info!(
        "Wrote {} maps to {}",
        places.len(),
        maker.output_dir().display()
    );
    Ok(())
}
