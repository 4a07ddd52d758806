//! Settings file and the JSON inputs: places, tag query, tag styles, tile catalog.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::error::MapError;
use crate::models::Place;
use crate::overpass::{TagQuery, DEFAULT_OVERPASS_URL};
use crate::style::TagStyles;
use crate::tiles::TileCatalog;

const DEFAULT_TAGS: &str = include_str!("../data/tags_osm.json");
const DEFAULT_TAG_STYLES: &str = include_str!("../data/tag_styles.json");
const DEFAULT_TILES: &str = include_str!("../data/tiles.json");

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub output: OutputConfig,
    pub overpass: OverpassConfig,
    pub tiles: TilesConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub dpi: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("maps"),
            dpi: 300.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OverpassConfig {
    pub endpoint: String,
    /// Server-side query timeout
    pub timeout_secs: u64,
    /// Total tries per query, the first one included; only 429 and 504 are retried
    pub max_attempts: u32,
    /// Wait before the first retry, growing linearly with each further one
    pub retry_delay_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_URL.to_string(),
            timeout_secs: 180,
            max_attempts: 2,
            retry_delay_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TilesConfig {
    pub user_agent: String,
    /// Added to the computed zoom for sharper print
    pub zoom_bump: i32,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("canoemap/", env!("CARGO_PKG_VERSION")).to_string(),
            zoom_bump: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub font: Option<PathBuf>,
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        settings.check()?;
        Ok(settings)
    }

    /// Settings from `path`, or the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn overpass_endpoint(&self) -> Result<Url> {
        Url::parse(&self.overpass.endpoint)
            .with_context(|| format!("Invalid Overpass endpoint '{}'", self.overpass.endpoint))
    }

    fn check(&self) -> Result<()> {
        if !(self.output.dpi.is_finite() && self.output.dpi > 0.0) {
            anyhow::bail!("output.dpi must be positive, got {}", self.output.dpi);
        }
        self.overpass_endpoint()?;
        Ok(())
    }
}

/// Read and validate the places file
pub fn load_places(path: &Path) -> Result<Vec<Place>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read places file {}", path.display()))?;
    parse_places(&text).with_context(|| format!("Invalid places file {}", path.display()))
}

/// Parse a JSON array of places, checking every bounding box
pub fn parse_places(text: &str) -> Result<Vec<Place>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(text).context("Expected a JSON array of places")?;
    if entries.is_empty() {
        warn!("Places file contains no entries");
    }

    let mut places = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let place: Place = serde_json::from_value(entry)
            .with_context(|| format!("place #{}: malformed entry", index))?;
        place
            .validate()
            .map_err(|e| MapError::InvalidPlaceEntry {
                index,
                source: Box::new(e),
            })?;
        places.push(place);
    }

    debug!("Loaded {} places", places.len());
    Ok(places)
}

fn read_or_default(path: Option<&Path>, default: &'static str, what: &str) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} file {}", what, path.display())),
        None => Ok(default.to_string()),
    }
}

/// OSM tags to fetch; built-in set when `path` is None
pub fn load_tag_query(path: Option<&Path>) -> Result<TagQuery> {
    let text = read_or_default(path, DEFAULT_TAGS, "tags")?;
    let query = TagQuery::from_json_str(&text)?;
    if query.is_empty() {
        anyhow::bail!("Tag query is empty, nothing would be fetched");
    }
    Ok(query)
}

pub fn load_tag_styles(path: Option<&Path>) -> Result<TagStyles> {
    let text = read_or_default(path, DEFAULT_TAG_STYLES, "tag styles")?;
    TagStyles::from_json_str(&text)
}

pub fn load_tile_catalog(path: Option<&Path>) -> Result<TileCatalog> {
    let text = read_or_default(path, DEFAULT_TILES, "tiles")?;
    TileCatalog::from_json_str(&text)
}
