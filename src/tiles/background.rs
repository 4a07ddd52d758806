use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::error::{MapError, MapResult};

/// Environment variable holding the Stadia Maps key for Stamen tiles
pub const STAMEN_API_KEY_VAR: &str = "STAMEN_API_KEY";

pub const STAMEN_SIGNUP_URL: &str = "https://stadiamaps.com/stamen/onboarding/create-account";

/// Placeholder replaced by the API key in tile URL templates
const API_KEY_PLACEHOLDER: &str = "API_KEY";

/// Background tile styles that can be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Background {
    StamenToner,
    StamenTonerLite,
    StamenTerrain,
    StamenWatercolor,
    GoogleMaps,
    GoogleSatellite,
    GoogleSatelliteHybrid,
    EsriSatellite,
}

impl Background {
    pub const ALL: [Background; 8] = [
        Background::StamenToner,
        Background::StamenTonerLite,
        Background::StamenTerrain,
        Background::StamenWatercolor,
        Background::GoogleMaps,
        Background::GoogleSatellite,
        Background::GoogleSatelliteHybrid,
        Background::EsriSatellite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Background::StamenToner => "StamenToner",
            Background::StamenTonerLite => "StamenTonerLite",
            Background::StamenTerrain => "StamenTerrain",
            Background::StamenWatercolor => "StamenWatercolor",
            Background::GoogleMaps => "GoogleMaps",
            Background::GoogleSatellite => "GoogleSatellite",
            Background::GoogleSatelliteHybrid => "GoogleSatelliteHybrid",
            Background::EsriSatellite => "EsriSatellite",
        }
    }

    /// Stamen tiles are served by Stadia Maps and need an API key
    pub fn needs_api_key(&self) -> bool {
        matches!(
            self,
            Background::StamenToner
                | Background::StamenTonerLite
                | Background::StamenTerrain
                | Background::StamenWatercolor
        )
    }

    fn names() -> String {
        Self::ALL
            .iter()
            .map(Background::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Background {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|bg| bg.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| MapError::UnknownBackground(s.to_string(), Self::names()))
    }
}

/// Background name -> URL template with `{x}`, `{y}`, `{z}` placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileCatalog {
    templates: BTreeMap<String, String>,
}

impl TileCatalog {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let templates: BTreeMap<String, String> =
            serde_json::from_str(text).context("Failed to parse tile catalog JSON")?;
        Ok(Self { templates })
    }

    pub fn template(&self, background: Background) -> MapResult<&str> {
        self.templates
            .get(background.name())
            .map(String::as_str)
            .ok_or_else(|| MapError::MissingTileTemplate(background.name().to_string()))
    }
}

/// A background with its ready-to-use URL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    pub background: Background,
    template: String,
}

impl TileSource {
    /// Pick the tile URL for `requested`, substituting the API key.
    ///
    /// Stamen styles without a key fall back to `GoogleMaps`.
    pub fn resolve(
        requested: Background,
        catalog: &TileCatalog,
        api_key: Option<&str>,
    ) -> MapResult<Self> {
        let api_key = api_key.map(str::trim).filter(|key| !key.is_empty());

        let (background, template) = match (requested.needs_api_key(), api_key) {
            (true, Some(key)) => {
                info!("Stamen API key found in environment");
                let template = catalog
                    .template(requested)?
                    .replace(API_KEY_PLACEHOLDER, key);
                (requested, template)
            }
            (true, None) => {
                warn!(
                    "Can't use '{}' tiles, no Stamen API key found in ${}",
                    requested, STAMEN_API_KEY_VAR
                );
                warn!("You can create one at {}", STAMEN_SIGNUP_URL);
                warn!("Using '{}' tiles instead", Background::GoogleMaps);
                let fallback = Background::GoogleMaps;
                (fallback, catalog.template(fallback)?.to_string())
            }
            (false, _) => (requested, catalog.template(requested)?.to_string()),
        };

        if !["{x}", "{y}", "{z}"].iter().all(|p| template.contains(p)) {
            return Err(MapError::BadTileTemplate(background.name().to_string()));
        }

        Ok(Self {
            background,
            template,
        })
    }

    /// Resolve using the key from the environment
    pub fn from_env(requested: Background, catalog: &TileCatalog) -> MapResult<Self> {
        let key = std::env::var(STAMEN_API_KEY_VAR).ok();
        Self::resolve(requested, catalog, key.as_deref())
    }

    pub fn tile_url(&self, z: u32, x: u32, y: u32) -> String {
        self.template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}
