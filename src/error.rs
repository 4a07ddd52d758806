use thiserror::Error;

/// Validation and configuration errors raised before any network work starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("place '{name}': {reason}")]
    InvalidBbox { name: String, reason: String },

    #[error("place #{index}: {source}")]
    InvalidPlaceEntry {
        index: usize,
        #[source]
        source: Box<MapError>,
    },

    #[error("unknown background '{0}', expected one of: {1}")]
    UnknownBackground(String, String),

    #[error("background '{0}' has no entry in the tile catalog")]
    MissingTileTemplate(String),

    #[error("tile template for '{0}' lacks the {{x}}, {{y}} and {{z}} placeholders")]
    BadTileTemplate(String),

    #[error("tag style {key}={value} refers to unknown style '{style}'")]
    UnknownStyle {
        key: String,
        value: String,
        style: String,
    },

    #[error("invalid tag filter for '{0}': expected true, a string or a list of strings")]
    InvalidTagFilter(String),
}

pub type MapResult<T> = Result<T, MapError>;
