//! Canoemap - printable canoe-trip maps from OpenStreetMap data
//!
//! This library provides the pipeline stages used by the `make-maps` binary:
//! settings loading, Overpass feature queries, background tiles, and rendering.

pub mod config;
pub mod error;
pub mod models;
pub mod overpass;
pub mod pipeline;
pub mod projection;
pub mod render;
pub mod style;
pub mod tiles;

#[cfg(test)]
mod test_support;

pub use error::MapError;
pub use models::{ElementType, MapFeature, Place};
pub use pipeline::MapMaker;
