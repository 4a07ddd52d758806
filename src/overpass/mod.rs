//! OpenStreetMap feature queries through the Overpass API.
//!
//! Builds Overpass QL for a bounding box and a set of tag filters, fetches
//! the result with inline geometry, and assembles `geo` geometries from it.

mod client;
mod geometry;
mod query;

pub use client::{OverpassClient, DEFAULT_OVERPASS_URL};
pub use geometry::{merge_rings, parse_response};
pub use query::{build_query, TagFilter, TagQuery};
