//! Core data models for map generation.

pub mod feature;
pub mod place;

pub use feature::{ElementType, MapFeature};
pub use place::{Place, MAX_MERCATOR_LAT};
