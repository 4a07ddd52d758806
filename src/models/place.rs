//! Named bounding box describing the extent of one map.

use serde::{Deserialize, Serialize};

use crate::error::{MapError, MapResult};

/// Latitude limit of the spherical Web Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// A named geographic bounding box, in degrees.
///
/// Boxes crossing the antimeridian are not supported: `west` must be
/// smaller than `east`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Place {
    pub name: String,
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Place {
    pub fn new(name: &str, north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            name: name.to_string(),
            north,
            south,
            east,
            west,
        }
    }

    /// Check the box is non-empty and renderable in Web Mercator
    pub fn validate(&self) -> MapResult<()> {
        let invalid = |reason: String| MapError::InvalidBbox {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }

        for (label, lat) in [("north", self.north), ("south", self.south)] {
            if !(-MAX_MERCATOR_LAT..=MAX_MERCATOR_LAT).contains(&lat) {
                return Err(invalid(format!(
                    "{} latitude {} outside [-{}, {}]",
                    label, lat, MAX_MERCATOR_LAT, MAX_MERCATOR_LAT
                )));
            }
        }
        for (label, lon) in [("east", self.east), ("west", self.west)] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(invalid(format!(
                    "{} longitude {} outside [-180, 180]",
                    label, lon
                )));
            }
        }

        // Negated comparisons so NaN is rejected as well
        if !(self.south < self.north) {
            return Err(invalid(format!(
                "south ({}) must be less than north ({})",
                self.south, self.north
            )));
        }
        if !(self.west < self.east) {
            return Err(invalid(format!(
                "west ({}) must be less than east ({})",
                self.west, self.east
            )));
        }

        Ok(())
    }

    /// Output file stem: the name with spaces removed
    pub fn file_stem(&self) -> String {
        self.name.chars().filter(|c| *c != ' ').collect()
    }

    pub fn center_lat(&self) -> f64 {
        (self.north + self.south) / 2.0
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (N {}, S {}, E {}, W {})",
            self.name, self.north, self.south, self.east, self.west
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nation_lakes() -> Place {
        Place::new("Nation Lakes", 55.2, 54.9, -124.9, -125.6)
    }

    #[test]
    fn test_valid_bbox() {
        assert!(nation_lakes().validate().is_ok());
    }

    #[test]
    fn test_south_not_below_north() {
        let mut place = nation_lakes();
        place.south = place.north;
        let err = place.validate().unwrap_err();
        assert!(err.to_string().contains("south"));
    }

    #[test]
    fn test_west_not_below_east() {
        let mut place = nation_lakes();
        place.west = -124.0;
        assert!(matches!(
            place.validate(),
            Err(MapError::InvalidBbox { .. })
        ));
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let mut place = nation_lakes();
        place.north = 89.0;
        assert!(place.validate().is_err());

        let mut place = nation_lakes();
        place.west = -181.0;
        assert!(place.validate().is_err());
    }

    #[test]
    fn test_nan_rejected() {
        let mut place = nation_lakes();
        place.south = f64::NAN;
        assert!(place.validate().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut place = nation_lakes();
        place.name = "  ".to_string();
        assert!(place.validate().is_err());
    }

    #[test]
    fn test_file_stem_strips_spaces() {
        assert_eq!(nation_lakes().file_stem(), "NationLakes");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"name": "A", "north": 1, "south": 0, "east": 1, "west": 0, "zoom": 3}"#;
        assert!(serde_json::from_str::<Place>(json).is_err());
    }
}
