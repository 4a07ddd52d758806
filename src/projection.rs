//! Coordinate transformations between lon/lat, Web Mercator and figure space.
//!
//! Tiles are served in spherical Web Mercator (EPSG:3857), so features are
//! projected there before drawing. Figure coordinates are fractions of the
//! map width and height with the origin at the lower-left corner.

use std::f64::consts::PI;

use geo::{Distance, Geodesic, Point};

use crate::models::Place;

/// WGS84 semi-major axis used by EPSG:3857
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Convert (lon, lat) in degrees to EPSG:3857 (x, y) in metres
pub fn lonlat_to_xy(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Convert EPSG:3857 (x, y) in metres to (lon, lat) in degrees
pub fn xy_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Projected extent of one map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl MercatorExtent {
    pub fn from_place(place: &Place) -> Self {
        let (x_min, y_min) = lonlat_to_xy(place.west, place.south);
        let (x_max, y_max) = lonlat_to_xy(place.east, place.north);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn dx(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn dy(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Figure fractions to projected coordinates
    pub fn fig_to_xy(&self, x_fig: f64, y_fig: f64) -> (f64, f64) {
        (
            x_fig * self.dx() + self.x_min,
            y_fig * self.dy() + self.y_min,
        )
    }

    /// Projected coordinates to figure fractions
    pub fn xy_to_fig(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.x_min) / self.dx(), (y - self.y_min) / self.dy())
    }
}

/// Figure size in inches for a map whose longer side is `max_dim` inches.
///
/// Returns `(width, height)`.
pub fn calculate_plot_dimensions(max_dim: f64, dx: f64, dy: f64) -> (f64, f64) {
    if dx >= dy {
        (max_dim, max_dim * dy / dx)
    } else {
        (max_dim * dx / dy, max_dim)
    }
}

/// Ground distance in km spanned by the map width at its central latitude
pub fn plot_width_km(west: f64, east: f64, south: f64, north: f64) -> f64 {
    let lat = (north + south) / 2.0;
    Geodesic.distance(Point::new(west, lat), Point::new(east, lat)) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn test_origin_projects_to_zero() {
        let (x, y) = lonlat_to_xy(0.0, 0.0);
        assert!(approx(x, 0.0, 1e-9));
        assert!(approx(y, 0.0, 1e-9));
    }

    #[test]
    fn test_known_mercator_values() {
        // Edge of the world in EPSG:3857
        let (x, _) = lonlat_to_xy(180.0, 0.0);
        assert!(approx(x, 20_037_508.342_789_244, 1e-6));

        let (_, y) = lonlat_to_xy(0.0, 85.051_128_78);
        assert!(approx(y, 20_037_508.34, 1.0));
    }

    #[test]
    fn test_mercator_round_trip() {
        let (x, y) = lonlat_to_xy(-125.3, 55.05);
        let (lon, lat) = xy_to_lonlat(x, y);
        assert!(approx(lon, -125.3, 1e-9));
        assert!(approx(lat, 55.05, 1e-9));
    }

    #[test]
    fn test_fig_xy_round_trip() {
        let extent = MercatorExtent {
            x_min: 100.0,
            x_max: 300.0,
            y_min: -50.0,
            y_max: 50.0,
        };
        assert_eq!(extent.fig_to_xy(0.5, 0.5), (200.0, 0.0));
        assert_eq!(extent.fig_to_xy(0.0, 1.0), (100.0, 50.0));
        assert_eq!(extent.xy_to_fig(250.0, 25.0), (0.75, 0.75));
    }

    #[test]
    fn test_plot_dimensions_wide() {
        let (w, h) = calculate_plot_dimensions(10.0, 200.0, 100.0);
        assert_eq!((w, h), (10.0, 5.0));
    }

    #[test]
    fn test_plot_dimensions_tall() {
        let (w, h) = calculate_plot_dimensions(12.0, 50.0, 200.0);
        assert_eq!((w, h), (3.0, 12.0));
    }

    #[test]
    fn test_plot_width_km_at_equator() {
        // One degree of longitude at the equator is about 111.32 km on WGS84
        let km = plot_width_km(0.0, 1.0, -0.001, 0.001);
        assert!(approx(km, 111.32, 0.05), "got {}", km);
    }

    #[test]
    fn test_plot_width_shrinks_with_latitude() {
        let equator = plot_width_km(0.0, 1.0, -0.5, 0.5);
        let north = plot_width_km(0.0, 1.0, 59.5, 60.5);
        assert!(approx(north / equator, 0.5, 0.01));
    }
}
