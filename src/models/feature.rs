//! OSM features returned by the Overpass API.

use std::collections::BTreeMap;

use geo_types::{Coord, Geometry, Polygon};
use serde::{Deserialize, Serialize};

/// Type of OSM element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::Node => write!(f, "node"),
            ElementType::Way => write!(f, "way"),
            ElementType::Relation => write!(f, "relation"),
        }
    }
}

/// One OSM element with its geometry in lon/lat degrees.
///
/// Only the tags that were requested are kept in `tags`; `name` is kept
/// separately for labelling.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    pub element_type: ElementType,
    pub id: i64,
    pub name: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub geometry: Geometry<f64>,
}

impl MapFeature {
    pub fn new(element_type: ElementType, id: i64, geometry: Geometry<f64>) -> Self {
        Self {
            element_type,
            id,
            name: None,
            tags: BTreeMap::new(),
            geometry,
        }
    }

    /// "{type}/{id}", as used on openstreetmap.org
    pub fn source_id(&self) -> String {
        format!("{}/{}", self.element_type, self.id)
    }

    /// Flatten the geometry into the coordinate runs that get drawn
    pub fn paths(&self) -> Vec<Vec<Coord<f64>>> {
        let mut paths = Vec::new();
        match &self.geometry {
            Geometry::Point(point) => paths.push(vec![point.0]),
            Geometry::LineString(line) => paths.push(line.0.clone()),
            Geometry::Polygon(polygon) => paths.extend(polygon_paths(polygon)),
            Geometry::MultiPolygon(multi) => {
                for polygon in &multi.0 {
                    paths.extend(polygon_paths(polygon));
                }
            }
            Geometry::MultiLineString(multi) => {
                paths.extend(multi.0.iter().map(|line| line.0.clone()));
            }
            _ => {}
        }
        paths
    }

    /// Point where a name label is anchored; only named nodes get one
    pub fn label_anchor(&self) -> Option<(Coord<f64>, &str)> {
        if self.element_type != ElementType::Node {
            return None;
        }
        let name = self.name.as_deref()?;
        match &self.geometry {
            Geometry::Point(point) => Some((point.0, name)),
            _ => None,
        }
    }
}

/// Exterior ring followed by each interior ring
fn polygon_paths(polygon: &Polygon<f64>) -> Vec<Vec<Coord<f64>>> {
    let mut paths = vec![polygon.exterior().0.clone()];
    paths.extend(polygon.interiors().iter().map(|ring| ring.0.clone()));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, point, LineString, MultiPolygon, Rect};

    #[test]
    fn test_point_paths() {
        let feature = MapFeature::new(ElementType::Node, 1, point!(x: 1.0, y: 2.0).into());
        assert_eq!(feature.paths(), vec![vec![coord! { x: 1.0, y: 2.0 }]]);
    }

    #[test]
    fn test_polygon_with_hole_paths() {
        let exterior = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)]);
        let polygon = Polygon::new(exterior, vec![hole]);
        let feature = MapFeature::new(ElementType::Way, 2, polygon.into());

        let paths = feature.paths();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0][1], coord! { x: 4.0, y: 0.0 });
        assert_eq!(paths[1][0], coord! { x: 1.0, y: 1.0 });
    }

    #[test]
    fn test_multipolygon_paths() {
        let a = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }).to_polygon();
        let b = Rect::new(coord! { x: 2.0, y: 2.0 }, coord! { x: 3.0, y: 3.0 }).to_polygon();
        let feature = MapFeature::new(
            ElementType::Relation,
            3,
            MultiPolygon::new(vec![a, b]).into(),
        );
        assert_eq!(feature.paths().len(), 2);
    }

    #[test]
    fn test_label_anchor_only_for_named_nodes() {
        let mut node = MapFeature::new(ElementType::Node, 1, point!(x: 1.0, y: 2.0).into());
        assert!(node.label_anchor().is_none());

        node.name = Some("Site 12".to_string());
        let (anchor, name) = node.label_anchor().unwrap();
        assert_eq!(anchor, coord! { x: 1.0, y: 2.0 });
        assert_eq!(name, "Site 12");

        let mut way = MapFeature::new(
            ElementType::Way,
            2,
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]).into(),
        );
        way.name = Some("Portage".to_string());
        assert!(way.label_anchor().is_none());
    }

    #[test]
    fn test_source_id() {
        let feature = MapFeature::new(ElementType::Way, 42, point!(x: 0.0, y: 0.0).into());
        assert_eq!(feature.source_id(), "way/42");
    }
}
