use std::collections::BTreeMap;

use anyhow::{Context, Result};
use geo::{Contains, Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use hashbrown::HashMap;
use serde::Deserialize;
use tracing::{debug, warn};

use super::TagQuery;
use crate::models::{ElementType, MapFeature};

/// Keys whose closed ways are still lines (a road loop is not an area)
const LINEAR_KEYS: [&str; 6] = ["highway", "barrier", "waterway", "route", "railway", "power"];

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
    /// Runtime errors (timeouts, memory) are reported here with partial results
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
    #[serde(default)]
    members: Vec<OverpassMember>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassMember {
    #[serde(rename = "type")]
    member_type: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

/// Parse an Overpass `out geom` JSON response into features.
///
/// Only the tag keys present in `tags` are retained on each feature.
/// Elements whose geometry cannot be built are skipped.
pub fn parse_response(text: &str, tags: &TagQuery) -> Result<Vec<MapFeature>> {
    let response: OverpassResponse =
        serde_json::from_str(text).context("Failed to parse Overpass response")?;

    if let Some(remark) = &response.remark {
        warn!("Overpass remark: {}", remark);
    }

    let mut features = Vec::with_capacity(response.elements.len());
    let mut skipped = 0;

    for element in response.elements {
        let (element_type, geometry) = match element.element_type.as_str() {
            "node" => (ElementType::Node, node_geometry(&element)),
            "way" => (ElementType::Way, way_geometry(&element)),
            "relation" => (ElementType::Relation, relation_geometry(&element)),
            other => {
                debug!("Ignoring Overpass element of type {}", other);
                continue;
            }
        };

        let Some(geometry) = geometry else {
            skipped += 1;
            continue;
        };

        let mut feature = MapFeature::new(element_type, element.id, geometry);
        feature.name = element.tags.get("name").cloned();
        feature.tags = element
            .tags
            .iter()
            .filter(|(key, _)| tags.contains_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<BTreeMap<_, _>>();
        features.push(feature);
    }

    if skipped > 0 {
        debug!("Skipped {} elements without usable geometry", skipped);
    }

    Ok(features)
}

fn to_coords(points: &[Option<LatLon>]) -> Vec<Coord<f64>> {
    points
        .iter()
        .flatten()
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect()
}

fn node_geometry(element: &OverpassElement) -> Option<Geometry<f64>> {
    let (lat, lon) = (element.lat?, element.lon?);
    Some(Point::new(lon, lat).into())
}

fn way_geometry(element: &OverpassElement) -> Option<Geometry<f64>> {
    let coords = to_coords(&element.geometry);
    if coords.len() < 2 {
        return None;
    }

    let closed = coords.len() >= 4 && coords.first() == coords.last();
    if closed && is_area(&element.tags) {
        Some(Polygon::new(LineString::new(coords), vec![]).into())
    } else {
        Some(LineString::new(coords).into())
    }
}

fn is_area(tags: &HashMap<String, String>) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("yes") => return true,
        Some("no") => return false,
        _ => {}
    }
    !LINEAR_KEYS.iter().any(|key| tags.contains_key(*key))
}

fn relation_geometry(element: &OverpassElement) -> Option<Geometry<f64>> {
    let way_members = element.members.iter().filter(|m| m.member_type == "way");

    let is_area = matches!(
        element.tags.get("type").map(String::as_str),
        Some("multipolygon") | Some("boundary")
    );

    if is_area {
        let mut outers = Vec::new();
        let mut inners = Vec::new();
        for member in way_members.clone() {
            let coords = to_coords(&member.geometry);
            if coords.len() < 2 {
                continue;
            }
            match member.role.as_str() {
                "inner" => inners.push(coords),
                _ => outers.push(coords),
            }
        }

        if let Some(multi) = assemble_multipolygon(outers, inners) {
            return Some(multi.into());
        }
        debug!(
            "relation/{} rings did not close, drawing members as lines",
            element.id
        );
    }

    let lines: Vec<LineString<f64>> = way_members
        .map(|m| to_coords(&m.geometry))
        .filter(|coords| coords.len() >= 2)
        .map(LineString::new)
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(MultiLineString::new(lines).into())
    }
}

/// Close outer and inner fragments into rings and put each hole in the
/// outer ring that contains it
fn assemble_multipolygon(
    outers: Vec<Vec<Coord<f64>>>,
    inners: Vec<Vec<Coord<f64>>>,
) -> Option<MultiPolygon<f64>> {
    let outer_rings = merge_rings(outers);
    if outer_rings.is_empty() {
        return None;
    }

    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); outer_rings.len()];
    for inner in merge_rings(inners) {
        // Whole-ring test: an inner ring may touch its outer ring at a vertex
        let owner = outer_rings
            .iter()
            .position(|outer| Polygon::new(outer.clone(), vec![]).contains(&inner));
        match owner {
            Some(index) => holes[index].push(inner),
            None => debug!("Dropping inner ring outside every outer ring"),
        }
    }

    let polygons = outer_rings
        .into_iter()
        .zip(holes)
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
        .collect();

    Some(MultiPolygon::new(polygons))
}

/// Join way fragments end-to-end into closed rings.
///
/// Fragments may be reversed relative to each other. Chains that never
/// close into a ring of at least four coordinates are dropped.
pub fn merge_rings(fragments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut result = Vec::new();
    let mut remaining = fragments;

    while !remaining.is_empty() {
        let mut current = remaining.remove(0);

        if current.len() >= 4 && current.first() == current.last() {
            result.push(LineString::new(current));
            continue;
        }

        let mut merged = true;
        while merged && !remaining.is_empty() && current.first() != current.last() {
            merged = false;

            let current_start = current.first().copied();
            let current_end = current.last().copied();

            for i in 0..remaining.len() {
                let fragment_start = remaining[i].first().copied();
                let fragment_end = remaining[i].last().copied();

                if current_end == fragment_start {
                    let mut fragment = remaining.remove(i);
                    fragment.remove(0);
                    current.extend(fragment);
                } else if current_end == fragment_end {
                    let mut fragment = remaining.remove(i);
                    fragment.reverse();
                    fragment.remove(0);
                    current.extend(fragment);
                } else if current_start == fragment_end {
                    let mut fragment = remaining.remove(i);
                    fragment.pop();
                    fragment.extend(current);
                    current = fragment;
                } else if current_start == fragment_start {
                    let mut fragment = remaining.remove(i);
                    fragment.reverse();
                    fragment.pop();
                    fragment.extend(current);
                    current = fragment;
                } else {
                    continue;
                }
                merged = true;
                break;
            }
        }

        if current.len() >= 4 && current.first() == current.last() {
            result.push(LineString::new(current));
        }
    }

    result
}
