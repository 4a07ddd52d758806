use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{MapError, MapResult};
use crate::models::Place;

/// Which values of one OSM key to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    /// Any element carrying the key
    Any,
    /// Elements whose value is one of these
    Values(Vec<String>),
}

/// Tag filters keyed by OSM key, e.g. `{"tourism": ["camp_site"], "whitewater": true}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    filters: BTreeMap<String, TagFilter>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFilter {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON form: each key maps to `true`, a value, or a list of values
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawFilter> =
            serde_json::from_str(text).context("Failed to parse tag query JSON")?;

        let mut query = Self::new();
        for (key, filter) in raw {
            let filter = match filter {
                RawFilter::Flag(true) => TagFilter::Any,
                RawFilter::Flag(false) => return Err(MapError::InvalidTagFilter(key).into()),
                RawFilter::One(value) => TagFilter::Values(vec![value]),
                RawFilter::Many(values) if values.is_empty() => {
                    return Err(MapError::InvalidTagFilter(key).into())
                }
                RawFilter::Many(values) => TagFilter::Values(values),
            };
            query.insert(&key, filter)?;
        }
        Ok(query)
    }

    pub fn insert(&mut self, key: &str, filter: TagFilter) -> MapResult<()> {
        if key.trim().is_empty() {
            return Err(MapError::InvalidTagFilter(key.to_string()));
        }
        self.filters.insert(key.to_string(), filter);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.filters.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagFilter)> {
        self.filters.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build an Overpass QL union over all tag filters inside the place's box.
///
/// Output uses `out geom;` so ways and relation members carry their
/// coordinates inline and no second node lookup is needed.
pub fn build_query(place: &Place, tags: &TagQuery, timeout_secs: u64) -> String {
    let bbox = format!(
        "({},{},{},{})",
        place.south, place.west, place.north, place.east
    );

    let mut clauses = Vec::new();
    for (key, filter) in tags.iter() {
        let key = escape(key);
        match filter {
            TagFilter::Any => clauses.push(format!("  nwr[\"{}\"]{};", key, bbox)),
            TagFilter::Values(values) => {
                for value in values {
                    clauses.push(format!(
                        "  nwr[\"{}\"=\"{}\"]{};",
                        key,
                        escape(value),
                        bbox
                    ));
                }
            }
        }
    }

    format!(
        "[out:json][timeout:{}];\n(\n{}\n);\nout geom;",
        timeout_secs,
        clauses.join("\n")
    )
}
