//! Drawing styles for map features and the OSM tag → style lookup.
//!
//! Sizes are in typographic points so they scale with the printed map rather
//! than with the output resolution.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use image::Rgba;

use crate::error::{MapError, MapResult};

/// Styles shown in the legend, in display order
pub const LEGEND_STYLES: [&str; 9] = [
    "campsite",
    "point_of_interest",
    "barrier",
    "mountain",
    "main_road",
    "secondary_road",
    "tertiary_road",
    "trail",
    "park_boundary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Markers only
    Hidden,
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Circle,
    Triangle,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Rgba<u8>,
    pub line: LineStyle,
    /// Points
    pub line_width: f64,
    pub marker: Marker,
    /// Points
    pub marker_size: f64,
}

impl Style {
    fn line(color: [u8; 3], line: LineStyle, line_width: f64) -> Self {
        Self {
            color: rgb(color),
            line,
            line_width,
            marker: Marker::None,
            marker_size: 0.0,
        }
    }

    fn marker(color: [u8; 3], marker: Marker, marker_size: f64) -> Self {
        Self {
            color: rgb(color),
            line: LineStyle::Hidden,
            line_width: 0.0,
            marker,
            marker_size,
        }
    }
}

impl Default for Style {
    /// Thin blue line for features without a style of their own
    fn default() -> Self {
        Style::line([0x1f, 0x77, 0xb4], LineStyle::Solid, 1.5)
    }
}

pub fn rgb([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

/// Named styles sized for one print dimension
#[derive(Debug, Clone)]
pub struct StyleBook {
    styles: BTreeMap<String, Style>,
    default: Style,
}

impl StyleBook {
    /// Build the style table for a map whose longer side is `dim` inches
    pub fn for_print_size(dim: f64) -> Self {
        let s = dim / 10.0;
        let mut styles = BTreeMap::new();

        styles.insert(
            "campsite".to_string(),
            Style::marker([0xd6, 0x27, 0x28], Marker::Triangle, 6.0 * s),
        );
        styles.insert(
            "point_of_interest".to_string(),
            Style::marker([0x94, 0x67, 0xbd], Marker::Circle, 5.0 * s),
        );
        styles.insert(
            "barrier".to_string(),
            Style {
                marker: Marker::Cross,
                marker_size: 6.0 * s,
                ..Style::line([0x00, 0x00, 0x00], LineStyle::Solid, 1.0 * s)
            },
        );
        styles.insert(
            "mountain".to_string(),
            Style::marker([0x8c, 0x56, 0x4b], Marker::Triangle, 7.0 * s),
        );
        styles.insert(
            "main_road".to_string(),
            Style::line([0xe6, 0x55, 0x0d], LineStyle::Solid, 2.5 * s),
        );
        styles.insert(
            "secondary_road".to_string(),
            Style::line([0xfd, 0x8d, 0x3c], LineStyle::Solid, 1.8 * s),
        );
        styles.insert(
            "tertiary_road".to_string(),
            Style::line([0xb8, 0x86, 0x0b], LineStyle::Solid, 1.2 * s),
        );
        styles.insert(
            "trail".to_string(),
            Style::line([0x8b, 0x00, 0x00], LineStyle::Dashed, 1.2 * s),
        );
        styles.insert(
            "park_boundary".to_string(),
            Style::line([0x2c, 0xa0, 0x2c], LineStyle::Dotted, 1.5 * s),
        );

        Self {
            styles,
            default: Style::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    pub fn default_style(&self) -> &Style {
        &self.default
    }

    /// Legend entries as (label, style), in display order
    pub fn legend_entries(&self) -> Vec<(String, Style)> {
        LEGEND_STYLES
            .iter()
            .filter_map(|name| self.get(name).map(|style| (legend_label(name), *style)))
            .collect()
    }
}

/// "point_of_interest" -> "Point of interest"
pub fn legend_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.as_str().to_lowercase();
            format!("{}{}", first.to_uppercase(), rest).replace('_', " ")
        }
        None => String::new(),
    }
}

/// OSM `key -> value -> style name` table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagStyles {
    table: BTreeMap<String, BTreeMap<String, String>>,
}

impl TagStyles {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let table: BTreeMap<String, BTreeMap<String, String>> =
            serde_json::from_str(text).context("Failed to parse tag styles JSON")?;
        Ok(Self { table })
    }

    /// Every referenced style name must exist in `book`
    pub fn validate(&self, book: &StyleBook) -> MapResult<()> {
        for (key, values) in &self.table {
            for (value, style) in values {
                if !book.contains(style) {
                    return Err(MapError::UnknownStyle {
                        key: key.clone(),
                        value: value.clone(),
                        style: style.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Name of the style for a feature's tags.
    ///
    /// Tags are checked in key order and the last matching pair wins.
    pub fn style_name<'a>(&'a self, tags: &BTreeMap<String, String>) -> Option<&'a str> {
        tags.iter()
            .filter_map(|(key, value)| self.table.get(key)?.get(value))
            .last()
            .map(String::as_str)
    }

    pub fn style_for<'a>(&self, tags: &BTreeMap<String, String>, book: &'a StyleBook) -> &'a Style {
        self.style_name(tags)
            .and_then(|name| book.get(name))
            .unwrap_or(book.default_style())
    }
}
