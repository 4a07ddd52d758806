//! Raster drawing surface in Web Mercator with print-size units.

use std::path::Path;

use anyhow::{Context, Result};
use geo::Coord;
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::projection::{lonlat_to_xy, MercatorExtent};
use crate::style::{LineStyle, Marker, Style};

/// Dash and gap lengths as multiples of the line width
const DASH_PATTERN: [f32; 2] = [3.7, 1.6];
const DOT_PATTERN: [f32; 2] = [1.0, 1.65];

/// Smallest advance along a dashed segment, in pixels
const MIN_DASH_STEP: f32 = 0.01;

/// Map image with a projected extent and an output resolution
pub struct MapCanvas {
    image: RgbaImage,
    extent: MercatorExtent,
    dpi: f64,
}

impl MapCanvas {
    /// Blank white canvas
    pub fn new(extent: MercatorExtent, width: u32, height: u32, dpi: f64) -> Self {
        Self::with_background(
            extent,
            RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            dpi,
        )
    }

    /// Canvas whose pixels start as `background`
    pub fn with_background(extent: MercatorExtent, background: RgbaImage, dpi: f64) -> Self {
        Self {
            image: background,
            extent,
            dpi,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn extent(&self) -> &MercatorExtent {
        &self.extent
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Points (1/72 inch) to pixels
    pub fn pt_to_px(&self, points: f64) -> f32 {
        (points * self.dpi / 72.0) as f32
    }

    /// Projected coordinates to pixels, y growing downwards
    pub fn xy_to_px(&self, x: f64, y: f64) -> (f32, f32) {
        let px = (x - self.extent.x_min) / self.extent.dx() * self.width() as f64;
        let py = (self.extent.y_max - y) / self.extent.dy() * self.height() as f64;
        (px as f32, py as f32)
    }

    pub fn lonlat_to_px(&self, lon: f64, lat: f64) -> (f32, f32) {
        let (x, y) = lonlat_to_xy(lon, lat);
        self.xy_to_px(x, y)
    }

    /// Figure fractions (origin lower-left) to pixels
    pub fn fig_to_px(&self, x_fig: f64, y_fig: f64) -> (f32, f32) {
        let (x, y) = self.extent.fig_to_xy(x_fig, y_fig);
        self.xy_to_px(x, y)
    }

    /// Draw a lon/lat coordinate run with a feature style
    pub fn draw_path(&mut self, coords: &[Coord<f64>], style: &Style) {
        let points: Vec<(f32, f32)> = coords
            .iter()
            .map(|c| self.lonlat_to_px(c.x, c.y))
            .collect();

        if style.line != LineStyle::Hidden && points.len() >= 2 {
            let width = self.pt_to_px(style.line_width);
            self.draw_polyline(&points, style.color, width, style.line);
        }

        if style.marker != Marker::None {
            let size = self.pt_to_px(style.marker_size);
            for &point in &points {
                self.draw_marker(point, style.marker, size, style.color);
            }
        }
    }

    /// Polyline in pixel space, dashed or dotted along its whole length
    pub fn draw_polyline(
        &mut self,
        points: &[(f32, f32)],
        color: Rgba<u8>,
        width: f32,
        line: LineStyle,
    ) {
        let pattern = match line {
            LineStyle::Hidden => return,
            LineStyle::Solid => {
                for pair in points.windows(2) {
                    self.draw_segment(pair[0], pair[1], color, width);
                }
                return;
            }
            LineStyle::Dashed => DASH_PATTERN,
            LineStyle::Dotted => DOT_PATTERN,
        };

        let unit = width.max(1.0);
        let (on, off) = (pattern[0] * unit, pattern[1] * unit);
        // Position within the current on+off period carries across vertices
        let mut phase = 0.0f32;

        for pair in points.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let length = distance(start, end);
            if length < 1e-3 {
                continue;
            }

            let mut t = 0.0f32;
            while length - t > MIN_DASH_STEP {
                let in_dash = phase < on;
                let left_in_state = if in_dash { on - phase } else { on + off - phase };
                let step = left_in_state.max(MIN_DASH_STEP).min(length - t);

                if in_dash {
                    let a = lerp(start, end, t / length);
                    let b = lerp(start, end, (t + step) / length);
                    self.draw_segment(a, b, color, width);
                }

                t += step;
                phase = (phase + step) % (on + off);
            }
        }
    }

    /// Straight segment of the given pixel width, clipped to the canvas
    pub fn draw_segment(&mut self, start: (f32, f32), end: (f32, f32), color: Rgba<u8>, width: f32) {
        let margin = width.max(1.0);
        let Some((start, end)) = clip_segment(
            start,
            end,
            (-margin, -margin),
            (self.width() as f32 + margin, self.height() as f32 + margin),
        ) else {
            return;
        };

        if width <= 1.0 {
            draw_line_segment_mut(&mut self.image, start, end, color);
            return;
        }

        let radius = (width / 2.0).max(1.0) as i32;
        let length = distance(start, end);
        let stamp = |image: &mut RgbaImage, p: (f32, f32)| {
            draw_filled_circle_mut(image, (p.0.round() as i32, p.1.round() as i32), radius, color)
        };

        if length < 0.001 {
            stamp(&mut self.image, start);
            return;
        }

        // Stamp discs along the segment, closer than the radius so the edge stays smooth
        let step = (radius as f32 * 0.5).max(0.5);
        let steps = (length / step).ceil() as i32;
        for i in 0..=steps {
            stamp(&mut self.image, lerp(start, end, (i as f32 * step / length).min(1.0)));
        }
        stamp(&mut self.image, end);
    }

    /// Marker of `size` pixels across centred on `center`
    pub fn draw_marker(&mut self, center: (f32, f32), marker: Marker, size: f32, color: Rgba<u8>) {
        let (w, h) = (self.width() as f32, self.height() as f32);
        if center.0 < -size || center.1 < -size || center.0 > w + size || center.1 > h + size {
            return;
        }

        let half = (size / 2.0).max(1.0);
        let (cx, cy) = center;
        match marker {
            Marker::None => {}
            Marker::Circle => {
                draw_filled_circle_mut(
                    &mut self.image,
                    (cx.round() as i32, cy.round() as i32),
                    half.round() as i32,
                    color,
                );
            }
            Marker::Triangle => {
                let apex = Point::new(cx.round() as i32, (cy - half).round() as i32);
                let left = Point::new((cx - half).round() as i32, (cy + half).round() as i32);
                let right = Point::new((cx + half).round() as i32, (cy + half).round() as i32);
                if apex != left && left != right {
                    draw_polygon_mut(&mut self.image, &[apex, left, right], color);
                }
            }
            Marker::Cross => {
                let stroke = (size / 5.0).max(1.0);
                self.draw_segment((cx - half, cy - half), (cx + half, cy + half), color, stroke);
                self.draw_segment((cx - half, cy + half), (cx + half, cy - half), color, stroke);
            }
        }
    }

    /// Filled rectangle with an outline `edge_width` pixels thick, in pixel space
    pub fn draw_box(
        &mut self,
        (left, top): (f32, f32),
        (width, height): (f32, f32),
        fill: Rgba<u8>,
        edge: Rgba<u8>,
        edge_width: f32,
    ) {
        let (width, height) = (width.round().max(1.0) as u32, height.round().max(1.0) as u32);
        let (left, top) = (left.round() as i32, top.round() as i32);
        let outer = Rect::at(left, top).of_size(width, height);

        let edge_px = edge_width.round().max(1.0) as u32;
        if edge_px == 1 || width <= 2 * edge_px || height <= 2 * edge_px {
            draw_filled_rect_mut(&mut self.image, outer, fill);
            draw_hollow_rect_mut(&mut self.image, outer, edge);
            return;
        }

        draw_filled_rect_mut(&mut self.image, outer, edge);
        let inner = Rect::at(left + edge_px as i32, top + edge_px as i32)
            .of_size(width - 2 * edge_px, height - 2 * edge_px);
        draw_filled_rect_mut(&mut self.image, inner, fill);
    }

    /// Border of `thickness` pixels around the whole image
    pub fn draw_frame(&mut self, color: Rgba<u8>, thickness: u32) {
        let (w, h) = (self.width(), self.height());
        let t = thickness.max(1).min(w.min(h) / 2).max(1);
        for rect in [
            Rect::at(0, 0).of_size(w, t),
            Rect::at(0, (h - t) as i32).of_size(w, t),
            Rect::at(0, 0).of_size(t, h),
            Rect::at((w - t) as i32, 0).of_size(t, h),
        ] {
            draw_filled_rect_mut(&mut self.image, rect, color);
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn lerp(a: (f32, f32), b: (f32, f32), t: f32) -> (f32, f32) {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}

/// Liang-Barsky clipping of a segment to an axis-aligned box
fn clip_segment(
    start: (f32, f32),
    end: (f32, f32),
    min: (f32, f32),
    max: (f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for (p, q) in [
        (-dx, start.0 - min.0),
        (dx, max.0 - start.0),
        (-dy, start.1 - min.1),
        (dy, max.1 - start.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((lerp(start, end, t0), lerp(start, end, t1)))
}
