//! Map rendering: features, labels, legend, scale bar, title and frame.

mod canvas;
mod legend;
mod scale_bar;
mod text;

pub use canvas::MapCanvas;
pub use legend::{draw_legend, legend_layout, LegendLayout};
pub use scale_bar::{draw_scale_bar, scale_label, scale_length_km, SCALE_STEPS_KM};
pub use text::{HAlign, Typeface, VAlign, FONT_CANDIDATES};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::MapResult;
use crate::models::{MapFeature, Place};
use crate::projection::{calculate_plot_dimensions, plot_width_km, MercatorExtent};
use crate::style::{rgb, StyleBook, TagStyles};

/// Frame colour around the finished map
const FRAME_COLOR: [u8; 3] = [0x04, 0x25, 0x3a];
const FRAME_PT: f64 = 1.0;
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Title position in figure fractions
const TITLE_FIG: (f64, f64) = (0.5, 0.9);

/// Largest canvas, in pixels, a map may need (about 400 MB of RGBA)
pub const MAX_CANVAS_PIXELS: u64 = 100_000_000;

/// Draws maps of one print size and resolution
pub struct MapRenderer {
    dim: f64,
    dpi: f64,
    styles: StyleBook,
    tag_styles: TagStyles,
    typeface: Typeface,
}

impl MapRenderer {
    /// `dim` is the longer printed side in inches
    pub fn new(dim: f64, dpi: f64, tag_styles: TagStyles, typeface: Typeface) -> MapResult<Self> {
        let styles = StyleBook::for_print_size(dim);
        tag_styles.validate(&styles)?;
        Ok(Self {
            dim,
            dpi,
            styles,
            tag_styles,
            typeface,
        })
    }

    pub fn styles(&self) -> &StyleBook {
        &self.styles
    }

    /// Label size in points; the title is four times larger
    pub fn text_size_pt(&self) -> f64 {
        self.dim * 0.5
    }

    /// Output size in pixels for an extent
    pub fn canvas_size(&self, extent: &MercatorExtent) -> (u32, u32) {
        let (width_in, height_in) = calculate_plot_dimensions(self.dim, extent.dx(), extent.dy());
        let px = |inches: f64| ((inches * self.dpi).round() as u32).max(1);
        (px(width_in), px(height_in))
    }

    /// Compose the whole map. `background` is stretched to the canvas if its size differs.
    pub fn render(
        &self,
        place: &Place,
        background: Option<RgbaImage>,
        features: &[MapFeature],
    ) -> MapCanvas {
        let extent = MercatorExtent::from_place(place);
        let (width, height) = self.canvas_size(&extent);

        let mut canvas = match background {
            Some(image) if image.dimensions() == (width, height) => {
                MapCanvas::with_background(extent, image, self.dpi)
            }
            Some(image) => {
                let resized = imageops::resize(&image, width, height, FilterType::Triangle);
                MapCanvas::with_background(extent, resized, self.dpi)
            }
            None => MapCanvas::new(extent, width, height, self.dpi),
        };

        for feature in features {
            let style = self.tag_styles.style_for(&feature.tags, &self.styles);
            for path in feature.paths() {
                canvas.draw_path(&path, style);
            }
        }

        let labels = self.draw_labels(&mut canvas, features);
        debug!("{}: drew {} features, {} labels", place, features.len(), labels);

        let text_pt = self.text_size_pt();
        draw_legend(
            &mut canvas,
            &self.typeface,
            &self.styles.legend_entries(),
            text_pt,
        );

        let width_km = plot_width_km(place.west, place.east, place.south, place.north);
        draw_scale_bar(&mut canvas, &self.typeface, width_km, text_pt);

        let title_at = canvas.fig_to_px(TITLE_FIG.0, TITLE_FIG.1);
        let title_px = canvas.pt_to_px(text_pt * 4.0);
        self.typeface.draw(
            &mut canvas,
            &place.name,
            title_at,
            title_px,
            TEXT_COLOR,
            (HAlign::Center, VAlign::Bottom),
        );

        let frame = canvas.pt_to_px(FRAME_PT).round().max(1.0) as u32;
        canvas.draw_frame(rgb(FRAME_COLOR), frame);
        canvas
    }

    /// Names of named nodes, centred just above the point
    fn draw_labels(&self, canvas: &mut MapCanvas, features: &[MapFeature]) -> usize {
        if !self.typeface.is_available() {
            return 0;
        }

        let text_pt = self.text_size_pt();
        let size = canvas.pt_to_px(text_pt);
        let lift = canvas.pt_to_px(text_pt * 0.75);
        let mut count = 0;
        for (coord, name) in features.iter().filter_map(MapFeature::label_anchor) {
            let (x, y) = canvas.lonlat_to_px(coord.x, coord.y);
            self.typeface.draw(
                canvas,
                name,
                (x, y - lift),
                size,
                TEXT_COLOR,
                (HAlign::Center, VAlign::Bottom),
            );
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;
    use crate::models::ElementType;
    use geo_types::{line_string, point, Geometry};

    fn tag_styles() -> TagStyles {
        TagStyles::from_json_str(
            r#"{"highway": {"path": "trail"}, "tourism": {"camp_site": "campsite"}}"#,
        )
        .unwrap()
    }

    fn renderer() -> MapRenderer {
        MapRenderer::new(2.0, 100.0, tag_styles(), Typeface::none()).unwrap()
    }

    fn place() -> Place {
        Place::new("Test Lake", 55.01, 55.0, -125.0, -125.02)
    }

    #[test]
    fn test_unknown_style_rejected() {
        let styles = TagStyles::from_json_str(r#"{"waterway": {"rapids": "whitewater"}}"#).unwrap();
        let result = MapRenderer::new(10.0, 300.0, styles, Typeface::none());
        assert!(matches!(result, Err(MapError::UnknownStyle { .. })));
    }

    #[test]
    fn test_canvas_size_follows_aspect() {
        let renderer = renderer();
        let extent = MercatorExtent {
            x_min: 0.0,
            x_max: 2000.0,
            y_min: 0.0,
            y_max: 1000.0,
        };
        assert_eq!(renderer.canvas_size(&extent), (200, 100));

        let tall = MercatorExtent {
            x_min: 0.0,
            x_max: 500.0,
            y_min: 0.0,
            y_max: 1000.0,
        };
        assert_eq!(renderer.canvas_size(&tall), (100, 200));
    }

    #[test]
    fn test_text_size_scales_with_dim() {
        assert_eq!(renderer().text_size_pt(), 1.0);
    }

    #[test]
    fn test_render_draws_features_and_frame() {
        let renderer = renderer();
        let mut trail = MapFeature::new(
            ElementType::Way,
            1,
            Geometry::LineString(line_string![
                (x: -125.019, y: 55.005),
                (x: -125.001, y: 55.005)
            ]),
        );
        trail.tags.insert("highway".to_string(), "path".to_string());

        let canvas = renderer.render(&place(), None, &[trail]);
        let image = canvas.image();
        let trail_color = renderer.styles().get("trail").unwrap().color;

        assert_eq!(*image.get_pixel(0, 0), rgb(FRAME_COLOR));
        assert!(image.pixels().any(|p| *p == trail_color));
    }

    #[test]
    fn test_render_resizes_background() {
        let renderer = renderer();
        let background = RgbaImage::from_pixel(10, 10, Rgba([0, 128, 0, 255]));
        let camp = {
            let mut f = MapFeature::new(
                ElementType::Node,
                2,
                Geometry::Point(point!(x: -125.01, y: 55.005)),
            );
            f.name = Some("Camp".to_string());
            f
        };

        let canvas = renderer.render(&place(), Some(background), &[camp]);
        let extent = MercatorExtent::from_place(&place());
        assert_eq!(canvas.image().dimensions(), renderer.canvas_size(&extent));
        let (w, h) = canvas.image().dimensions();
        assert_eq!(*canvas.image().get_pixel(w / 4, h / 4), Rgba([0, 128, 0, 255]));
    }
}
