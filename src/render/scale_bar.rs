use image::Rgba;

use super::text::{HAlign, VAlign};
use super::{MapCanvas, Typeface};

/// Bar lengths in km, typical for canoe trips
pub const SCALE_STEPS_KM: [f64; 12] = [
    0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0,
];

/// Widest bar as a fraction of the map width
pub const SCALE_MAX_WIDTH_PCT: f64 = 0.15;

/// Lower-left corner of the bar in figure fractions
pub const SCALE_ANCHOR_FIG: (f64, f64) = (1.0 - SCALE_MAX_WIDTH_PCT, 0.025);

const BAR_FILL: Rgba<u8> = Rgba([211, 211, 211, 255]);
const BAR_EDGE: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BAR_EDGE_PT: f64 = 0.5;

/// Largest step not wider than `max_width_pct` of the map, or the smallest step
pub fn scale_length_km(plot_width_km: f64, max_width_pct: f64) -> f64 {
    let limit = plot_width_km * max_width_pct;
    SCALE_STEPS_KM
        .iter()
        .rev()
        .copied()
        .find(|step| *step <= limit)
        .unwrap_or(SCALE_STEPS_KM[0])
}

pub fn scale_label(length_km: f64) -> String {
    format!("{} km", length_km)
}

/// Draw the scale bar and its label; returns the bar length in km
pub fn draw_scale_bar(
    canvas: &mut MapCanvas,
    typeface: &Typeface,
    plot_width_km: f64,
    text_size_pt: f64,
) -> f64 {
    let length_km = scale_length_km(plot_width_km, SCALE_MAX_WIDTH_PCT);
    let extent = *canvas.extent();

    let width = length_km / plot_width_km * extent.dx();
    let height = extent.dx().max(extent.dy()) * 0.0025;
    let (x0, y0) = extent.fig_to_xy(SCALE_ANCHOR_FIG.0, SCALE_ANCHOR_FIG.1);

    // Anchor is the lower-left corner; pixel space wants the top-left
    let (left, top) = canvas.xy_to_px(x0, y0 + height);
    let (right, bottom) = canvas.xy_to_px(x0 + width, y0);
    let edge = canvas.pt_to_px(BAR_EDGE_PT);
    canvas.draw_box(
        (left, top),
        (right - left, bottom - top),
        BAR_FILL,
        BAR_EDGE,
        edge,
    );

    let size = canvas.pt_to_px(text_size_pt);
    typeface.draw(
        canvas,
        &scale_label(length_km),
        ((left + right) / 2.0, bottom + size),
        size,
        BAR_EDGE,
        (HAlign::Center, VAlign::Bottom),
    );

    length_km
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::MercatorExtent;

    #[test]
    fn test_scale_length_picks_largest_fitting_step() {
        // 15% of 40 km is 6 km
        assert_eq!(scale_length_km(40.0, 0.15), 5.0);
        assert_eq!(scale_length_km(100.0, 0.15), 10.0);
        assert_eq!(scale_length_km(10_000.0, 0.15), 500.0);
        // Exactly on a step
        assert_eq!(scale_length_km(20.0, 0.1), 2.0);
    }

    #[test]
    fn test_scale_length_tiny_map() {
        assert_eq!(scale_length_km(0.3, 0.15), 0.1);
    }

    #[test]
    fn test_scale_label() {
        assert_eq!(scale_label(0.5), "0.5 km");
        assert_eq!(scale_label(20.0), "20 km");
    }

    #[test]
    fn test_draw_scale_bar() {
        let extent = MercatorExtent {
            x_min: 0.0,
            x_max: 40_000.0,
            y_min: 0.0,
            y_max: 20_000.0,
        };
        let mut canvas = MapCanvas::new(extent, 2000, 1000, 100.0);
        let length = draw_scale_bar(&mut canvas, &Typeface::none(), 40.0, 5.0);
        assert_eq!(length, 5.0);

        // 5 of 40 km is 250 px from x = 1700; the bar covers rows 970..=974
        let image = canvas.image();
        let white = Rgba([255, 255, 255, 255]);
        assert_eq!(*image.get_pixel(1760, 970), BAR_EDGE);
        assert_eq!(*image.get_pixel(1760, 972), BAR_FILL);
        assert_eq!(*image.get_pixel(1980, 972), white);
        assert_eq!(*image.get_pixel(1690, 972), white);
    }
}
