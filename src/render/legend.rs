use image::Rgba;
use tracing::debug;

use super::text::{HAlign, VAlign};
use super::{MapCanvas, Typeface};
use crate::style::{LineStyle, Marker, Style};

const LEGEND_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LEGEND_EDGE: Rgba<u8> = Rgba([204, 204, 204, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Pixel geometry of the legend box, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct LegendLayout {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Vertical centre of the title row
    pub title_y: f32,
    /// Vertical centre of each entry row
    pub row_y: Vec<f32>,
    pub handle_x: (f32, f32),
    pub label_x: f32,
}

/// Lay out a legend anchored at the lower-left corner of a `canvas_height` image.
///
/// Spacing follows the text size: `text_px` for labels and `title_px` for the
/// title, with label and title widths as measured by the font.
pub fn legend_layout(
    canvas_height: f32,
    text_px: f32,
    title_px: f32,
    title_width: f32,
    label_widths: &[f32],
) -> LegendLayout {
    let pad = 0.5 * text_px;
    let border = 0.5 * text_px;
    let row = 1.4 * text_px;
    let handle = 2.0 * text_px;
    let gap = 0.8 * text_px;

    let widest_label = label_widths.iter().copied().fold(0.0f32, f32::max);
    let width = (pad + handle + gap + widest_label).max(pad + title_width) + pad;
    let title_row = 1.4 * title_px;
    let height = pad + title_row + row * label_widths.len() as f32 + pad;

    let left = border;
    let top = canvas_height - border - height;
    let rows_top = top + pad + title_row;

    LegendLayout {
        left,
        top,
        width,
        height,
        title_y: top + pad + title_row / 2.0,
        row_y: (0..label_widths.len())
            .map(|i| rows_top + row * (i as f32 + 0.5))
            .collect(),
        handle_x: (left + pad, left + pad + handle),
        label_x: left + pad + handle + gap,
    }
}

/// Draw the legend in the lower-left corner.
///
/// Returns false when no font is available and the legend was skipped.
pub fn draw_legend(
    canvas: &mut MapCanvas,
    typeface: &Typeface,
    entries: &[(String, Style)],
    text_size_pt: f64,
) -> bool {
    if !typeface.is_available() {
        debug!("Skipping legend, no font");
        return false;
    }

    let text_px = canvas.pt_to_px(text_size_pt);
    let title_px = canvas.pt_to_px(text_size_pt + 1.0);
    let title = "Legend";

    let measure = |text: &str, size: f32| {
        typeface
            .measure(text, size)
            .map(|(w, _)| w as f32)
            .unwrap_or(0.0)
    };
    let title_width = measure(title, title_px);
    let label_widths: Vec<f32> = entries
        .iter()
        .map(|(label, _)| measure(label, text_px))
        .collect();

    let layout = legend_layout(
        canvas.height() as f32,
        text_px,
        title_px,
        title_width,
        &label_widths,
    );

    canvas.draw_box(
        (layout.left, layout.top),
        (layout.width, layout.height),
        LEGEND_FILL,
        LEGEND_EDGE,
        1.0,
    );
    typeface.draw(
        canvas,
        title,
        (layout.left + 0.5 * text_px, layout.title_y),
        title_px,
        TEXT_COLOR,
        (HAlign::Left, VAlign::Center),
    );

    for ((label, style), y) in entries.iter().zip(&layout.row_y) {
        draw_handle(canvas, style, layout.handle_x, *y);
        typeface.draw(
            canvas,
            label,
            (layout.label_x, *y),
            text_px,
            TEXT_COLOR,
            (HAlign::Left, VAlign::Center),
        );
    }

    true
}

/// Sample of a style: a short line, a marker in its middle, or both
fn draw_handle(canvas: &mut MapCanvas, style: &Style, (x0, x1): (f32, f32), y: f32) {
    if style.line != LineStyle::Hidden {
        let width = canvas.pt_to_px(style.line_width);
        canvas.draw_polyline(&[(x0, y), (x1, y)], style.color, width, style.line);
    }
    if style.marker != Marker::None {
        let size = canvas.pt_to_px(style.marker_size);
        canvas.draw_marker(((x0 + x1) / 2.0, y), style.marker, size, style.color);
    }
}
