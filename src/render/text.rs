use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::Rgba;
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

use super::MapCanvas;

/// Fonts tried, in order, when none is configured
pub const FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Center,
    Bottom,
}

/// Font used for labels; maps are still drawn without one, just without text
pub struct Typeface {
    font: Option<FontVec>,
}

impl Typeface {
    /// Load `path` if given, otherwise the first readable system candidate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let font = read_font(path)?;
            debug!("Loaded font {}", path.display());
            return Ok(Self { font: Some(font) });
        }

        for candidate in FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match read_font(path) {
                Ok(font) => {
                    debug!("Using system font {}", candidate);
                    return Ok(Self { font: Some(font) });
                }
                Err(e) => debug!("Skipping font {}: {:#}", candidate, e),
            }
        }

        warn!("No usable font found, maps will be drawn without text (set --font)");
        Ok(Self::none())
    }

    pub fn none() -> Self {
        Self { font: None }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(bytes).context("Invalid font data")?;
        Ok(Self { font: Some(font) })
    }

    pub fn is_available(&self) -> bool {
        self.font.is_some()
    }

    /// Rendered size of `text` at `size_px` pixels
    pub fn measure(&self, text: &str, size_px: f32) -> Option<(u32, u32)> {
        let font = self.font.as_ref()?;
        Some(text_size(PxScale::from(size_px), font, text))
    }

    /// Draw `text` positioned relative to `anchor` in pixel space.
    ///
    /// Returns false when there is no font.
    pub fn draw(
        &self,
        canvas: &mut MapCanvas,
        text: &str,
        anchor: (f32, f32),
        size_px: f32,
        color: Rgba<u8>,
        align: (HAlign, VAlign),
    ) -> bool {
        let Some(font) = self.font.as_ref() else {
            return false;
        };
        if text.is_empty() || size_px < 1.0 {
            return true;
        }

        let scale = PxScale::from(size_px);
        let (w, h) = text_size(scale, font, text);
        let x = match align.0 {
            HAlign::Left => anchor.0,
            HAlign::Center => anchor.0 - w as f32 / 2.0,
        };
        let y = match align.1 {
            VAlign::Center => anchor.1 - h as f32 / 2.0,
            VAlign::Bottom => anchor.1 - h as f32,
        };

        draw_text_mut(
            canvas.image_mut(),
            color,
            x.round() as i32,
            y.round() as i32,
            scale,
            font,
            text,
        );
        true
    }
}

fn read_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?;
    FontVec::try_from_vec(bytes).with_context(|| format!("{} is not a usable font", path.display()))
}
