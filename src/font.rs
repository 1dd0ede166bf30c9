//! Font metrics for caption fitting and drawing.
//!
//! A single face is loaded once at startup and shared read-only between renders.
//! Sizes are nominal em sizes in points at a fixed 72 DPI, so one point is one
//! pixel. Glyph outlines are never hinted.

use crate::errors::RenderError;
use rusttype::{Font, Scale};
use std::fmt;

/// Face compiled into the binary.
pub const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

pub const DPI: f32 = 72.0;

/// Horizontal glyph metrics at a nominal size.
pub trait GlyphMetrics {
    fn advance_width(&self, ch: char, size: f32) -> f32;
}

#[derive(Clone)]
pub struct Face {
    font: Font<'static>,
}

impl Face {
    pub fn load(bytes: &[u8]) -> Result<Self, RenderError> {
        let font = Font::try_from_vec(bytes.to_vec())
            .ok_or_else(|| RenderError::FontLoad(format!("{} bytes are not a valid font program", bytes.len())))?;
        Ok(Self { font })
    }

    pub fn embedded() -> Result<Self, RenderError> {
        Self::load(EMBEDDED_FONT)
    }

    /// rusttype scales by line height (ascent - descent); convert the em size to that.
    pub fn scale(&self, size: f32) -> Scale {
        let pixels_per_em = size * DPI / 72.0;
        let v_metrics = self.font.v_metrics_unscaled();
        let units_per_em = f32::from(self.font.units_per_em());
        Scale::uniform(pixels_per_em * (v_metrics.ascent - v_metrics.descent) / units_per_em)
    }

    pub(crate) fn font(&self) -> &Font<'static> {
        &self.font
    }
}

impl GlyphMetrics for Face {
    fn advance_width(&self, ch: char, size: f32) -> f32 {
        self.font.glyph(ch).scaled(self.scale(size)).h_metrics().advance_width
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("glyph_count", &self.font.glyph_count())
            .field("units_per_em", &self.font.units_per_em())
            .finish()
    }
}
