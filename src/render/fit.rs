use crate::font::GlyphMetrics;

/// Size ladder tried from largest to smallest.
pub const DEFAULT_SIZES: [u32; 4] = [72, 48, 36, 24];

/// Result of fitting one caption line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    /// Rendered width in pixels. Zero for the empty string and for the overflow fallback.
    pub width: u32,
    /// Nominal font size in points.
    pub size: u32,
}

/// Picks the first size in `sizes` at which `text` is no wider than `max_width`.
///
/// Widths are plain sums of glyph advances on a single line. When even the last
/// size overflows, the caption is still drawn at that size with a reported width
/// of zero rather than failing the render.
pub fn fit<M>(metrics: &M, text: &str, max_width: u32, sizes: &[u32]) -> Fit
where
    M: GlyphMetrics + ?Sized,
{
    for &size in sizes {
        let width: f32 = text
            .chars()
            .map(|ch| metrics.advance_width(ch, size as f32))
            .sum();

        if width <= max_width as f32 {
            return Fit {
                width: width.ceil() as u32,
                size,
            };
        }
    }

    Fit {
        width: 0,
        size: sizes.last().copied().unwrap_or(DEFAULT_SIZES[DEFAULT_SIZES.len() - 1]),
    }
}
