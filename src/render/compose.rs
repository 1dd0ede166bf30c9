use super::fit::{fit, Fit, DEFAULT_SIZES};
use crate::errors::RenderError;
use crate::font::Face;
use image::{DynamicImage, ImageBuffer, Pixel, Rgba};
use rusttype::point;

/// Placement policy for the two captions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLayout {
    /// Gap between the top edge and the top caption, before adding the font size.
    pub top_margin: i32,
    /// Height of the band above the bottom edge the bottom caption starts from.
    pub bottom_band: i32,
    /// Candidate font sizes, largest first.
    pub sizes: Vec<u32>,
}

impl Default for RenderLayout {
    fn default() -> Self {
        Self {
            top_margin: 15,
            bottom_band: 100,
            sizes: DEFAULT_SIZES.to_vec(),
        }
    }
}

/// Copies `source` into a fresh RGBA canvas and draws both captions in white.
///
/// The canvas keeps the source's channel depth: 16-bit templates get a 16-bit
/// canvas, everything else an 8-bit one. The captions are fitted independently
/// and may end up at different sizes.
pub fn render(
    face: &Face,
    source: &DynamicImage,
    top: &str,
    bottom: &str,
    layout: &RenderLayout,
) -> Result<DynamicImage, RenderError> {
    if is_wide(source) {
        let mut canvas = source.to_rgba16();
        draw_captions(&mut canvas, face, top, bottom, layout)?;
        Ok(DynamicImage::ImageRgba16(canvas))
    } else {
        let mut canvas = source.to_rgba8();
        draw_captions(&mut canvas, face, top, bottom, layout)?;
        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

/// More than one byte per channel.
fn is_wide(source: &DynamicImage) -> bool {
    let color = source.color();
    color.bytes_per_pixel() > color.channel_count()
}

fn draw_captions<S: Channel>(
    canvas: &mut ImageBuffer<Rgba<S>, Vec<S>>,
    face: &Face,
    top: &str,
    bottom: &str,
    layout: &RenderLayout,
) -> Result<(), RenderError>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    let (width, height) = canvas.dimensions();
    let height = i32::try_from(height)
        .map_err(|_| RenderError::GlyphDraw(format!("canvas height {} out of range", height)))?;

    let top_fit = fit(face, top, width, &layout.sizes);
    let top_baseline = layout.top_margin + top_fit.size as i32;
    draw_caption(canvas, face, top, top_fit, top_baseline)?;

    let bottom_fit = fit(face, bottom, width, &layout.sizes);
    let bottom_baseline = height - layout.bottom_band + bottom_fit.size as i32;
    draw_caption(canvas, face, bottom, bottom_fit, bottom_baseline)
}

fn draw_caption<S: Channel>(
    canvas: &mut ImageBuffer<Rgba<S>, Vec<S>>,
    face: &Face,
    text: &str,
    fitted: Fit,
    baseline: i32,
) -> Result<(), RenderError>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    if text.is_empty() {
        return Ok(());
    }

    let (width, height) = canvas.dimensions();
    let scale = face.scale(fitted.size as f32);
    let mut caret = (width.saturating_sub(fitted.width) / 2) as f32;

    for ch in text.chars() {
        let glyph = face.font().glyph(ch).scaled(scale);
        let advance = glyph.h_metrics().advance_width;
        if !advance.is_finite() {
            return Err(RenderError::GlyphDraw(format!("non-finite advance for {:?}", ch)));
        }

        let glyph = glyph.positioned(point(caret, baseline as f32));
        if let Some(bounds) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let x = bounds.min.x + gx as i32;
                let y = bounds.min.y + gy as i32;
                if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
                    return;
                }
                blend_white(canvas.get_pixel_mut(x as u32, y as u32), coverage);
            });
        }
        caret += advance;
    }

    Ok(())
}

/// Canvas subpixel the compositor can blend into.
trait Channel: Copy {
    const MAX: f32;

    fn level(self) -> f32;

    fn from_level(level: f32) -> Self;
}

impl Channel for u8 {
    const MAX: f32 = u8::MAX as f32;

    fn level(self) -> f32 {
        f32::from(self)
    }

    fn from_level(level: f32) -> Self {
        level.round().clamp(0.0, <Self as Channel>::MAX) as u8
    }
}

impl Channel for u16 {
    const MAX: f32 = u16::MAX as f32;

    fn level(self) -> f32 {
        f32::from(self)
    }

    fn from_level(level: f32) -> Self {
        level.round().clamp(0.0, <Self as Channel>::MAX) as u16
    }
}

/// Source-over compositing of opaque white with the given coverage.
fn blend_white<S: Channel>(pixel: &mut Rgba<S>, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage == 0.0 {
        return;
    }

    let [r, g, b, a] = pixel.0;
    let dst_alpha = a.level() / S::MAX;
    let out_alpha = coverage + dst_alpha * (1.0 - coverage);
    let channel = |c: S| S::from_level((S::MAX * coverage + c.level() * dst_alpha * (1.0 - coverage)) / out_alpha);

    *pixel = Rgba([channel(r), channel(g), channel(b), S::from_level(out_alpha * S::MAX)]);
}
