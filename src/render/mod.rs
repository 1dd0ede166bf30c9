//! Caption engine: fits two captions onto a template image and composites them.
//!
//! The engine holds no state besides the loaded face and the layout policy, so a
//! single [`Renderer`] is shared by every worker run.

mod compose;
mod fit;

pub use compose::{render, RenderLayout};
pub use fit::{fit, Fit, DEFAULT_SIZES};

use crate::errors::RenderError;
use crate::font::Face;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Renderer {
    face: Arc<Face>,
    layout: RenderLayout,
}

impl Renderer {
    pub fn new(face: Arc<Face>, layout: RenderLayout) -> Self {
        Self { face, layout }
    }

    pub fn from_font_bytes(font_bytes: &[u8], layout: RenderLayout) -> Result<Self, RenderError> {
        Ok(Self::new(Arc::new(Face::load(font_bytes)?), layout))
    }

    pub fn layout(&self) -> &RenderLayout {
        &self.layout
    }

    /// Template bytes in, PNG bytes out.
    pub fn render_png(&self, template: &[u8], top: &str, bottom: &str) -> Result<Vec<u8>, RenderError> {
        let source = decode_template(template)?;
        let canvas = render(&self.face, &source, top, bottom, &self.layout)?;
        encode_png(&canvas)
    }
}

/// Detects the format from content; the file name is never consulted.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, RenderError> {
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => Ok(format),
        Ok(other) => Err(RenderError::Decode(format!("unsupported image format {:?}", other))),
        Err(e) => Err(RenderError::Decode(e.to_string())),
    }
}

pub fn decode_template(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    let format = detect_format(bytes)?;
    image::load_from_memory_with_format(bytes, format).map_err(|e| RenderError::Decode(e.to_string()))
}

/// Encodes at the canvas depth, so 16-bit canvases produce 16-bit PNGs.
pub fn encode_png(canvas: &DynamicImage) -> Result<Vec<u8>, RenderError> {
    let mut out = Cursor::new(Vec::new());
    canvas
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}
