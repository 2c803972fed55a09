//! Deterministic screenshot pipeline for the static backend.
//!
//! Layout rects plus computed colors become a flat display list which the
//! rasterizer fills into an RGBA frame and encodes as PNG. Text paints as
//! solid line boxes rather than glyphs, so captures are bit-stable across
//! platforms and font installations.

pub mod paint;
pub mod raster;

/// A captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl Screenshot {
    pub fn is_png(&self) -> bool {
        self.png_data.starts_with(b"\x89PNG\r\n\x1a\n")
    }
}
