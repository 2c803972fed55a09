//! Rasterize a display list into a PNG-encoded frame.

use std::io::Cursor;

use image::{Rgba as ImageRgba, RgbaImage};

use crate::css::color::Rgba;
use crate::error::{Error, Result};
use crate::layout::Rect;
use crate::render::paint::PaintCommand;
use crate::render::Screenshot;

/// Fill a frame with `background`, replay the display list, and encode PNG.
pub fn rasterize(
    width: u32,
    height: u32,
    background: Rgba,
    commands: &[PaintCommand],
) -> Result<Screenshot> {
    if width == 0 || height == 0 {
        return Err(Error::RenderError(format!(
            "cannot rasterize a {width}x{height} frame"
        )));
    }
    let mut frame = RgbaImage::from_pixel(
        width,
        height,
        ImageRgba([background.r, background.g, background.b, 255]),
    );
    for command in commands {
        let (rect, rgba) = match command {
            PaintCommand::SolidRect { rect, rgba } => (rect, rgba),
            PaintCommand::TextLine { rect, rgba } => (rect, rgba),
        };
        fill_rect(&mut frame, rect, *rgba);
    }
    encode(frame)
}

/// Crop a region out of an encoded screenshot
pub fn crop(shot: &Screenshot, rect: Rect) -> Result<Screenshot> {
    let decoded = image::load_from_memory(&shot.png_data)
        .map_err(|e| Error::RenderError(format!("failed to decode frame: {e}")))?;
    let x = rect.x.max(0) as u32;
    let y = rect.y.max(0) as u32;
    let w = rect.width.min(decoded.width().saturating_sub(x));
    let h = rect.height.min(decoded.height().saturating_sub(y));
    if w == 0 || h == 0 {
        return Err(Error::RenderError("element crop region is empty".into()));
    }
    encode(decoded.crop_imm(x, y, w, h).to_rgba8())
}

fn fill_rect(frame: &mut RgbaImage, rect: &Rect, rgba: Rgba) {
    if rgba.a == 0 {
        return;
    }
    let x0 = rect.x.max(0) as u32;
    let y0 = rect.y.max(0) as u32;
    let x1 = (rect.right().max(0) as u32).min(frame.width());
    let y1 = (rect.bottom().max(0) as u32).min(frame.height());
    let px = ImageRgba([rgba.r, rgba.g, rgba.b, 255]);
    for y in y0..y1 {
        for x in x0..x1 {
            frame.put_pixel(x, y, px);
        }
    }
}

fn encode(frame: RgbaImage) -> Result<Screenshot> {
    let (width, height) = frame.dimensions();
    let mut png_data = Vec::new();
    image::DynamicImage::ImageRgba8(frame)
        .write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
        .map_err(|e| Error::RenderError(format!("PNG encode failed: {e}")))?;
    Ok(Screenshot {
        width,
        height,
        png_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterize_produces_png() {
        let shot = rasterize(64, 32, Rgba::WHITE, &[]).unwrap();
        assert_eq!(shot.width, 64);
        assert_eq!(shot.height, 32);
        assert!(shot.is_png());
    }

    #[test]
    fn rasterize_is_deterministic() {
        let commands = [PaintCommand::SolidRect {
            rect: Rect { x: 4, y: 4, width: 8, height: 8 },
            rgba: Rgba { r: 10, g: 20, b: 30, a: 255 },
        }];
        let a = rasterize(32, 32, Rgba::WHITE, &commands).unwrap();
        let b = rasterize(32, 32, Rgba::WHITE, &commands).unwrap();
        assert_eq!(a.png_data, b.png_data);
    }

    #[test]
    fn crop_extracts_region() {
        let commands = [PaintCommand::SolidRect {
            rect: Rect { x: 0, y: 0, width: 16, height: 16 },
            rgba: Rgba::BLACK,
        }];
        let shot = rasterize(32, 32, Rgba::WHITE, &commands).unwrap();
        let cropped = crop(&shot, Rect { x: 0, y: 0, width: 16, height: 16 }).unwrap();
        assert_eq!(cropped.width, 16);
        assert_eq!(cropped.height, 16);
    }

    #[test]
    fn zero_sized_frame_is_rejected() {
        assert!(rasterize(0, 10, Rgba::WHITE, &[]).is_err());
    }
}
