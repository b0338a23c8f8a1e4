//! Conversions between RGBA rasters and Cairo image surfaces.
//!
//! Canvas state lives in [`RgbaImage`] buffers (straight alpha, `Send`, cheap to
//! snapshot). Vector annotations are stroked by Cairo, whose `ARgb32` surfaces
//! store premultiplied native-endian words, so drawing goes through a
//! round-trip: raster -> surface -> Cairo -> raster.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

/// Errors raised while moving pixels between representations.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Cairo error: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("Cairo surface is still borrowed: {0}")]
    Borrow(#[from] cairo::BorrowError),

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Raster dimensions {width}x{height} are not supported")]
    Dimensions { width: u32, height: u32 },
}

/// Decodes PNG/JPEG bytes into an RGBA raster.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, RasterError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encodes a raster as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RasterError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Copies a raster into a new Cairo `ARgb32` surface (premultiplying alpha).
pub fn to_surface(image: &RgbaImage) -> Result<cairo::ImageSurface, RasterError> {
    let (width, height) = checked_dimensions(image.width(), image.height())?;
    let mut surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height)?;
    let stride = surface.stride() as usize;
    {
        let mut data = surface.data()?;
        for (x, y, pixel) in image.enumerate_pixels() {
            let offset = y as usize * stride + x as usize * 4;
            data[offset..offset + 4].copy_from_slice(&pack_argb(*pixel).to_ne_bytes());
        }
    }
    Ok(surface)
}

/// Copies a Cairo `ARgb32` surface back into a raster (unpremultiplying alpha).
///
/// Every `cairo::Context` targeting the surface must be dropped first,
/// otherwise Cairo refuses exclusive access to the pixel data.
pub fn from_surface(surface: &mut cairo::ImageSurface) -> Result<RgbaImage, RasterError> {
    surface.flush();
    let width = surface.width() as u32;
    let height = surface.height() as u32;
    let stride = surface.stride() as usize;
    let data = surface.data()?;

    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let offset = y as usize * stride + x as usize * 4;
        let word = read_word(&data, offset);
        *pixel = unpack_argb(word);
    }
    Ok(image)
}

/// Runs `draw` against a Cairo context targeting a copy of `image`, then
/// writes the pixels Cairo touched back into `image`.
///
/// Untouched pixels keep their exact straight-alpha values, so translucent
/// regions outside the drawing do not pick up premultiplication rounding.
pub fn draw_with_cairo<F>(image: &mut RgbaImage, draw: F) -> Result<(), RasterError>
where
    F: FnOnce(&cairo::Context) -> Result<(), cairo::Error>,
{
    let mut surface = to_surface(image)?;
    {
        let ctx = cairo::Context::new(&surface)?;
        draw(&ctx)?;
    }
    surface.flush();
    let stride = surface.stride() as usize;
    let data = surface.data()?;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let offset = y as usize * stride + x as usize * 4;
        let word = read_word(&data, offset);
        if word != pack_argb(*pixel) {
            *pixel = unpack_argb(word);
        }
    }
    Ok(())
}

fn checked_dimensions(width: u32, height: u32) -> Result<(i32, i32), RasterError> {
    match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(RasterError::Dimensions { width, height }),
    }
}

fn read_word(data: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn pack_argb(pixel: Rgba<u8>) -> u32 {
    let [r, g, b, a] = pixel.0;
    let premultiply = |c: u8| ((c as u32 * a as u32 + 127) / 255) & 0xff;
    ((a as u32) << 24) | (premultiply(r) << 16) | (premultiply(g) << 8) | premultiply(b)
}

fn unpack_argb(word: u32) -> Rgba<u8> {
    let a = (word >> 24) & 0xff;
    let channel = |shift: u32| {
        let c = (word >> shift) & 0xff;
        if a == 0 {
            0
        } else {
            ((c * 255 + a / 2) / a).min(255) as u8
        }
    };
    Rgba([channel(16), channel(8), channel(0), a as u8])
}
