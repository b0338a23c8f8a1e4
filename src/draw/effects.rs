//! Pixel-level region effects: mosaic and box blur.
//!
//! Both effects only read and write pixels inside the (clipped) region, so the
//! rest of the canvas is left bit-for-bit untouched.

use image::{Rgba, RgbaImage};

use crate::util::Rect;

/// Replaces every `block x block` cell of `region` with its average color.
///
/// Cells on the right and bottom edges may be smaller than `block`. Averages
/// are floored per RGB channel; alpha is preserved.
pub fn mosaic(canvas: &mut RgbaImage, region: Rect, block: u32) {
    let Some(region) = region.clip_to(canvas.width(), canvas.height()) else {
        return;
    };
    let block = block.max(1);
    let (x0, y0) = (region.x as u32, region.y as u32);
    let (x1, y1) = (x0 + region.width as u32, y0 + region.height as u32);

    for by in (y0..y1).step_by(block as usize) {
        for bx in (x0..x1).step_by(block as usize) {
            let bx_end = (bx + block).min(x1);
            let by_end = (by + block).min(y1);

            let mut sums = [0u64; 3];
            let mut count = 0u64;
            for y in by..by_end {
                for x in bx..bx_end {
                    let pixel = canvas.get_pixel(x, y);
                    for (sum, channel) in sums.iter_mut().zip(pixel.0.iter()) {
                        *sum += *channel as u64;
                    }
                    count += 1;
                }
            }

            let average = sums.map(|sum| (sum / count) as u8);
            for y in by..by_end {
                for x in bx..bx_end {
                    let pixel = canvas.get_pixel_mut(x, y);
                    pixel.0[..3].copy_from_slice(&average);
                }
            }
        }
    }
}

/// Box-blurs `region` with a `(2r+1)^2` averaging kernel.
///
/// Neighbours are limited to the region itself, matching a blur applied to an
/// extracted sub-image. All four channels are averaged and rounded to nearest.
/// Sums come from a summed-area table, so cost does not grow with the radius.
pub fn box_blur(canvas: &mut RgbaImage, region: Rect, radius: u32) {
    let Some(region) = region.clip_to(canvas.width(), canvas.height()) else {
        return;
    };
    let (x0, y0) = (region.x as u32, region.y as u32);
    let (w, h) = (region.width as usize, region.height as usize);
    let r = radius as usize;

    // table[(y + 1) * (w + 1) + (x + 1)] holds sums over [0..=x] x [0..=y]
    let stride = w + 1;
    let mut table = vec![[0u64; 4]; stride * (h + 1)];
    for y in 0..h {
        let mut row = [0u64; 4];
        for x in 0..w {
            let pixel = canvas.get_pixel(x0 + x as u32, y0 + y as u32);
            for c in 0..4 {
                row[c] += pixel.0[c] as u64;
            }
            let above = table[y * stride + x + 1];
            let cell = &mut table[(y + 1) * stride + x + 1];
            for c in 0..4 {
                cell[c] = above[c] + row[c];
            }
        }
    }

    for y in 0..h {
        let top = y.saturating_sub(r);
        let bottom = (y + r + 1).min(h);
        for x in 0..w {
            let left = x.saturating_sub(r);
            let right = (x + r + 1).min(w);
            let count = ((bottom - top) * (right - left)) as u64;

            let mut out = [0u8; 4];
            for (c, value) in out.iter_mut().enumerate() {
                let sum = table[bottom * stride + right][c] + table[top * stride + left][c]
                    - table[top * stride + right][c]
                    - table[bottom * stride + left][c];
                *value = ((sum + count / 2) / count) as u8;
            }
            canvas.put_pixel(x0 + x as u32, y0 + y as u32, Rgba(out));
        }
    }
}
