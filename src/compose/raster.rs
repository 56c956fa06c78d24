use image::{Rgba, RgbaImage};

use crate::foundation::core::{Canvas, FrameRect};

/// Fully transparent pixel; also what cleared regions are reset to.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Fresh canvas-sized raster with every pixel transparent.
pub fn transparent_canvas(canvas: Canvas) -> RgbaImage {
    RgbaImage::from_pixel(canvas.width, canvas.height, TRANSPARENT)
}

/// Reset the pixels inside `rect` (clipped to the image) to [`TRANSPARENT`].
pub fn clear_rect(img: &mut RgbaImage, rect: FrameRect) {
    let clip = rect.clip_to(Canvas {
        width: img.width(),
        height: img.height(),
    });
    for y in clip.top..clip.top + clip.height {
        for x in clip.left..clip.left + clip.width {
            img.put_pixel(x, y, TRANSPARENT);
        }
    }
}

/// Reorder rows stored in 4-pass interlaced order into top-to-bottom order.
///
/// Passes: every 8th row from 0, every 8th from 4, every 4th from 2, every 2nd from 1.
/// Rows missing from a short `indices` stay zero.
pub fn deinterlace(indices: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return indices.to_vec();
    }
    let mut out = vec![0u8; width * height];
    for (y, row) in out.chunks_exact_mut(width).enumerate() {
        let src = interlaced_row(y, height) * width;
        if let Some(stored) = indices.get(src..src + width) {
            row.copy_from_slice(stored);
        }
    }
    out
}

/// Position in 4-pass interlaced storage order of display row `y` out of `height` rows.
pub fn interlaced_row(y: usize, height: usize) -> usize {
    let pass1 = height.div_ceil(8);
    let pass2 = (height + 3) / 8;
    let pass3 = (height + 1) / 4;
    match y % 8 {
        0 => y / 8,
        4 => pass1 + y / 8,
        2 | 6 => pass1 + pass2 + y / 4,
        _ => pass1 + pass2 + pass3 + y / 2,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/raster.rs"]
mod tests;
