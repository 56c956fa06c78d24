use image::{Rgba, RgbaImage};

use crate::{
    compose::raster::{clear_rect, interlaced_row},
    decode::container::{DisposalMethod, GifContainer},
    decode::lzw,
    foundation::error::{AnimError, AnimResult},
};

/// Canvas a frame is drawn onto, expressed in terms of earlier frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BaseRef {
    /// A freshly cleared canvas.
    Transparent,
    /// The displayed raster of frame `j`.
    Display(usize),
    /// The displayed raster of frame `j` with its own rect cleared.
    Cleared(usize),
}

/// Base canvas of every frame, derived from the disposal chain alone.
///
/// `RestorePrevious` inherits the base of the frame that declared it, so its drawing never
/// reaches later frames.
pub(crate) fn plan_bases(container: &GifContainer) -> Vec<BaseRef> {
    let canvas = container.canvas();
    let mut bases = Vec::with_capacity(container.frames.len());
    let mut next = BaseRef::Transparent;
    for (i, frame) in container.frames.iter().enumerate() {
        bases.push(next);
        next = match frame.control.disposal {
            DisposalMethod::None | DisposalMethod::DoNotDispose => BaseRef::Display(i),
            DisposalMethod::RestoreBackground => {
                if frame.descriptor.rect.clip_to(canvas).covers(canvas) {
                    BaseRef::Transparent
                } else {
                    BaseRef::Cleared(i)
                }
            }
            DisposalMethod::RestorePrevious => next,
        };
    }
    bases
}

/// Draw frame `index` of `container` on top of `base`.
///
/// Indices equal to the transparency index, and indices outside the applicable color table,
/// leave the base pixel untouched. The frame rect is clipped to the logical screen and only the
/// stored rows the clip shows are decompressed.
pub fn render_frame(
    container: &GifContainer,
    index: usize,
    base: &RgbaImage,
) -> AnimResult<RgbaImage> {
    let canvas = container.canvas();
    let frame = container.frames.get(index).ok_or_else(|| {
        AnimError::validation(format!(
            "frame {index} out of range (count {})",
            container.frames.len()
        ))
    })?;
    if base.dimensions() != (canvas.width, canvas.height) {
        return Err(AnimError::validation(format!(
            "base raster is {}x{}, logical screen is {}x{}",
            base.width(),
            base.height(),
            canvas.width,
            canvas.height
        )));
    }
    let table = container
        .color_table_for(frame)
        .ok_or_else(|| AnimError::decode(format!("frame {index} has no color table")))?;

    let rect = frame.descriptor.rect;
    let clip = rect.clip_to(canvas);
    let width = rect.width as usize;
    let height = rect.height as usize;
    let interlaced = frame.descriptor.interlaced;
    let stored_row = |y: u32| {
        let y = (y - rect.top) as usize;
        if interlaced {
            interlaced_row(y, height)
        } else {
            y
        }
    };

    // Only the rows the clip shows are expanded.
    let needed_rows = (clip.top..clip.top + clip.height)
        .map(|y| stored_row(y) + 1)
        .max()
        .unwrap_or(0);
    let indices = lzw::decompress_prefix(
        frame.data.min_code_size,
        &frame.data.bytes,
        needed_rows.saturating_mul(width),
    )
    .map_err(|e| match e {
        AnimError::CorruptData(m) => AnimError::CorruptData(format!("frame {index}: {m}")),
        other => other,
    })?;

    let transparent = frame.control.transparent_index;
    let mut out = base.clone();
    for y in clip.top..clip.top + clip.height {
        let row = stored_row(y) * width;
        for x in clip.left..clip.left + clip.width {
            // Pixels past the end of a short stream read as index 0.
            let idx = indices
                .get(row + (x - rect.left) as usize)
                .copied()
                .unwrap_or(0);
            if Some(idx) == transparent {
                continue;
            }
            let Some([r, g, b]) = table.get(idx) else {
                continue;
            };
            out.put_pixel(x, y, Rgba([r, g, b, 255]));
        }
    }
    Ok(out)
}

/// `display` with `index`'s frame rect cleared; the base handed on by partial `RestoreBackground`.
pub(crate) fn cleared_after(
    container: &GifContainer,
    index: usize,
    display: &RgbaImage,
) -> AnimResult<RgbaImage> {
    let frame = container
        .frames
        .get(index)
        .ok_or_else(|| AnimError::validation(format!("frame {index} out of range")))?;
    let mut out = display.clone();
    clear_rect(&mut out, frame.descriptor.rect);
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
