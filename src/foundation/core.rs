use std::time::Duration;

use crate::foundation::error::{AnimError, AnimResult};

/// Logical screen dimensions shared by every frame of an animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Total pixel count (`width * height`).
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Rectangle covering the whole canvas.
    pub fn full_rect(self) -> FrameRect {
        FrameRect {
            left: 0,
            top: 0,
            width: self.width,
            height: self.height,
        }
    }
}

/// Axis-aligned pixel rectangle in canvas coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameRect {
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameRect {
    /// Number of pixels inside the rectangle before any clipping.
    pub fn area(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Whether this rectangle covers the entire `canvas` exactly.
    pub fn covers(self, canvas: Canvas) -> bool {
        self.left == 0
            && self.top == 0
            && self.width == canvas.width
            && self.height == canvas.height
    }

    /// Intersection with `canvas`; may be empty.
    pub fn clip_to(self, canvas: Canvas) -> FrameRect {
        let left = self.left.min(canvas.width);
        let top = self.top.min(canvas.height);
        let right = self.left.saturating_add(self.width).min(canvas.width);
        let bottom = self.top.saturating_add(self.height).min(canvas.height);
        FrameRect {
            left,
            top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Whether `(x, y)` lies inside the rectangle.
    pub fn contains(self, x: u32, y: u32) -> bool {
        x >= self.left
            && y >= self.top
            && u64::from(x) < u64::from(self.left) + u64::from(self.width)
            && u64::from(y) < u64::from(self.top) + u64::from(self.height)
    }
}

/// `a mod b` for durations; `b` must be non-zero.
pub(crate) fn duration_rem(a: Duration, b: Duration) -> Duration {
    let b = b.as_nanos();
    if b == 0 {
        return Duration::ZERO;
    }
    nanos_to_duration(a.as_nanos() % b)
}

/// `d * num / den` with 128-bit intermediate precision.
pub(crate) fn duration_mul_div(d: Duration, num: u128, den: u128) -> Duration {
    if den == 0 {
        return Duration::ZERO;
    }
    nanos_to_duration(d.as_nanos().saturating_mul(num) / den)
}

/// Scale a duration by a finite, non-negative factor.
pub(crate) fn duration_scale(d: Duration, factor: f64) -> AnimResult<Duration> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(AnimError::validation(format!(
            "duration scale factor must be finite and >= 0, got {factor}"
        )));
    }
    let nanos = (d.as_nanos() as f64 * factor).round();
    if nanos >= u128::MAX as f64 {
        return Err(AnimError::validation("scaled duration out of range"));
    }
    Ok(nanos_to_duration(nanos as u128))
}

fn nanos_to_duration(n: u128) -> Duration {
    let secs = (n / 1_000_000_000).min(u128::from(u64::MAX)) as u64;
    let sub = (n % 1_000_000_000) as u32;
    Duration::new(secs, sub)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
