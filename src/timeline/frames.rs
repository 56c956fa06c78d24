use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::{
    compose::compositor::{BaseRef, cleared_after, plan_bases, render_frame},
    compose::raster::transparent_canvas,
    decode::container::GifContainer,
    decode::parser::parse_container,
    foundation::core::Canvas,
    foundation::error::{AnimError, AnimResult},
    foundation::memo::Memo,
};

/// One full-canvas raster with its active time window `[start, end)`.
#[derive(Clone, Debug)]
pub struct CompositedFrame {
    /// Position in the timeline.
    pub index: usize,
    /// Inclusive start time.
    pub start: Duration,
    /// Exclusive end time; always `start + delay`.
    pub end: Duration,
    /// Composited RGBA raster of logical-screen size.
    pub image: RgbaImage,
}

impl CompositedFrame {
    /// Display time of this frame.
    pub fn delay(&self) -> Duration {
        self.end - self.start
    }
}

struct FrameSlot {
    display: Memo<CompositedFrame>,
    /// Present when a later frame's base is this frame with its rect cleared.
    cleared: Option<Memo<RgbaImage>>,
}

/// Ordered, gap-free sequence of composited frames with cumulative timestamps.
///
/// Frames are composited lazily: the first access to frame `i` composites every frame before it
/// that has not been composited yet, in order, because each frame is drawn on the canvas its
/// predecessor leaves behind. Every frame is computed at most once and shared read-only.
pub struct Timeline {
    container: GifContainer,
    starts: Vec<Duration>,
    delays: Vec<Duration>,
    total: Duration,
    bases: Vec<BaseRef>,
    slots: Vec<FrameSlot>,
}

impl Timeline {
    /// Parse `bytes` and build a timeline over the resulting container.
    #[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
    pub fn from_bytes(bytes: &[u8]) -> AnimResult<Self> {
        Self::new(parse_container(bytes)?)
    }

    /// Build a timeline over an already parsed container. Nothing is composited yet.
    pub fn new(container: GifContainer) -> AnimResult<Self> {
        if container.frames.is_empty() {
            return Err(AnimError::decode("gif stream contains no image frames"));
        }

        let delays: Vec<Duration> = container.frames.iter().map(|f| f.control.delay()).collect();
        let mut starts = Vec::with_capacity(delays.len());
        let mut total = Duration::ZERO;
        for d in &delays {
            starts.push(total);
            total += *d;
        }

        let bases = plan_bases(&container);
        let mut needs_cleared = vec![false; container.frames.len()];
        for base in &bases {
            if let BaseRef::Cleared(j) = *base {
                needs_cleared[j] = true;
            }
        }
        let slots = needs_cleared
            .into_iter()
            .map(|cleared| FrameSlot {
                display: Memo::new(),
                cleared: cleared.then(Memo::new),
            })
            .collect();

        tracing::debug!(
            frames = delays.len(),
            total_ms = total.as_millis() as u64,
            repeat = container.repeat_count,
            "timeline built"
        );

        Ok(Self {
            container,
            starts,
            delays,
            total,
            bases,
            slots,
        })
    }

    /// Parsed container the timeline was built from.
    pub fn container(&self) -> &GifContainer {
        &self.container
    }

    /// Logical screen size of every frame.
    pub fn canvas(&self) -> Canvas {
        self.container.canvas()
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.delays.len()
    }

    /// Sum of all (normalized) frame delays.
    pub fn total_duration(&self) -> Duration {
        self.total
    }

    /// Loop count from the stream: `0` loops forever, `N` plays `N` times.
    pub fn repeat_count(&self) -> u16 {
        self.container.repeat_count
    }

    /// Whether the source has more than one frame; single-frame sources play as a static image.
    pub fn is_animated(&self) -> bool {
        self.frame_count() > 1
    }

    /// Start time of every frame, ascending, first is zero.
    pub fn key_times(&self) -> &[Duration] {
        &self.starts
    }

    /// Start time of frame `index`.
    pub fn frame_start(&self, index: usize) -> AnimResult<Duration> {
        self.starts
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_range(index))
    }

    /// Normalized delay of frame `index`.
    pub fn frame_delay(&self, index: usize) -> AnimResult<Duration> {
        self.delays
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_range(index))
    }

    /// Index of the frame active at `t`; times at or past the end map to the last frame.
    pub fn frame_index_at(&self, t: Duration) -> usize {
        frame_index_at(&self.starts, t)
    }

    /// Composited frame `index`, compositing it and any uncomposited predecessors first.
    pub fn frame(&self, index: usize) -> AnimResult<Arc<CompositedFrame>> {
        if index >= self.frame_count() {
            return Err(self.out_of_range(index));
        }
        for j in 0..index {
            if !self.slots[j].display.is_resolved() {
                self.display(j)?;
            }
        }
        self.display(index)
    }

    /// Frame active at `t` (see [`Timeline::frame_index_at`]).
    pub fn frame_at(&self, t: Duration) -> AnimResult<Arc<CompositedFrame>> {
        self.frame(self.frame_index_at(t))
    }

    /// Frame `index` if it has already been composited (or has failed); never blocks.
    pub fn try_frame(&self, index: usize) -> Option<AnimResult<Arc<CompositedFrame>>> {
        self.slots.get(index)?.display.peek()
    }

    /// Whether frame `index` has finished compositing, successfully or not.
    pub fn is_materialized(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|s| s.display.is_resolved())
    }

    fn display(&self, index: usize) -> AnimResult<Arc<CompositedFrame>> {
        self.slots[index].display.get_or_compute(|| {
            if index != 0 {
                return self.composite(index);
            }
            retry_once(|| self.composite(0))
        })
    }

    fn composite(&self, index: usize) -> AnimResult<CompositedFrame> {
        let base = match self.bases[index] {
            BaseRef::Transparent => transparent_canvas(self.canvas()),
            BaseRef::Display(j) => self.display(j)?.image.clone(),
            BaseRef::Cleared(j) => self.cleared(j)?.as_ref().clone(),
        };
        let image = render_frame(&self.container, index, &base)?;
        let start = self.starts[index];
        Ok(CompositedFrame {
            index,
            start,
            end: start + self.delays[index],
            image,
        })
    }

    fn cleared(&self, index: usize) -> AnimResult<Arc<RgbaImage>> {
        let Some(memo) = self.slots[index].cleared.as_ref() else {
            return Err(AnimError::validation(format!(
                "frame {index} does not hand on a cleared canvas"
            )));
        };
        memo.get_or_compute(|| {
            let display = self.display(index)?;
            cleared_after(&self.container, index, &display.image)
        })
    }

    fn out_of_range(&self, index: usize) -> AnimError {
        AnimError::validation(format!(
            "frame {index} out of range (count {})",
            self.frame_count()
        ))
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("canvas", &self.canvas())
            .field("frames", &self.frame_count())
            .field("total", &self.total)
            .field("repeat_count", &self.repeat_count())
            .finish_non_exhaustive()
    }
}

/// Run `attempt` and, when it fails, exactly once more.
fn retry_once<T>(mut attempt: impl FnMut() -> AnimResult<T>) -> AnimResult<T> {
    attempt().or_else(|err| {
        tracing::warn!(error = %err, "first frame failed to composite, retrying once");
        attempt()
    })
}

/// Binary search over ascending start times; `starts[0]` must be zero.
pub(crate) fn frame_index_at(starts: &[Duration], t: Duration) -> usize {
    starts.partition_point(|s| *s <= t).saturating_sub(1)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/frames.rs"]
mod tests;
