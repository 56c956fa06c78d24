use std::sync::Arc;
use std::time::Duration;

use crate::{
    cache::source::{GifSource, SourceKey},
    cache::store::DecodeCache,
    foundation::error::{AnimError, AnimResult},
    playback::controller::{PlaybackController, RepeatBehavior},
    timeline::frames::{CompositedFrame, Timeline},
};

/// Per-consumer playback configuration applied at attach time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttachOptions {
    /// Start playing immediately (animated sources only).
    pub auto_start: bool,
    /// Overrides the loop count stored in the stream.
    pub repeat: Option<RepeatBehavior>,
    /// Playback speed multiplier; excludes `fixed_duration_ms`.
    pub speed_ratio: Option<f64>,
    /// Wall-clock length of one pass in milliseconds; excludes `speed_ratio`.
    pub fixed_duration_ms: Option<u64>,
}

impl Default for AttachOptions {
    fn default() -> Self {
        Self {
            auto_start: true,
            repeat: None,
            speed_ratio: None,
            fixed_duration_ms: None,
        }
    }
}

impl AttachOptions {
    /// Parse options from JSON and validate them.
    pub fn from_json(json: &str) -> AnimResult<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| AnimError::validation(format!("invalid attach options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject rate settings that conflict or fall outside their domain.
    pub fn validate(&self) -> AnimResult<()> {
        if self.speed_ratio.is_some() && self.fixed_duration_ms.is_some() {
            return Err(AnimError::conflict(
                "speed_ratio and fixed_duration_ms are mutually exclusive",
            ));
        }
        if let Some(r) = self.speed_ratio
            && (!r.is_finite() || r <= 0.0)
        {
            return Err(AnimError::conflict(format!(
                "speed_ratio must be finite and > 0, got {r}"
            )));
        }
        if self.fixed_duration_ms == Some(0) {
            return Err(AnimError::conflict("fixed_duration_ms must be > 0"));
        }
        if self.repeat == Some(RepeatBehavior::Count(0)) {
            return Err(AnimError::validation("repeat count must be >= 1"));
        }
        Ok(())
    }
}

/// One consumer's view of a shared timeline: its own playback state plus a cache reference.
///
/// Dropping the handle gives the reference back, as does [`DecodeCache::detach`].
pub struct AnimationHandle {
    cache: Arc<DecodeCache>,
    key: SourceKey,
    timeline: Arc<Timeline>,
    controller: PlaybackController,
    prefetched: Option<usize>,
    attached: bool,
}

impl AnimationHandle {
    /// Cache key of the source.
    pub fn key(&self) -> &SourceKey {
        &self.key
    }

    /// Shared timeline.
    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    /// Playback state.
    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Mutable playback state for play/pause/seek/rate changes.
    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    /// Advance playback by `dt` and schedule compositing of the frame after the current one.
    ///
    /// Returns the new frame index when the current frame changed.
    pub fn tick(&mut self, dt: Duration) -> AnimResult<Option<usize>> {
        let changed = self.controller.tick(dt)?;
        if !self.controller.is_complete() && self.timeline.is_animated() {
            let next = (self.controller.current_frame() + 1) % self.timeline.frame_count();
            if self.prefetched != Some(next) && self.cache.prefetch(&self.timeline, next) {
                self.prefetched = Some(next);
            }
        }
        Ok(changed)
    }

    /// Index of the frame to show now.
    pub fn current_frame(&self) -> usize {
        self.controller.current_frame()
    }

    /// Raster to show now; composites it first if needed.
    pub fn current_image(&self) -> AnimResult<Arc<CompositedFrame>> {
        self.timeline.frame(self.current_frame())
    }

    /// Raster to show now if it is already composited; never blocks.
    pub fn try_current_image(&self) -> Option<AnimResult<Arc<CompositedFrame>>> {
        self.timeline.try_frame(self.current_frame())
    }

    fn release(&mut self) -> AnimResult<usize> {
        if !self.attached {
            return Err(AnimError::validation(format!(
                "handle for '{}' is already detached",
                self.key
            )));
        }
        self.attached = false;
        self.cache.release(&self.key)
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        if self.attached
            && let Err(err) = self.release()
        {
            tracing::debug!(key = %self.key, error = %err, "release on drop failed");
        }
    }
}

impl std::fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("key", &self.key)
            .field("timeline", &self.timeline)
            .field("controller", &self.controller)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

impl DecodeCache {
    /// Acquire `source` and wrap it in a playback handle configured by `options`.
    ///
    /// Options are validated before any decode; the first frame is composited before this
    /// returns.
    #[tracing::instrument(skip(self, source, options))]
    pub fn attach(
        self: &Arc<Self>,
        source: &GifSource,
        options: AttachOptions,
    ) -> AnimResult<AnimationHandle> {
        options.validate()?;
        let key = self.key_for(source)?;
        let timeline = self.acquire(source)?;

        let mut handle = AnimationHandle {
            cache: Arc::clone(self),
            key,
            controller: PlaybackController::new(&timeline),
            timeline,
            prefetched: None,
            attached: true,
        };

        let controller = &mut handle.controller;
        if let Some(repeat) = options.repeat {
            controller.set_repeat(repeat)?;
        }
        if let Some(ratio) = options.speed_ratio {
            controller.set_speed_ratio(ratio)?;
        }
        if let Some(ms) = options.fixed_duration_ms {
            controller.set_fixed_duration(Duration::from_millis(ms))?;
        }
        if options.auto_start && handle.timeline.is_animated() {
            handle.controller.play();
        }
        if handle.timeline.is_animated() && self.prefetch(&handle.timeline, 1) {
            handle.prefetched = Some(1);
        }

        tracing::debug!(
            key = %handle.key,
            frames = handle.timeline.frame_count(),
            repeat = ?handle.controller.repeat(),
            "attached"
        );
        Ok(handle)
    }

    /// Give back `handle`'s reference. Returns the references still held on its source.
    pub fn detach(&self, mut handle: AnimationHandle) -> AnimResult<usize> {
        if !std::ptr::eq(Arc::as_ptr(&handle.cache), self) {
            return Err(AnimError::validation(
                "handle was attached through a different cache",
            ));
        }
        handle.release()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/handle.rs"]
mod tests;
