use std::time::Duration;

use crate::{
    foundation::core::{duration_mul_div, duration_rem, duration_scale},
    foundation::error::{AnimError, AnimResult},
    timeline::frames::{Timeline, frame_index_at},
};

/// Playback state machine states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Created, never started.
    #[default]
    Initial,
    /// Time advances on every tick.
    Playing,
    /// Time is frozen until [`PlaybackController::play`].
    Paused,
    /// All passes played; the last frame is held.
    Complete,
}

/// How many passes over the timeline playback makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatBehavior {
    /// Play `n` passes (`n >= 1`), then complete.
    Count(u32),
    /// Loop without end.
    Forever,
}

impl RepeatBehavior {
    /// Map a stream loop count: `0` loops forever, `N` plays `N` times.
    pub fn from_loop_count(count: u16) -> Self {
        match count {
            0 => Self::Forever,
            n => Self::Count(u32::from(n)),
        }
    }

    fn validate(self) -> AnimResult<Self> {
        if self == Self::Count(0) {
            return Err(AnimError::validation("repeat count must be >= 1"));
        }
        Ok(self)
    }
}

type FrameCallback = Box<dyn FnMut(usize) + Send>;
type CompletedCallback = Box<dyn FnMut() + Send>;

/// Clock-driven play/pause/seek/loop state machine over a timeline's key times.
///
/// The host calls [`PlaybackController::tick`] with the wall-clock time since the last tick.
/// Elapsed time is kept in timeline time, across all passes; the current frame is derived from
/// it on demand. A rate control, either a speed ratio or a fixed pass duration, scales how far a
/// tick advances; the two are mutually exclusive.
pub struct PlaybackController {
    key_times: Vec<Duration>,
    duration: Duration,
    repeat: RepeatBehavior,
    state: PlaybackState,
    elapsed: Duration,
    speed_ratio: Option<f64>,
    fixed_duration: Option<Duration>,
    suspended: bool,
    shown: usize,
    on_frame: Vec<FrameCallback>,
    on_completed: Vec<CompletedCallback>,
}

impl PlaybackController {
    /// Controller over `timeline` that loops as the stream asks.
    pub fn new(timeline: &Timeline) -> Self {
        Self::from_parts(
            timeline.key_times().to_vec(),
            timeline.total_duration(),
            RepeatBehavior::from_loop_count(timeline.repeat_count()),
        )
    }

    /// Controller over explicit frame start times and pass duration.
    ///
    /// `key_times` must start at zero, ascend strictly and end before `duration`.
    pub fn from_key_times(
        key_times: Vec<Duration>,
        duration: Duration,
        repeat: RepeatBehavior,
    ) -> AnimResult<Self> {
        if key_times.first() != Some(&Duration::ZERO) {
            return Err(AnimError::validation("key times must start at zero"));
        }
        if key_times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnimError::validation("key times must ascend strictly"));
        }
        if key_times.last().is_some_and(|t| *t >= duration) {
            return Err(AnimError::validation(
                "duration must extend past the last key time",
            ));
        }
        Ok(Self::from_parts(key_times, duration, repeat.validate()?))
    }

    fn from_parts(key_times: Vec<Duration>, duration: Duration, repeat: RepeatBehavior) -> Self {
        Self {
            key_times,
            duration,
            repeat,
            state: PlaybackState::Initial,
            elapsed: Duration::ZERO,
            speed_ratio: None,
            fixed_duration: None,
            suspended: false,
            shown: 0,
            on_frame: Vec::new(),
            on_completed: Vec::new(),
        }
    }

    /// Register a callback receiving the new frame index whenever the current frame changes.
    pub fn on_current_frame_changed(&mut self, f: impl FnMut(usize) + Send + 'static) {
        self.on_frame.push(Box::new(f));
    }

    /// Register a callback fired each time playback enters [`PlaybackState::Complete`].
    pub fn on_completed(&mut self, f: impl FnMut() + Send + 'static) {
        self.on_completed.push(Box::new(f));
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether time is not advancing because playback was never started or was paused.
    pub fn is_paused(&self) -> bool {
        matches!(self.state, PlaybackState::Initial | PlaybackState::Paused)
    }

    /// Whether all passes have played.
    pub fn is_complete(&self) -> bool {
        self.state == PlaybackState::Complete
    }

    /// Whether the host has suspended time advancement.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.key_times.len()
    }

    /// Duration of one pass in timeline time.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start time of every frame in timeline time.
    pub fn key_times(&self) -> &[Duration] {
        &self.key_times
    }

    /// Active repeat behavior.
    pub fn repeat(&self) -> RepeatBehavior {
        self.repeat
    }

    /// Elapsed timeline time summed over all passes.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Time inside the current pass; equals [`PlaybackController::duration`] once complete.
    pub fn position(&self) -> Duration {
        if self.is_complete() {
            return self.duration;
        }
        duration_rem(self.elapsed, self.duration)
    }

    /// Zero-based index of the current pass.
    pub fn current_loop(&self) -> u64 {
        if self.duration.is_zero() {
            return 0;
        }
        let pass = (self.elapsed.as_nanos() / self.duration.as_nanos()) as u64;
        if self.is_complete() {
            pass.saturating_sub(1)
        } else {
            pass
        }
    }

    /// Frame to show now.
    pub fn current_frame(&self) -> usize {
        if self.is_complete() {
            return self.frame_count().saturating_sub(1);
        }
        frame_index_at(&self.key_times, self.position())
    }

    /// Active speed ratio, if set.
    pub fn speed_ratio(&self) -> Option<f64> {
        self.speed_ratio
    }

    /// Active fixed pass duration, if set.
    pub fn fixed_duration(&self) -> Option<Duration> {
        self.fixed_duration
    }

    /// Wall-clock length of one pass under the active rate control.
    pub fn effective_duration(&self) -> AnimResult<Duration> {
        match (self.fixed_duration, self.speed_ratio) {
            (Some(fixed), _) => Ok(fixed),
            (None, Some(ratio)) => duration_scale(self.duration, 1.0 / ratio),
            (None, None) => Ok(self.duration),
        }
    }

    /// Start or resume. From `Complete` playback restarts at time zero.
    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Playing => {}
            PlaybackState::Initial | PlaybackState::Paused => self.state = PlaybackState::Playing,
            PlaybackState::Complete => {
                self.elapsed = Duration::ZERO;
                self.state = PlaybackState::Playing;
                self.sync_frame();
            }
        }
    }

    /// Freeze time. Has no effect once complete.
    pub fn pause(&mut self) {
        if matches!(self.state, PlaybackState::Initial | PlaybackState::Playing) {
            self.state = PlaybackState::Paused;
        }
    }

    /// Jump to the start of frame `index`, keeping the play/pause state.
    ///
    /// Elapsed time becomes that frame's start in the first pass. A completed controller
    /// resumes playing.
    pub fn seek(&mut self, index: usize) -> AnimResult<()> {
        let Some(start) = self.key_times.get(index).copied() else {
            return Err(AnimError::validation(format!(
                "seek to frame {index} out of range (count {})",
                self.frame_count()
            )));
        };
        self.elapsed = start;
        if self.is_complete() {
            self.state = PlaybackState::Playing;
        }
        self.sync_frame();
        Ok(())
    }

    /// Stop or resume time advancement without touching the play/pause state.
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// Replace the repeat behavior; `Count(0)` is rejected.
    pub fn set_repeat(&mut self, repeat: RepeatBehavior) -> AnimResult<()> {
        self.repeat = repeat.validate()?;
        Ok(())
    }

    /// Scale tick advancement by `ratio`.
    pub fn set_speed_ratio(&mut self, ratio: f64) -> AnimResult<()> {
        if self.fixed_duration.is_some() {
            return Err(AnimError::conflict(
                "speed ratio cannot be set while a fixed duration is active",
            ));
        }
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(AnimError::conflict(format!(
                "speed ratio must be finite and > 0, got {ratio}"
            )));
        }
        self.speed_ratio = Some(ratio);
        Ok(())
    }

    /// Remove the speed ratio.
    pub fn clear_speed_ratio(&mut self) {
        self.speed_ratio = None;
    }

    /// Stretch or squeeze every pass to last `fixed` of wall-clock time.
    pub fn set_fixed_duration(&mut self, fixed: Duration) -> AnimResult<()> {
        if self.speed_ratio.is_some() {
            return Err(AnimError::conflict(
                "fixed duration cannot be set while a speed ratio is active",
            ));
        }
        if fixed.is_zero() {
            return Err(AnimError::conflict("fixed duration must be > 0"));
        }
        self.fixed_duration = Some(fixed);
        Ok(())
    }

    /// [`PlaybackController::set_fixed_duration`] from seconds; non-finite or non-positive values
    /// are rejected.
    pub fn set_fixed_duration_secs(&mut self, secs: f64) -> AnimResult<()> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(AnimError::conflict(format!(
                "fixed duration must be finite and > 0, got {secs}s"
            )));
        }
        let fixed = Duration::try_from_secs_f64(secs)
            .map_err(|e| AnimError::conflict(format!("fixed duration out of range: {e}")))?;
        self.set_fixed_duration(fixed)
    }

    /// Remove the fixed duration.
    pub fn clear_fixed_duration(&mut self) {
        self.fixed_duration = None;
    }

    /// Re-time the timeline so every frame lasts `new_duration / frame_count`.
    ///
    /// A duration too short to keep key times strictly ascending is a configuration conflict.
    pub fn change_duration_flat(&mut self, new_duration: Duration) -> AnimResult<()> {
        let n = self.frame_count() as u128;
        self.retime(new_duration, |_, i| duration_mul_div(new_duration, i as u128, n))
    }

    /// Re-time the timeline so every key time is scaled by `new_duration / duration`.
    pub fn change_duration_scale(&mut self, new_duration: Duration) -> AnimResult<()> {
        let old = self.duration.as_nanos();
        self.retime(new_duration, |t, _| duration_mul_div(t, new_duration.as_nanos(), old))
    }

    fn retime(
        &mut self,
        new_duration: Duration,
        key_time: impl Fn(Duration, usize) -> Duration,
    ) -> AnimResult<()> {
        if new_duration.is_zero() {
            return Err(AnimError::conflict("new duration must be > 0"));
        }
        if new_duration == self.duration {
            return Ok(());
        }

        let key_times: Vec<Duration> = self
            .key_times
            .iter()
            .enumerate()
            .map(|(i, t)| key_time(*t, i))
            .collect();
        if key_times.windows(2).any(|w| w[0] >= w[1])
            || key_times.last().is_some_and(|t| *t >= new_duration)
        {
            return Err(AnimError::conflict(format!(
                "new duration {new_duration:?} is too short to keep {} frames apart",
                self.frame_count()
            )));
        }

        let frame = self.current_frame();
        let pass = self.current_loop();
        self.key_times = key_times;
        self.duration = new_duration;

        self.elapsed = if self.is_complete() {
            self.completion_point().unwrap_or(self.elapsed)
        } else {
            let pass = u32::try_from(pass).unwrap_or(u32::MAX);
            new_duration.saturating_mul(pass) + self.key_times[frame]
        };
        self.sync_frame();
        Ok(())
    }

    /// Advance by `dt` of wall-clock time.
    ///
    /// Returns the new frame index when the current frame changed.
    pub fn tick(&mut self, dt: Duration) -> AnimResult<Option<usize>> {
        if self.state != PlaybackState::Playing || self.suspended || dt.is_zero() {
            return Ok(None);
        }

        let advance = match (self.fixed_duration, self.speed_ratio) {
            (Some(fixed), _) => duration_mul_div(dt, self.duration.as_nanos(), fixed.as_nanos()),
            (None, Some(ratio)) => duration_scale(dt, ratio)?,
            (None, None) => dt,
        };
        self.elapsed = self.elapsed.saturating_add(advance);

        let mut completed = false;
        if let Some(end) = self.completion_point()
            && self.elapsed >= end
        {
            self.elapsed = end;
            self.state = PlaybackState::Complete;
            completed = true;
        }

        let changed = self.sync_frame();
        if completed {
            tracing::debug!(elapsed_ms = self.elapsed.as_millis() as u64, "playback complete");
            for f in &mut self.on_completed {
                f();
            }
        }
        Ok(changed)
    }

    fn completion_point(&self) -> Option<Duration> {
        match self.repeat {
            RepeatBehavior::Forever => None,
            RepeatBehavior::Count(n) => Some(self.duration.saturating_mul(n)),
        }
    }

    fn sync_frame(&mut self) -> Option<usize> {
        let frame = self.current_frame();
        if frame == self.shown {
            return None;
        }
        self.shown = frame;
        for f in &mut self.on_frame {
            f(frame);
        }
        Some(frame)
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("elapsed", &self.elapsed)
            .field("duration", &self.duration)
            .field("repeat", &self.repeat)
            .field("speed_ratio", &self.speed_ratio)
            .field("fixed_duration", &self.fixed_duration)
            .field("suspended", &self.suspended)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
