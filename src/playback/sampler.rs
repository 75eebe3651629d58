//! Time-advance and loop rules for interactive playback.
//!
//! Everything here is pure: callers pass the current instant and the clip duration, so the rules
//! are testable with a [`crate::ManualClock`] and no render thread.

use std::time::Instant;

use crate::foundation::core::{FillMode, LoopTarget, PixelSize, StretchDirection};
use crate::playback::command::{PlaybackPosition, StartParams};
use crate::playback::throttle::RenderThrottle;

/// Coarse lifecycle phase derived from [`PlaybackState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// No clip.
    Idle,
    /// Advancing with the clock.
    Playing,
    /// Playing but frozen.
    Paused,
    /// Clip retained, not advancing.
    Stopped,
}

/// Mutable data of one playback session.
///
/// Invariants: `elapsed_secs` stays in `[0, duration]`; once a finite loop target is reached the
/// session is stopped with `elapsed_secs == duration`; no clip implies not playing.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    /// Duration of the owned clip, `None` without a clip.
    pub duration_secs: Option<f64>,
    /// Natural size of the owned clip.
    pub natural_size: Option<PixelSize>,
    /// Scaling mode.
    pub fill: FillMode,
    /// Scaling restriction.
    pub direction: StretchDirection,
    /// Loops to play before freezing.
    pub loop_target: LoopTarget,
    /// Speed multiplier.
    pub speed: f64,
    /// Redraw cap in Hz, also sizes the reported frame grid.
    pub sample_rate_hz: f64,
    /// Position within the current loop.
    pub elapsed_secs: f64,
    /// Full loops completed.
    pub loops_completed: u64,
    /// Advancing with the clock (unless paused).
    pub playing: bool,
    /// Frozen by `Pause`.
    pub paused: bool,
    /// Wall-clock instant of the last time advance.
    pub last_host: Option<Instant>,
    /// Redraw throttle, holding the last rendered tick.
    pub throttle: RenderThrottle,
}

impl Default for PlaybackState {
    fn default() -> Self {
        let p = StartParams::default();
        Self {
            duration_secs: None,
            natural_size: None,
            fill: p.fill,
            direction: p.direction,
            loop_target: p.loop_target,
            speed: p.speed,
            sample_rate_hz: p.sample_rate_hz,
            elapsed_secs: 0.0,
            loops_completed: 0,
            playing: false,
            paused: false,
            last_host: None,
            throttle: RenderThrottle::default(),
        }
    }
}

/// What one evaluation of the time rules did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Advance {
    /// Scaled seconds added to the position.
    pub advanced_secs: f64,
    /// Loop boundaries crossed.
    pub wrapped: u64,
    /// The loop target stopped playback during this evaluation.
    pub reached_loop_target: bool,
}

impl PlaybackState {
    /// Derived lifecycle phase.
    pub fn phase(&self) -> PlaybackPhase {
        match (self.duration_secs.is_some(), self.playing, self.paused) {
            (false, _, _) => PlaybackPhase::Idle,
            (true, true, true) => PlaybackPhase::Paused,
            (true, true, false) => PlaybackPhase::Playing,
            (true, false, _) => PlaybackPhase::Stopped,
        }
    }

    /// Reset for a freshly started clip.
    pub(crate) fn start(&mut self, duration: f64, natural: PixelSize, params: StartParams) {
        *self = Self {
            duration_secs: Some(duration),
            natural_size: Some(natural),
            fill: params.fill,
            direction: params.direction,
            loop_target: params.loop_target,
            speed: params.speed,
            sample_rate_hz: params.sample_rate_hz,
            playing: true,
            ..Self::default()
        };
    }

    /// Stop and forget the clip.
    pub(crate) fn terminate(&mut self) {
        self.playing = false;
        self.paused = false;
        self.duration_secs = None;
        self.natural_size = None;
        self.last_host = None;
        self.throttle.reset();
    }

    /// Run the time rules for one sampling pass.
    ///
    /// With `advance_time`, a playing, unpaused session accumulates `(now - last_host) * speed`.
    /// Without it only the loop rules are evaluated (used right after a seek).
    pub(crate) fn advance(&mut self, now: Instant, duration: f64, advance_time: bool) -> Advance {
        let mut out = Advance::default();

        if advance_time && self.playing && !self.paused {
            if let Some(last) = self.last_host {
                let delta = now.saturating_duration_since(last).as_secs_f64() * self.speed;
                self.elapsed_secs += delta;
                out.advanced_secs = delta;
            }
            self.last_host = Some(now);
        } else if advance_time {
            // Re-armed by resume so paused wall time is never credited.
            self.last_host = None;
        }

        if duration <= 0.0 {
            self.elapsed_secs = 0.0;
            return out;
        }

        if self.elapsed_secs > duration {
            let wraps = self.loop_wraps(duration);
            self.loops_completed = self.loops_completed.saturating_add(wraps as u64);
            out.wrapped = wraps as u64;
            let rem = self.elapsed_secs - wraps * duration;
            self.elapsed_secs = if rem.is_finite() { rem } else { 0.0 };
        }

        if self.loop_target.is_reached(self.loops_completed) {
            if self.playing {
                out.reached_loop_target = true;
            }
            self.playing = false;
            self.elapsed_secs = duration;
            self.last_host = None;
        }

        self.elapsed_secs = self.elapsed_secs.clamp(0.0, duration);
        out
    }

    /// Loop boundaries crossed by the current `elapsed_secs`, at least one and never past a
    /// finite loop target. An exact multiple of `duration` stays on the last frame of a loop.
    fn loop_wraps(&self, duration: f64) -> f64 {
        let ratio = self.elapsed_secs / duration;
        let wraps = if ratio.is_finite() {
            (ratio.ceil() - 1.0).max(1.0)
        } else {
            f64::MAX
        };
        match self.loop_target {
            LoopTarget::Count(n) => {
                let left = u64::from(n).saturating_sub(self.loops_completed).max(1);
                wraps.min(left as f64)
            }
            LoopTarget::Infinite => wraps,
        }
    }

    /// Jump to `time_secs`, counted across loops.
    pub(crate) fn seek(&mut self, time_secs: f64, duration: f64, now: Instant) {
        let t = if time_secs.is_finite() {
            time_secs.max(0.0)
        } else {
            0.0
        };
        if duration > 0.0 {
            let loops = (t / duration).floor();
            self.loops_completed = loops as u64;
            self.elapsed_secs = (t - loops * duration).clamp(0.0, duration);
        } else {
            self.loops_completed = 0;
            self.elapsed_secs = 0.0;
        }
        self.last_host = (self.playing && !self.paused).then_some(now);
    }

    /// Position for the callback, on a `ceil(duration * sample_rate)` frame grid.
    pub fn position(&self, duration: f64) -> PlaybackPosition {
        position_for(self.elapsed_secs, duration, self.sample_rate_hz)
    }
}

/// Map an elapsed time to a [`PlaybackPosition`].
pub fn position_for(elapsed_secs: f64, duration: f64, sample_rate_hz: f64) -> PlaybackPosition {
    let normalized = if duration > 0.0 {
        (elapsed_secs / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let total_frames = if sample_rate_hz > 0.0 && duration > 0.0 {
        (duration * sample_rate_hz).ceil() as u64
    } else {
        0
    };
    let frame_index = if total_frames > 1 {
        (normalized * (total_frames - 1) as f64).floor() as u64
    } else {
        0
    };
    PlaybackPosition {
        frame_index,
        normalized,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/sampler.rs"]
mod tests;
