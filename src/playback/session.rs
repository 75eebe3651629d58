use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::clip::{AnimationClip, open_clip, validate_clip};
use crate::foundation::clock::Clock;
use crate::foundation::core::{
    FillMode, StretchDirection, validate_sample_rate, validate_speed,
};
use crate::foundation::error::VanimResult;
use crate::playback::command::{
    ClipSource, Command, PlaybackPosition, PositionCallback, RefreshParams, StartParams,
};
use crate::playback::sampler::{Advance, PlaybackState};
use crate::playback::throttle::TickDecision;
use crate::render::fit::fit_rect;
use crate::render::surface::Surface;
use crate::render::target::RenderTarget;

/// How a command was applied.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    /// State updated.
    Applied,
    /// A clip was taken over and playback started.
    Started,
    /// Playback stopped; the clip stays loaded.
    Stopped,
    /// `Start` failed validation or decoding; nothing changed.
    Rejected(String),
    /// A seek was applied and sampled immediately.
    Seeked(PassReport),
    /// The command needs a clip and there is none.
    Ignored,
    /// Clip and callback released.
    Terminated,
}

/// Result of a render tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// No clip to sample.
    Idle,
    /// The throttle skipped this tick.
    Throttled {
        /// Time until the next tick may render.
        retry_in: Duration,
    },
    /// A sampling pass ran.
    Sampled(PassReport),
}

/// Summary of one sampling pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassReport {
    /// Time rules applied during the pass.
    pub advance: Advance,
    /// Position reported to the callback.
    pub position: PlaybackPosition,
    /// Clip time the frame was rendered at.
    pub elapsed_secs: f64,
    /// Whether a frame reached the render target.
    pub presented: bool,
}

/// One playback session: a clip, its [`PlaybackState`] and a position callback.
///
/// Commands and ticks are applied one at a time by whoever owns the session (normally the thread
/// behind [`crate::PlaybackHandle`]). The state sits behind a mutex so other threads can read
/// snapshots; the lock covers field reads and writes only, never a call into the clip, the render
/// target or the callback.
pub struct PlaybackSession {
    state: Arc<Mutex<PlaybackState>>,
    clip: Option<Box<dyn AnimationClip>>,
    callback: Option<PositionCallback>,
    clock: Arc<dyn Clock>,
    scratch: Option<Surface>,
    tick_requested: bool,
}

impl PlaybackSession {
    /// Create an idle session.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlaybackState::default())),
            clip: None,
            callback: None,
            clock,
            scratch: None,
            tick_requested: false,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PlaybackState {
        self.state.lock().clone()
    }

    /// Shared handle to the state, for readers on other threads.
    pub fn shared_state(&self) -> Arc<Mutex<PlaybackState>> {
        Arc::clone(&self.state)
    }

    /// `true` while a clip is owned.
    pub fn has_clip(&self) -> bool {
        self.clip.is_some()
    }

    /// `true` while ticks should keep being scheduled.
    pub fn wants_ticks(&self) -> bool {
        if self.clip.is_none() {
            return false;
        }
        let s = self.state.lock();
        s.playing && !s.paused
    }

    /// Consume a pending "tick as soon as possible" request left by the last command.
    pub fn take_tick_request(&mut self) -> bool {
        std::mem::take(&mut self.tick_requested)
    }

    /// Apply one command.
    ///
    /// `target` is used by `Seek`, which renders immediately.
    pub fn handle(&mut self, cmd: Command, target: &mut dyn RenderTarget) -> CommandOutcome {
        trace!(command = cmd.name(), "handling playback command");
        match cmd {
            Command::Start { clip, params } => self.start(clip, params),
            Command::Stop => {
                let mut s = self.state.lock();
                s.playing = false;
                s.paused = false;
                CommandOutcome::Stopped
            }
            Command::Pause => {
                self.state.lock().paused = true;
                self.tick_requested = self.clip.is_some();
                CommandOutcome::Applied
            }
            Command::Resume => {
                let mut s = self.state.lock();
                s.paused = false;
                s.last_host = None;
                self.tick_requested = s.playing && self.clip.is_some();
                CommandOutcome::Applied
            }
            Command::Seek { time_secs } => self.seek(time_secs, target),
            Command::Refresh(params) => {
                self.refresh(params);
                self.tick_requested = self.clip.is_some();
                CommandOutcome::Applied
            }
            Command::RefreshLoopTarget(loop_target) => {
                self.state.lock().loop_target = loop_target;
                CommandOutcome::Applied
            }
            Command::SetPositionCallback(cb) => {
                self.callback = cb;
                CommandOutcome::Applied
            }
            Command::Terminate => {
                self.state.lock().terminate();
                self.callback = None;
                self.scratch = None;
                self.tick_requested = false;
                if self.clip.take().is_some() {
                    debug!("playback clip released");
                }
                CommandOutcome::Terminated
            }
        }
    }

    /// Handle a render tick: consult the throttle, then run a sampling pass.
    pub fn tick(&mut self, target: &mut dyn RenderTarget) -> TickOutcome {
        if self.clip.is_none() {
            return TickOutcome::Idle;
        }
        let now = self.clock.now();
        let decision = {
            let mut s = self.state.lock();
            let hz = s.sample_rate_hz;
            s.throttle.admit(now, hz)
        };
        match decision {
            TickDecision::Skip { retry_in } => TickOutcome::Throttled { retry_in },
            TickDecision::Render => match self.sample_pass(target, true) {
                Some(report) => TickOutcome::Sampled(report),
                None => TickOutcome::Idle,
            },
        }
    }

    fn start(&mut self, source: ClipSource, params: StartParams) -> CommandOutcome {
        match self.prepare_start(source, &params) {
            Ok(clip) => {
                let duration = clip.duration_secs();
                let natural = clip.natural_size();
                // Releasing the previous clip first keeps at most one clip owned.
                self.clip = None;
                self.state.lock().start(duration, natural, params);
                self.clip = Some(clip);
                self.tick_requested = true;
                debug!(
                    duration_secs = duration,
                    width = natural.width,
                    height = natural.height,
                    "playback started"
                );
                CommandOutcome::Started
            }
            Err(e) => {
                warn!(error = %e, "playback start rejected");
                CommandOutcome::Rejected(e.to_string())
            }
        }
    }

    fn prepare_start(
        &self,
        source: ClipSource,
        params: &StartParams,
    ) -> VanimResult<Box<dyn AnimationClip>> {
        validate_speed(params.speed)?;
        validate_sample_rate(params.sample_rate_hz)?;
        let clip = match source {
            ClipSource::Decoded(clip) => clip,
            ClipSource::Path(path) => open_clip(&path)?,
        };
        validate_clip(clip.as_ref())?;
        Ok(clip)
    }

    fn refresh(&mut self, params: RefreshParams) {
        let mut s = self.state.lock();
        if let Some(fill) = params.fill {
            s.fill = fill;
        }
        if let Some(direction) = params.direction {
            s.direction = direction;
        }
        if let Some(speed) = params.speed {
            match validate_speed(speed) {
                Ok(v) => s.speed = v,
                Err(e) => warn!(error = %e, "ignoring refreshed speed"),
            }
        }
        if let Some(hz) = params.sample_rate_hz {
            match validate_sample_rate(hz) {
                Ok(v) => s.sample_rate_hz = v,
                Err(e) => warn!(error = %e, "ignoring refreshed sample rate"),
            }
        }
    }

    fn seek(&mut self, time_secs: f64, target: &mut dyn RenderTarget) -> CommandOutcome {
        let Some(duration) = self.clip.as_ref().map(|c| c.duration_secs()) else {
            return CommandOutcome::Ignored;
        };
        let now = self.clock.now();
        self.state.lock().seek(time_secs, duration, now);
        match self.sample_pass(target, false) {
            Some(report) => CommandOutcome::Seeked(report),
            None => CommandOutcome::Ignored,
        }
    }

    /// Evaluate the time rules, report the position, then render outside the state lock.
    fn sample_pass(
        &mut self,
        target: &mut dyn RenderTarget,
        advance_time: bool,
    ) -> Option<PassReport> {
        let duration = self.clip.as_ref()?.duration_secs();
        let now = self.clock.now();

        let (advance, position, elapsed, fill, direction) = {
            let mut s = self.state.lock();
            let advance = s.advance(now, duration, advance_time);
            (
                advance,
                s.position(duration),
                s.elapsed_secs,
                s.fill,
                s.direction,
            )
        };
        if advance.reached_loop_target {
            debug!(elapsed_secs = elapsed, "loop target reached, playback stopped");
        }

        if let Some(cb) = self.callback.as_mut()
            && catch_unwind(AssertUnwindSafe(|| cb(position))).is_err()
        {
            warn!("position callback panicked; continuing playback");
        }

        let presented = self.render(target, elapsed, fill, direction);
        Some(PassReport {
            advance,
            position,
            elapsed_secs: elapsed,
            presented,
        })
    }

    fn render(
        &mut self,
        target: &mut dyn RenderTarget,
        elapsed: f64,
        fill: FillMode,
        direction: StretchDirection,
    ) -> bool {
        let Some(clip) = self.clip.as_mut() else {
            return false;
        };
        let size = target.surface_size();
        if size.is_empty() {
            return false;
        }

        let mut surface = match self.scratch.take() {
            Some(mut s) if s.size() == size => {
                s.clear();
                s
            }
            _ => match Surface::new(size) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "cannot allocate playback surface");
                    return false;
                }
            },
        };

        let dest = fit_rect(clip.natural_size(), size, fill, direction);
        if let Err(e) = clip.seek_and_render(elapsed, &mut surface, dest) {
            warn!(error = %e, elapsed_secs = elapsed, "clip render failed");
            self.scratch = Some(surface);
            return false;
        }
        let presented = match target.present(&surface) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "render target rejected frame");
                false
            }
        };
        self.scratch = Some(surface);
        presented
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/session.rs"]
mod tests;
