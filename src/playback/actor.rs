use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clip::AnimationClip;
use crate::foundation::clock::{Clock, SystemClock};
use crate::foundation::core::{LoopTarget, PixelSize};
use crate::foundation::error::{VanimError, VanimResult};
use crate::playback::command::{
    ClipSource, Command, PlaybackPosition, RefreshParams, StartParams,
};
use crate::playback::sampler::PlaybackState;
use crate::playback::session::{CommandOutcome, PlaybackSession, TickOutcome};
use crate::render::target::RenderTarget;

/// Options for the render scheduling thread.
#[derive(Clone, Debug)]
pub struct SessionOpts {
    /// Base tick cadence while playing, before throttling.
    pub tick_interval: Duration,
    /// Capacity of the [`SessionEvent`] channel. Events are dropped when it is full.
    pub event_capacity: usize,
    /// Name of the spawned thread.
    pub thread_name: String,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            event_capacity: 64,
            thread_name: "vanim-render".to_owned(),
        }
    }
}

/// Notable transitions reported by the render thread.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A `Start` command took over a clip.
    Started {
        /// Clip duration in seconds.
        duration_secs: f64,
        /// Clip natural size.
        natural_size: PixelSize,
    },
    /// A `Start` command was rejected; the previous state is unchanged.
    StartRejected {
        /// Why the clip was not accepted.
        reason: String,
    },
    /// A `Stop` command halted playback.
    Stopped,
    /// A finite loop target was reached and playback froze on the last frame.
    LoopTargetReached {
        /// Loops completed when playback stopped.
        loops_completed: u64,
    },
    /// The clip was released.
    Terminated,
}

/// Control-side handle to a playback session running on its own thread.
///
/// Commands are queued without acknowledgement and applied in order. Ticks and commands are
/// handled by the same thread, so a tick always sees every command queued before it. Dropping
/// the handle terminates the session and joins the thread.
pub struct PlaybackHandle {
    tx: Option<Sender<Command>>,
    state: Arc<Mutex<PlaybackState>>,
    events: Receiver<SessionEvent>,
    join: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    /// Spawn a session driven by the system clock.
    pub fn spawn(target: Box<dyn RenderTarget>, opts: SessionOpts) -> VanimResult<Self> {
        Self::spawn_with_clock(target, opts, Arc::new(SystemClock))
    }

    /// Spawn a session sampling time from `clock`.
    pub fn spawn_with_clock(
        target: Box<dyn RenderTarget>,
        opts: SessionOpts,
        clock: Arc<dyn Clock>,
    ) -> VanimResult<Self> {
        let session = PlaybackSession::new(clock);
        let state = session.shared_state();
        let (tx, rx) = crossbeam_channel::unbounded::<Command>();
        let (event_tx, event_rx) = crossbeam_channel::bounded(opts.event_capacity.max(1));

        let tick_interval = opts.tick_interval;
        let join = std::thread::Builder::new()
            .name(opts.thread_name.clone())
            .spawn(move || run_render_loop(session, target, rx, event_tx, tick_interval))
            .context("spawn playback render thread")?;

        Ok(Self {
            tx: Some(tx),
            state,
            events: event_rx,
            join: Some(join),
        })
    }

    /// Queue a command.
    pub fn send(&self, cmd: Command) -> VanimResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| VanimError::validation("playback session already shut down"))?;
        tx.send(cmd)
            .map_err(|_| VanimError::render("playback render thread has exited"))
    }

    /// Queue `Start` with an already decoded clip.
    pub fn start(&self, clip: Box<dyn AnimationClip>, params: StartParams) -> VanimResult<()> {
        self.send(Command::Start {
            clip: ClipSource::Decoded(clip),
            params,
        })
    }

    /// Queue `Start` with a clip decoded on the render thread.
    pub fn start_path(&self, path: impl Into<PathBuf>, params: StartParams) -> VanimResult<()> {
        self.send(Command::Start {
            clip: ClipSource::Path(path.into()),
            params,
        })
    }

    /// Queue `Stop`.
    pub fn stop(&self) -> VanimResult<()> {
        self.send(Command::Stop)
    }

    /// Queue `Pause`.
    pub fn pause(&self) -> VanimResult<()> {
        self.send(Command::Pause)
    }

    /// Queue `Resume`.
    pub fn resume(&self) -> VanimResult<()> {
        self.send(Command::Resume)
    }

    /// Queue `Seek`.
    pub fn seek(&self, time_secs: f64) -> VanimResult<()> {
        self.send(Command::Seek { time_secs })
    }

    /// Queue `Refresh`.
    pub fn refresh(&self, params: RefreshParams) -> VanimResult<()> {
        self.send(Command::Refresh(params))
    }

    /// Queue `RefreshLoopTarget`.
    pub fn refresh_loop_target(&self, loop_target: LoopTarget) -> VanimResult<()> {
        self.send(Command::RefreshLoopTarget(loop_target))
    }

    /// Queue `SetPositionCallback`. The callback runs on the render thread.
    pub fn set_position_callback<F>(&self, cb: Option<F>) -> VanimResult<()>
    where
        F: FnMut(PlaybackPosition) + Send + 'static,
    {
        self.send(Command::SetPositionCallback(
            cb.map(|f| Box::new(f) as Box<dyn FnMut(PlaybackPosition) + Send>),
        ))
    }

    /// Queue `Terminate`.
    pub fn terminate(&self) -> VanimResult<()> {
        self.send(Command::Terminate)
    }

    /// Snapshot of the session state as of the last applied command or tick.
    pub fn state(&self) -> PlaybackState {
        self.state.lock().clone()
    }

    /// Transition events from the render thread.
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Terminate, close the queue and wait for the render thread.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Terminate);
        }
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::error!("playback render thread panicked");
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_render_loop(
    mut session: PlaybackSession,
    mut target: Box<dyn RenderTarget>,
    rx: Receiver<Command>,
    events: Sender<SessionEvent>,
    tick_interval: Duration,
) {
    debug!("playback render thread started");
    let mut next_tick: Option<Instant> = None;

    loop {
        if let Some(deadline) = next_tick
            && deadline <= Instant::now()
        {
            next_tick = run_tick(&mut session, target.as_mut(), &events, tick_interval);
            continue;
        }

        let msg = match next_tick {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match msg {
            Ok(cmd) => {
                let name = cmd.name();
                let outcome = session.handle(cmd, target.as_mut());
                trace!(command = name, ?outcome, "command applied");
                emit_outcome(&session, &events, outcome);
                if session.take_tick_request() {
                    next_tick = Some(Instant::now());
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                next_tick = run_tick(&mut session, target.as_mut(), &events, tick_interval);
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(session);
    debug!("playback render thread stopped");
}

fn run_tick(
    session: &mut PlaybackSession,
    target: &mut dyn RenderTarget,
    events: &Sender<SessionEvent>,
    tick_interval: Duration,
) -> Option<Instant> {
    match session.tick(target) {
        TickOutcome::Idle => None,
        TickOutcome::Throttled { retry_in } => Some(Instant::now() + retry_in),
        TickOutcome::Sampled(report) => {
            if report.advance.reached_loop_target {
                emit(
                    events,
                    SessionEvent::LoopTargetReached {
                        loops_completed: session.state().loops_completed,
                    },
                );
            }
            session
                .wants_ticks()
                .then(|| Instant::now() + tick_interval)
        }
    }
}

fn emit_outcome(session: &PlaybackSession, events: &Sender<SessionEvent>, outcome: CommandOutcome) {
    let event = match outcome {
        CommandOutcome::Started => {
            let st = session.state();
            SessionEvent::Started {
                duration_secs: st.duration_secs.unwrap_or_default(),
                natural_size: st.natural_size.unwrap_or(PixelSize::new(0, 0)),
            }
        }
        CommandOutcome::Rejected(reason) => SessionEvent::StartRejected { reason },
        CommandOutcome::Stopped => SessionEvent::Stopped,
        CommandOutcome::Terminated => SessionEvent::Terminated,
        CommandOutcome::Seeked(report) if report.advance.reached_loop_target => {
            SessionEvent::LoopTargetReached {
                loops_completed: session.state().loops_completed,
            }
        }
        CommandOutcome::Seeked(_) | CommandOutcome::Applied | CommandOutcome::Ignored => return,
    };
    emit(events, event);
}

fn emit(events: &Sender<SessionEvent>, event: SessionEvent) {
    if let Err(TrySendError::Full(ev)) = events.try_send(event) {
        trace!(event = ?ev, "session event dropped, channel full");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/actor.rs"]
mod tests;
