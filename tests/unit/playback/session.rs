use super::*;
use crate::clip::testing::FakeClip;
use crate::foundation::clock::ManualClock;
use crate::foundation::core::{LoopTarget, PixelSize};
use crate::playback::sampler::PlaybackPhase;
use crate::render::target::FrameSlot;

fn session() -> (PlaybackSession, Arc<ManualClock>, FrameSlot) {
    let clock = Arc::new(ManualClock::new());
    let session = PlaybackSession::new(clock.clone());
    (session, clock, FrameSlot::new(PixelSize::new(16, 16)))
}

fn start_cmd(clip: FakeClip, params: StartParams) -> Command {
    Command::Start {
        clip: ClipSource::Decoded(Box::new(clip)),
        params,
    }
}

fn recorder() -> (Arc<Mutex<Vec<PlaybackPosition>>>, Command) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cmd = Command::SetPositionCallback(Some(Box::new(move |p| sink.lock().push(p))));
    (seen, cmd)
}

#[test]
fn start_takes_clip_and_requests_a_tick() {
    let (mut s, _clock, mut slot) = session();
    let outcome = s.handle(start_cmd(FakeClip::new(2.0), StartParams::default()), &mut slot);
    assert_eq!(outcome, CommandOutcome::Started);
    assert!(s.has_clip());
    assert!(s.take_tick_request());
    assert!(!s.take_tick_request());
    assert!(s.wants_ticks());

    let st = s.state();
    assert_eq!(st.phase(), PlaybackPhase::Playing);
    assert_eq!(st.duration_secs, Some(2.0));
    assert_eq!(st.elapsed_secs, 0.0);

    let TickOutcome::Sampled(report) = s.tick(&mut slot) else {
        panic!("expected a sampling pass");
    };
    assert!(report.presented);
    assert_eq!(slot.presented(), 1);
    assert_eq!(
        slot.latest().unwrap().pixel(8, 8),
        Some([0, 0, 255, 255])
    );
}

#[test]
fn invalid_start_is_rejected_without_state_change() {
    let (mut s, _clock, mut slot) = session();

    let out = s.handle(start_cmd(FakeClip::new(0.0), StartParams::default()), &mut slot);
    assert!(matches!(out, CommandOutcome::Rejected(_)));

    let bad_speed = StartParams {
        speed: 0.0,
        ..StartParams::default()
    };
    let out = s.handle(start_cmd(FakeClip::new(1.0), bad_speed), &mut slot);
    assert!(matches!(out, CommandOutcome::Rejected(_)));

    let out = s.handle(
        Command::Start {
            clip: ClipSource::Path("target/no/such/clip.json".into()),
            params: StartParams::default(),
        },
        &mut slot,
    );
    assert!(matches!(out, CommandOutcome::Rejected(_)));

    assert!(!s.has_clip());
    assert_eq!(s.state(), PlaybackState::default());
    assert!(!s.take_tick_request());
}

#[test]
fn rejected_start_keeps_the_running_clip() {
    let (mut s, _clock, mut slot) = session();
    s.handle(start_cmd(FakeClip::new(2.0), StartParams::default()), &mut slot);
    s.handle(start_cmd(FakeClip::new(-1.0), StartParams::default()), &mut slot);
    assert_eq!(s.state().duration_secs, Some(2.0));
    assert!(s.state().playing);
}

#[test]
fn ticks_advance_with_the_clock_and_report_positions() {
    let (mut s, clock, mut slot) = session();
    let (seen, cb) = recorder();
    s.handle(cb, &mut slot);
    let params = StartParams {
        speed: 2.0,
        sample_rate_hz: 10.0,
        ..StartParams::default()
    };
    s.handle(start_cmd(FakeClip::new(2.0), params), &mut slot);

    s.tick(&mut slot);
    clock.advance_secs(0.25);
    s.tick(&mut slot);

    let st = s.state();
    assert!((st.elapsed_secs - 0.5).abs() < 1e-9);
    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].normalized, 0.25);
    // 20 frames on the grid -> floor(0.25 * 19).
    assert_eq!(seen[1].frame_index, 4);
}

#[test]
fn seek_reports_and_renders_immediately() {
    let (mut s, _clock, mut slot) = session();
    let clip = FakeClip::new(2.0);
    let seeks = Arc::clone(&clip.seeks);
    let (seen, cb) = recorder();
    s.handle(cb, &mut slot);
    s.handle(start_cmd(clip, StartParams::default()), &mut slot);

    let out = s.handle(Command::Seek { time_secs: 5.0 }, &mut slot);
    let CommandOutcome::Seeked(report) = out else {
        panic!("expected a seek pass, got {out:?}");
    };
    assert!(report.presented);
    assert!(!report.advance.reached_loop_target);
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(seen.lock()[0].normalized, 0.5);
    assert_eq!(seeks.lock().as_slice(), &[1.0]);
    assert_eq!(slot.presented(), 1);

    let st = s.state();
    assert_eq!(st.loops_completed, 2);
    assert_eq!(st.elapsed_secs, 1.0);
}

#[test]
fn seek_past_finite_target_freezes_at_once() {
    let (mut s, _clock, mut slot) = session();
    let params = StartParams {
        loop_target: LoopTarget::Count(1),
        ..StartParams::default()
    };
    s.handle(start_cmd(FakeClip::new(2.0), params), &mut slot);
    let out = s.handle(Command::Seek { time_secs: 3.0 }, &mut slot);
    assert!(matches!(
        out,
        CommandOutcome::Seeked(r) if r.advance.reached_loop_target
    ));
    let st = s.state();
    assert!(!st.playing);
    assert_eq!(st.elapsed_secs, 2.0);
    assert!(!s.wants_ticks());
}

#[test]
fn loop_target_stops_playback_on_the_last_frame() {
    let (mut s, clock, mut slot) = session();
    let params = StartParams {
        loop_target: LoopTarget::Count(2),
        ..StartParams::default()
    };
    s.handle(start_cmd(FakeClip::new(1.0), params), &mut slot);
    s.tick(&mut slot);
    clock.advance_secs(2.5);
    let TickOutcome::Sampled(report) = s.tick(&mut slot) else {
        panic!("expected a sampling pass");
    };
    assert!(report.advance.reached_loop_target);
    assert_eq!(report.elapsed_secs, 1.0);
    assert_eq!(report.position.normalized, 1.0);
    assert!(!s.wants_ticks());
    assert_eq!(s.state().phase(), PlaybackPhase::Stopped);
}

#[test]
fn pause_then_resume_keeps_position() {
    let (mut s, clock, mut slot) = session();
    let params = StartParams {
        loop_target: LoopTarget::Count(5),
        ..StartParams::default()
    };
    s.handle(start_cmd(FakeClip::new(1.0), params), &mut slot);
    s.tick(&mut slot);
    clock.advance_secs(1.25);
    s.tick(&mut slot);
    let before = s.state();

    s.handle(Command::Pause, &mut slot);
    assert!(s.take_tick_request());
    assert!(!s.wants_ticks());
    clock.advance_secs(10.0);
    s.tick(&mut slot);
    s.handle(Command::Resume, &mut slot);
    assert!(s.take_tick_request());

    let after = s.state();
    assert_eq!(after.elapsed_secs, before.elapsed_secs);
    assert_eq!(after.loops_completed, before.loops_completed);
    assert_eq!(after.loop_target, before.loop_target);

    // First pass after resume re-arms without crediting paused time.
    s.tick(&mut slot);
    assert_eq!(s.state().elapsed_secs, before.elapsed_secs);
}

#[test]
fn throttle_limits_passes_but_not_elapsed_time() {
    let (mut s, clock, mut slot) = session();
    let params = StartParams {
        sample_rate_hz: 10.0,
        ..StartParams::default()
    };
    s.handle(start_cmd(FakeClip::new(5.0), params), &mut slot);

    assert!(matches!(s.tick(&mut slot), TickOutcome::Sampled(_)));
    clock.advance(Duration::from_millis(50));
    assert!(matches!(
        s.tick(&mut slot),
        TickOutcome::Throttled { retry_in } if retry_in == Duration::from_millis(50)
    ));
    clock.advance(Duration::from_millis(50));
    assert!(matches!(s.tick(&mut slot), TickOutcome::Sampled(_)));
    assert!((s.state().elapsed_secs - 0.1).abs() < 1e-9);
    assert_eq!(slot.presented(), 2);
}

#[test]
fn refresh_updates_only_supplied_fields() {
    let (mut s, _clock, mut slot) = session();
    s.handle(start_cmd(FakeClip::new(1.0), StartParams::default()), &mut slot);
    s.handle(
        Command::Refresh(RefreshParams {
            speed: Some(3.0),
            ..RefreshParams::default()
        }),
        &mut slot,
    );
    s.handle(
        Command::Refresh(RefreshParams {
            fill: Some(FillMode::Fill),
            speed: Some(-2.0),
            ..RefreshParams::default()
        }),
        &mut slot,
    );
    let st = s.state();
    assert_eq!(st.speed, 3.0);
    assert_eq!(st.fill, FillMode::Fill);
    assert_eq!(st.direction, StretchDirection::Both);
}

#[test]
fn terminate_releases_clip_and_callback() {
    let (mut s, _clock, mut slot) = session();
    let clip = FakeClip::new(1.0);
    let dropped = Arc::clone(&clip.dropped);
    let (seen, cb) = recorder();
    s.handle(cb, &mut slot);
    s.handle(start_cmd(clip, StartParams::default()), &mut slot);

    assert_eq!(s.handle(Command::Terminate, &mut slot), CommandOutcome::Terminated);
    assert!(FakeClip::is_dropped(&dropped));
    assert!(!s.has_clip());
    assert_eq!(s.state().phase(), PlaybackPhase::Idle);
    assert_eq!(s.tick(&mut slot), TickOutcome::Idle);
    assert_eq!(
        s.handle(Command::Seek { time_secs: 0.5 }, &mut slot),
        CommandOutcome::Ignored
    );
    assert!(seen.lock().is_empty());

    // Terminate while idle only clears.
    assert_eq!(s.handle(Command::Terminate, &mut slot), CommandOutcome::Terminated);
}

#[test]
fn new_start_releases_previous_clip() {
    let (mut s, _clock, mut slot) = session();
    let first = FakeClip::new(1.0);
    let first_dropped = Arc::clone(&first.dropped);
    s.handle(start_cmd(first, StartParams::default()), &mut slot);
    s.handle(start_cmd(FakeClip::new(3.0), StartParams::default()), &mut slot);
    assert!(FakeClip::is_dropped(&first_dropped));
    assert_eq!(s.state().duration_secs, Some(3.0));
}

#[test]
fn panicking_callback_does_not_abort_the_pass() {
    let (mut s, _clock, mut slot) = session();
    s.handle(
        Command::SetPositionCallback(Some(Box::new(|_| panic!("host bug")))),
        &mut slot,
    );
    s.handle(start_cmd(FakeClip::new(1.0), StartParams::default()), &mut slot);
    let TickOutcome::Sampled(report) = s.tick(&mut slot) else {
        panic!("expected a sampling pass");
    };
    assert!(report.presented);
}

#[test]
fn empty_target_skips_rasterization() {
    let (mut s, _clock, _slot) = session();
    let mut empty = FrameSlot::new(PixelSize::new(0, 0));
    s.handle(start_cmd(FakeClip::new(1.0), StartParams::default()), &mut empty);
    let TickOutcome::Sampled(report) = s.tick(&mut empty) else {
        panic!("expected a sampling pass");
    };
    assert!(!report.presented);
    assert_eq!(empty.presented(), 0);
}

#[test]
fn stop_keeps_clip_and_halts_ticks() {
    let (mut s, clock, mut slot) = session();
    s.handle(start_cmd(FakeClip::new(2.0), StartParams::default()), &mut slot);
    s.tick(&mut slot);
    clock.advance_secs(0.5);
    s.tick(&mut slot);

    assert_eq!(s.handle(Command::Stop, &mut slot), CommandOutcome::Stopped);
    assert!(s.has_clip());
    assert!(!s.wants_ticks());
    assert_eq!(s.state().phase(), PlaybackPhase::Stopped);
    assert!((s.state().elapsed_secs - 0.5).abs() < 1e-9);
}
