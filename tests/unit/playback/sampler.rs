use super::*;
use std::time::Duration;

const D: f64 = 2.0;

fn playing(loop_target: LoopTarget, speed: f64) -> PlaybackState {
    let mut s = PlaybackState::default();
    s.start(
        D,
        PixelSize::new(10, 10),
        StartParams {
            loop_target,
            speed,
            ..StartParams::default()
        },
    );
    s
}

fn at(t0: Instant, secs: f64) -> Instant {
    t0 + Duration::from_secs_f64(secs)
}

#[test]
fn first_pass_only_arms_the_host_timestamp() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Infinite, 1.0);
    let a = s.advance(t0, D, true);
    assert_eq!(a.advanced_secs, 0.0);
    assert_eq!(s.elapsed_secs, 0.0);
    assert_eq!(s.last_host, Some(t0));
}

#[test]
fn elapsed_accumulates_scaled_wall_time() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Infinite, 1.5);
    s.advance(t0, D, true);
    s.advance(at(t0, 0.5), D, true);
    assert!((s.elapsed_secs - 0.75).abs() < 1e-9);
    s.advance(at(t0, 1.0), D, true);
    assert!((s.elapsed_secs - 1.5).abs() < 1e-9);
}

#[test]
fn infinite_target_wraps_forever() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Infinite, 1.0);
    s.advance(t0, D, true);
    let a = s.advance(at(t0, 9.0), D, true);
    assert_eq!(a.wrapped, 4);
    assert_eq!(s.loops_completed, 4);
    assert!((s.elapsed_secs - 1.0).abs() < 1e-9);
    assert!(s.playing);
    assert!(!a.reached_loop_target);
}

#[test]
fn finite_target_freezes_on_last_frame() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Count(2), 1.0);
    s.advance(t0, D, true);
    let a = s.advance(at(t0, 4.5), D, true);
    assert!(a.reached_loop_target);
    assert!(!s.playing);
    assert_eq!(s.elapsed_secs, D);
    assert_eq!(s.loops_completed, 2);

    // Further passes never wrap past the final loop.
    let a = s.advance(at(t0, 100.0), D, true);
    assert_eq!(a.wrapped, 0);
    assert!(!a.reached_loop_target);
    assert_eq!(s.elapsed_secs, D);
    assert_eq!(s.phase(), PlaybackPhase::Stopped);
}

#[test]
fn one_huge_delta_stops_at_the_target_loop() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Count(3), 1.0);
    s.advance(t0, D, true);
    s.advance(at(t0, 1_000.0), D, true);
    assert_eq!(s.loops_completed, 3);
    assert_eq!(s.elapsed_secs, D);
}

#[test]
fn elapsed_equal_to_duration_does_not_wrap() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Count(1), 1.0);
    s.advance(t0, D, true);
    s.advance(at(t0, D), D, true);
    assert!(s.playing);
    assert_eq!(s.loops_completed, 0);
}

#[test]
fn paused_session_does_not_advance_and_clears_host_timestamp() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Infinite, 1.0);
    s.advance(t0, D, true);
    s.advance(at(t0, 0.5), D, true);
    s.paused = true;
    s.advance(at(t0, 1.5), D, true);
    assert!((s.elapsed_secs - 0.5).abs() < 1e-9);
    assert_eq!(s.last_host, None);
    assert_eq!(s.phase(), PlaybackPhase::Paused);

    // Resume: the first pass re-arms, paused wall time is not credited.
    s.paused = false;
    s.advance(at(t0, 5.0), D, true);
    assert!((s.elapsed_secs - 0.5).abs() < 1e-9);
    s.advance(at(t0, 5.25), D, true);
    assert!((s.elapsed_secs - 0.75).abs() < 1e-9);
}

#[test]
fn seek_splits_time_into_loops_and_offset() {
    let t0 = Instant::now();
    for &t in &[0.0, 0.3, 2.0, 5.5, 13.25] {
        let mut s = playing(LoopTarget::Infinite, 1.0);
        s.seek(t, D, t0);
        s.advance(t0, D, true);
        assert_eq!(s.loops_completed, (t / D).floor() as u64, "t={t}");
        assert!((s.elapsed_secs - t % D).abs() < 1e-9, "t={t}");
    }
}

#[test]
fn seek_clamps_negative_and_nan() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Infinite, 1.0);
    s.seek(-3.0, D, t0);
    assert_eq!((s.loops_completed, s.elapsed_secs), (0, 0.0));
    s.seek(f64::NAN, D, t0);
    assert_eq!((s.loops_completed, s.elapsed_secs), (0, 0.0));
}

#[test]
fn seek_past_finite_target_stops_on_evaluation() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Count(2), 1.0);
    s.seek(5.0, D, t0);
    assert!(s.playing);
    let a = s.advance(t0, D, false);
    assert!(a.reached_loop_target);
    assert!(!s.playing);
    assert_eq!(s.elapsed_secs, D);
}

#[test]
fn lowering_loop_target_stops_on_next_evaluation() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Infinite, 1.0);
    s.advance(t0, D, true);
    s.advance(at(t0, 6.5), D, true);
    assert_eq!(s.loops_completed, 3);
    s.loop_target = LoopTarget::Count(2);
    s.advance(at(t0, 6.6), D, true);
    assert!(!s.playing);
    assert_eq!(s.elapsed_secs, D);
    assert_eq!(s.loops_completed, 3);
}

#[test]
fn position_uses_sample_rate_grid() {
    let p = position_for(1.0, 2.0, 30.0);
    assert_eq!(p.normalized, 0.5);
    assert_eq!(p.frame_index, 29);

    let p = position_for(2.0, 2.0, 30.0);
    assert_eq!(p.frame_index, 59);

    let p = position_for(1.0, 2.0, 0.0);
    assert_eq!(p.frame_index, 0);

    let p = position_for(1.0, 0.0, 30.0);
    assert_eq!(p.normalized, 0.0);
    assert_eq!(p.frame_index, 0);
}

#[test]
fn terminate_returns_to_idle() {
    let mut s = playing(LoopTarget::Infinite, 1.0);
    assert_eq!(s.phase(), PlaybackPhase::Playing);
    s.terminate();
    assert_eq!(s.phase(), PlaybackPhase::Idle);
    assert!(!s.playing);
}

#[test]
fn extreme_speed_wraps_in_one_step() {
    let d = 1.0 / 30.0;
    let t0 = Instant::now();
    let mut s = PlaybackState::default();
    s.start(
        d,
        PixelSize::new(10, 10),
        StartParams {
            speed: 1e17,
            ..StartParams::default()
        },
    );
    s.advance(t0, d, true);
    let a = s.advance(at(t0, 0.016), d, true);
    assert!(a.wrapped > 1_000_000_000_000);
    assert_eq!(s.loops_completed, a.wrapped);
    assert!((0.0..=d).contains(&s.elapsed_secs));
    assert!(s.playing);
}

#[test]
fn extreme_speed_still_stops_at_finite_target() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Count(5), 1e17);
    s.advance(t0, D, true);
    let a = s.advance(at(t0, 0.016), D, true);
    assert!(a.reached_loop_target);
    assert_eq!(a.wrapped, 5);
    assert_eq!(s.loops_completed, 5);
    assert_eq!(s.elapsed_secs, D);
}

#[test]
fn overflowing_elapsed_resets_into_range() {
    let t0 = Instant::now();
    let mut s = playing(LoopTarget::Infinite, f64::MAX);
    s.advance(t0, D, true);
    s.advance(at(t0, 10.0), D, true);
    assert!((0.0..=D).contains(&s.elapsed_secs));
    assert_eq!(s.loops_completed, u64::MAX);
}
