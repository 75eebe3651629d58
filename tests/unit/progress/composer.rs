use super::*;
use crate::foundation::clock::ManualClock;

fn composer() -> (ProgressComposer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (ProgressComposer::new(clock.clone()), clock)
}

#[test]
fn weights_sum_to_one_hundred() {
    let total: f64 = Stage::WEIGHTED.iter().map(|s| s.weight()).sum();
    assert_eq!(total, 100.0);
    assert_eq!(Stage::Initializing.base(), 0.0);
    assert_eq!(Stage::Sampling.base(), 5.0);
    assert_eq!(Stage::Converting.base(), 70.0);
    assert_eq!(Stage::Cleanup.base(), 95.0);
}

#[test]
fn overall_is_weighted() {
    let (mut c, _) = composer();
    assert_eq!(c.report(Stage::Initializing, 100.0).overall, 5.0);
    assert_eq!(c.report(Stage::Sampling, 50.0).overall, 37.5);
    assert_eq!(c.report(Stage::Converting, 0.0).overall, 70.0);
    assert_eq!(c.report(Stage::Cleanup, 100.0).overall, 100.0);
}

#[test]
fn in_order_feed_is_monotonic_and_ends_at_100() {
    let (mut c, clock) = composer();
    let mut last = 0.0;
    for stage in Stage::WEIGHTED {
        for p in [0.0, 25.0, 50.0, 75.0, 100.0] {
            clock.advance_secs(0.1);
            let ev = c.report(stage, p);
            assert!(ev.overall >= last, "{stage:?} {p}: {} < {last}", ev.overall);
            last = ev.overall;
        }
    }
    let done = c.report(Stage::Completed, 100.0);
    assert_eq!(done.overall, 100.0);
    assert_eq!(done.estimated_remaining, None);
}

#[test]
fn regressions_and_bad_input_are_clamped() {
    let (mut c, _) = composer();
    c.report(Stage::Sampling, 80.0);
    assert_eq!(c.report(Stage::Sampling, 10.0).overall, 57.0);
    assert_eq!(c.report(Stage::Initializing, 0.0).overall, 57.0);

    let (mut c, _) = composer();
    let ev = c.report(Stage::Sampling, 250.0);
    assert_eq!(ev.stage_progress, 100.0);
    assert_eq!(ev.overall, 70.0);
    assert_eq!(c.report(Stage::Converting, f64::NAN).stage_progress, 0.0);
}

#[test]
fn eta_extrapolates_elapsed_time() {
    let (mut c, clock) = composer();
    assert_eq!(c.report(Stage::Initializing, 0.0).estimated_remaining, None);

    clock.advance_secs(10.0);
    let ev = c.report(Stage::Sampling, 50.0);
    assert_eq!(ev.elapsed, Duration::from_secs(10));
    let eta = ev.estimated_remaining.unwrap().as_secs_f64();
    assert!((eta - 10.0 * (100.0 / 37.5 - 1.0)).abs() < 1e-6, "{eta}");
}

#[test]
fn events_serialize_as_json() {
    let (mut c, clock) = composer();
    clock.advance_secs(2.0);
    let ev = c.report(Stage::Converting, 0.0);
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v["stage"], "converting");
    assert_eq!(v["overall"], 70.0);
    assert_eq!(v["elapsed_secs"], 2.0);
    assert!(v["estimated_remaining_secs"].is_f64());
}

#[test]
fn eta_is_absent_when_it_overflows() {
    let (mut c, clock) = composer();
    clock.advance_secs(1.0);
    let ev = c.report(Stage::Initializing, 1e-300);
    assert!(ev.overall > 0.0);
    assert_eq!(ev.estimated_remaining, None);

    clock.advance_secs(1.0);
    let ev = c.report(Stage::Sampling, 50.0);
    assert!(ev.estimated_remaining.is_some());
}
