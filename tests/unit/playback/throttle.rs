use super::*;

#[test]
fn ten_hz_allows_one_pass_per_100ms() {
    let t0 = Instant::now();
    let mut throttle = RenderThrottle::default();
    assert_eq!(throttle.admit(t0, 10.0), TickDecision::Render);
    assert_eq!(
        throttle.admit(t0 + Duration::from_millis(40), 10.0),
        TickDecision::Skip {
            retry_in: Duration::from_millis(60)
        }
    );
    assert_eq!(
        throttle.admit(t0 + Duration::from_millis(100), 10.0),
        TickDecision::Render
    );
    assert_eq!(
        throttle.admit(t0 + Duration::from_millis(250), 10.0),
        TickDecision::Render
    );
    assert_eq!(
        throttle.last_render(),
        Some(t0 + Duration::from_millis(250))
    );
}

#[test]
fn skipped_ticks_do_not_move_the_window() {
    let t0 = Instant::now();
    let mut throttle = RenderThrottle::default();
    throttle.admit(t0, 10.0);
    throttle.admit(t0 + Duration::from_millis(90), 10.0);
    assert_eq!(throttle.last_render(), Some(t0));
}

#[test]
fn zero_rate_never_throttles() {
    let t0 = Instant::now();
    let mut throttle = RenderThrottle::default();
    for _ in 0..3 {
        assert_eq!(throttle.admit(t0, 0.0), TickDecision::Render);
    }
}

#[test]
fn reset_forgets_last_render() {
    let t0 = Instant::now();
    let mut throttle = RenderThrottle::default();
    throttle.admit(t0, 10.0);
    throttle.reset();
    assert_eq!(throttle.admit(t0, 10.0), TickDecision::Render);
}
