use std::time::{Duration, Instant};

/// Result of asking the throttle whether a render tick may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickDecision {
    /// Run a sampling pass now.
    Render,
    /// Too early; try again after `retry_in`.
    Skip {
        /// Time left until the throttle window closes.
        retry_in: Duration,
    },
}

/// Caps redraw frequency at a sample rate.
///
/// Only decides whether a tick renders. Elapsed-time accumulation never goes through here, so a
/// throttled session still advances by the full wall-clock delta on its next pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderThrottle {
    last_render: Option<Instant>,
}

impl RenderThrottle {
    /// Decide whether a tick at `now` renders, recording it when it does.
    ///
    /// `sample_rate_hz <= 0` disables throttling.
    pub fn admit(&mut self, now: Instant, sample_rate_hz: f64) -> TickDecision {
        if let (Some(interval), Some(last)) = (min_interval(sample_rate_hz), self.last_render) {
            let since = now.saturating_duration_since(last);
            if since < interval {
                return TickDecision::Skip {
                    retry_in: interval - since,
                };
            }
        }
        self.last_render = Some(now);
        TickDecision::Render
    }

    /// Instant of the last admitted tick.
    pub fn last_render(&self) -> Option<Instant> {
        self.last_render
    }

    /// Forget the last admitted tick.
    pub fn reset(&mut self) {
        self.last_render = None;
    }
}

fn min_interval(sample_rate_hz: f64) -> Option<Duration> {
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / sample_rate_hz).ok()
}

#[cfg(test)]
#[path = "../../tests/unit/playback/throttle.rs"]
mod tests;
