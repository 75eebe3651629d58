use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::foundation::clock::Clock;

/// Phase of an export job, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Opening and validating the clip.
    Initializing,
    /// Writing frames.
    Sampling,
    /// Handing frames to an external converter.
    Converting,
    /// Removing intermediate files.
    Cleanup,
    /// Done.
    Completed,
}

impl Stage {
    /// Every stage that carries weight, in order.
    pub const WEIGHTED: [Stage; 4] = [
        Stage::Initializing,
        Stage::Sampling,
        Stage::Converting,
        Stage::Cleanup,
    ];

    /// Share of the overall percentage owned by this stage.
    pub fn weight(self) -> f64 {
        match self {
            Stage::Initializing => 5.0,
            Stage::Sampling => 65.0,
            Stage::Converting => 25.0,
            Stage::Cleanup => 5.0,
            Stage::Completed => 0.0,
        }
    }

    /// Sum of the weights of all stages before this one.
    pub fn base(self) -> f64 {
        Self::WEIGHTED
            .iter()
            .take_while(|s| **s < self)
            .map(|s| s.weight())
            .sum()
    }
}

/// One progress event.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StageProgress {
    /// Current stage.
    pub stage: Stage,
    /// Progress within `stage`, `0..=100`.
    pub stage_progress: f64,
    /// Weighted progress of the whole run, `0..=100`, never decreasing.
    pub overall: f64,
    /// Time since the composer was created.
    #[serde(rename = "elapsed_secs", serialize_with = "ser_secs")]
    pub elapsed: Duration,
    /// Extrapolated time left; absent at 0%, at 100% and when it does not fit a `Duration`.
    #[serde(rename = "estimated_remaining_secs", serialize_with = "ser_opt_secs")]
    pub estimated_remaining: Option<Duration>,
}

fn ser_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn ser_opt_secs<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&d.as_secs_f64()),
        None => s.serialize_none(),
    }
}

/// Folds per-stage percentages into one monotonic overall percentage with an ETA.
pub struct ProgressComposer {
    clock: Arc<dyn Clock>,
    started_at: Instant,
    high_water: f64,
}

impl ProgressComposer {
    /// Start timing now.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self {
            clock,
            started_at,
            high_water: 0.0,
        }
    }

    /// Highest overall percentage reported so far.
    pub fn overall(&self) -> f64 {
        self.high_water
    }

    /// Compose the event for `stage` at `stage_progress` percent.
    ///
    /// Out-of-range and NaN inputs are clamped. A report lower than an earlier one keeps the
    /// earlier overall value.
    pub fn report(&mut self, stage: Stage, stage_progress: f64) -> StageProgress {
        let stage_progress = if stage_progress.is_nan() {
            0.0
        } else {
            stage_progress.clamp(0.0, 100.0)
        };
        let raw = match stage {
            Stage::Completed => 100.0,
            s => s.base() + s.weight() * stage_progress / 100.0,
        };
        self.high_water = self.high_water.max(raw.clamp(0.0, 100.0));
        let overall = self.high_water;

        let elapsed = self.clock.now().saturating_duration_since(self.started_at);
        let estimated_remaining = if overall > 0.0 && overall < 100.0 {
            Duration::try_from_secs_f64(elapsed.as_secs_f64() * (100.0 / overall - 1.0)).ok()
        } else {
            None
        };

        StageProgress {
            stage,
            stage_progress,
            overall,
            elapsed,
            estimated_remaining,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/progress/composer.rs"]
mod tests;
