use crate::foundation::error::{VanimError, VanimResult};
use std::str::FromStr;

pub use kurbo::{Affine, Rect};

/// 0-based index of an output frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> VanimResult<Self> {
        if den == 0 {
            return Err(VanimError::validation("fps den must be > 0"));
        }
        if num == 0 {
            return Err(VanimError::validation("fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Output time of frame `idx`, i.e. `idx / fps`.
    pub fn frame_to_secs(self, idx: FrameIndex) -> f64 {
        (idx.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }
}

impl FromStr for Fps {
    type Err = VanimError;

    /// Accepts `"30"` or `"30000/1001"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s, "1"),
        };
        let num: u32 = num
            .parse()
            .map_err(|_| VanimError::validation(format!("invalid fps '{s}'")))?;
        let den: u32 = den
            .parse()
            .map_err(|_| VanimError::validation(format!("invalid fps '{s}'")))?;
        Self::new(num, den)
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Construct a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Full-surface rectangle `(0, 0, width, height)`.
    pub fn to_rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Number of full loops to play before stopping on the last frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "LoopTargetRepr", into = "LoopTargetRepr")]
pub enum LoopTarget {
    /// Stop once this many loops completed. `Count(0)` behaves like `Count(1)`.
    Count(u32),
    /// Never stop because of looping.
    #[default]
    Infinite,
}

impl LoopTarget {
    /// Return `true` when `loops_completed` reaches a finite target.
    ///
    /// Nothing is reached before the first loop completes.
    pub fn is_reached(self, loops_completed: u64) -> bool {
        match self {
            Self::Infinite => false,
            Self::Count(n) => loops_completed > 0 && loops_completed >= u64::from(n),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum LoopTargetRepr {
    Count(u32),
    Keyword(String),
}

impl TryFrom<LoopTargetRepr> for LoopTarget {
    type Error = String;

    fn try_from(value: LoopTargetRepr) -> Result<Self, Self::Error> {
        match value {
            LoopTargetRepr::Count(n) => Ok(Self::Count(n)),
            LoopTargetRepr::Keyword(k) => k.parse().map_err(|e: VanimError| e.to_string()),
        }
    }
}

impl From<LoopTarget> for LoopTargetRepr {
    fn from(value: LoopTarget) -> Self {
        match value {
            LoopTarget::Count(n) => Self::Count(n),
            LoopTarget::Infinite => Self::Keyword("infinite".to_owned()),
        }
    }
}

impl FromStr for LoopTarget {
    type Err = VanimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("infinite") || s.eq_ignore_ascii_case("forever") {
            return Ok(Self::Infinite);
        }
        s.parse::<u32>()
            .map(Self::Count)
            .map_err(|_| VanimError::validation(format!("invalid loop target '{s}'")))
    }
}

/// How a clip is scaled into the target surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Natural size, centred.
    None,
    /// Stretch both axes independently to cover the target.
    Fill,
    /// Largest uniform scale that fits inside the target.
    #[default]
    Uniform,
    /// Smallest uniform scale that covers the target.
    UniformToFill,
}

impl FromStr for FillMode {
    type Err = VanimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" => Ok(Self::None),
            "fill" => Ok(Self::Fill),
            "uniform" => Ok(Self::Uniform),
            "uniform_to_fill" | "uniformtofill" => Ok(Self::UniformToFill),
            other => Err(VanimError::validation(format!("unknown fill mode '{other}'"))),
        }
    }
}

/// Restricts the scale chosen by [`FillMode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StretchDirection {
    /// Only enlarge.
    UpOnly,
    /// Only shrink.
    DownOnly,
    /// Either way.
    #[default]
    Both,
}

impl FromStr for StretchDirection {
    type Err = VanimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "up_only" | "uponly" | "up" => Ok(Self::UpOnly),
            "down_only" | "downonly" | "down" => Ok(Self::DownOnly),
            "both" => Ok(Self::Both),
            other => Err(VanimError::validation(format!(
                "unknown stretch direction '{other}'"
            ))),
        }
    }
}

/// Validate a playback speed multiplier.
pub fn validate_speed(speed: f64) -> VanimResult<f64> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(VanimError::validation(format!(
            "speed must be finite and > 0, got {speed}"
        )));
    }
    Ok(speed)
}

/// Validate a render sample rate. `0` disables throttling.
pub fn validate_sample_rate(hz: f64) -> VanimResult<f64> {
    if !hz.is_finite() || hz < 0.0 {
        return Err(VanimError::validation(format!(
            "sample rate must be finite and >= 0, got {hz}"
        )));
    }
    Ok(hz)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
