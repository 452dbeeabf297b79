//! Throttle tuning parameters.

use std::ops::RangeInclusive;
use std::time::Duration;

use thiserror::Error;

/// Default baseline delay mean.
pub const DEFAULT_BASELINE_DELAY: Duration = Duration::from_millis(500);
/// Default minimum delay floor.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(250);
/// Default standard deviation as a fraction of the current mean.
pub const DEFAULT_JITTER_RATIO: f64 = 0.5;
/// Default range the identity rotation threshold is drawn from.
pub const DEFAULT_ROTATION_RANGE: RangeInclusive<u32> = 3..=15;

/// Largest accepted jitter ratio.
const MAX_JITTER_RATIO: f64 = 2.0;
/// Largest accepted rotation threshold.
const MAX_ROTATION_THRESHOLD: u32 = 100;

/// Invalid throttle settings.
#[derive(Debug, Error, PartialEq)]
pub enum ThrottleConfigError {
    /// The minimum delay must be positive.
    #[error("minimum delay must be greater than zero\n  Suggestion: set min_delay_ms to at least 1")]
    ZeroMinDelay,

    /// The baseline must exceed the floor, otherwise sampling cannot terminate sensibly.
    #[error(
        "baseline delay {baseline_ms} ms must be greater than minimum delay {min_ms} ms\n  Suggestion: raise --delay-ms or lower --min-delay-ms"
    )]
    BaselineNotAboveMin {
        /// Baseline in milliseconds.
        baseline_ms: u128,
        /// Floor in milliseconds.
        min_ms: u128,
    },

    /// Jitter ratio outside (0, 2].
    #[error("jitter ratio {ratio} must be in (0, 2]")]
    InvalidJitterRatio {
        /// The rejected ratio.
        ratio: f64,
    },

    /// Rotation range empty or out of bounds.
    #[error("rotation range {min}..={max} must satisfy 1 <= min <= max <= 100")]
    InvalidRotationRange {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
}

/// Validated throttle parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    baseline_delay: Duration,
    min_delay: Duration,
    jitter_ratio: f64,
    rotation_range: RangeInclusive<u32>,
}

impl ThrottleConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleConfigError`] when any parameter is out of range.
    pub fn new(
        baseline_delay: Duration,
        min_delay: Duration,
        jitter_ratio: f64,
        rotation_range: RangeInclusive<u32>,
    ) -> Result<Self, ThrottleConfigError> {
        if min_delay.is_zero() {
            return Err(ThrottleConfigError::ZeroMinDelay);
        }
        if baseline_delay <= min_delay {
            return Err(ThrottleConfigError::BaselineNotAboveMin {
                baseline_ms: baseline_delay.as_millis(),
                min_ms: min_delay.as_millis(),
            });
        }
        if !(jitter_ratio > 0.0 && jitter_ratio <= MAX_JITTER_RATIO) {
            return Err(ThrottleConfigError::InvalidJitterRatio {
                ratio: jitter_ratio,
            });
        }
        let (min, max) = (*rotation_range.start(), *rotation_range.end());
        if min == 0 || min > max || max > MAX_ROTATION_THRESHOLD {
            return Err(ThrottleConfigError::InvalidRotationRange { min, max });
        }
        Ok(Self {
            baseline_delay,
            min_delay,
            jitter_ratio,
            rotation_range,
        })
    }

    /// Mean delay when the provider behaves.
    #[must_use]
    pub fn baseline_delay(&self) -> Duration {
        self.baseline_delay
    }

    /// Floor every sampled delay must exceed.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Standard deviation as a fraction of the mean.
    #[must_use]
    pub fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }

    /// Range identity rotation thresholds are drawn from.
    #[must_use]
    pub fn rotation_range(&self) -> RangeInclusive<u32> {
        self.rotation_range.clone()
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            baseline_delay: DEFAULT_BASELINE_DELAY,
            min_delay: DEFAULT_MIN_DELAY,
            jitter_ratio: DEFAULT_JITTER_RATIO,
            rotation_range: DEFAULT_ROTATION_RANGE,
        }
    }
}
