//! Trend analysis: compare a current reading against the mean of recent history.

use citywx_core::{WeatherError, WeatherResult};

use crate::types::{Measurement, Temperature, Trend, TrendAnalysis, TrendDirection};

/// Default magnitude below which a delta is reported as stable
pub const DEFAULT_STABLE_THRESHOLD_CELSIUS: f64 = 0.3;

/// Computes an average and a trend from a current reading and its history.
///
/// Callers pass history oldest-first; implementations must not depend on
/// that order for the result.
pub trait TrendAnalyzer: Send + Sync {
    fn analyze(&self, current: Temperature, history: &[Measurement]) -> TrendAnalysis;
}

/// Arithmetic mean with a configurable stable band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleTrendAnalyzer {
    stable_threshold_celsius: f64,
}

impl SimpleTrendAnalyzer {
    /// # Errors
    /// Returns `WeatherError::InvalidConfiguration` if the threshold is
    /// negative or not finite.
    pub fn new(stable_threshold_celsius: f64) -> WeatherResult<Self> {
        if !stable_threshold_celsius.is_finite() || stable_threshold_celsius < 0.0 {
            return Err(WeatherError::invalid_configuration(format!(
                "Stable threshold cannot be negative (got {})",
                stable_threshold_celsius
            )));
        }
        Ok(Self {
            stable_threshold_celsius,
        })
    }

    pub fn stable_threshold_celsius(&self) -> f64 {
        self.stable_threshold_celsius
    }

    fn classify(&self, delta: f64) -> TrendDirection {
        // A zero delta is stable even when the threshold is zero.
        if delta.abs() < self.stable_threshold_celsius || delta == 0.0 {
            TrendDirection::Stable
        } else if delta > 0.0 {
            TrendDirection::Hotter
        } else {
            TrendDirection::Colder
        }
    }
}

/// Clamp an overflowed result to the largest finite value of the same sign.
fn saturate(value: f64) -> f64 {
    value.clamp(f64::MIN, f64::MAX)
}

impl Default for SimpleTrendAnalyzer {
    fn default() -> Self {
        Self {
            stable_threshold_celsius: DEFAULT_STABLE_THRESHOLD_CELSIUS,
        }
    }
}

impl TrendAnalyzer for SimpleTrendAnalyzer {
    fn analyze(&self, current: Temperature, history: &[Measurement]) -> TrendAnalysis {
        if history.is_empty() {
            return TrendAnalysis::new(Trend::stable(), None);
        }

        // Dividing before summing keeps the mean finite for any finite readings.
        let n = history.len() as f64;
        let mean: f64 = history.iter().map(|m| m.temperature().value() / n).sum();

        let Ok(average) = Temperature::new(saturate(mean)) else {
            // NaN cannot come out of finite readings.
            return TrendAnalysis::new(Trend::stable(), Some(current));
        };

        let delta = saturate(current.difference(&average));
        let trend = Trend::classified(self.classify(delta), delta);

        TrendAnalysis::new(trend, Some(average))
    }
}
