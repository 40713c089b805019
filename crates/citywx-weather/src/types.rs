use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use citywx_core::{WeatherError, WeatherResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A city name as supplied by the caller, trimmed.
///
/// Equality and hashing ignore case, so `City::new("  Sofia ")` and
/// `City::new("SOFIA")` identify the same place.
#[derive(Debug, Clone)]
pub struct City {
    name: String,
}

impl City {
    pub fn new(raw: &str) -> WeatherResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::invalid_input("City name cannot be empty."));
        }
        Ok(Self {
            name: trimmed.to_string(),
        })
    }

    /// Trimmed name, original casing preserved for display
    pub fn value(&self) -> &str {
        &self.name
    }

    /// Lowercase fold used for lookups and cache keys
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl PartialEq for City {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for City {}

impl Hash for City {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A finite temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f64);

impl Temperature {
    pub fn new(celsius: f64) -> WeatherResult<Self> {
        if !celsius.is_finite() {
            return Err(WeatherError::invalid_input(
                "Temperature must be a finite numeric value.",
            ));
        }
        Ok(Self(celsius))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// `self - other` in degrees Celsius
    pub fn difference(&self, other: &Temperature) -> f64 {
        self.0 - other.0
    }

    pub fn is_above(&self, other: &Temperature) -> bool {
        self.0 > other.0
    }

    pub fn is_below(&self, other: &Temperature) -> bool {
        self.0 < other.0
    }

    pub fn approx_eq(&self, other: &Temperature, epsilon: f64) -> bool {
        self.difference(other).abs() < epsilon
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.0)
    }
}

/// When a measurement was taken, with second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeasurementTime(DateTime<Utc>);

impl MeasurementTime {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Sub-second precision is dropped.
    pub fn from_datetime<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
        let at = at.with_timezone(&Utc);
        let truncated = Utc
            .timestamp_opt(at.timestamp(), 0)
            .single()
            .unwrap_or(at);
        Self(truncated)
    }

    pub fn from_unix_seconds(seconds: i64) -> WeatherResult<Self> {
        Utc.timestamp_opt(seconds, 0)
            .single()
            .map(Self)
            .ok_or_else(|| {
                WeatherError::invalid_input(format!("Timestamp out of range: {}", seconds))
            })
    }

    /// Parse an RFC 3339 / ISO-8601 timestamp
    pub fn parse(value: &str) -> WeatherResult<Self> {
        DateTime::parse_from_rfc3339(value)
            .map(Self::from_datetime)
            .map_err(|e| WeatherError::invalid_input(format!("Invalid timestamp '{}': {}", value, e)))
    }

    pub fn value(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn is_before(&self, other: &MeasurementTime) -> bool {
        self.0 < other.0
    }

    pub fn is_after(&self, other: &MeasurementTime) -> bool {
        self.0 > other.0
    }
}

impl fmt::Display for MeasurementTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, false))
    }
}

/// One historical temperature sample for a city
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    id: Option<i64>,
    city: City,
    temperature: Temperature,
    measured_at: MeasurementTime,
}

impl Measurement {
    pub fn new(
        id: Option<i64>,
        city: City,
        temperature: Temperature,
        measured_at: MeasurementTime,
    ) -> Self {
        Self {
            id,
            city,
            temperature,
            measured_at,
        }
    }

    /// Storage identity; `None` until persisted
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    pub fn measured_at(&self) -> MeasurementTime {
        self.measured_at
    }
}

/// Qualitative direction of a trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Hotter,
    Colder,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotter => "hotter",
            Self::Colder => "colder",
            Self::Stable => "stable",
        }
    }

    pub fn parse(value: &str) -> WeatherResult<Self> {
        match value {
            "hotter" => Ok(Self::Hotter),
            "colder" => Ok(Self::Colder),
            "stable" => Ok(Self::Stable),
            other => Err(WeatherError::invalid_input(format!(
                "Invalid trend direction: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction plus signed delta (current minus baseline) in Celsius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    direction: TrendDirection,
    delta: f64,
}

impl Trend {
    /// # Errors
    /// `InvalidInput` if `delta` is not finite, or if its sign contradicts
    /// `direction` (hotter needs a positive delta, colder a negative one).
    pub fn new(direction: TrendDirection, delta: f64) -> WeatherResult<Self> {
        if !delta.is_finite() {
            return Err(WeatherError::invalid_input("Delta must be a finite numeric value."));
        }
        let consistent = match direction {
            TrendDirection::Hotter => delta > 0.0,
            TrendDirection::Colder => delta < 0.0,
            TrendDirection::Stable => true,
        };
        if !consistent {
            return Err(WeatherError::invalid_input(format!(
                "A {} trend cannot have a delta of {}",
                direction, delta
            )));
        }
        Ok(Self { direction, delta })
    }

    /// For callers whose classification already matches the sign of a
    /// finite `delta`.
    pub(crate) fn classified(direction: TrendDirection, delta: f64) -> Self {
        debug_assert!(Self::new(direction, delta).is_ok());
        Self { direction, delta }
    }

    pub fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            delta: 0.0,
        }
    }

    pub fn direction(&self) -> TrendDirection {
        self.direction
    }

    /// Positive means hotter than the baseline, negative colder
    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn is_hotter(&self) -> bool {
        self.direction == TrendDirection::Hotter
    }

    pub fn is_colder(&self) -> bool {
        self.direction == TrendDirection::Colder
    }

    pub fn is_stable(&self) -> bool {
        self.direction == TrendDirection::Stable
    }

    /// Human-friendly label, e.g. "hotter by 8.0°C" or "stable"
    pub fn label(&self) -> String {
        match self.direction {
            TrendDirection::Stable => "stable".to_string(),
            direction => format!("{} by {:.1}°C", direction, self.delta.abs()),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Outcome of comparing a current reading against history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAnalysis {
    trend: Trend,
    average: Option<Temperature>,
}

impl TrendAnalysis {
    pub fn new(trend: Trend, average: Option<Temperature>) -> Self {
        Self { trend, average }
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn average(&self) -> Option<Temperature> {
        self.average
    }

    pub fn has_average(&self) -> bool {
        self.average.is_some()
    }
}

/// Aggregated weather state for a city
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    city: City,
    current: Temperature,
    average: Option<Temperature>,
    trend: Trend,
}

impl WeatherSummary {
    pub fn new(city: City, current: Temperature, average: Option<Temperature>, trend: Trend) -> Self {
        Self {
            city,
            current,
            average,
            trend,
        }
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn current(&self) -> Temperature {
        self.current
    }

    pub fn average(&self) -> Option<Temperature> {
        self.average
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn has_average(&self) -> bool {
        self.average.is_some()
    }

    pub fn is_stable(&self) -> bool {
        self.trend.is_stable()
    }

    pub fn to_view(&self) -> WeatherSummaryView {
        WeatherSummaryView::from(self)
    }
}

/// JSON projection of a summary for inbound adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummaryView {
    pub city: String,
    pub current: f64,
    pub average: Option<f64>,
    pub trend: TrendView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendView {
    pub direction: TrendDirection,
    pub delta: f64,
    pub label: String,
}

impl From<&WeatherSummary> for WeatherSummaryView {
    fn from(summary: &WeatherSummary) -> Self {
        let trend = summary.trend();
        Self {
            city: summary.city().value().to_string(),
            current: summary.current().value(),
            average: summary.average().map(|t| t.value()),
            trend: TrendView {
                direction: trend.direction(),
                delta: trend.delta(),
                label: trend.label(),
            },
        }
    }
}
