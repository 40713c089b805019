//! Weather domain for citywx
//!
//! Value types, the trend analyzer, current-weather providers and the
//! summary cache port.

pub mod analyzer;
pub mod cache;
pub mod provider;
pub mod retry;
pub mod types;

pub use analyzer::{SimpleTrendAnalyzer, TrendAnalyzer, DEFAULT_STABLE_THRESHOLD_CELSIUS};
pub use cache::{MemoryCache, SummaryCache};
pub use provider::{CurrentWeatherProvider, FakeProvider, OpenWeatherProvider};
pub use retry::RetryConfig;
pub use types::*;
