//! Weather summary orchestration.
//!
//! `SummaryService` combines a live reading with recent history and runs
//! the trend analyzer over them. It holds no state between calls.

use std::sync::Arc;

use async_trait::async_trait;
use citywx_core::WeatherResult;
use citywx_weather::{City, CurrentWeatherProvider, TrendAnalyzer, WeatherSummary};

use crate::history::{run_blocking, HistoryStore};

/// Days of history considered when computing the average.
pub const HISTORY_WINDOW_DAYS: u32 = 10;

/// Produces a `WeatherSummary` for a raw city name.
#[async_trait]
pub trait WeatherSummaryService: Send + Sync {
    /// # Errors
    /// `InvalidInput` for a blank city. Provider and store failures are
    /// returned unchanged.
    async fn get_summary_for_city(&self, raw_city: &str) -> WeatherResult<WeatherSummary>;
}

#[async_trait]
impl<S: WeatherSummaryService + ?Sized> WeatherSummaryService for Arc<S> {
    async fn get_summary_for_city(&self, raw_city: &str) -> WeatherResult<WeatherSummary> {
        (**self).get_summary_for_city(raw_city).await
    }
}

/// Provider + history store + analyzer.
#[derive(Clone)]
pub struct SummaryService {
    provider: Arc<dyn CurrentWeatherProvider>,
    store: Arc<dyn HistoryStore>,
    analyzer: Arc<dyn TrendAnalyzer>,
}

impl SummaryService {
    pub fn new(
        provider: Arc<dyn CurrentWeatherProvider>,
        store: Arc<dyn HistoryStore>,
        analyzer: Arc<dyn TrendAnalyzer>,
    ) -> Self {
        Self {
            provider,
            store,
            analyzer,
        }
    }
}

#[async_trait]
impl WeatherSummaryService for SummaryService {
    async fn get_summary_for_city(&self, raw_city: &str) -> WeatherResult<WeatherSummary> {
        let city = City::new(raw_city)?;

        let current = self.provider.get_current_temperature(&city).await?;

        let lookup = city.clone();
        let history = run_blocking(&self.store, move |store| {
            store.find_measurements_for_last_n_days(&lookup, HISTORY_WINDOW_DAYS)
        })
        .await?;

        let analysis = self.analyzer.analyze(current, &history);
        tracing::debug!(
            "Summary for {}: current {}, {} historical samples, trend {}",
            city,
            current,
            history.len(),
            analysis.trend()
        );

        Ok(WeatherSummary::new(
            city,
            current,
            analysis.average(),
            analysis.trend(),
        ))
    }
}
