//! Caching layer in front of any `WeatherSummaryService`.
//!
//! The cache is best-effort: read and write failures, as well as entries
//! that no longer decode, are logged and the inner service is consulted.

use std::sync::Arc;

use async_trait::async_trait;
use citywx_core::{CacheError, WeatherError, WeatherResult};
use citywx_weather::{City, SummaryCache, Temperature, Trend, TrendDirection, WeatherSummary};
use serde::{Deserialize, Serialize};

use crate::summary::WeatherSummaryService;

/// Default lifetime of a cached summary.
pub const DEFAULT_SUMMARY_TTL_SECS: u64 = 300;

const KEY_PREFIX: &str = "weather:summary:";

/// Serialized form of a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSummary {
    pub city: String,
    pub current: f64,
    pub average: Option<f64>,
    pub trend_direction: TrendDirection,
    pub trend_delta: f64,
}

impl From<&WeatherSummary> for CachedSummary {
    fn from(summary: &WeatherSummary) -> Self {
        Self {
            city: summary.city().value().to_string(),
            current: summary.current().value(),
            average: summary.average().map(|t| t.value()),
            trend_direction: summary.trend().direction(),
            trend_delta: summary.trend().delta(),
        }
    }
}

impl CachedSummary {
    /// Rebuild the domain summary, re-checking every value invariant.
    pub fn into_summary(self) -> WeatherResult<WeatherSummary> {
        let average = self.average.map(Temperature::new).transpose()?;
        Ok(WeatherSummary::new(
            City::new(&self.city)?,
            Temperature::new(self.current)?,
            average,
            Trend::new(self.trend_direction, self.trend_delta)?,
        ))
    }
}

/// Cache key for a city: prefix plus the trimmed, lowercased name.
pub fn summary_cache_key(city: &City) -> String {
    format!("{}{}", KEY_PREFIX, city.key())
}

/// Decorator adding a TTL cache to a summary service.
pub struct CachedSummaryService<S> {
    inner: S,
    cache: Arc<dyn SummaryCache>,
    ttl_secs: u64,
}

impl<S: WeatherSummaryService> CachedSummaryService<S> {
    /// # Errors
    /// `InvalidConfiguration` if `ttl_secs` is zero.
    pub fn new(inner: S, cache: Arc<dyn SummaryCache>, ttl_secs: u64) -> WeatherResult<Self> {
        if ttl_secs == 0 {
            return Err(WeatherError::invalid_configuration(
                "Cache TTL must be positive",
            ));
        }
        Ok(Self {
            inner,
            cache,
            ttl_secs,
        })
    }

    pub fn with_default_ttl(inner: S, cache: Arc<dyn SummaryCache>) -> Self {
        Self {
            inner,
            cache,
            ttl_secs: DEFAULT_SUMMARY_TTL_SECS,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn cache_call<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SummaryCache) -> Result<T, CacheError> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || op(cache.as_ref()))
            .await
            .map_err(|e| CacheError::Unavailable(format!("cache task failed: {}", e)))?
    }

    async fn lookup(&self, key: &str) -> Option<WeatherSummary> {
        let owned = key.to_string();
        let bytes = match self.cache_call(move |cache| cache.get(&owned)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!("Summary cache miss for {}", key);
                return None;
            }
            Err(e) => {
                tracing::warn!("Summary cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let decoded = serde_json::from_slice::<CachedSummary>(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|cached| cached.into_summary().map_err(|e| e.to_string()));

        match decoded {
            Ok(summary) => {
                tracing::debug!("Summary cache hit for {}", key);
                Some(summary)
            }
            Err(e) => {
                tracing::warn!("Ignoring undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: String, summary: &WeatherSummary) {
        let bytes = match serde_json::to_vec(&CachedSummary::from(summary)) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not encode summary for {}: {}", key, e);
                return;
            }
        };

        let ttl = self.ttl_secs;
        let log_key = key.clone();
        match self
            .cache_call(move |cache| cache.set_with_ttl(&key, &bytes, ttl))
            .await
        {
            Ok(()) => tracing::info!("Cached summary {} for {}s", log_key, ttl),
            Err(e) => tracing::warn!("Summary cache write failed for {}: {}", log_key, e),
        }
    }
}

#[async_trait]
impl<S: WeatherSummaryService> WeatherSummaryService for CachedSummaryService<S> {
    async fn get_summary_for_city(&self, raw_city: &str) -> WeatherResult<WeatherSummary> {
        let city = City::new(raw_city)?;
        let key = summary_cache_key(&city);

        if let Some(summary) = self.lookup(&key).await {
            return Ok(summary);
        }

        let summary = self.inner.get_summary_for_city(raw_city).await?;
        self.store(key, &summary).await;
        Ok(summary)
    }
}
