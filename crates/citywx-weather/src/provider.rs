//! Current-weather providers.
//!
//! `OpenWeatherProvider` calls the OpenWeather "current weather" endpoint;
//! `FakeProvider` produces stable pseudo-readings for local runs.

use async_trait::async_trait;
use citywx_core::{ReqwestErrorExt, WeatherError, WeatherResult};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{City, Temperature};

/// Source of live temperature readings
#[async_trait]
pub trait CurrentWeatherProvider: Send + Sync {
    /// # Errors
    /// `ProviderUnavailable` on transport failures, timeouts and non-success
    /// statuses; `ProviderMalformedResponse` when the body has no usable
    /// temperature.
    async fn get_current_temperature(&self, city: &City) -> WeatherResult<Temperature>;
}

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    main: Option<OpenWeatherMain>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: Option<f64>,
}

/// HTTP adapter for the OpenWeather current-weather API
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl OpenWeatherProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> WeatherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::invalid_configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into(),
            api_key: api_key.into(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl CurrentWeatherProvider for OpenWeatherProvider {
    async fn get_current_temperature(&self, city: &City) -> WeatherResult<Temperature> {
        tracing::debug!("Requesting current temperature for {}", city);

        let response = with_retry(&self.retry, || {
            self.client
                .get(&self.base_url)
                .query(&[
                    ("q", city.value()),
                    ("appid", self.api_key.as_str()),
                    ("units", "metric"),
                ])
                .send()
        })
        .await
        .map_err(|e| {
            tracing::error!("Error fetching current temperature for {}: {}", city, e);
            e.into_weather_error()
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Non-200 response from weather API for {}: {}", city, status);
            return Err(WeatherError::provider_unavailable(format!(
                "weather API returned status {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(ReqwestErrorExt::into_weather_error)?;

        let parsed: OpenWeatherResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::provider_malformed(format!("invalid JSON: {}", e)))?;

        let value = parsed
            .main
            .and_then(|m| m.temp)
            .ok_or_else(|| {
                WeatherError::provider_malformed("Temperature not found in provider response.")
            })?;

        Temperature::new(value)
            .map_err(|_| WeatherError::provider_malformed(format!("non-finite temperature {}", value)))
    }
}

/// Offline provider returning a stable reading in [5.0, 30.0] °C per city
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeProvider;

impl FakeProvider {
    pub fn new() -> Self {
        Self
    }

    /// FNV-1a over the city key, mapped onto 50..=300 tenths of a degree.
    fn reading_for(city: &City) -> f64 {
        let hash = city
            .key()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        (50 + hash % 251) as f64 / 10.0
    }
}

#[async_trait]
impl CurrentWeatherProvider for FakeProvider {
    async fn get_current_temperature(&self, city: &City) -> WeatherResult<Temperature> {
        Temperature::new(Self::reading_for(city))
    }
}
