//! Ingestion: fetch the current reading for a city and persist it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use citywx_core::{WeatherError, WeatherResult};
use citywx_weather::{City, CurrentWeatherProvider, Measurement, MeasurementTime};

use crate::history::{run_blocking, HistoryStore};

/// Records a fresh measurement for a raw city name.
#[async_trait]
pub trait MeasurementImporter: Send + Sync {
    /// Returns the measurement that was saved. It carries no id; the id
    /// assigned by the store is only logged.
    ///
    /// # Errors
    /// `InvalidInput` for a blank city; provider and store errors unchanged.
    async fn import_for_city(&self, raw_city: &str) -> WeatherResult<Measurement>;
}

/// A city that could not be imported.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    pub city: String,
    pub error: WeatherError,
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported: Vec<Measurement>,
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.imported.len() + self.failed.len()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} imported, {} failed",
            self.imported.len(),
            self.failed.len()
        )
    }
}

#[derive(Clone)]
pub struct ImportService {
    provider: Arc<dyn CurrentWeatherProvider>,
    store: Arc<dyn HistoryStore>,
}

impl ImportService {
    pub fn new(provider: Arc<dyn CurrentWeatherProvider>, store: Arc<dyn HistoryStore>) -> Self {
        Self { provider, store }
    }

    /// Import each city in turn. A failing city is recorded and the batch
    /// continues.
    pub async fn import_many<S: AsRef<str>>(&self, cities: &[S]) -> ImportReport {
        let mut report = ImportReport::default();

        for raw in cities {
            let raw = raw.as_ref();
            match self.import_for_city(raw).await {
                Ok(measurement) => report.imported.push(measurement),
                Err(error) => {
                    tracing::warn!("Import failed for {:?}: {}", raw, error);
                    report.failed.push(ImportFailure {
                        city: raw.trim().to_string(),
                        error,
                    });
                }
            }
        }

        tracing::info!("Batch import finished: {}", report);
        report
    }
}

#[async_trait]
impl MeasurementImporter for ImportService {
    async fn import_for_city(&self, raw_city: &str) -> WeatherResult<Measurement> {
        let city = City::new(raw_city)?;
        let temperature = self.provider.get_current_temperature(&city).await?;
        let measurement = Measurement::new(None, city, temperature, MeasurementTime::now());

        let pending = measurement.clone();
        let id = run_blocking(&self.store, move |store| store.save_measurement(&pending)).await?;

        tracing::info!(
            "Imported measurement {} for {}: {}",
            id,
            measurement.city(),
            measurement.temperature()
        );

        Ok(measurement)
    }
}
