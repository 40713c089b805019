//! History store trait and shared helpers.
//!
//! This module defines the `HistoryStore` trait that abstracts over the
//! places measurements are persisted (SQLite, in-memory).

use std::sync::Arc;

use citywx_core::{WeatherError, WeatherResult};
use citywx_weather::{City, Measurement, MeasurementTime, Temperature};

/// Sample history inserted by `seed_sample_history`: (days ago, °C).
pub const SAMPLE_HISTORY: [(i64, f64); 5] = [(1, 10.5), (2, 12.2), (3, 8.7), (4, 7.1), (5, 11.3)];

/// Trait for measurement storage backends.
///
/// Implementations are shared across requests and must be `Sync`; SQLite
/// backends serialize access through a mutex.
pub trait HistoryStore: Send + Sync {
    /// Measurements for `city` taken within the last `days` days.
    ///
    /// Returns measurements ordered oldest-first. City matching is
    /// case-insensitive.
    ///
    /// # Errors
    /// Returns `WeatherError::StoreUnavailable` if the backend fails.
    fn find_measurements_for_last_n_days(
        &self,
        city: &City,
        days: u32,
    ) -> WeatherResult<Vec<Measurement>>;

    /// Persist a measurement, ignoring any id it carries.
    ///
    /// Returns the id assigned by the store.
    ///
    /// # Errors
    /// Returns `WeatherError::StoreUnavailable` if the backend fails.
    fn save_measurement(&self, measurement: &Measurement) -> WeatherResult<i64>;
}

/// Start of a `days`-long window ending now.
pub(crate) fn window_start(days: u32) -> MeasurementTime {
    let since = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
    MeasurementTime::from_datetime(since)
}

/// Run a synchronous store operation on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(store: &Arc<dyn HistoryStore>, op: F) -> WeatherResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn HistoryStore) -> WeatherResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| WeatherError::store_unavailable(format!("store task failed: {}", e)))?
}

/// Insert `SAMPLE_HISTORY` for `city`, stamped relative to now.
///
/// # Errors
/// Propagates `StoreUnavailable` from the store.
pub fn seed_sample_history(store: &dyn HistoryStore, city: &City) -> WeatherResult<Vec<Measurement>> {
    let now = chrono::Utc::now();
    let mut seeded = Vec::with_capacity(SAMPLE_HISTORY.len());

    for (days_ago, celsius) in SAMPLE_HISTORY {
        let measured_at = MeasurementTime::from_datetime(now - chrono::Duration::days(days_ago));
        let measurement = Measurement::new(None, city.clone(), Temperature::new(celsius)?, measured_at);
        let id = store.save_measurement(&measurement)?;
        seeded.push(Measurement::new(
            Some(id),
            measurement.city().clone(),
            measurement.temperature(),
            measurement.measured_at(),
        ));
    }

    tracing::info!("Seeded {} sample measurements for {}", seeded.len(), city);
    Ok(seeded)
}
