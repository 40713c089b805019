//! SQLite-based measurement storage.
//!
//! This module provides `SqliteHistoryStore`, a local SQLite implementation
//! of the `HistoryStore` trait.

use std::path::Path;

use citywx_core::{RusqliteErrorExt, WeatherError, WeatherResult};
use citywx_weather::{City, Measurement, MeasurementTime, Temperature};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::history::{window_start, HistoryStore};

/// SQLite-based measurement storage.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

/// Raw row: id, city_name, temperature_celsius, measured_at
type MeasurementRow = (i64, String, f64, i64);

impl SqliteHistoryStore {
    /// Open a store at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn new<P: AsRef<Path>>(path: P) -> WeatherResult<Self> {
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_store_error)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> WeatherResult<Self> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_store_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> WeatherResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> WeatherResult<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS weather_measurements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    city_name TEXT NOT NULL,
                    city_key TEXT NOT NULL,
                    temperature_celsius REAL NOT NULL,
                    measured_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_measurements_city_time
                    ON weather_measurements(city_key, measured_at);
                "#,
            )
            .map_err(RusqliteErrorExt::into_store_error)
    }

    /// Convert a raw row into a Measurement, rejecting rows that violate
    /// the value-type invariants.
    fn row_to_measurement(row: MeasurementRow) -> WeatherResult<Measurement> {
        let (id, city_name, celsius, measured_at) = row;
        let corrupt = |e: WeatherError| {
            WeatherError::store_unavailable(format!("corrupt measurement row {}: {}", id, e))
        };

        Ok(Measurement::new(
            Some(id),
            City::new(&city_name).map_err(corrupt)?,
            Temperature::new(celsius).map_err(corrupt)?,
            MeasurementTime::from_unix_seconds(measured_at).map_err(corrupt)?,
        ))
    }

    /// Measurements for `city` at or after `since`, oldest first.
    pub fn find_measurements_since(
        &self,
        city: &City,
        since: MeasurementTime,
    ) -> WeatherResult<Vec<Measurement>> {
        let rows: Vec<MeasurementRow> = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, city_name, temperature_celsius, measured_at
                     FROM weather_measurements
                     WHERE city_key = ?1 AND measured_at >= ?2
                     ORDER BY measured_at ASC, id ASC",
                )
                .map_err(RusqliteErrorExt::into_store_error)?;

            let rows = stmt
                .query_map(params![city.key(), since.unix_seconds()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })
                .map_err(RusqliteErrorExt::into_store_error)?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(RusqliteErrorExt::into_store_error)?
        };

        rows.into_iter().map(Self::row_to_measurement).collect()
    }

    /// Get the measurement count.
    pub fn count(&self) -> WeatherResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM weather_measurements", [], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_store_error)?;
        Ok(count as usize)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn find_measurements_for_last_n_days(
        &self,
        city: &City,
        days: u32,
    ) -> WeatherResult<Vec<Measurement>> {
        self.find_measurements_since(city, window_start(days))
    }

    fn save_measurement(&self, measurement: &Measurement) -> WeatherResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO weather_measurements (city_name, city_key, temperature_celsius, measured_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                measurement.city().value(),
                measurement.city().key(),
                measurement.temperature().value(),
                measurement.measured_at().unix_seconds(),
            ],
        )
        .map_err(RusqliteErrorExt::into_store_error)?;

        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn measurement(city: &str, celsius: f64, hours_ago: i64) -> Measurement {
        Measurement::new(
            None,
            City::new(city).unwrap(),
            Temperature::new(celsius).unwrap(),
            MeasurementTime::from_datetime(Utc::now() - Duration::hours(hours_ago)),
        )
    }

    #[test]
    fn test_save_assigns_ids() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let first = store.save_measurement(&measurement("Sofia", 10.0, 1)).unwrap();
        let second = store.save_measurement(&measurement("Sofia", 11.0, 2)).unwrap();
        assert!(second > first);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_find_orders_oldest_first() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store.save_measurement(&measurement("Sofia", 12.0, 2)).unwrap();
        store.save_measurement(&measurement("Sofia", 10.0, 48)).unwrap();
        store.save_measurement(&measurement("Sofia", 11.0, 24)).unwrap();

        let found = store
            .find_measurements_for_last_n_days(&City::new("Sofia").unwrap(), 10)
            .unwrap();

        let temps: Vec<f64> = found.iter().map(|m| m.temperature().value()).collect();
        assert_eq!(temps, vec![10.0, 11.0, 12.0]);
        assert!(found.iter().all(|m| m.id().is_some()));
        assert!(found[0].measured_at().is_before(&found[1].measured_at()));
    }

    #[test]
    fn test_find_excludes_old_measurements() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store.save_measurement(&measurement("Sofia", 30.0, 24 * 11)).unwrap();
        store.save_measurement(&measurement("Sofia", 15.0, 24 * 9)).unwrap();

        let found = store
            .find_measurements_for_last_n_days(&City::new("Sofia").unwrap(), 10)
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].temperature().value(), 15.0);
    }

    #[test]
    fn test_find_matches_city_case_insensitively() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store.save_measurement(&measurement("Sofia", 10.0, 1)).unwrap();
        store.save_measurement(&measurement("Varna", 20.0, 1)).unwrap();

        let found = store
            .find_measurements_for_last_n_days(&City::new("  SOFIA ").unwrap(), 10)
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].city().value(), "Sofia");
    }

    #[test]
    fn test_corrupt_row_reported_as_store_failure() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO weather_measurements (city_name, city_key, temperature_celsius, measured_at)
                 VALUES ('   ', 'sofia', 10.0, ?1)",
                params![Utc::now().timestamp()],
            )
            .unwrap();

        let result = store.find_measurements_for_last_n_days(&City::new("Sofia").unwrap(), 10);
        assert!(matches!(result, Err(WeatherError::StoreUnavailable(_))));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");

        {
            let store = SqliteHistoryStore::new(&path).unwrap();
            store.save_measurement(&measurement("Burgas", 18.5, 3)).unwrap();
        }

        let store = SqliteHistoryStore::new(&path).unwrap();
        let found = store
            .find_measurements_for_last_n_days(&City::new("burgas").unwrap(), 10)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].temperature().value(), 18.5);
    }
}
