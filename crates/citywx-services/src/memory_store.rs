//! Vector-backed measurement storage for tests and ephemeral runs.

use citywx_core::WeatherResult;
use citywx_weather::{City, Measurement, MeasurementTime};
use parking_lot::RwLock;

use crate::history::{window_start, HistoryStore};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    measurements: Vec<Measurement>,
}

/// In-memory `HistoryStore` with the same window and ordering rules as the
/// SQLite store.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().measurements.is_empty()
    }

    /// Every stored measurement in insertion order
    pub fn all(&self) -> Vec<Measurement> {
        self.inner.read().measurements.clone()
    }

    pub fn find_measurements_since(&self, city: &City, since: MeasurementTime) -> Vec<Measurement> {
        let mut found: Vec<Measurement> = self
            .inner
            .read()
            .measurements
            .iter()
            .filter(|m| m.city() == city && !m.measured_at().is_before(&since))
            .cloned()
            .collect();

        found.sort_by_key(|m| (m.measured_at().unix_seconds(), m.id()));
        found
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn find_measurements_for_last_n_days(
        &self,
        city: &City,
        days: u32,
    ) -> WeatherResult<Vec<Measurement>> {
        Ok(self.find_measurements_since(city, window_start(days)))
    }

    fn save_measurement(&self, measurement: &Measurement) -> WeatherResult<i64> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.measurements.push(Measurement::new(
            Some(id),
            measurement.city().clone(),
            measurement.temperature(),
            measurement.measured_at(),
        ));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use citywx_weather::Temperature;

    fn at_days_ago(city: &str, celsius: f64, days: i64) -> Measurement {
        Measurement::new(
            Some(999),
            City::new(city).unwrap(),
            Temperature::new(celsius).unwrap(),
            MeasurementTime::from_datetime(Utc::now() - Duration::days(days)),
        )
    }

    #[test]
    fn test_save_ignores_incoming_id() {
        let store = InMemoryHistoryStore::new();
        assert_eq!(store.save_measurement(&at_days_ago("Sofia", 10.0, 1)).unwrap(), 1);
        assert_eq!(store.save_measurement(&at_days_ago("Sofia", 11.0, 1)).unwrap(), 2);
        assert_eq!(store.all()[0].id(), Some(1));
    }

    #[test]
    fn test_window_and_ordering() {
        let store = InMemoryHistoryStore::new();
        store.save_measurement(&at_days_ago("Sofia", 1.0, 2)).unwrap();
        store.save_measurement(&at_days_ago("Sofia", 2.0, 12)).unwrap();
        store.save_measurement(&at_days_ago("sofia", 3.0, 5)).unwrap();
        store.save_measurement(&at_days_ago("Plovdiv", 4.0, 1)).unwrap();

        let found = store
            .find_measurements_for_last_n_days(&City::new("SOFIA").unwrap(), 10)
            .unwrap();
        let temps: Vec<f64> = found.iter().map(|m| m.temperature().value()).collect();
        assert_eq!(temps, vec![3.0, 1.0]);
    }

    #[test]
    fn test_unknown_city_is_empty() {
        let store = InMemoryHistoryStore::new();
        let found = store
            .find_measurements_for_last_n_days(&City::new("Ruse").unwrap(), 10)
            .unwrap();
        assert!(found.is_empty());
        assert!(store.is_empty());
    }
}
