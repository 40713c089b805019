//! End-to-end tests: OpenWeather adapter (against wiremock), SQLite history
//! and SQLite summary cache on a temporary directory.

use std::sync::Arc;
use std::time::Duration;

use citywx_services::{
    seed_sample_history, CachedSummaryService, HistoryStore, ImportService, MeasurementImporter,
    SqliteHistoryStore, SqliteSummaryCache, SummaryService, WeatherSummaryService, SAMPLE_HISTORY,
};
use citywx_weather::{City, OpenWeatherProvider, RetryConfig, SimpleTrendAnalyzer, TrendDirection};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_reading(server: &MockServer, city: &str, celsius: f64, times: u64) {
    Mock::given(method("GET"))
        .and(query_param("q", city))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": city,
            "main": {"temp": celsius}
        })))
        .expect(times)
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> Arc<OpenWeatherProvider> {
    Arc::new(
        OpenWeatherProvider::new(server.uri(), "test-key", Duration::from_secs(2))
            .unwrap()
            .with_retry(RetryConfig::none()),
    )
}

#[tokio::test]
async fn test_seeded_history_drives_summary() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteHistoryStore::new(dir.path().join("weather.db")).unwrap());
    let sofia = City::new("Sofia").unwrap();
    seed_sample_history(store.as_ref(), &sofia).unwrap();

    let server = MockServer::start().await;
    mock_reading(&server, "sofia", 15.0, 1).await;

    let service = SummaryService::new(
        provider(&server),
        store,
        Arc::new(SimpleTrendAnalyzer::default()),
    );
    let summary = service.get_summary_for_city("sofia").await.unwrap();

    let expected_mean =
        SAMPLE_HISTORY.iter().map(|(_, t)| t).sum::<f64>() / SAMPLE_HISTORY.len() as f64;
    assert!((summary.average().unwrap().value() - expected_mean).abs() < 1e-9);
    assert_eq!(summary.trend().direction(), TrendDirection::Hotter);

    let view = serde_json::to_value(summary.to_view()).unwrap();
    assert_eq!(view["city"], "sofia");
    assert_eq!(view["trend"]["direction"], "hotter");
}

#[tokio::test]
async fn test_import_then_reopen_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weather.db");

    let server = MockServer::start().await;
    mock_reading(&server, "Varna", 21.5, 1).await;

    let imported = {
        let store = Arc::new(SqliteHistoryStore::new(&path).unwrap());
        ImportService::new(provider(&server), store)
            .import_for_city("Varna")
            .await
            .unwrap()
    };
    assert_eq!(imported.id(), None);

    let reopened = SqliteHistoryStore::new(&path).unwrap();
    let history = reopened
        .find_measurements_for_last_n_days(&City::new("VARNA").unwrap(), 10)
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].id().is_some());
    assert_eq!(history[0].measured_at(), imported.measured_at());
    assert_eq!(history[0].temperature().value(), 21.5);
}

#[tokio::test]
async fn test_sqlite_cache_serves_repeat_requests() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteHistoryStore::new(dir.path().join("weather.db")).unwrap());
    let cache = Arc::new(SqliteSummaryCache::new(dir.path().join("cache.db")).unwrap());

    let server = MockServer::start().await;
    mock_reading(&server, "Burgas", 19.0, 1).await;

    let service = CachedSummaryService::new(
        SummaryService::new(
            provider(&server),
            store,
            Arc::new(SimpleTrendAnalyzer::default()),
        ),
        cache,
        60,
    )
    .unwrap();

    let first = service.get_summary_for_city("Burgas").await.unwrap();
    let second = service.get_summary_for_city("burgas").await.unwrap();

    assert_eq!(first, second);
    assert!(first.average().is_none());
    // MockServer verifies the single upstream call on drop.
}

#[tokio::test]
async fn test_upstream_failure_surfaces_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteHistoryStore::new(dir.path().join("weather.db")).unwrap());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = SummaryService::new(
        provider(&server),
        store,
        Arc::new(SimpleTrendAnalyzer::default()),
    )
    .get_summary_for_city("Atlantis")
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.http_status(), 503);
}
