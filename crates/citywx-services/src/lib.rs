//! Application services for citywx: history storage, the summary pipeline,
//! ingestion and summary caching.

pub mod cached_summary;
pub mod history;
pub mod history_store;
pub mod import;
pub mod memory_store;
pub mod request;
pub mod summary;
pub mod summary_cache_store;

pub use cached_summary::{
    summary_cache_key, CachedSummary, CachedSummaryService, DEFAULT_SUMMARY_TTL_SECS,
};
pub use history::{seed_sample_history, HistoryStore, SAMPLE_HISTORY};
pub use history_store::SqliteHistoryStore;
pub use import::{ImportFailure, ImportReport, ImportService, MeasurementImporter};
pub use memory_store::InMemoryHistoryStore;
pub use request::{CityQuery, FieldErrors};
pub use summary::{SummaryService, WeatherSummaryService, HISTORY_WINDOW_DAYS};
pub use summary_cache_store::SqliteSummaryCache;
