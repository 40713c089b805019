//! SQLite-backed summary cache that survives process restarts.

use std::path::Path;

use citywx_core::{CacheError, RusqliteErrorExt};
use citywx_weather::SummaryCache;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

/// Persistent `SummaryCache`.
///
/// Expiry is stored as unix milliseconds. Expired rows are never returned
/// and are deleted when the cache is opened.
pub struct SqliteSummaryCache {
    conn: Mutex<Connection>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SqliteSummaryCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_cache_error)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_cache_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS summary_cache (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .map_err(RusqliteErrorExt::into_cache_error)?;

        let cache = Self {
            conn: Mutex::new(conn),
        };
        let purged = cache.purge_expired()?;
        if purged > 0 {
            tracing::debug!("Purged {} expired summary cache rows", purged);
        }
        Ok(cache)
    }

    /// Delete expired rows, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        self.conn
            .lock()
            .execute(
                "DELETE FROM summary_cache WHERE expires_at <= ?1",
                params![now_millis()],
            )
            .map_err(RusqliteErrorExt::into_cache_error)
    }
}

impl SummaryCache for SqliteSummaryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.conn
            .lock()
            .query_row(
                "SELECT value FROM summary_cache WHERE key = ?1 AND expires_at > ?2",
                params![key, now_millis()],
                |row| row.get(0),
            )
            .optional()
            .map_err(RusqliteErrorExt::into_cache_error)
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        let ttl_millis = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_millis);

        self.conn
            .lock()
            .execute(
                "INSERT INTO summary_cache (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![key, value, expires_at],
            )
            .map_err(RusqliteErrorExt::into_cache_error)?;
        Ok(())
    }
}
