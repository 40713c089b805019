//! Key-value cache port used by the summary caching layer.

use citywx_core::CacheError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Byte-oriented cache with per-entry time-to-live.
///
/// Implementations must tolerate concurrent `get`/`set_with_ttl` calls;
/// concurrent writers to one key resolve to last-writer-wins.
pub trait SummaryCache: Send + Sync {
    /// Returns `None` for absent or expired entries.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value`, replacing any previous entry; a TTL of 0 expires immediately.
    fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError>;
}

/// Expiry used when `now + ttl` does not fit in an `Instant` (about a century).
const FAR_FUTURE_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process-local cache. Expired entries are dropped on every write.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) -> usize {
        drop_expired(&mut self.entries.write(), Instant::now())
    }
}

fn drop_expired(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.expires_at > now);
    before - entries.len()
}

impl SummaryCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone()))
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(ttl_secs))
            .or_else(|| now.checked_add(Duration::from_secs(FAR_FUTURE_SECS)))
            .unwrap_or(now);

        let mut entries = self.entries.write();
        drop_expired(&mut entries, now);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }
}
