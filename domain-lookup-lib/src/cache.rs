//! Short-lived cache of lookup results.
//!
//! Keyed by normalized domain. A read past the TTL removes the entry and
//! reports a miss. Writes also sweep out every expired entry, at most once
//! per TTL, so domains that are never read again do not pile up.

use crate::types::CanonicalRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Default lifetime of a cached record.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    record: CanonicalRecord,
    inserted_at: Instant,
}

/// Thread-safe TTL cache for canonical records.
///
/// Share it between lookups with an `Arc`. The lock is never held across
/// an `.await`.
#[derive(Debug)]
pub struct ResultCache {
    inner: Mutex<Entries>,
    ttl: Duration,
}

#[derive(Debug)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    last_sweep: Instant,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock cannot leave a half-written entry
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached record, evicting it if it has expired.
    pub fn get(&self, domain: &str) -> Option<CanonicalRecord> {
        let mut entries = self.lock();
        let expired = match entries.map.get(domain) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
        };

        if expired {
            entries.map.remove(domain);
            None
        } else {
            entries.map.get(domain).map(|entry| entry.record.clone())
        }
    }

    /// Store a record, replacing any previous entry.
    pub fn put(&self, domain: &str, record: CanonicalRecord) {
        let mut entries = self.lock();
        let now = Instant::now();

        if now.duration_since(entries.last_sweep) > self.ttl {
            let ttl = self.ttl;
            entries
                .map
                .retain(|_, entry| now.duration_since(entry.inserted_at) <= ttl);
            entries.last_sweep = now;
        }

        entries.map.insert(
            domain.to_string(),
            CacheEntry {
                record,
                inserted_at: now,
            },
        );
    }

    /// Drop one domain's entry. Returns whether it was present.
    pub fn invalidate(&self, domain: &str) -> bool {
        self.lock().map.remove(domain).is_some()
    }

    pub fn clear(&self) {
        self.lock().map.clear();
    }

    /// Number of stored entries, expired ones included until they are
    /// read or swept.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceProtocol;

    fn record(domain: &str) -> CanonicalRecord {
        let mut record = CanonicalRecord::new(domain, SourceProtocol::Rdap, "https://rdap.test");
        record.registrar = Some("Example Registrar".into());
        record
    }

    #[test]
    fn test_put_get_invalidate_clear() {
        let cache = ResultCache::default();
        assert!(cache.is_empty());
        assert!(cache.get("example.com").is_none());

        cache.put("example.com", record("example.com"));
        cache.put("example.org", record("example.org"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("example.com"), Some(record("example.com")));

        assert!(cache.invalidate("example.com"));
        assert!(!cache.invalidate("example.com"));
        assert!(cache.get("example.com").is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.put("example.com", record("example.com"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("example.com").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("example.com").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_unread_expired_entries() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("stale.com", record("stale.com"));
        cache.put("stale.org", record("stale.org"));

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.put("fresh.com", record("fresh.com"));
        assert_eq!(cache.len(), 3);

        tokio::time::advance(Duration::from_secs(45)).await;
        cache.put("fresh.org", record("fresh.org"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("fresh.com").is_some());
        assert!(cache.get("stale.com").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_refreshes_insertion_time() {
        let cache = ResultCache::new(Duration::from_secs(10));
        cache.put("example.com", record("example.com"));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("example.com", record("example.com"));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(cache.get("example.com").is_some());
    }
}
