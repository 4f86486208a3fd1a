//! TTL'd candidate cache over a bounded LRU store.
//!
//! One cache instance is shared by every lookup of a session. The clock
//! is injected so expiry is testable without sleeping.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond time source for TTL accounting.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time. The default outside tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Hit/miss counters since construction or the last `clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct Entry {
    values: Vec<String>,
    fetched_at_ms: u64,
}

struct Inner {
    entries: LruCache<String, Entry>,
    ttl_ms: u64,
    stats: CacheStats,
}

/// Shared candidate cache with a single uniform TTL.
pub struct CandidateCache {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl CandidateCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
    pub const DEFAULT_CAPACITY: usize = 256;

    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self::with_clock(ttl, capacity, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("non-zero cache capacity");
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                ttl_ms: duration_ms(ttl),
                stats: CacheStats::default(),
            }),
            clock,
        }
    }

    /// Fresh value for `key`, if any. Expired entries are evicted on
    /// read and count as misses.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let fresh = match inner.entries.get(key) {
            Some(entry) => now.saturating_sub(entry.fetched_at_ms) < inner.ttl_ms,
            None => false,
        };
        if !fresh {
            inner.entries.pop(key);
            inner.stats.misses += 1;
            return None;
        }
        inner.stats.hits += 1;
        inner.entries.get(key).map(|entry| entry.values.clone())
    }

    pub fn insert(&self, key: impl Into<String>, values: Vec<String>) {
        let fetched_at_ms = self.clock.now_ms();
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.put(
            key.into(),
            Entry {
                values,
                fetched_at_ms,
            },
        );
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.clear();
        inner.stats = CacheStats::default();
    }

    /// Change the TTL for subsequent freshness checks. Existing entries
    /// are re-judged against the new value on their next read.
    pub fn set_ttl(&self, ttl: Duration) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.ttl_ms = duration_ms(ttl);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().expect("cache mutex poisoned").stats
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Hand-advanced clock for deterministic expiry tests.
    #[derive(Default)]
    pub struct ManualClock(AtomicU64);

    impl ManualClock {
        pub fn advance(&self, d: Duration) {
            self.0.fetch_add(duration_ms(d), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = CandidateCache::with_clock(Duration::from_secs(30), 16, clock.clone());
        cache.insert("metrics", vec!["a".into()]);

        clock.advance(Duration::from_secs(29));
        assert_eq!(cache.get("metrics"), Some(vec!["a".to_string()]));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("metrics"), None);
    }

    #[test]
    fn set_ttl_applies_to_existing_entries() {
        let clock = Arc::new(ManualClock::default());
        let cache = CandidateCache::with_clock(Duration::from_secs(30), 16, clock.clone());
        cache.insert("k", vec!["v".into()]);
        clock.advance(Duration::from_secs(10));

        cache.set_ttl(Duration::from_secs(5));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn clear_drops_entries_and_stats() {
        let cache = CandidateCache::new(Duration::from_secs(30), 16);
        cache.insert("k", vec!["v".into()]);
        let _ = cache.get("k");
        cache.clear();
        assert_eq!(cache.get("k"), None);
        // The post-clear read above is the only recorded event.
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 1 });
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = CandidateCache::new(Duration::from_secs(30), 16);
        assert_eq!(cache.get("k"), None);
        cache.insert("k", vec!["v".into()]);
        let _ = cache.get("k");
        let _ = cache.get("k");
        assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 1 });
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = CandidateCache::new(Duration::from_secs(30), 2);
        cache.insert("a", vec!["1".into()]);
        cache.insert("b", vec!["2".into()]);
        let _ = cache.get("a");
        cache.insert("c", vec!["3".into()]);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }
}
