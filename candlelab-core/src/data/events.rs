//! Cache events and the observer hook.
//!
//! Store operations never call observers directly: they queue events under
//! the cache lock, and a drain step dispatches the queue under the separate
//! notification lock. That split is what makes it safe for an observer to
//! turn around and query the store.

use std::sync::atomic::{AtomicU64, Ordering};

/// What happened in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// A lookup was served from the cache.
    Hit,
    /// A lookup had to load from disk.
    Miss,
    /// An entry was removed under memory or capacity pressure.
    Evict,
    /// A frame could not be admitted after the eviction rounds; it was
    /// returned to the caller uncached.
    OverCapacity,
}

impl CacheEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEventKind::Hit => "hit",
            CacheEventKind::Miss => "miss",
            CacheEventKind::Evict => "evict",
            CacheEventKind::OverCapacity => "over_capacity",
        }
    }
}

/// A cache event with the key it concerns and the frame's byte estimate
/// (0 where no frame is involved).
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub kind: CacheEventKind,
    pub key: String,
    pub bytes: usize,
}

/// Sink for cache events.
///
/// Dispatch happens synchronously on whichever thread triggered the drain,
/// in registration order. Keep implementations side-effect-lean; they may be
/// invoked from any thread that touches the store.
pub trait CacheObserver: Send + Sync {
    fn notify(&self, event: &CacheEvent);
}

/// Per-kind event totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub over_capacity: u64,
}

/// Observer that counts events per kind; the monitoring building block and
/// the workhorse of the cache tests.
#[derive(Debug, Default)]
pub struct CountingObserver {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    over_capacity: AtomicU64,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> EventCounts {
        EventCounts {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            over_capacity: self.over_capacity.load(Ordering::Relaxed),
        }
    }
}

impl CacheObserver for CountingObserver {
    fn notify(&self, event: &CacheEvent) {
        let counter = match event.kind {
            CacheEventKind::Hit => &self.hits,
            CacheEventKind::Miss => &self.misses,
            CacheEventKind::Evict => &self.evictions,
            CacheEventKind::OverCapacity => &self.over_capacity,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Observer that reports events on stderr.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl CacheObserver for LoggingObserver {
    fn notify(&self, event: &CacheEvent) {
        eprintln!(
            "cache {}: {} ({} bytes)",
            event.kind.as_str(),
            event.key,
            event.bytes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: CacheEventKind) -> CacheEvent {
        CacheEvent {
            kind,
            key: "k".into(),
            bytes: 0,
        }
    }

    #[test]
    fn counting_observer_tallies_by_kind() {
        let observer = CountingObserver::new();
        observer.notify(&event(CacheEventKind::Hit));
        observer.notify(&event(CacheEventKind::Hit));
        observer.notify(&event(CacheEventKind::Miss));
        observer.notify(&event(CacheEventKind::Evict));
        observer.notify(&event(CacheEventKind::OverCapacity));

        let counts = observer.counts();
        assert_eq!(counts.hits, 2);
        assert_eq!(counts.misses, 1);
        assert_eq!(counts.evictions, 1);
        assert_eq!(counts.over_capacity, 1);
    }
}
