//! OhlcvStore: the shared, thread-safe frame cache and window assembler.
//!
//! One store may serve many concurrent backtests. It holds two locks:
//! the cache/state lock (LRU map, memory tracker, statistics, pending
//! events) and the notification lock (observer registry). They are never
//! held together; event dispatch always happens after the cache lock is
//! released, which keeps an observer free to query the store.

use crate::data::events::{CacheEvent, CacheEventKind, CacheObserver};
use crate::data::frame::DayFrame;
use crate::data::layout;
use crate::data::loader;
use crate::data::memory::MemoryTracker;
use crate::data::stat_cache::FileStatCache;
use crate::data::window::OhlcvWindow;
use crate::data::DataError;
use crate::domain::{Symbol, Timeframe, TradingMode};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Eviction rounds attempted per insertion before the frame is refused.
const MAX_EVICTION_ROUNDS: usize = 3;

const DEFAULT_CACHE_CAPACITY: usize = 100;
const DEFAULT_MEMORY_LIMIT: usize = 512 * 1024 * 1024;
const DEFAULT_STAT_TTL: Duration = Duration::from_secs(300);
const STAT_CACHE_CAPACITY: usize = 1_000;

/// Store construction parameters.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root of the market-data tree.
    pub root: PathBuf,
    /// Which market directory (spot or futures) to read.
    pub mode: TradingMode,
    /// Maximum number of cached day frames.
    pub cache_capacity: usize,
    /// Ceiling on the estimated bytes of cached frames.
    pub memory_limit_bytes: usize,
    /// How long a file's mtime may be served without re-statting. Bounds
    /// how stale a cached frame can be after an external rewrite.
    pub stat_ttl: Duration,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>, mode: TradingMode) -> Self {
        Self {
            root: root.into(),
            mode,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT,
            stat_ttl: DEFAULT_STAT_TTL,
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    pub fn with_stat_ttl(mut self, ttl: Duration) -> Self {
        self.stat_ttl = ttl;
        self
    }
}

/// Counters exposed by [`OhlcvStore::statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes_used: usize,
    pub bytes_limit: usize,
}

/// Cache key: a file path plus its modification time. Any rewrite produces
/// a distinct key, so stale frames are never served. Nanosecond mtimes keep
/// same-second rewrites distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    mtime_ns: u128,
}

impl CacheKey {
    fn new(path: PathBuf, mtime: SystemTime) -> Self {
        let mtime_ns = mtime
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self { path, mtime_ns }
    }

    fn render(&self) -> String {
        format!("{}:{}", self.path.display(), self.mtime_ns)
    }
}

struct CacheSlot {
    frame: Arc<DayFrame>,
    bytes: usize,
    last_used: u64,
}

struct CacheState {
    entries: HashMap<CacheKey, CacheSlot>,
    tick: u64,
    memory: MemoryTracker,
    hits: u64,
    misses: u64,
    evictions: u64,
    pending: Vec<CacheEvent>,
}

impl CacheState {
    /// Remove the least-recently-used entry, queueing an Evict event.
    /// Returns false when the cache is already empty.
    fn evict_lru(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone());
        match victim {
            Some(key) => {
                let slot = self.entries.remove(&key).expect("victim key present");
                self.memory.record_evict(slot.bytes);
                self.evictions += 1;
                self.pending.push(CacheEvent {
                    kind: CacheEventKind::Evict,
                    key: key.render(),
                    bytes: slot.bytes,
                });
                true
            }
            None => false,
        }
    }
}

/// Materializes OHLCV windows from per-day CSV files, with an observed,
/// memory-bounded, mtime-aware LRU cache of immutable day frames.
pub struct OhlcvStore {
    config: StoreConfig,
    stat_cache: FileStatCache,
    state: Mutex<CacheState>,
    observers: Mutex<Vec<Arc<dyn CacheObserver>>>,
}

impl OhlcvStore {
    pub fn new(config: StoreConfig) -> Self {
        let memory = MemoryTracker::new(config.memory_limit_bytes);
        let stat_cache = FileStatCache::with_settings(config.stat_ttl, STAT_CACHE_CAPACITY);
        Self {
            config,
            stat_cache,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tick: 0,
                memory,
                hits: 0,
                misses: 0,
                evictions: 0,
                pending: Vec::new(),
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Load one day's frame, served from the cache when the file has not
    /// changed since it was cached.
    pub fn load_day(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        date: NaiveDate,
    ) -> Result<Arc<DayFrame>, DataError> {
        let path = layout::day_file_path(&self.config.root, self.config.mode, symbol, timeframe, date);
        let mtime = self.stat_cache.mtime(&path)?;
        let key = CacheKey::new(path.clone(), mtime);

        {
            let mut state = self.state.lock().unwrap();
            state.tick += 1;
            let tick = state.tick;
            let cached = state.entries.get_mut(&key).map(|slot| {
                slot.last_used = tick;
                (Arc::clone(&slot.frame), slot.bytes)
            });
            match cached {
                Some((frame, bytes)) => {
                    state.hits += 1;
                    state.pending.push(CacheEvent {
                        kind: CacheEventKind::Hit,
                        key: key.render(),
                        bytes,
                    });
                    drop(state);
                    self.drain_events();
                    return Ok(frame);
                }
                None => {
                    state.misses += 1;
                    state.pending.push(CacheEvent {
                        kind: CacheEventKind::Miss,
                        key: key.render(),
                        bytes: 0,
                    });
                }
            }
        }
        self.drain_events();

        // Disk I/O happens outside both locks.
        let bars = loader::read_day_file(&path)?;
        let frame = Arc::new(DayFrame::new(bars));
        self.try_insert(key, &frame);
        self.drain_events();
        Ok(frame)
    }

    /// Admit a freshly loaded frame, evicting under pressure. The frame is
    /// returned to the caller either way; only caching is refused.
    fn try_insert(&self, key: CacheKey, frame: &Arc<DayFrame>) {
        let bytes = frame.estimated_bytes();
        let mut state = self.state.lock().unwrap();
        state.tick += 1;
        let tick = state.tick;

        // A racing loader may have inserted the same key already; keep the
        // existing slot and its accounting.
        if let Some(slot) = state.entries.get_mut(&key) {
            slot.last_used = tick;
            return;
        }

        while state.entries.len() >= self.config.cache_capacity {
            if !state.evict_lru() {
                break;
            }
        }

        let mut rounds = 0;
        while state.memory.would_exceed(bytes) && rounds < MAX_EVICTION_ROUNDS {
            if !state.evict_lru() {
                break;
            }
            rounds += 1;
        }

        if state.memory.would_exceed(bytes) {
            state.pending.push(CacheEvent {
                kind: CacheEventKind::OverCapacity,
                key: key.render(),
                bytes,
            });
            return;
        }

        state.memory.record_insert(bytes);
        state.entries.insert(
            key,
            CacheSlot {
                frame: Arc::clone(frame),
                bytes,
                last_used: tick,
            },
        );
    }

    /// Assemble the window covering `[start, end]` at millisecond
    /// resolution: concatenate the day frames, filter, sort ascending, and
    /// deduplicate timestamps with last-wins. Missing day files contribute
    /// nothing; any other data error aborts the whole window.
    pub fn load_window(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<OhlcvWindow, DataError> {
        if start > end {
            return Err(DataError::InvalidRequest(format!(
                "window start {start} is after end {end}"
            )));
        }

        let mut bars = Vec::new();
        for date in layout::days_between(start, end) {
            match self.load_day(symbol, timeframe, date) {
                Ok(frame) => bars.extend_from_slice(frame.bars()),
                Err(e) if e.is_missing_file() => continue,
                Err(e) => return Err(e),
            }
        }

        let start_ms = start.timestamp_millis();
        let end_ms = end.timestamp_millis();
        bars.retain(|bar| {
            let t = bar.timestamp_ms();
            t >= start_ms && t <= end_ms
        });

        // Stable sort keeps file order within equal timestamps; reversing
        // before dedup makes "first kept" mean "last seen".
        bars.sort_by_key(|bar| bar.timestamp_ms());
        bars.reverse();
        bars.dedup_by_key(|bar| bar.timestamp_ms());
        bars.reverse();

        Ok(OhlcvWindow::new(symbol, timeframe, bars))
    }

    /// Symbols present under the store's market directory, sorted.
    pub fn discover_symbols(&self) -> Result<Vec<Symbol>, DataError> {
        let dir = layout::market_dir(&self.config.root, self.config.mode);
        let mut symbols: Vec<Symbol> = list_dirs(&dir)?
            .into_iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    /// Timeframes available for a symbol, sorted by granularity.
    pub fn discover_timeframes(
        &self,
        symbol: Symbol,
    ) -> Result<Vec<Timeframe>, DataError> {
        let dir = layout::market_dir(&self.config.root, self.config.mode).join(symbol.as_str());
        let mut timeframes: Vec<Timeframe> = list_dirs(&dir)?
            .into_iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        timeframes.sort_by_key(|tf| tf.seconds());
        Ok(timeframes)
    }

    /// Register an observer; events reach observers in registration order.
    pub fn subscribe(&self, observer: Arc<dyn CacheObserver>) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Remove an observer by pointer identity.
    pub fn unsubscribe(&self, observer: &Arc<dyn CacheObserver>) {
        self.observers
            .lock()
            .unwrap()
            .retain(|existing| !Arc::ptr_eq(existing, observer));
    }

    pub fn statistics(&self) -> CacheStatistics {
        let state = self.state.lock().unwrap();
        CacheStatistics {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entries: state.entries.len(),
            bytes_used: state.memory.usage(),
            bytes_limit: state.memory.limit(),
        }
    }

    /// Take the pending events (cache lock), then dispatch them
    /// (notification lock). A panicking observer is reported and skipped;
    /// the remaining observers still see the event.
    fn drain_events(&self) {
        let events = {
            let mut state = self.state.lock().unwrap();
            if state.pending.is_empty() {
                return;
            }
            std::mem::take(&mut state.pending)
        };
        let observers = self.observers.lock().unwrap();
        for event in &events {
            for observer in observers.iter() {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    observer.notify(event)
                }));
                if outcome.is_err() {
                    eprintln!(
                        "cache observer panicked handling {} for {}",
                        event.kind.as_str(),
                        event.key
                    );
                }
            }
        }
    }
}

/// Names of subdirectories, or empty when the directory does not exist.
fn list_dirs(dir: &Path) -> Result<Vec<String>, DataError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(DataError::FileSystem {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataError::FileSystem {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
