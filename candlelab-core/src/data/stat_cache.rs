//! File-stat cache: answers "has this file changed?" without hitting the
//! OS on every lookup.
//!
//! Entries expire after a TTL (300 s) and the map is capped (1 000 entries,
//! LRU eviction). The internal lock nests strictly inside the store's cache
//! lock; this module never calls back into the store.

use crate::data::DataError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_CAPACITY: usize = 1_000;

#[derive(Debug)]
struct StatEntry {
    mtime: SystemTime,
    fetched_at: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct StatState {
    entries: HashMap<PathBuf, StatEntry>,
    tick: u64,
}

/// TTL-bounded, capacity-bounded cache of file modification times.
#[derive(Debug)]
pub struct FileStatCache {
    state: Mutex<StatState>,
    ttl: Duration,
    capacity: usize,
}

impl FileStatCache {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_settings(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(StatState::default()),
            ttl,
            capacity,
        }
    }

    /// Cached or freshly stat'd modification time for `path`.
    ///
    /// A stat failure (including a missing file) propagates as
    /// `DataError::FileSystem` and leaves no cache entry behind.
    pub fn mtime(&self, path: &Path) -> Result<SystemTime, DataError> {
        let mut state = self.state.lock().unwrap();
        state.tick += 1;
        let tick = state.tick;

        if let Some(entry) = state.entries.get_mut(path) {
            if entry.fetched_at.elapsed() < self.ttl {
                entry.last_used = tick;
                return Ok(entry.mtime);
            }
            state.entries.remove(path);
        }

        let mtime = stat_mtime(path)?;
        if state.entries.len() >= self.capacity {
            evict_lru(&mut state.entries);
        }
        state.entries.insert(
            path.to_path_buf(),
            StatEntry {
                mtime,
                fetched_at: Instant::now(),
                last_used: tick,
            },
        );
        Ok(mtime)
    }

    /// Drop the cached entry for `path`, forcing the next lookup to stat.
    pub fn invalidate(&self, path: &Path) {
        self.state.lock().unwrap().entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FileStatCache {
    fn default() -> Self {
        Self::new()
    }
}

fn stat_mtime(path: &Path) -> Result<SystemTime, DataError> {
    let metadata = fs::metadata(path).map_err(|source| DataError::FileSystem {
        path: path.to_path_buf(),
        source,
    })?;
    metadata.modified().map_err(|source| DataError::FileSystem {
        path: path.to_path_buf(),
        source,
    })
}

fn evict_lru(entries: &mut HashMap<PathBuf, StatEntry>) {
    if let Some(victim) = entries
        .iter()
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(path, _)| path.clone())
    {
        entries.remove(&victim);
    }
}
