//! Data access layer: per-day CSV files, stat caching, the shared frame
//! cache, and window assembly.
//!
//! Layout on disk: `{root}/binance/{spot|futures}/{SYMBOL}/{TIMEFRAME}/`
//! with one file per UTC day, `{SYMBOL}_{TIMEFRAME}_{YYYY-MM-DD}.csv`.

pub mod events;
pub mod frame;
pub mod layout;
pub mod loader;
pub mod memory;
pub mod stat_cache;
pub mod store;
pub mod window;

pub use events::{CacheEvent, CacheEventKind, CacheObserver, CountingObserver, LoggingObserver};
pub use frame::DayFrame;
pub use memory::MemoryTracker;
pub use stat_cache::FileStatCache;
pub use store::{CacheStatistics, OhlcvStore, StoreConfig};
pub use window::OhlcvWindow;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the data layer.
///
/// Each variant carries the offending path so callers can report which file
/// broke and react per failure class (missing day files are tolerated by
/// window assembly; everything else aborts it).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("file system error at {path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse error in {path}, row {row}: {message}")]
    Parse {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("encoding error in {path}: not valid UTF-8")]
    Encoding { path: PathBuf },

    #[error("structural error in {path}: {message}")]
    Structure { path: PathBuf, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DataError {
    /// True for a file-not-found failure, the one class window assembly
    /// treats as "no data for that day".
    pub fn is_missing_file(&self) -> bool {
        matches!(
            self,
            DataError::FileSystem { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }
}
