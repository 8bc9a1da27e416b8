//! Per-day CSV reading and validation.
//!
//! Day files carry the header `timestamp,open,high,low,close,volume`
//! (order-exact) with epoch-millisecond timestamps. A header-only file is a
//! valid empty day. Failures split into the four data-error classes so
//! callers can tell a missing file from a corrupt one.

use crate::data::DataError;
use crate::domain::Bar;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// Required column set, in order.
pub const EXPECTED_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

#[derive(Debug, Deserialize)]
struct DayRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Read and validate one day file into bars, in file order.
pub fn read_day_file(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = File::open(path).map_err(|source| DataError::FileSystem {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| map_csv_error(e, path))?
        .clone();
    if headers.is_empty() {
        // Zero-byte file: no data for this day.
        return Ok(Vec::new());
    }
    if headers.len() != EXPECTED_HEADER.len() || !headers.iter().eq(EXPECTED_HEADER) {
        return Err(DataError::Structure {
            path: path.to_path_buf(),
            message: format!(
                "header mismatch: expected '{}', got '{}'",
                EXPECTED_HEADER.join(","),
                headers.iter().collect::<Vec<_>>().join(","),
            ),
        });
    }

    let mut bars = Vec::new();
    for (index, result) in reader.deserialize::<DayRow>().enumerate() {
        let row_number = index + 2; // 1-based, after the header
        let row = result.map_err(|e| map_csv_error(e, path))?;
        let timestamp = Utc
            .timestamp_millis_opt(row.timestamp)
            .single()
            .ok_or_else(|| DataError::Parse {
                path: path.to_path_buf(),
                row: row_number,
                message: format!("timestamp {} out of range", row.timestamp),
            })?;
        let bar = Bar::new(timestamp, row.open, row.high, row.low, row.close, row.volume);
        bar.validate().map_err(|e| DataError::Parse {
            path: path.to_path_buf(),
            row: row_number,
            message: e.to_string(),
        })?;
        bars.push(bar);
    }
    Ok(bars)
}

fn map_csv_error(error: csv::Error, path: &Path) -> DataError {
    let row = error
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or_default();
    let message = error.to_string();
    match error.into_kind() {
        csv::ErrorKind::Io(source) => DataError::FileSystem {
            path: path.to_path_buf(),
            source,
        },
        csv::ErrorKind::Utf8 { .. } => DataError::Encoding {
            path: path.to_path_buf(),
        },
        _ => DataError::Parse {
            path: path.to_path_buf(),
            row,
            message,
        },
    }
}
