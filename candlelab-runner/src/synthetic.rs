//! Deterministic synthetic bars and day-file fixtures.
//!
//! A seeded ChaCha8 random walk: the same seed always produces the same
//! bars, so tests and demos are reproducible. `write_day_files`
//! materializes the bars in the on-disk layout the store reads.

use candlelab_core::data::layout;
use candlelab_core::domain::{Bar, Symbol, Timeframe, TradingMode};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Generate `count` random-walk bars starting at `start`.
pub fn generate_bars(
    seed: u64,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    count: usize,
    start_price: f64,
) -> Vec<Bar> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let step = Duration::seconds(timeframe.seconds() as i64);
    let mut price = start_price.max(0.01);
    let mut bars = Vec::with_capacity(count);

    for i in 0..count {
        let drift: f64 = rng.gen_range(-0.008..0.008);
        let open = price;
        let close = (open * (1.0 + drift)).max(0.01);
        let wick_up: f64 = rng.gen_range(0.0..0.004);
        let wick_down: f64 = rng.gen_range(0.0..0.004);
        let high = open.max(close) * (1.0 + wick_up);
        let low = (open.min(close) * (1.0 - wick_down)).max(0.001);
        let volume = rng.gen_range(100.0..10_000.0);

        bars.push(Bar::new(
            start + step * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }
    bars
}

/// Write bars into per-day CSV files under `root`, returning the created
/// paths in date order.
pub fn write_day_files(
    root: &Path,
    mode: TradingMode,
    symbol: Symbol,
    timeframe: Timeframe,
    bars: &[Bar],
) -> io::Result<Vec<PathBuf>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Bar>> = BTreeMap::new();
    for bar in bars {
        by_day.entry(bar.timestamp.date_naive()).or_default().push(bar);
    }

    let mut paths = Vec::with_capacity(by_day.len());
    for (date, day_bars) in by_day {
        let path = layout::day_file_path(root, mode, symbol, timeframe, date);
        fs::create_dir_all(path.parent().expect("day file path has a parent"))?;
        let mut file = fs::File::create(&path)?;
        writeln!(file, "timestamp,open,high,low,close,volume")?;
        for bar in day_bars {
            writeln!(
                file,
                "{},{},{},{},{},{}",
                bar.timestamp_ms(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            )?;
        }
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn same_seed_same_bars() {
        let a = generate_bars(7, Timeframe::H1, start(), 50, 100.0);
        let b = generate_bars(7, Timeframe::H1, start(), 50, 100.0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_bars(7, Timeframe::H1, start(), 50, 100.0);
        let b = generate_bars(8, Timeframe::H1, start(), 50, 100.0);
        assert_ne!(a, b);
    }

    #[test]
    fn generated_bars_are_valid() {
        for bar in generate_bars(42, Timeframe::M5, start(), 500, 250.0) {
            bar.validate().unwrap();
        }
    }

    #[test]
    fn bars_are_spaced_by_the_timeframe() {
        let bars = generate_bars(1, Timeframe::M15, start(), 10, 100.0);
        for pair in bars.windows(2) {
            assert_eq!(
                pair[1].timestamp_ms() - pair[0].timestamp_ms(),
                15 * 60 * 1000
            );
        }
    }

    #[test]
    fn day_files_split_on_utc_midnight() {
        let dir = std::env::temp_dir().join(format!("candlelab_synth_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        // 30 hourly bars span two UTC days.
        let bars = generate_bars(3, Timeframe::H1, start(), 30, 100.0);
        let paths =
            write_day_files(&dir, TradingMode::Spot, Symbol::EthUsdt, Timeframe::H1, &bars)
                .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("ETHUSDT_1h_2025-01-01.csv"));
        assert!(paths[1].ends_with("ETHUSDT_1h_2025-01-02.csv"));
        let _ = fs::remove_dir_all(&dir);
    }
}
