//! Criterion benchmarks for candlelab hot paths.
//!
//! Benchmarks:
//! 1. Order engine round trips (buy + close under the portfolio lock)
//! 2. Liquidation scan over a populated portfolio
//! 3. Snapshot recording with history compaction

use candlelab_core::domain::{Symbol, TradingMode};
use candlelab_core::portfolio::{
    ExecutionParams, MarkPrices, OrderEngine, PortfolioCore, RiskEngine,
};
use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::sync::Arc;

fn ts() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn futures_engine(capital: f64) -> (Arc<PortfolioCore>, OrderEngine) {
    let core = Arc::new(PortfolioCore::new(capital, TradingMode::Futures));
    let params = ExecutionParams {
        mode: TradingMode::Futures,
        max_leverage: 100.0,
        taker_fee_rate: 0.001,
    };
    (Arc::clone(&core), OrderEngine::new(core, params))
}

fn bench_order_round_trip(c: &mut Criterion) {
    c.bench_function("order_round_trip", |b| {
        let (_core, orders) = futures_engine(1e12);
        b.iter(|| {
            orders
                .buy(Symbol::BtcUsdt, black_box(1.0), 100.0, 10.0, ts())
                .unwrap();
            orders
                .close_position(Symbol::BtcUsdt, 100.0, 101.0, ts())
                .unwrap();
        });
    });
}

fn bench_liquidation_scan(c: &mut Criterion) {
    c.bench_function("liquidation_scan", |b| {
        let (core, orders) = futures_engine(1e9);
        for (i, symbol) in [Symbol::BtcUsdt, Symbol::EthUsdt, Symbol::SolUsdt]
            .into_iter()
            .enumerate()
        {
            orders
                .buy(symbol, 1.0 + i as f64, 100.0, 10.0, ts())
                .unwrap();
        }
        let risk = RiskEngine::new(Arc::clone(&core), 0.005, 0.001);
        let marks: MarkPrices = HashMap::from([
            (Symbol::BtcUsdt, 95.0),
            (Symbol::EthUsdt, 99.0),
            (Symbol::SolUsdt, 100.0),
        ]);
        b.iter(|| black_box(risk.scan_liquidations(black_box(&marks))));
    });
}

fn bench_snapshot_recording(c: &mut Criterion) {
    c.bench_function("snapshot_recording", |b| {
        let (core, orders) = futures_engine(1e9);
        orders.buy(Symbol::BtcUsdt, 5.0, 100.0, 10.0, ts()).unwrap();
        let marks: MarkPrices = HashMap::from([(Symbol::BtcUsdt, 101.0)]);
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            core.record_snapshot(ts() + chrono::Duration::seconds(i), &marks);
        });
    });
}

criterion_group!(
    benches,
    bench_order_round_trip,
    bench_liquidation_scan,
    bench_snapshot_recording
);
criterion_main!(benches);
