//! Candlelab CLI: run backtests from TOML configs and save artifacts.
//!
//! Commands:
//! - `run`: execute a backtest described by a TOML config file
//! - `demo`: generate synthetic day files and run the bundled SMA
//!   crossover end to end

use anyhow::{bail, Context, Result};
use candlelab_core::config::BacktestConfig;
use candlelab_core::data::{OhlcvStore, StoreConfig};
use candlelab_core::domain::{Symbol, Timeframe, TradingMode};
use candlelab_core::engine::RunStatus;
use candlelab_core::strategy::examples::SmaCrossover;
use candlelab_runner::{synthetic, ArtifactWriter, RunConfig, RunOutcome, Runner};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "candlelab", about = "Historical crypto backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a backtest from a TOML config file.
    Run {
        /// Path to the run configuration.
        #[arg(long)]
        config: PathBuf,
        /// Override the data root from the config file.
        #[arg(long)]
        data_root: Option<PathBuf>,
        /// Directory for run artifacts.
        #[arg(long, default_value = "runs")]
        out: PathBuf,
    },
    /// Generate synthetic data and run a demo backtest on it.
    Demo {
        /// Working directory for the demo data and artifacts.
        #[arg(long, default_value = "candlelab-demo")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Run {
            config,
            data_root,
            out,
        } => run_from_config(&config, data_root, &out),
        Command::Demo { out } => run_demo(&out),
    }
}

fn run_from_config(
    config_path: &PathBuf,
    data_root: Option<PathBuf>,
    out: &PathBuf,
) -> Result<()> {
    let run_config = RunConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let backtest_config = run_config.to_backtest_config()?;

    let mut store_config = run_config.store_config(backtest_config.trading_mode);
    if let Some(root) = data_root {
        store_config.root = root;
    }
    let store = Arc::new(OhlcvStore::new(store_config));

    let mut strategy = run_config.build_strategy()?;
    let outcome = Runner::new(store).run(backtest_config, strategy.as_mut())?;

    report(&outcome);
    save(&outcome, out)?;

    if let RunStatus::Failed { reason } = &outcome.result.status {
        bail!("run {} failed: {reason}", outcome.run_id);
    }
    Ok(())
}

fn run_demo(out: &PathBuf) -> Result<()> {
    let data_root = out.join("data");
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let bars = synthetic::generate_bars(2024, Timeframe::H1, start, 14 * 24, 42_000.0);
    let paths = synthetic::write_day_files(
        &data_root,
        TradingMode::Futures,
        Symbol::BtcUsdt,
        Timeframe::H1,
        &bars,
    )
    .context("failed to write demo day files")?;
    println!("wrote {} synthetic day files under {}", paths.len(), data_root.display());

    let config = BacktestConfig::new(
        Symbol::BtcUsdt,
        Timeframe::H1,
        start,
        Utc.with_ymd_and_hms(2025, 1, 14, 23, 59, 59).unwrap(),
        100_000.0,
        TradingMode::Futures,
        10.0,
    )?;

    let store = Arc::new(OhlcvStore::new(StoreConfig::new(
        &data_root,
        TradingMode::Futures,
    )));
    let mut strategy = SmaCrossover::new(8, 24, 0.5, 3.0);
    let outcome = Runner::new(store).run(config, &mut strategy)?;

    report(&outcome);
    save(&outcome, &out.join("runs"))?;
    Ok(())
}

fn report(outcome: &RunOutcome) {
    let result = &outcome.result;
    let metrics = &outcome.metrics;

    println!("\nrun {}", outcome.run_id);
    println!(
        "  {} {} {} -> {}",
        result.config.symbol,
        result.config.timeframe,
        result.config.start.date_naive(),
        result.config.end.date_naive()
    );
    println!("  bars processed   {}", result.bars_processed);
    println!("  final value      {:.2}", result.final_value);
    println!("  total return     {:+.2}%", metrics.total_return * 100.0);
    println!("  max drawdown     {:.2}%", metrics.max_drawdown * 100.0);
    println!("  sharpe / sortino {:.2} / {:.2}", metrics.sharpe_ratio, metrics.sortino_ratio);
    println!(
        "  trades           {} (win rate {:.1}%, liquidations {})",
        metrics.total_trades,
        metrics.win_rate * 100.0,
        metrics.liquidations
    );
    if let RunStatus::Failed { reason } = &result.status {
        println!("  status           FAILED: {reason}");
    }
}

fn save(outcome: &RunOutcome, out: &PathBuf) -> Result<()> {
    let writer = ArtifactWriter::new(out)?;
    let paths = writer.save_run(outcome)?;
    println!("  artifacts        {}", paths.run_dir.display());
    Ok(())
}
