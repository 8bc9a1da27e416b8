//! Artifact export for finished runs.
//!
//! Each run writes into `<output_dir>/<run_id>/`:
//! - `config.json`: the run's configuration
//! - `trades.csv`: one row per trade event
//! - `portfolio.csv`: the snapshot time series
//! - `metrics.json`: the computed performance metrics
//!
//! Values are rounded only here, at the serialization boundary: prices to
//! 2 decimals, amounts to 8, ratios to 4.

mod portfolio;
mod trades;

use crate::runner::RunOutcome;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Paths of the files written for one run.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub config_json: PathBuf,
    pub trades_csv: PathBuf,
    pub portfolio_csv: PathBuf,
    pub metrics_json: PathBuf,
}

/// Writes all artifacts for finished runs under one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).context("failed to create artifact output dir")?;
        Ok(Self { output_dir })
    }

    pub fn save_run(&self, outcome: &RunOutcome) -> Result<ArtifactPaths> {
        let run_dir = self.output_dir.join(outcome.run_id.as_str());
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create run dir {}", run_dir.display()))?;

        let config_json = run_dir.join("config.json");
        let config_body = serde_json::to_string_pretty(&outcome.result.config)
            .context("failed to serialize config")?;
        std::fs::write(&config_json, config_body)
            .with_context(|| format!("failed to write {}", config_json.display()))?;

        let trades_csv = run_dir.join("trades.csv");
        trades::write_trades_csv(&trades_csv, &outcome.result.trades)?;

        let portfolio_csv = run_dir.join("portfolio.csv");
        portfolio::write_portfolio_csv(&portfolio_csv, &outcome.result.history)?;

        let metrics_json = run_dir.join("metrics.json");
        let metrics_body = serde_json::to_string_pretty(&outcome.metrics)
            .context("failed to serialize metrics")?;
        std::fs::write(&metrics_json, metrics_body)
            .with_context(|| format!("failed to write {}", metrics_json.display()))?;

        Ok(ArtifactPaths {
            run_dir,
            config_json,
            trades_csv,
            portfolio_csv,
            metrics_json,
        })
    }
}
