//! Portfolio time-series export.

use anyhow::{Context, Result};
use candlelab_core::domain::Snapshot;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn write_portfolio_csv(path: &Path, history: &[Snapshot]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create portfolio CSV {}", path.display()))?;

    writeln!(
        file,
        "timestamp,portfolio_value,cash,unrealized_pnl,realized_pnl,margin_used,leverage_ratio"
    )?;

    for snapshot in history {
        writeln!(
            file,
            "{},{:.8},{:.8},{:.8},{:.8},{:.8},{:.4}",
            snapshot.timestamp.to_rfc3339(),
            snapshot.portfolio_value,
            snapshot.cash,
            snapshot.unrealized_pnl,
            snapshot.realized_pnl,
            snapshot.margin_used,
            snapshot.leverage_ratio
        )?;
    }

    Ok(())
}
