//! Trade tape export.

use anyhow::{Context, Result};
use candlelab_core::domain::Trade;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create trades CSV {}", path.display()))?;

    writeln!(
        file,
        "timestamp,action,symbol,quantity,price,leverage,fee,position_type,pnl"
    )?;

    for trade in trades {
        writeln!(
            file,
            "{},{},{},{:.8},{:.2},{:.2},{:.8},{},{:.8}",
            trade.timestamp.to_rfc3339(),
            trade.action.as_str(),
            trade.symbol,
            trade.quantity,
            trade.price,
            trade.leverage,
            trade.fee,
            trade.side.as_str(),
            trade.pnl
        )?;
    }

    Ok(())
}
