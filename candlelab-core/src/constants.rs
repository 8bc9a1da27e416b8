//! System-wide limits, default rates, and float-precision policy.
//!
//! The engine computes in binary `f64` throughout and only rounds at the
//! serialization boundary: prices to 2 decimals, amounts to 8, percentages
//! to 4. Comparisons use [`approx_eq`] with [`PRICE_EPSILON`] for per-step
//! quantities and [`VALUE_EPSILON`] for aggregates.

/// Maximum number of concurrently open positions in one portfolio.
pub const MAX_POSITIONS_PER_PORTFOLIO: usize = 100;

/// Smallest order quantity accepted (rejects dust trades).
pub const MIN_TRADE_SIZE: f64 = 1e-5;

/// Largest single order quantity accepted.
pub const MAX_TRADE_SIZE: f64 = 1e6;

/// Portfolio snapshots retained before the history is compacted.
pub const MAX_HISTORY_ENTRIES: usize = 5_000;

/// Number of newest snapshots kept by a history compaction.
pub const HISTORY_TRIM_TO: usize = 4_000;

/// Default maintenance margin rate (0.5%).
pub const DEFAULT_MAINTENANCE_MARGIN_RATE: f64 = 0.005;

/// Default taker fee rate (0.1%), charged on notional value.
pub const DEFAULT_TAKER_FEE_RATE: f64 = 0.001;

/// Tolerance for per-step quantities (sizes, prices, ratios).
pub const PRICE_EPSILON: f64 = 1e-9;

/// Tolerance for aggregate values (portfolio valuation, cash identities).
pub const VALUE_EPSILON: f64 = 1e-6;

/// Decimal places for serialized prices (USD quotes).
pub const PRICE_DECIMALS: u32 = 2;

/// Decimal places for serialized amounts (crypto convention).
pub const AMOUNT_DECIMALS: u32 = 8;

/// Decimal places for serialized percentages and ratios.
pub const PERCENTAGE_DECIMALS: u32 = 4;

/// True when `a` and `b` differ by less than `tolerance`.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Round a price for serialization.
pub fn round_price(price: f64) -> f64 {
    round_to(price, PRICE_DECIMALS)
}

/// Round an amount for serialization.
pub fn round_amount(amount: f64) -> f64 {
    round_to(amount, AMOUNT_DECIMALS)
}

/// Round a percentage or ratio for serialization.
pub fn round_percentage(percentage: f64) -> f64 {
    round_to(percentage, PERCENTAGE_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_eq_absorbs_float_noise() {
        assert!(approx_eq(0.1 + 0.2, 0.3, PRICE_EPSILON));
        assert!(!approx_eq(1.0, 1.1, PRICE_EPSILON));
    }

    #[test]
    fn rounding_precision() {
        assert_eq!(round_price(42135.6789), 42135.68);
        assert_eq!(round_amount(0.123456789), 0.12345679);
        assert_eq!(round_percentage(0.123456), 0.1235);
    }

    #[test]
    fn trim_target_below_limit() {
        assert!(HISTORY_TRIM_TO < MAX_HISTORY_ENTRIES);
    }
}
