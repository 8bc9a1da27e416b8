//! Domain types: bars, market enums, positions, trades, snapshots.

pub mod bar;
pub mod market;
pub mod position;
pub mod snapshot;
pub mod trade;

pub use bar::{Bar, BarError};
pub use market::{MarketError, PositionSide, Symbol, Timeframe, TradeAction, TradingMode};
pub use position::Position;
pub use snapshot::Snapshot;
pub use trade::Trade;
