use crate::domain::{Bar, Symbol, Timeframe};

/// Contiguous bars for one (symbol, timeframe) over a requested range.
///
/// Timestamps are strictly increasing after assembly; gaps are permitted
/// (missing days contribute nothing). The window owns its bars by copy, so
/// callers may mutate derived data freely without touching cached frames.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvWindow {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl OhlcvWindow {
    pub(crate) fn new(symbol: Symbol, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        debug_assert!(
            bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "window bars must be strictly increasing"
        );
        Self { symbol, timeframe, bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}
