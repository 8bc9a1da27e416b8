use crate::domain::Bar;

/// Immutable bars for one day file.
///
/// Frames are shared from the cache behind `Arc` and never mutated after
/// insertion, so concurrent consumers hold references without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct DayFrame {
    bars: Vec<Bar>,
}

impl DayFrame {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn empty() -> Self {
        Self { bars: Vec::new() }
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

    /// Approximate heap cost of this frame for the memory tracker.
    /// Absolute precision is unnecessary; the estimate only has to scale
    /// with row count.
    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.bars.capacity() * std::mem::size_of::<Bar>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn estimated_bytes_scales_with_rows() {
        let bar = Bar::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            100.0,
            101.0,
            99.0,
            100.5,
            10.0,
        );
        let small = DayFrame::new(vec![bar.clone(); 10]);
        let large = DayFrame::new(vec![bar; 1000]);
        assert!(large.estimated_bytes() > small.estimated_bytes() * 50);
        assert!(DayFrame::empty().estimated_bytes() < small.estimated_bytes());
    }
}
