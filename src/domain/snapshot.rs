//! Per-instrument, per-period bundle of indicator readings.

/// One indicator value paired with its readiness flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub ready: bool,
}

impl Reading {
    pub fn ready(value: f64) -> Self {
        Reading { value, ready: true }
    }

    pub fn not_ready() -> Self {
        Reading {
            value: 0.0,
            ready: false,
        }
    }

    /// The value, if the indicator has enough history.
    pub fn get(&self) -> Option<f64> {
        self.ready.then_some(self.value)
    }
}

/// Everything the per-symbol policy reads about one instrument in one period.
/// Built fresh each period by the indicator feed and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub trend_band_fast: Reading,
    pub trend_band_slow: Reading,
    pub momentum: Reading,
    pub long_moving_average: Reading,
    pub weekly_average_price: Reading,
    pub volatility: Reading,
}

impl IndicatorSnapshot {
    /// True when every reading the entry predicate needs is ready.
    /// Volatility is excluded: the sizer has its own fallback.
    pub fn entry_inputs_ready(&self) -> bool {
        self.trend_band_fast.ready
            && self.trend_band_slow.ready
            && self.momentum.ready
            && self.long_moving_average.ready
            && self.weekly_average_price.ready
    }

    pub fn trend_bands_ready(&self) -> bool {
        self.trend_band_fast.ready && self.trend_band_slow.ready
    }
}
