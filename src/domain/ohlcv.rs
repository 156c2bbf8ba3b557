//! Daily price bar, optionally carrying closing bid/ask quotes.

use chrono::NaiveDate;

use crate::domain::universe::InstrumentClass;

#[derive(Debug, Clone)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub bid_close: Option<f64>,
    pub ask_close: Option<f64>,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// (high + low) / 2
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Bid/ask midpoint, or the close when either side of the quote is missing.
    pub fn mid_price(&self) -> f64 {
        match (self.bid_close, self.ask_close) {
            (Some(bid), Some(ask)) => (bid + ask) / 2.0,
            _ => self.close,
        }
    }

    /// The decision price for an instrument of the given class.
    pub fn decision_price(&self, class: InstrumentClass) -> f64 {
        if class.is_quote_driven() {
            self.mid_price()
        } else {
            self.close
        }
    }
}
