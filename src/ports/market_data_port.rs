//! Per-period price lookup.

use crate::domain::universe::Instrument;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Decision price for the instrument on `date`: the quote mid for
    /// quote-driven classes when both sides exist, otherwise the close.
    /// `None` when the instrument has no observation that period.
    fn price(&self, instrument: &Instrument, date: NaiveDate) -> Option<f64>;

    /// Close of the regime benchmark on `date`.
    fn benchmark_price(&self, date: NaiveDate) -> Option<f64>;
}
