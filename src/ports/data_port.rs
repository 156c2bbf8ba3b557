//! Bar history access port trait.

use crate::domain::error::VolshieldError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `code` with `start_date <= date <= end_date`, ascending by date.
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, VolshieldError>;
}
