//! Per-period indicator lookup.

use crate::domain::snapshot::{IndicatorSnapshot, Reading};
use chrono::NaiveDate;

pub trait IndicatorPort {
    /// `None` when the instrument has no bar on `date`. A snapshot whose
    /// readings are still warming up is returned with `ready == false`.
    fn snapshot(&self, code: &str, date: NaiveDate) -> Option<IndicatorSnapshot>;

    /// The benchmark's long moving average on `date`.
    fn benchmark_average(&self, date: NaiveDate) -> Reading;
}
