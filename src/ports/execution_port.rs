//! Idealized order execution.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::error::VolshieldError;

pub trait ExecutionPort {
    /// Rebalance `code` so its holding is `weight` of total portfolio value.
    fn set_target_weight(&mut self, code: &str, weight: f64) -> Result<(), VolshieldError>;

    /// Close the whole holding in `code`.
    fn liquidate(&mut self, code: &str) -> Result<(), VolshieldError>;

    /// Revalue holdings at the period's prices before any decision is made.
    /// Codes absent from `prices` keep their last mark.
    fn mark_to_market(&mut self, _date: NaiveDate, _prices: &HashMap<String, f64>) {}
}
