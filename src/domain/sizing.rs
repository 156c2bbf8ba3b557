//! Volatility-normalized position sizing.
//!
//! Converts an ATR reading into a target portfolio weight inversely
//! proportional to the instrument's annualized volatility, so each position
//! carries roughly the same risk:
//!
//! ```text
//! daily  = atr / price
//! annual = daily * sqrt(annualization_periods)
//! raw    = target_volatility / (annual * leverage_multiplier)
//! weight = clamp(raw, min_weight, max_weight)
//! ```

use crate::domain::error::VolshieldError;
use crate::domain::snapshot::Reading;

/// Trading periods per year for daily bars.
pub const DAILY_ANNUALIZATION_PERIODS: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingParameters {
    /// Fraction of portfolio value allowed in long exposure before new
    /// entries stop.
    pub exposure_ceiling: f64,
    /// Target annualized volatility contributed per position.
    pub target_volatility: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    /// Assumed instrument leverage / contract multiplier.
    pub leverage_multiplier: f64,
    pub annualization_periods: f64,
    /// Weight used when the sizer cannot produce one (volatility not ready or
    /// non-positive). Entries still go ahead at this weight.
    pub default_weight: f64,
}

impl Default for SizingParameters {
    fn default() -> Self {
        SizingParameters {
            exposure_ceiling: 0.95,
            target_volatility: 0.12,
            min_weight: 0.05,
            max_weight: 0.20,
            leverage_multiplier: 3.0,
            annualization_periods: DAILY_ANNUALIZATION_PERIODS,
            default_weight: 0.1,
        }
    }
}

impl SizingParameters {
    /// Rejects parameter sets that would make sizing meaningless. Called at
    /// startup; an error here must abort the run.
    pub fn validate(&self) -> Result<(), VolshieldError> {
        if !(self.exposure_ceiling > 0.0 && self.exposure_ceiling <= 1.0) {
            return Err(VolshieldError::invalid(
                "sizing",
                "exposure_ceiling",
                "exposure_ceiling must be in (0, 1]",
            ));
        }
        if !(self.target_volatility > 0.0) {
            return Err(VolshieldError::invalid(
                "sizing",
                "target_volatility",
                "target_volatility must be positive",
            ));
        }
        if !(self.min_weight > 0.0) {
            return Err(VolshieldError::invalid(
                "sizing",
                "min_weight",
                "min_weight must be positive",
            ));
        }
        if !(self.max_weight <= 1.0) {
            return Err(VolshieldError::invalid(
                "sizing",
                "max_weight",
                "max_weight must not exceed 1",
            ));
        }
        if self.min_weight > self.max_weight {
            return Err(VolshieldError::invalid(
                "sizing",
                "min_weight",
                "min_weight must not exceed max_weight",
            ));
        }
        if !(self.leverage_multiplier > 0.0) {
            return Err(VolshieldError::invalid(
                "sizing",
                "leverage",
                "leverage must be positive",
            ));
        }
        if !(self.annualization_periods > 0.0) {
            return Err(VolshieldError::invalid(
                "sizing",
                "annualization_periods",
                "annualization_periods must be positive",
            ));
        }
        if !(self.default_weight > 0.0 && self.default_weight <= 1.0) {
            return Err(VolshieldError::invalid(
                "sizing",
                "default_weight",
                "default_weight must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Target weight for an instrument, or `None` when the inputs cannot produce
/// one (volatility not ready or non-positive, price non-positive).
pub fn volatility_weight(volatility: Reading, price: f64, params: &SizingParameters) -> Option<f64> {
    let atr = volatility.get()?;
    if atr <= 0.0 || price <= 0.0 {
        return None;
    }

    let daily = atr / price;
    let annual = daily * params.annualization_periods.sqrt();
    let raw = params.target_volatility / (annual * params.leverage_multiplier);
    Some(raw.clamp(params.min_weight, params.max_weight))
}

/// The weight an entry is actually placed at: the sized weight, or the
/// configured default when sizing is unavailable.
pub fn entry_weight(volatility: Reading, price: f64, params: &SizingParameters) -> f64 {
    volatility_weight(volatility, price, params).unwrap_or(params.default_weight)
}
