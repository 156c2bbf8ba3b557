//! Portfolio-wide exposure governor.
//!
//! Long exposure is measured against total portfolio value each period. Once
//! it reaches the ceiling, no instrument may open a new position until fills
//! bring it back down. Exits are never gated.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Read-only view of the portfolio, owned by the execution layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioSnapshot {
    pub total_value: f64,
    /// Signed holdings value per instrument; negative for shorts.
    pub holdings: HashMap<String, f64>,
}

impl PortfolioSnapshot {
    pub fn new(total_value: f64) -> Self {
        PortfolioSnapshot {
            total_value,
            holdings: HashMap::new(),
        }
    }

    pub fn with_holding(mut self, code: &str, value: f64) -> Self {
        self.holdings.insert(code.to_string(), value);
        self
    }

    pub fn long_value(&self) -> f64 {
        self.holdings.values().map(|v| v.max(0.0)).sum()
    }
}

/// Fraction of portfolio value held long. Zero when the portfolio value is
/// not positive.
pub fn current_exposure(portfolio: &PortfolioSnapshot) -> f64 {
    if portfolio.total_value <= 0.0 {
        return 0.0;
    }
    portfolio.long_value() / portfolio.total_value
}

/// When the exposure fraction is sampled during one pass of the decision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposurePolicy {
    /// One portfolio snapshot before the first instrument; every entry check
    /// in the period compares against it.
    OncePerPeriod,
    /// A fresh snapshot before each flat instrument's entry check, so fills
    /// from earlier entries in the same period count against later ones.
    #[default]
    PerInstrument,
}

impl fmt::Display for ExposurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExposurePolicy::OncePerPeriod => f.write_str("once_per_period"),
            ExposurePolicy::PerInstrument => f.write_str("per_instrument"),
        }
    }
}

impl FromStr for ExposurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "once_per_period" | "period" => Ok(ExposurePolicy::OncePerPeriod),
            "per_instrument" | "instrument" => Ok(ExposurePolicy::PerInstrument),
            other => Err(format!(
                "unknown exposure policy '{}', expected once_per_period or per_instrument",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureGovernor {
    pub ceiling: f64,
    pub policy: ExposurePolicy,
}

impl ExposureGovernor {
    pub fn new(ceiling: f64, policy: ExposurePolicy) -> Self {
        ExposureGovernor { ceiling, policy }
    }

    /// Meeting the ceiling already blocks entries.
    pub fn permits_entry(&self, exposure: f64) -> bool {
        exposure < self.ceiling
    }

    /// The fraction an entry check compares against: the period's opening
    /// sample, or a fresh read when sampling per instrument.
    pub fn sample(&self, period_exposure: f64, fresh: impl FnOnce() -> f64) -> f64 {
        match self.policy {
            ExposurePolicy::OncePerPeriod => period_exposure,
            ExposurePolicy::PerInstrument => fresh(),
        }
    }
}
