//! Technical indicator series.
//!
//! Every indicator produces one point per input bar. Points inside the
//! warm-up window carry `valid = false` so consumers can tell "insufficient
//! history" apart from a real value.

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod supertrend;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::snapshot::Reading;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub(crate) fn warming(date: NaiveDate) -> Self {
        IndicatorPoint {
            date,
            valid: false,
            value: 0.0,
        }
    }

    pub(crate) fn ready(date: NaiveDate, value: f64) -> Self {
        IndicatorPoint {
            date,
            valid: true,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Supertrend { period: usize, multiplier_x100: u32 },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Supertrend {
                period,
                multiplier_x100,
            } => {
                let mult = *multiplier_x100 as f64 / 100.0;
                write!(f, "SUPERTREND({},{})", period, mult)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub(crate) fn empty(indicator_type: IndicatorType) -> Self {
        IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        }
    }

    /// Reading at a bar index; out-of-range indices read as not ready.
    pub fn reading(&self, index: usize) -> Reading {
        match self.values.get(index) {
            Some(point) => Reading {
                value: point.value,
                ready: point.valid,
            },
            None => Reading::not_ready(),
        }
    }

    /// Number of leading points that are not yet valid.
    pub fn warmup_len(&self) -> usize {
        self.values.iter().take_while(|p| !p.valid).count()
    }
}

/// Multiplier stored as hundredths so the type can be hashed.
pub fn multiplier_x100(multiplier: f64) -> u32 {
    (multiplier * 100.0).round() as u32
}
