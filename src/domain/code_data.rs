//! Loaded bar history per instrument, its computed indicators, and the
//! unified timeline across instruments.

use crate::domain::error::VolshieldError;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_weekly_average;
use crate::domain::indicator::supertrend::calculate_supertrend;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::snapshot::{IndicatorSnapshot, Reading};
use crate::domain::universe::Instrument;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Periods and multipliers for every indicator the policy reads.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSettings {
    pub supertrend_period: usize,
    pub fast_multiplier: f64,
    pub slow_multiplier: f64,
    pub rsi_period: usize,
    pub long_ma_period: usize,
    pub benchmark_ma_period: usize,
    pub weekly_average_weeks: usize,
    pub atr_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        IndicatorSettings {
            supertrend_period: 10,
            fast_multiplier: 2.5,
            slow_multiplier: 3.0,
            rsi_period: 10,
            long_ma_period: 100,
            benchmark_ma_period: 200,
            weekly_average_weeks: 5,
            atr_period: 14,
        }
    }
}

impl IndicatorSettings {
    pub fn validate(&self) -> Result<(), VolshieldError> {
        let periods = [
            ("supertrend_period", self.supertrend_period),
            ("rsi_period", self.rsi_period),
            ("long_ma_period", self.long_ma_period),
            ("benchmark_ma_period", self.benchmark_ma_period),
            ("weekly_average_weeks", self.weekly_average_weeks),
            ("atr_period", self.atr_period),
        ];
        for (key, period) in periods {
            if period == 0 {
                return Err(VolshieldError::invalid("indicators", key, "must be at least 1"));
            }
        }
        for (key, mult) in [
            ("fast_multiplier", self.fast_multiplier),
            ("slow_multiplier", self.slow_multiplier),
        ] {
            if !(mult > 0.0) {
                return Err(VolshieldError::invalid("indicators", key, "must be positive"));
            }
        }
        Ok(())
    }

    /// Bars needed before every entry input is ready.
    pub fn longest_lookback(&self) -> usize {
        [
            self.supertrend_period,
            self.rsi_period + 1,
            self.long_ma_period,
            self.weekly_average_weeks * crate::domain::indicator::sma::TRADING_DAYS_PER_WEEK,
            self.atr_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentIndicators {
    pub trend_fast: IndicatorSeries,
    pub trend_slow: IndicatorSeries,
    pub momentum: IndicatorSeries,
    pub long_ma: IndicatorSeries,
    pub weekly_average: IndicatorSeries,
    pub volatility: IndicatorSeries,
}

impl InstrumentIndicators {
    pub fn compute(bars: &[OhlcvBar], settings: &IndicatorSettings) -> Self {
        InstrumentIndicators {
            trend_fast: calculate_supertrend(bars, settings.supertrend_period, settings.fast_multiplier),
            trend_slow: calculate_supertrend(bars, settings.supertrend_period, settings.slow_multiplier),
            momentum: calculate_rsi(bars, settings.rsi_period),
            long_ma: calculate_ema(bars, settings.long_ma_period),
            weekly_average: calculate_weekly_average(bars, settings.weekly_average_weeks),
            volatility: calculate_atr(bars, settings.atr_period),
        }
    }

    pub fn snapshot(&self, index: usize) -> IndicatorSnapshot {
        IndicatorSnapshot {
            trend_band_fast: self.trend_fast.reading(index),
            trend_band_slow: self.trend_slow.reading(index),
            momentum: self.momentum.reading(index),
            long_moving_average: self.long_ma.reading(index),
            weekly_average_price: self.weekly_average.reading(index),
            volatility: self.volatility.reading(index),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentData {
    pub instrument: Instrument,
    pub ohlcv: Vec<OhlcvBar>,
    pub indicators: InstrumentIndicators,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl InstrumentData {
    pub fn new(instrument: Instrument, ohlcv: Vec<OhlcvBar>, settings: &IndicatorSettings) -> Self {
        let date_index = index_dates(&ohlcv);
        let indicators = InstrumentIndicators::compute(&ohlcv, settings);
        Self {
            instrument,
            ohlcv,
            indicators,
            date_index,
        }
    }

    pub fn code(&self) -> &str {
        &self.instrument.code
    }

    pub fn bar_count(&self) -> usize {
        self.ohlcv.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.ohlcv[i])
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn price(&self, date: NaiveDate) -> Option<f64> {
        self.get_bar(date)
            .map(|bar| bar.decision_price(self.instrument.class))
    }

    pub fn snapshot(&self, date: NaiveDate) -> Option<IndicatorSnapshot> {
        self.get_bar_index(date)
            .map(|i| self.indicators.snapshot(i))
    }
}

/// The regime benchmark: closes plus one long moving average.
#[derive(Debug, Clone)]
pub struct BenchmarkData {
    pub code: String,
    pub ohlcv: Vec<OhlcvBar>,
    pub average: IndicatorSeries,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl BenchmarkData {
    pub fn new(code: String, ohlcv: Vec<OhlcvBar>, ma_period: usize) -> Self {
        let date_index = index_dates(&ohlcv);
        let average = calculate_ema(&ohlcv, ma_period);
        Self {
            code,
            ohlcv,
            average,
            date_index,
        }
    }

    pub fn price(&self, date: NaiveDate) -> Option<f64> {
        self.date_index.get(&date).map(|&i| self.ohlcv[i].close)
    }

    pub fn average(&self, date: NaiveDate) -> Reading {
        match self.date_index.get(&date) {
            Some(&i) => self.average.reading(i),
            None => Reading::not_ready(),
        }
    }
}

fn index_dates(bars: &[OhlcvBar]) -> HashMap<NaiveDate, usize> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| (bar.date, i))
        .collect()
}

pub fn build_unified_timeline(data: &[InstrumentData]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = data
        .iter()
        .flat_map(|d| d.ohlcv.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
