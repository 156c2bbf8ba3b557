//! Average True Range with Wilder's smoothing.
//!
//! TR[0] = high - low; TR[i] = true range against the previous close.
//! Seed = mean of the first n TRs, then ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn true_ranges(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Atr(period));
    }

    let tr = true_ranges(bars);
    let mut values = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i < period - 1 {
            values.push(IndicatorPoint::warming(bar.date));
        } else if i == period - 1 {
            atr = tr[..period].iter().sum::<f64>() / period as f64;
            values.push(IndicatorPoint::ready(bar.date, atr));
        } else {
            atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
            values.push(IndicatorPoint::ready(bar.date, atr));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
