//! Simple Moving Average of closes. Used as the weekly average price with a
//! window of `weeks * 5` trading days.
//!
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const TRADING_DAYS_PER_WEEK: usize = 5;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Sma(period));
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += bar.close;
        if i >= period {
            window_sum -= bars[i - period].close;
        }

        if i + 1 < period {
            values.push(IndicatorPoint::warming(bar.date));
        } else {
            values.push(IndicatorPoint::ready(bar.date, window_sum / period as f64));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

/// Weekly average price over `weeks` trading weeks.
pub fn calculate_weekly_average(bars: &[OhlcvBar], weeks: usize) -> IndicatorSeries {
    calculate_sma(bars, weeks * TRADING_DAYS_PER_WEEK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::closes;

    #[test]
    fn sma_warmup_and_values() {
        let series = calculate_sma(&closes(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);

        assert_eq!(series.warmup_len(), 2);
        assert!((series.values[2].value - 2.0).abs() < f64::EPSILON);
        assert!((series.values[3].value - 3.0).abs() < f64::EPSILON);
        assert!((series.values[4].value - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weekly_average_uses_five_day_weeks() {
        let prices: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let series = calculate_weekly_average(&closes(&prices), 5);

        assert_eq!(series.indicator_type, IndicatorType::Sma(25));
        assert_eq!(series.warmup_len(), 24);
        // mean of 1..=25
        assert!((series.values[24].value - 13.0).abs() < 1e-9);
        // mean of 6..=30
        assert!((series.values[29].value - 18.0).abs() < 1e-9);
    }

    #[test]
    fn sma_zero_period() {
        assert!(calculate_sma(&closes(&[1.0]), 0).values.is_empty());
    }
}
