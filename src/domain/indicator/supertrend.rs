//! Supertrend: ATR-based trailing band.
//!
//! basic_upper = hl2 + m * ATR, basic_lower = hl2 - m * ATR. The final upper
//! band may only tighten (decrease) while the previous close stays beneath
//! it; the final lower band may only rise while the previous close stays
//! above it. The trend flips down when the close breaks the lower band and up
//! when it breaks the upper band. Output is the lower band in an uptrend and
//! the upper band in a downtrend.
//!
//! Warmup: same as ATR(n), the first (n-1) bars are invalid.

use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, multiplier_x100,
};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_supertrend(bars: &[OhlcvBar], period: usize, multiplier: f64) -> IndicatorSeries {
    let indicator_type = IndicatorType::Supertrend {
        period,
        multiplier_x100: multiplier_x100(multiplier),
    };

    let atr = calculate_atr(bars, period);
    let start = match atr.values.iter().position(|p| p.valid) {
        Some(idx) => idx,
        None => {
            return IndicatorSeries {
                indicator_type,
                values: bars.iter().map(|b| IndicatorPoint::warming(b.date)).collect(),
            };
        }
    };

    let mut values: Vec<IndicatorPoint> = bars[..start]
        .iter()
        .map(|b| IndicatorPoint::warming(b.date))
        .collect();

    let hl2 = bars[start].median_price();
    let mut upper = hl2 + multiplier * atr.values[start].value;
    let mut lower = hl2 - multiplier * atr.values[start].value;
    let mut trending_up = bars[start].close >= lower;
    values.push(IndicatorPoint::ready(
        bars[start].date,
        if trending_up { lower } else { upper },
    ));

    for i in (start + 1)..bars.len() {
        let bar = &bars[i];
        let band = multiplier * atr.values[i].value;
        let basic_upper = bar.median_price() + band;
        let basic_lower = bar.median_price() - band;
        let prev_close = bars[i - 1].close;

        upper = if prev_close <= upper {
            basic_upper.min(upper)
        } else {
            basic_upper
        };
        lower = if prev_close >= lower {
            basic_lower.max(lower)
        } else {
            basic_lower
        };

        if trending_up && bar.close < lower {
            trending_up = false;
        } else if !trending_up && bar.close > upper {
            trending_up = true;
        }

        values.push(IndicatorPoint::ready(
            bar.date,
            if trending_up { lower } else { upper },
        ));
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::bar;

    fn rising(count: usize) -> Vec<OhlcvBar> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                bar(i, base + 3.0, base - 3.0, base + 1.0)
            })
            .collect()
    }

    fn falling(count: usize) -> Vec<OhlcvBar> {
        (0..count)
            .map(|i| {
                let base = 200.0 - i as f64 * 2.0;
                bar(i, base + 3.0, base - 3.0, base - 1.0)
            })
            .collect()
    }

    #[test]
    fn warmup_matches_atr() {
        let series = calculate_supertrend(&rising(15), 10, 2.5);
        assert_eq!(series.values.len(), 15);
        assert_eq!(series.warmup_len(), 9);
    }

    #[test]
    fn uptrend_band_sits_below_close() {
        let bars = rising(30);
        let series = calculate_supertrend(&bars, 10, 2.5);
        for (point, bar) in series.values.iter().zip(&bars).skip(9) {
            assert!(point.valid);
            assert!(point.value < bar.close);
        }
    }

    #[test]
    fn downtrend_band_sits_above_close() {
        let bars = falling(30);
        let series = calculate_supertrend(&bars, 10, 2.5);
        // Seeded as an uptrend; the close breaks the frozen lower band at bar 17.
        for (point, bar) in series.values.iter().zip(&bars).skip(17) {
            assert!(point.value > bar.close);
        }
        assert!(series.values[15].value < bars[15].close);
    }

    #[test]
    fn wider_multiplier_trails_further() {
        let bars = rising(30);
        let fast = calculate_supertrend(&bars, 10, 2.5);
        let slow = calculate_supertrend(&bars, 10, 3.0);
        for i in 9..30 {
            assert!(slow.values[i].value < fast.values[i].value);
        }
    }

    #[test]
    fn lower_band_never_decreases_in_uptrend() {
        let series = calculate_supertrend(&rising(30), 10, 3.0);
        for pair in series.values[9..].windows(2) {
            assert!(pair[1].value >= pair[0].value);
        }
    }

    #[test]
    fn short_history_is_all_invalid() {
        let series = calculate_supertrend(&rising(5), 10, 3.0);
        assert_eq!(series.values.len(), 5);
        assert!(series.values.iter().all(|p| !p.valid));
        assert_eq!(
            series.indicator_type,
            IndicatorType::Supertrend {
                period: 10,
                multiplier_x100: 300
            }
        );
    }
}
