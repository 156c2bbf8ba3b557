//! In-memory price and indicator feed built from loaded bar history.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::code_data::{BenchmarkData, IndicatorSettings, InstrumentData, build_unified_timeline};
use crate::domain::error::VolshieldError;
use crate::domain::snapshot::{IndicatorSnapshot, Reading};
use crate::domain::universe::{Instrument, Universe};
use crate::ports::data_port::DataPort;
use crate::ports::indicator_port::IndicatorPort;
use crate::ports::market_data_port::MarketDataPort;

pub struct HistoryFeed {
    instruments: Vec<InstrumentData>,
    by_code: HashMap<String, usize>,
    benchmark: Option<BenchmarkData>,
}

/// What loading left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Instruments with no file, no rows in range, or unreadable data.
    pub skipped: Vec<(String, String)>,
    pub benchmark_missing: bool,
}

impl HistoryFeed {
    pub fn new(instruments: Vec<InstrumentData>, benchmark: Option<BenchmarkData>) -> Self {
        let by_code = instruments
            .iter()
            .enumerate()
            .map(|(i, d)| (d.code().to_string(), i))
            .collect();
        HistoryFeed {
            instruments,
            by_code,
            benchmark,
        }
    }

    /// Loads every instrument in the universe plus the benchmark. A code that
    /// fails to load is skipped with a warning; it fails only when nothing at
    /// all could be loaded.
    pub fn load(
        data_port: &dyn DataPort,
        universe: &Universe,
        settings: &IndicatorSettings,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(Self, LoadReport), VolshieldError> {
        let mut report = LoadReport::default();
        let mut loaded = Vec::with_capacity(universe.count());

        for instrument in &universe.instruments {
            match data_port.fetch_bars(&instrument.code, start_date, end_date) {
                Ok(bars) if bars.is_empty() => {
                    warn!(code = %instrument.code, "no bars in range, skipping");
                    report
                        .skipped
                        .push((instrument.code.clone(), "no bars in range".into()));
                }
                Ok(bars) => {
                    debug!(code = %instrument.code, bars = bars.len(), "loaded");
                    loaded.push(InstrumentData::new(instrument.clone(), bars, settings));
                }
                Err(e) => {
                    warn!(code = %instrument.code, error = %e, "skipping");
                    report.skipped.push((instrument.code.clone(), e.to_string()));
                }
            }
        }

        if loaded.is_empty() {
            return Err(VolshieldError::Data {
                reason: "no instrument in the universe has data in range".into(),
            });
        }

        let benchmark = match data_port.fetch_bars(&universe.benchmark, start_date, end_date) {
            Ok(bars) if !bars.is_empty() => Some(BenchmarkData::new(
                universe.benchmark.clone(),
                bars,
                settings.benchmark_ma_period,
            )),
            Ok(_) | Err(_) => {
                warn!(
                    benchmark = %universe.benchmark,
                    "benchmark unavailable, equity entries will be denied"
                );
                report.benchmark_missing = true;
                None
            }
        };

        Ok((HistoryFeed::new(loaded, benchmark), report))
    }

    pub fn timeline(&self) -> Vec<NaiveDate> {
        build_unified_timeline(&self.instruments)
    }

    pub fn instrument(&self, code: &str) -> Option<&InstrumentData> {
        self.by_code.get(code).map(|&i| &self.instruments[i])
    }

    pub fn loaded_count(&self) -> usize {
        self.instruments.len()
    }
}

impl MarketDataPort for HistoryFeed {
    fn price(&self, instrument: &Instrument, date: NaiveDate) -> Option<f64> {
        self.instrument(&instrument.code)?.price(date)
    }

    fn benchmark_price(&self, date: NaiveDate) -> Option<f64> {
        self.benchmark.as_ref()?.price(date)
    }
}

impl IndicatorPort for HistoryFeed {
    fn snapshot(&self, code: &str, date: NaiveDate) -> Option<IndicatorSnapshot> {
        self.instrument(code)?.snapshot(date)
    }

    fn benchmark_average(&self, date: NaiveDate) -> Reading {
        self.benchmark
            .as_ref()
            .map_or_else(Reading::not_ready, |b| b.average(date))
    }
}
