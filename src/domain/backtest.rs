//! Backtest driver: replays a timeline through the decision engine.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::engine::{DecisionEngine, PeriodReport};
use crate::domain::error::VolshieldError;
use crate::domain::policy::{Action, SkipReason};
use crate::ports::execution_port::ExecutionPort;
use crate::ports::indicator_port::IndicatorPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::portfolio_port::PortfolioPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub data_dir: String,
    pub warmup_periods: usize,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), VolshieldError> {
        if self.start_date > self.end_date {
            return Err(VolshieldError::invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
        if !(self.initial_capital > 0.0) {
            return Err(VolshieldError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        Ok(())
    }
}

/// Counters accumulated over every period of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub periods: usize,
    pub warmup_periods: usize,
    pub entries: usize,
    pub exits: usize,
    pub holds: usize,
    pub rejected_orders: usize,
    pub skips: HashMap<SkipReason, usize>,
    pub missing_observations: usize,
    pub regime_closed_periods: usize,
    pub peak_exposure: f64,
}

impl RunSummary {
    pub fn absorb(&mut self, report: &PeriodReport) {
        self.periods += 1;
        if report.warming_up {
            self.warmup_periods += 1;
            return;
        }
        if !report.regime.is_open() {
            self.regime_closed_periods += 1;
        }
        self.peak_exposure = self.peak_exposure.max(report.exposure);
        self.missing_observations += report.missing.len();

        for decision in &report.decisions {
            match decision.action {
                Action::Enter(_) | Action::Exit if !decision.executed => self.rejected_orders += 1,
                Action::Enter(_) => self.entries += 1,
                Action::Exit => self.exits += 1,
                Action::Hold => self.holds += 1,
                Action::Skip(reason) => *self.skips.entry(reason).or_insert(0) += 1,
            }
        }
    }

    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skips.get(&reason).copied().unwrap_or(0)
    }
}

/// Marks the broker at each date's prices, then runs one engine period.
pub fn run_backtest<B>(
    engine: &mut DecisionEngine,
    timeline: &[NaiveDate],
    market: &dyn MarketDataPort,
    indicators: &dyn IndicatorPort,
    broker: &mut B,
) -> RunSummary
where
    B: ExecutionPort + PortfolioPort + ?Sized,
{
    let mut summary = RunSummary::default();

    for &date in timeline {
        let prices: HashMap<String, f64> = engine
            .universe()
            .instruments
            .iter()
            .filter_map(|i| market.price(i, date).map(|p| (i.code.clone(), p)))
            .collect();
        broker.mark_to_market(date, &prices);

        let report = engine.step(date, market, indicators, &mut *broker);
        summary.absorb(&report);
    }

    info!(
        periods = summary.periods,
        entries = summary.entries,
        exits = summary.exits,
        "backtest finished"
    );
    summary
}
