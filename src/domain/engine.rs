//! Decision loop.
//!
//! Once per period the engine evaluates the regime gate, samples exposure,
//! and walks the universe in order, feeding each instrument's price and
//! indicator snapshot to the per-symbol policy. `Enter` and `Exit` are routed
//! to the execution port; everything else is recorded in the period report.
//! The position-state table is the only state carried between periods.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::error::VolshieldError;
use crate::domain::exposure::{ExposureGovernor, ExposurePolicy, current_exposure};
use crate::domain::policy::{Action, PerSymbolPolicy, PolicyParameters, PositionState};
use crate::domain::regime::RegimeGate;
use crate::domain::sizing::SizingParameters;
use crate::domain::universe::{InstrumentClass, Universe};
use crate::ports::execution_port::ExecutionPort;
use crate::ports::indicator_port::IndicatorPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::portfolio_port::PortfolioPort;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    pub sizing: SizingParameters,
    pub policy: PolicyParameters,
    pub exposure_policy: ExposurePolicy,
    /// Leading periods that are observed but never evaluated.
    pub warmup_periods: usize,
}

/// One instrument's outcome in one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub code: String,
    pub class: InstrumentClass,
    pub price: f64,
    pub action: Action,
    /// False when the execution port rejected an `Enter` or `Exit`; the
    /// position state was left unchanged.
    pub executed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReport {
    pub date: NaiveDate,
    pub warming_up: bool,
    /// Exposure fraction sampled before the first instrument.
    pub exposure: f64,
    pub regime: RegimeGate,
    pub decisions: Vec<Decision>,
    /// Instruments with no price or no indicator snapshot this period.
    pub missing: Vec<String>,
}

impl PeriodReport {
    fn warming(date: NaiveDate) -> Self {
        PeriodReport {
            date,
            warming_up: true,
            exposure: 0.0,
            regime: RegimeGate::closed(),
            decisions: Vec::new(),
            missing: Vec::new(),
        }
    }

    pub fn decision(&self, code: &str) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.code == code)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Decision> {
        self.decisions
            .iter()
            .filter(|d| d.executed && matches!(d.action, Action::Enter(_)))
    }

    pub fn exits(&self) -> impl Iterator<Item = &Decision> {
        self.decisions
            .iter()
            .filter(|d| d.executed && d.action == Action::Exit)
    }
}

pub struct DecisionEngine {
    universe: Universe,
    policy: PerSymbolPolicy,
    warmup_periods: usize,
    states: HashMap<String, PositionState>,
    periods_seen: usize,
}

impl DecisionEngine {
    /// Fails on parameter sets that cannot be traded; nothing after this
    /// point returns an error to the caller.
    pub fn new(universe: Universe, settings: EngineSettings) -> Result<Self, VolshieldError> {
        settings.sizing.validate()?;
        settings.policy.validate()?;

        let governor = ExposureGovernor::new(settings.sizing.exposure_ceiling, settings.exposure_policy);
        let states = universe
            .instruments
            .iter()
            .map(|i| (i.code.clone(), PositionState::Flat))
            .collect();

        Ok(DecisionEngine {
            universe,
            policy: PerSymbolPolicy::new(settings.policy, settings.sizing, governor),
            warmup_periods: settings.warmup_periods,
            states,
            periods_seen: 0,
        })
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn position_state(&self, code: &str) -> PositionState {
        self.states.get(code).copied().unwrap_or_default()
    }

    pub fn open_positions(&self) -> Vec<&str> {
        self.universe
            .instruments
            .iter()
            .filter(|i| self.position_state(&i.code).is_open())
            .map(|i| i.code.as_str())
            .collect()
    }

    pub fn periods_seen(&self) -> usize {
        self.periods_seen
    }

    pub fn is_warming_up(&self) -> bool {
        self.periods_seen < self.warmup_periods
    }

    /// Runs one period. Per-instrument problems (missing data, rejected
    /// orders) are logged and reported, never returned.
    pub fn step<B>(
        &mut self,
        date: NaiveDate,
        market: &dyn MarketDataPort,
        indicators: &dyn IndicatorPort,
        broker: &mut B,
    ) -> PeriodReport
    where
        B: ExecutionPort + PortfolioPort + ?Sized,
    {
        if self.is_warming_up() {
            self.periods_seen += 1;
            debug!(%date, period = self.periods_seen, "warm-up period, no evaluation");
            return PeriodReport::warming(date);
        }
        self.periods_seen += 1;

        let regime = RegimeGate::evaluate(market.benchmark_price(date), indicators.benchmark_average(date));
        let period_exposure = current_exposure(&broker.snapshot());
        debug!(%date, regime_open = regime.is_open(), exposure = period_exposure, "period start");

        let mut report = PeriodReport {
            date,
            warming_up: false,
            exposure: period_exposure,
            regime,
            decisions: Vec::with_capacity(self.universe.count()),
            missing: Vec::new(),
        };

        for instrument in &self.universe.instruments {
            let code = instrument.code.as_str();
            let observed = market
                .price(instrument, date)
                .zip(indicators.snapshot(code, date));
            let Some((price, snapshot)) = observed else {
                debug!(%date, code, "no data this period, skipped");
                report.missing.push(code.to_string());
                continue;
            };

            let state = self.states.get(code).copied().unwrap_or_default();
            let governor = self.policy.governor;
            let exposure = || governor.sample(period_exposure, || current_exposure(&broker.snapshot()));
            let transition = self
                .policy
                .evaluate(state, instrument.class, price, &snapshot, regime, exposure);

            let outcome = match transition.action {
                Action::Enter(weight) => broker.set_target_weight(code, weight),
                Action::Exit => broker.liquidate(code),
                Action::Hold | Action::Skip(_) => Ok(()),
            };

            let executed = match outcome {
                Ok(()) => {
                    self.states.insert(code.to_string(), transition.next);
                    true
                }
                Err(e) => {
                    warn!(%date, code, error = %e, "execution rejected, state unchanged");
                    false
                }
            };

            match transition.action {
                Action::Enter(weight) if executed => info!(
                    %date,
                    code,
                    class = %instrument.class,
                    price,
                    weight,
                    fast = snapshot.trend_band_fast.value,
                    slow = snapshot.trend_band_slow.value,
                    momentum = snapshot.momentum.value,
                    long_ma = snapshot.long_moving_average.value,
                    weekly_avg = snapshot.weekly_average_price.value,
                    "enter"
                ),
                Action::Exit if executed => {
                    let entry_price = state.entry_price().unwrap_or(price);
                    info!(%date, code, price, entry_price, "exit")
                }
                Action::Skip(reason) => debug!(%date, code, %reason, "skip"),
                _ => debug!(%date, code, price, "hold"),
            }

            report.decisions.push(Decision {
                code: code.to_string(),
                class: instrument.class,
                price,
                action: transition.action,
                executed,
            });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exposure::PortfolioSnapshot;
    use crate::domain::policy::SkipReason;
    use crate::domain::snapshot::{IndicatorSnapshot, Reading};
    use crate::domain::universe::Instrument;

    struct Fixed {
        prices: HashMap<String, f64>,
        snapshot: IndicatorSnapshot,
        benchmark: Option<f64>,
    }

    impl MarketDataPort for Fixed {
        fn price(&self, instrument: &Instrument, _date: NaiveDate) -> Option<f64> {
            self.prices.get(&instrument.code).copied()
        }
        fn benchmark_price(&self, _date: NaiveDate) -> Option<f64> {
            self.benchmark
        }
    }

    impl IndicatorPort for Fixed {
        fn snapshot(&self, code: &str, _date: NaiveDate) -> Option<IndicatorSnapshot> {
            self.prices.contains_key(code).then_some(self.snapshot)
        }
        fn benchmark_average(&self, _date: NaiveDate) -> Reading {
            Reading::ready(400.0)
        }
    }

    #[derive(Default)]
    struct Recorder {
        orders: Vec<(String, Option<f64>)>,
        reject: bool,
    }

    impl ExecutionPort for Recorder {
        fn set_target_weight(&mut self, code: &str, weight: f64) -> Result<(), VolshieldError> {
            if self.reject {
                return Err(VolshieldError::Execution {
                    code: code.into(),
                    reason: "rejected".into(),
                });
            }
            self.orders.push((code.to_string(), Some(weight)));
            Ok(())
        }
        fn liquidate(&mut self, code: &str) -> Result<(), VolshieldError> {
            self.orders.push((code.to_string(), None));
            Ok(())
        }
    }

    impl PortfolioPort for Recorder {
        fn snapshot(&self) -> PortfolioSnapshot {
            PortfolioSnapshot::new(100_000.0)
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn bullish() -> IndicatorSnapshot {
        IndicatorSnapshot {
            trend_band_fast: Reading::ready(95.0),
            trend_band_slow: Reading::ready(90.0),
            momentum: Reading::ready(60.0),
            long_moving_average: Reading::ready(98.0),
            weekly_average_price: Reading::ready(95.0),
            volatility: Reading::not_ready(),
        }
    }

    fn universe() -> Universe {
        Universe::from_lists(
            &[(InstrumentClass::Crypto, vec!["BTCUSD".into(), "ETHUSD".into()])],
            "SPY",
        )
        .unwrap()
    }

    fn feed(codes: &[&str]) -> Fixed {
        Fixed {
            prices: codes.iter().map(|c| (c.to_string(), 100.0)).collect(),
            snapshot: bullish(),
            benchmark: Some(450.0),
        }
    }

    #[test]
    fn invalid_sizing_is_rejected_at_construction() {
        let settings = EngineSettings {
            sizing: SizingParameters {
                min_weight: 0.5,
                max_weight: 0.2,
                ..SizingParameters::default()
            },
            ..EngineSettings::default()
        };
        assert!(DecisionEngine::new(universe(), settings).is_err());
    }

    #[test]
    fn enters_every_signalling_instrument_in_universe_order() {
        let mut engine = DecisionEngine::new(universe(), EngineSettings::default()).unwrap();
        let data = feed(&["BTCUSD", "ETHUSD"]);
        let mut broker = Recorder::default();

        let report = engine.step(date(), &data, &data, &mut broker);

        assert_eq!(
            broker.orders,
            vec![("BTCUSD".to_string(), Some(0.1)), ("ETHUSD".to_string(), Some(0.1))]
        );
        assert_eq!(report.entries().count(), 2);
        assert_eq!(engine.open_positions(), vec!["BTCUSD", "ETHUSD"]);
    }

    #[test]
    fn second_period_holds() {
        let mut engine = DecisionEngine::new(universe(), EngineSettings::default()).unwrap();
        let data = feed(&["BTCUSD", "ETHUSD"]);
        let mut broker = Recorder::default();

        engine.step(date(), &data, &data, &mut broker);
        let report = engine.step(date().succ_opt().unwrap(), &data, &data, &mut broker);

        assert_eq!(broker.orders.len(), 2);
        assert!(report.decisions.iter().all(|d| d.action == Action::Hold));
    }

    #[test]
    fn missing_data_skips_instrument_without_transition() {
        let mut engine = DecisionEngine::new(universe(), EngineSettings::default()).unwrap();
        let data = feed(&["ETHUSD"]);
        let mut broker = Recorder::default();

        let report = engine.step(date(), &data, &data, &mut broker);

        assert_eq!(report.missing, vec!["BTCUSD".to_string()]);
        assert!(report.decision("BTCUSD").is_none());
        assert_eq!(engine.position_state("BTCUSD"), PositionState::Flat);
        assert!(engine.position_state("ETHUSD").is_open());
    }

    #[test]
    fn warmup_periods_do_nothing() {
        let settings = EngineSettings {
            warmup_periods: 2,
            ..EngineSettings::default()
        };
        let mut engine = DecisionEngine::new(universe(), settings).unwrap();
        let data = feed(&["BTCUSD", "ETHUSD"]);
        let mut broker = Recorder::default();

        for _ in 0..2 {
            let report = engine.step(date(), &data, &data, &mut broker);
            assert!(report.warming_up);
            assert!(report.decisions.is_empty());
        }
        assert!(broker.orders.is_empty());

        let report = engine.step(date(), &data, &data, &mut broker);
        assert!(!report.warming_up);
        assert_eq!(report.entries().count(), 2);
        assert_eq!(engine.periods_seen(), 3);
    }

    /// Each fill adds 20% of a 100k book.
    #[derive(Default)]
    struct Filling {
        fills: usize,
    }

    impl ExecutionPort for Filling {
        fn set_target_weight(&mut self, _code: &str, _weight: f64) -> Result<(), VolshieldError> {
            self.fills += 1;
            Ok(())
        }
        fn liquidate(&mut self, _code: &str) -> Result<(), VolshieldError> {
            Ok(())
        }
    }

    impl PortfolioPort for Filling {
        fn snapshot(&self) -> PortfolioSnapshot {
            (0..self.fills).fold(PortfolioSnapshot::new(100_000.0), |p, i| {
                p.with_holding(&format!("H{}", i), 20_000.0)
            })
        }
    }

    #[test]
    fn exposure_policy_setting_reaches_entry_checks() {
        let codes = ["C1", "C2", "C3", "C4", "C5", "C6"];
        let many = Universe::from_lists(
            &[(InstrumentClass::Crypto, codes.iter().map(|c| c.to_string()).collect())],
            "SPY",
        )
        .unwrap();
        let data = feed(&codes);

        let mut per = DecisionEngine::new(many.clone(), EngineSettings::default()).unwrap();
        let report = per.step(date(), &data, &data, &mut Filling::default());
        assert_eq!(report.entries().count(), 5);
        assert_eq!(
            report.decision("C6").unwrap().action,
            Action::Skip(SkipReason::ExposureCeiling)
        );

        let settings = EngineSettings {
            exposure_policy: ExposurePolicy::OncePerPeriod,
            ..EngineSettings::default()
        };
        let mut once = DecisionEngine::new(many, settings).unwrap();
        let report = once.step(date(), &data, &data, &mut Filling::default());
        assert_eq!(report.entries().count(), 6);
    }

    #[test]
    fn rejected_order_leaves_state_flat() {
        let mut engine = DecisionEngine::new(universe(), EngineSettings::default()).unwrap();
        let data = feed(&["BTCUSD"]);
        let mut broker = Recorder {
            reject: true,
            ..Recorder::default()
        };

        let report = engine.step(date(), &data, &data, &mut broker);

        let decision = report.decision("BTCUSD").unwrap();
        assert!(matches!(decision.action, Action::Enter(_)));
        assert!(!decision.executed);
        assert_eq!(engine.position_state("BTCUSD"), PositionState::Flat);
        assert_eq!(report.entries().count(), 0);
    }

    #[test]
    fn regime_evaluated_once_and_reported() {
        let equities = Universe::from_lists(&[(InstrumentClass::Equity, vec!["AAPL".into()])], "SPY").unwrap();
        let mut engine = DecisionEngine::new(equities, EngineSettings::default()).unwrap();
        let mut data = feed(&["AAPL"]);
        data.benchmark = None;
        let mut broker = Recorder::default();

        let report = engine.step(date(), &data, &data, &mut broker);

        assert!(!report.regime.is_open());
        assert_eq!(
            report.decision("AAPL").unwrap().action,
            Action::Skip(SkipReason::RegimeDenied)
        );
    }
}
