#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use volshield::domain::error::VolshieldError;
use volshield::domain::exposure::PortfolioSnapshot;
pub use volshield::domain::ohlcv::OhlcvBar;
use volshield::domain::snapshot::{IndicatorSnapshot, Reading};
use volshield::domain::universe::{Instrument, InstrumentClass, Universe};
use volshield::ports::data_port::DataPort;
use volshield::ports::execution_port::ExecutionPort;
use volshield::ports::indicator_port::IndicatorPort;
use volshield::ports::market_data_port::MarketDataPort;
use volshield::ports::portfolio_port::PortfolioPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, VolshieldError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(VolshieldError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(code).ok_or_else(|| VolshieldError::NoData {
            code: code.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .cloned()
            .collect())
    }
}

/// Price and indicator source scripted per (code, date).
#[derive(Default)]
pub struct ScriptedFeed {
    pub prices: HashMap<(String, NaiveDate), f64>,
    pub snapshots: HashMap<(String, NaiveDate), IndicatorSnapshot>,
    pub benchmark_prices: HashMap<NaiveDate, f64>,
    pub benchmark_averages: HashMap<NaiveDate, f64>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: &str, date: NaiveDate, price: f64, snapshot: IndicatorSnapshot) -> Self {
        self.prices.insert((code.to_string(), date), price);
        self.snapshots.insert((code.to_string(), date), snapshot);
        self
    }

    pub fn with_benchmark(mut self, date: NaiveDate, price: f64, average: f64) -> Self {
        self.benchmark_prices.insert(date, price);
        self.benchmark_averages.insert(date, average);
        self
    }
}

impl MarketDataPort for ScriptedFeed {
    fn price(&self, instrument: &Instrument, date: NaiveDate) -> Option<f64> {
        self.prices.get(&(instrument.code.clone(), date)).copied()
    }

    fn benchmark_price(&self, date: NaiveDate) -> Option<f64> {
        self.benchmark_prices.get(&date).copied()
    }
}

impl IndicatorPort for ScriptedFeed {
    fn snapshot(&self, code: &str, date: NaiveDate) -> Option<IndicatorSnapshot> {
        self.snapshots.get(&(code.to_string(), date)).copied()
    }

    fn benchmark_average(&self, date: NaiveDate) -> Reading {
        self.benchmark_averages
            .get(&date)
            .map_or_else(Reading::not_ready, |&v| Reading::ready(v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    Target(String, f64),
    Liquidate(String),
}

/// Broker whose holdings are exactly the weights it was told to hold.
pub struct MockBroker {
    pub total_value: f64,
    pub holdings: HashMap<String, f64>,
    pub orders: Vec<Order>,
}

impl MockBroker {
    pub fn new(total_value: f64) -> Self {
        Self {
            total_value,
            holdings: HashMap::new(),
            orders: Vec::new(),
        }
    }

    pub fn with_holding(mut self, code: &str, value: f64) -> Self {
        self.holdings.insert(code.to_string(), value);
        self
    }

    pub fn entered(&self) -> Vec<String> {
        self.orders
            .iter()
            .filter_map(|o| match o {
                Order::Target(code, _) => Some(code.clone()),
                Order::Liquidate(_) => None,
            })
            .collect()
    }
}

impl ExecutionPort for MockBroker {
    fn set_target_weight(&mut self, code: &str, weight: f64) -> Result<(), VolshieldError> {
        self.holdings
            .insert(code.to_string(), weight * self.total_value);
        self.orders.push(Order::Target(code.to_string(), weight));
        Ok(())
    }

    fn liquidate(&mut self, code: &str) -> Result<(), VolshieldError> {
        self.holdings.remove(code);
        self.orders.push(Order::Liquidate(code.to_string()));
        Ok(())
    }
}

impl PortfolioPort for MockBroker {
    fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            total_value: self.total_value,
            holdings: self.holdings.clone(),
        }
    }
}

/// Every entry condition holds at price 100 for any class (weekly average
/// 99 keeps 100 under 1.02 * 99).
pub fn bullish_snapshot() -> IndicatorSnapshot {
    IndicatorSnapshot {
        trend_band_fast: Reading::ready(95.0),
        trend_band_slow: Reading::ready(90.0),
        momentum: Reading::ready(60.0),
        long_moving_average: Reading::ready(98.0),
        weekly_average_price: Reading::ready(99.0),
        volatility: Reading::ready(1.5),
    }
}

/// Both trend bands above a price of 100.
pub fn broken_snapshot() -> IndicatorSnapshot {
    IndicatorSnapshot {
        trend_band_fast: Reading::ready(101.0),
        trend_band_slow: Reading::ready(102.0),
        ..bullish_snapshot()
    }
}

pub fn universe(crypto: &[&str], equity: &[&str], forex: &[&str]) -> Universe {
    let list = |codes: &[&str]| codes.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    Universe::from_lists(
        &[
            (InstrumentClass::Crypto, list(crypto)),
            (InstrumentClass::Equity, list(equity)),
            (InstrumentClass::Forex, list(forex)),
        ],
        "SPY",
    )
    .unwrap()
}

pub fn make_bar(code: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
        bid_close: None,
        ask_close: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One bar per calendar day from `start_date` with the given closes.
pub fn bars_from_closes(code: &str, start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            code: code.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
            bid_close: None,
            ask_close: None,
        })
        .collect()
}

/// `rise` bars climbing in a +2/-1 zigzag, then `fall` bars dropping 5 a day.
pub fn rally_then_crash(rise: usize, fall: usize, start_price: f64) -> Vec<f64> {
    let mut closes = Vec::with_capacity(rise + fall);
    let mut price = start_price;
    for i in 0..rise {
        price += if i % 2 == 0 { 2.0 } else { -1.0 };
        closes.push(price);
    }
    for _ in 0..fall {
        price -= 5.0;
        closes.push(price);
    }
    closes
}
