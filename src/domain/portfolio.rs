//! Cash-and-holdings ledger with an equity curve.
//!
//! Holdings are valued at the last mark per code. Fills are frictionless and
//! happen at the mark, so a rebalance never changes total equity.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::exposure::PortfolioSnapshot;
use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub marks: HashMap<String, f64>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            marks: HashMap::new(),
        }
    }

    pub fn has_position(&self, code: &str) -> bool {
        self.positions.contains_key(code)
    }

    pub fn mark(&mut self, code: &str, price: f64) {
        self.marks.insert(code.to_string(), price);
    }

    pub fn mark_price(&self, code: &str) -> Option<f64> {
        self.marks.get(code).copied()
    }

    pub fn holding_value(&self, code: &str) -> f64 {
        match (self.positions.get(code), self.mark_price(code)) {
            (Some(pos), Some(price)) => pos.market_value(price),
            (Some(pos), None) => pos.market_value(pos.entry_price),
            _ => 0.0,
        }
    }

    pub fn total_equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .keys()
            .map(|code| self.holding_value(code))
            .sum();
        self.cash + position_value
    }

    pub fn record_equity(&mut self, date: NaiveDate) {
        let equity = self.total_equity();
        self.equity_curve.push(EquityPoint { date, equity });
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        let holdings = self
            .positions
            .keys()
            .map(|code| (code.clone(), self.holding_value(code)))
            .collect();
        PortfolioSnapshot {
            total_value: self.total_equity(),
            holdings,
        }
    }

    /// Buys or sells at `price` until the holding is worth `target_value`.
    /// Any reduction is booked as a closed trade for the units sold.
    pub fn rebalance(&mut self, code: &str, target_value: f64, price: f64, date: NaiveDate) {
        let current_qty = self.positions.get(code).map_or(0.0, |p| p.quantity);
        let target_qty = target_value / price;
        let delta = target_qty - current_qty;

        if delta > 0.0 {
            self.cash -= delta * price;
            self.positions
                .entry(code.to_string())
                .and_modify(|p| p.add(delta, price))
                .or_insert_with(|| Position {
                    code: code.to_string(),
                    quantity: delta,
                    entry_price: price,
                    entry_date: date,
                });
        } else if delta < 0.0 {
            self.sell(code, -delta, price, date);
        }
    }

    /// Sells the whole holding. Returns the realized trade, if any.
    pub fn close(&mut self, code: &str, price: f64, date: NaiveDate) -> Option<ClosedTrade> {
        let qty = self.positions.get(code)?.quantity;
        self.sell(code, qty, price, date);
        self.closed_trades.last().cloned()
    }

    fn sell(&mut self, code: &str, quantity: f64, price: f64, date: NaiveDate) {
        let Some(pos) = self.positions.get_mut(code) else {
            return;
        };
        let quantity = quantity.min(pos.quantity);
        self.closed_trades
            .push(ClosedTrade::from_position(pos, quantity, price, date));
        self.cash += quantity * price;
        pos.quantity -= quantity;
        if pos.quantity <= f64::EPSILON {
            self.positions.remove(code);
        }
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        (self.total_equity() - self.initial_capital) / self.initial_capital
    }

    /// Largest peak-to-trough fall of the equity curve, as a fraction of the peak.
    pub fn max_drawdown(&self) -> f64 {
        let mut peak = f64::MIN;
        let mut worst: f64 = 0.0;
        for point in &self.equity_curve {
            peak = peak.max(point.equity);
            if peak > 0.0 {
                worst = worst.max((peak - point.equity) / peak);
            }
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100000.0);
        assert_relative_eq!(portfolio.cash, 100000.0);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.closed_trades.is_empty());
        assert!(portfolio.equity_curve.is_empty());
        assert_relative_eq!(portfolio.total_equity(), 100000.0);
    }

    #[test]
    fn rebalance_opens_position_at_target_value() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.mark("BTCUSD", 40_000.0);
        portfolio.rebalance("BTCUSD", 10_000.0, 40_000.0, day(2));

        let pos = portfolio.positions.get("BTCUSD").unwrap();
        assert_relative_eq!(pos.quantity, 0.25);
        assert_relative_eq!(portfolio.cash, 90_000.0);
        assert_relative_eq!(portfolio.total_equity(), 100_000.0);
        assert_relative_eq!(portfolio.holding_value("BTCUSD"), 10_000.0);
    }

    #[test]
    fn rebalance_down_books_partial_trade() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.mark("AAPL", 100.0);
        portfolio.rebalance("AAPL", 20_000.0, 100.0, day(2));

        portfolio.mark("AAPL", 110.0);
        portfolio.rebalance("AAPL", 11_000.0, 110.0, day(3));

        let pos = portfolio.positions.get("AAPL").unwrap();
        assert_relative_eq!(pos.quantity, 100.0, epsilon = 1e-9);
        assert_eq!(portfolio.closed_trades.len(), 1);
        assert_relative_eq!(portfolio.closed_trades[0].pnl, 1_000.0, epsilon = 1e-9);
    }

    #[test]
    fn close_realizes_pnl_and_removes_position() {
        let mut portfolio = Portfolio::new(50_000.0);
        portfolio.mark("ETHUSD", 2_000.0);
        portfolio.rebalance("ETHUSD", 10_000.0, 2_000.0, day(2));

        portfolio.mark("ETHUSD", 2_500.0);
        let trade = portfolio.close("ETHUSD", 2_500.0, day(9)).unwrap();

        assert_relative_eq!(trade.pnl, 2_500.0, epsilon = 1e-9);
        assert!(!portfolio.has_position("ETHUSD"));
        assert_relative_eq!(portfolio.cash, 52_500.0, epsilon = 1e-9);
        assert!(portfolio.close("ETHUSD", 2_500.0, day(10)).is_none());
    }

    #[test]
    fn snapshot_reflects_marks() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.mark("AAPL", 100.0);
        portfolio.rebalance("AAPL", 5_000.0, 100.0, day(2));
        portfolio.mark("AAPL", 120.0);

        let snap = portfolio.snapshot();
        assert_relative_eq!(snap.total_value, 11_000.0);
        assert_relative_eq!(snap.holdings["AAPL"], 6_000.0);
    }

    #[test]
    fn equity_curve_and_drawdown() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.mark("AAPL", 100.0);
        portfolio.rebalance("AAPL", 50_000.0, 100.0, day(1));
        portfolio.record_equity(day(1));

        portfolio.mark("AAPL", 120.0);
        portfolio.record_equity(day(2));

        portfolio.mark("AAPL", 90.0);
        portfolio.record_equity(day(3));

        assert_eq!(portfolio.equity_curve.len(), 3);
        assert_relative_eq!(portfolio.equity_curve[1].equity, 110_000.0);
        // 110k -> 95k
        assert_relative_eq!(portfolio.max_drawdown(), 15.0 / 110.0, epsilon = 1e-12);
        assert_relative_eq!(portfolio.total_return(), -0.05, epsilon = 1e-12);
    }
}
