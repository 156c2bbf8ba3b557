//! Frictionless paper broker: fills every target weight in full at the
//! current mark, with no slippage, fees or partial fills.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::error::VolshieldError;
use crate::domain::exposure::PortfolioSnapshot;
use crate::domain::portfolio::Portfolio;
use crate::ports::execution_port::ExecutionPort;
use crate::ports::portfolio_port::PortfolioPort;

pub struct PaperBroker {
    portfolio: Portfolio,
    date: Option<NaiveDate>,
}

impl PaperBroker {
    pub fn new(initial_capital: f64) -> Self {
        PaperBroker {
            portfolio: Portfolio::new(initial_capital),
            date: None,
        }
    }

    pub fn into_portfolio(self) -> Portfolio {
        self.portfolio
    }

    fn fill_context(&self, code: &str) -> Result<(f64, NaiveDate), VolshieldError> {
        let reject = |reason: &str| VolshieldError::Execution {
            code: code.to_string(),
            reason: reason.to_string(),
        };
        let date = self.date.ok_or_else(|| reject("no period has been marked yet"))?;
        let price = self
            .portfolio
            .mark_price(code)
            .filter(|p| *p > 0.0)
            .ok_or_else(|| reject("no positive price to fill at"))?;
        Ok((price, date))
    }
}

impl ExecutionPort for PaperBroker {
    fn set_target_weight(&mut self, code: &str, weight: f64) -> Result<(), VolshieldError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(VolshieldError::Execution {
                code: code.to_string(),
                reason: format!("target weight {} is not a non-negative number", weight),
            });
        }
        let (price, date) = self.fill_context(code)?;
        let target_value = weight * self.portfolio.total_equity();
        self.portfolio.rebalance(code, target_value, price, date);
        debug!(code, weight, price, target_value, "filled target weight");
        Ok(())
    }

    fn liquidate(&mut self, code: &str) -> Result<(), VolshieldError> {
        if !self.portfolio.has_position(code) {
            return Ok(());
        }
        let (price, date) = self.fill_context(code)?;
        if let Some(trade) = self.portfolio.close(code, price, date) {
            debug!(code, price, pnl = trade.pnl, "liquidated");
        }
        Ok(())
    }

    fn mark_to_market(&mut self, date: NaiveDate, prices: &HashMap<String, f64>) {
        self.date = Some(date);
        for (code, &price) in prices {
            self.portfolio.mark(code, price);
        }
        self.portfolio.record_equity(date);
    }
}

impl PortfolioPort for PaperBroker {
    fn snapshot(&self) -> PortfolioSnapshot {
        self.portfolio.snapshot()
    }
}
