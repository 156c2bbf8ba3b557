//! Open holdings and closed trades in the paper ledger.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub code: String,
    /// Fractional units; target-weight fills rarely land on whole units.
    pub quantity: f64,
    /// Volume-weighted average cost of the units still held.
    pub entry_price: f64,
    pub entry_date: NaiveDate,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Adds units, re-averaging the cost basis.
    pub fn add(&mut self, quantity: f64, price: f64) {
        let total = self.quantity + quantity;
        if total > 0.0 {
            self.entry_price = (self.entry_price * self.quantity + price * quantity) / total;
        }
        self.quantity = total;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub code: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn from_position(position: &Position, quantity: f64, exit_price: f64, exit_date: NaiveDate) -> Self {
        ClosedTrade {
            code: position.code.clone(),
            quantity,
            entry_price: position.entry_price,
            exit_price,
            entry_date: position.entry_date,
            exit_date,
            pnl: quantity * (exit_price - position.entry_price),
        }
    }

    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.exit_price - self.entry_price) / self.entry_price
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
