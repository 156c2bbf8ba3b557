//! Benchmark regime gate for equity entries.
//!
//! Evaluated once per period from the benchmark's price and its long moving
//! average, then shared by every equity checked in that period. Other
//! instrument classes are not gated.

use crate::domain::snapshot::Reading;
use crate::domain::universe::InstrumentClass;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeGate {
    open: bool,
}

impl RegimeGate {
    /// Open unless the benchmark trades below its average. A missing price or
    /// an average without enough history keeps the gate closed.
    pub fn evaluate(benchmark_price: Option<f64>, benchmark_average: Reading) -> Self {
        let open = match (benchmark_price, benchmark_average.get()) {
            (Some(price), Some(average)) => price >= average,
            _ => false,
        };
        RegimeGate { open }
    }

    pub fn open() -> Self {
        RegimeGate { open: true }
    }

    pub fn closed() -> Self {
        RegimeGate { open: false }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn allow_entry(&self, class: InstrumentClass) -> bool {
        match class {
            InstrumentClass::Equity => self.open,
            InstrumentClass::Crypto | InstrumentClass::Forex => true,
        }
    }
}
