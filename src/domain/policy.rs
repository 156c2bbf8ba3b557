//! Per-symbol decision policy.
//!
//! A two-state machine per instrument. While flat, an entry requires the
//! regime gate (equities only), room under the exposure ceiling, and all five
//! entry conditions at once:
//!
//! ```text
//! price > trend_band_fast
//! price > trend_band_slow
//! momentum > momentum_threshold
//! price > long_moving_average
//! price < class_factor * weekly_average_price
//! ```
//!
//! While open, the position is closed only when price is below both trend
//! bands.

use std::fmt;

use crate::domain::error::VolshieldError;
use crate::domain::exposure::ExposureGovernor;
use crate::domain::regime::RegimeGate;
use crate::domain::sizing::{SizingParameters, entry_weight};
use crate::domain::snapshot::IndicatorSnapshot;
use crate::domain::universe::InstrumentClass;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open {
        entry_price: f64,
    },
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open { .. })
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            PositionState::Open { entry_price } => Some(*entry_price),
            PositionState::Flat => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    RegimeDenied,
    ExposureCeiling,
    IndicatorNotReady,
    NoSignal,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::RegimeDenied => "regime_denied",
            SkipReason::ExposureCeiling => "exposure_ceiling",
            SkipReason::IndicatorNotReady => "indicator_not_ready",
            SkipReason::NoSignal => "no_signal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Enter(f64),
    Exit,
    Hold,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next: PositionState,
    pub action: Action,
}

/// Per-class ceiling on how far above the weekly average price an entry may
/// still be taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryFactors {
    pub crypto: f64,
    pub equity: f64,
    pub forex: f64,
}

impl Default for EntryFactors {
    fn default() -> Self {
        EntryFactors {
            crypto: 1.10,
            equity: 1.02,
            forex: 1.02,
        }
    }
}

impl EntryFactors {
    pub fn for_class(&self, class: InstrumentClass) -> f64 {
        match class {
            InstrumentClass::Crypto => self.crypto,
            InstrumentClass::Equity => self.equity,
            InstrumentClass::Forex => self.forex,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyParameters {
    pub momentum_threshold: f64,
    pub entry_factors: EntryFactors,
}

impl Default for PolicyParameters {
    fn default() -> Self {
        PolicyParameters {
            momentum_threshold: 55.0,
            entry_factors: EntryFactors::default(),
        }
    }
}

impl PolicyParameters {
    pub fn validate(&self) -> Result<(), VolshieldError> {
        if !(0.0..100.0).contains(&self.momentum_threshold) {
            return Err(VolshieldError::invalid(
                "policy",
                "momentum_threshold",
                "momentum_threshold must be in [0, 100)",
            ));
        }
        let factors = [
            ("crypto_factor", self.entry_factors.crypto),
            ("equity_factor", self.entry_factors.equity),
            ("forex_factor", self.entry_factors.forex),
        ];
        for (key, factor) in factors {
            if !(factor > 0.0) {
                return Err(VolshieldError::invalid("policy", key, format!("{} must be positive", key)));
            }
        }
        Ok(())
    }
}

/// The five-way entry conjunction. Readiness is checked by the caller.
pub fn entry_signal(price: f64, snapshot: &IndicatorSnapshot, class_factor: f64, momentum_threshold: f64) -> bool {
    price > snapshot.trend_band_fast.value
        && price > snapshot.trend_band_slow.value
        && snapshot.momentum.value > momentum_threshold
        && price > snapshot.long_moving_average.value
        && price < class_factor * snapshot.weekly_average_price.value
}

/// Both trend bands broken.
pub fn exit_signal(price: f64, snapshot: &IndicatorSnapshot) -> bool {
    price < snapshot.trend_band_fast.value && price < snapshot.trend_band_slow.value
}

#[derive(Debug, Clone)]
pub struct PerSymbolPolicy {
    pub params: PolicyParameters,
    pub sizing: SizingParameters,
    pub governor: ExposureGovernor,
}

impl PerSymbolPolicy {
    pub fn new(params: PolicyParameters, sizing: SizingParameters, governor: ExposureGovernor) -> Self {
        PerSymbolPolicy {
            params,
            sizing,
            governor,
        }
    }

    /// One period's transition for one instrument.
    ///
    /// `exposure` is only called for a flat instrument that has passed the
    /// regime gate, so the caller decides how fresh the fraction is.
    pub fn evaluate(
        &self,
        state: PositionState,
        class: InstrumentClass,
        price: f64,
        snapshot: &IndicatorSnapshot,
        regime: RegimeGate,
        exposure: impl FnOnce() -> f64,
    ) -> Transition {
        match state {
            PositionState::Flat => self.evaluate_entry(class, price, snapshot, regime, exposure),
            PositionState::Open { .. } => self.evaluate_exit(state, price, snapshot),
        }
    }

    fn evaluate_entry(
        &self,
        class: InstrumentClass,
        price: f64,
        snapshot: &IndicatorSnapshot,
        regime: RegimeGate,
        exposure: impl FnOnce() -> f64,
    ) -> Transition {
        let stay = |reason| Transition {
            next: PositionState::Flat,
            action: Action::Skip(reason),
        };

        if !regime.allow_entry(class) {
            return stay(SkipReason::RegimeDenied);
        }
        if !self.governor.permits_entry(exposure()) {
            return stay(SkipReason::ExposureCeiling);
        }
        if !snapshot.entry_inputs_ready() {
            return stay(SkipReason::IndicatorNotReady);
        }

        let factor = self.params.entry_factors.for_class(class);
        if !entry_signal(price, snapshot, factor, self.params.momentum_threshold) {
            return stay(SkipReason::NoSignal);
        }

        let weight = entry_weight(snapshot.volatility, price, &self.sizing);
        Transition {
            next: PositionState::Open { entry_price: price },
            action: Action::Enter(weight),
        }
    }

    fn evaluate_exit(&self, state: PositionState, price: f64, snapshot: &IndicatorSnapshot) -> Transition {
        if snapshot.trend_bands_ready() && exit_signal(price, snapshot) {
            Transition {
                next: PositionState::Flat,
                action: Action::Exit,
            }
        } else {
            Transition {
                next: state,
                action: Action::Hold,
            }
        }
    }
}
