//! Up-front checks on raw configuration values.
//!
//! `ConfigPort` numeric getters fall back to a default on unparsable input,
//! so a typo would silently run with the default. Everything here rejects
//! such values before the typed config is built. Range checks live with the
//! typed parameter structs.

use crate::domain::error::VolshieldError;
use crate::domain::exposure::ExposurePolicy;
use crate::domain::universe::InstrumentClass;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const SIZING_KEYS: [&str; 7] = [
    "exposure_ceiling",
    "target_volatility",
    "min_weight",
    "max_weight",
    "leverage",
    "annualization_periods",
    "default_weight",
];

const POLICY_KEYS: [&str; 4] = [
    "momentum_threshold",
    "crypto_factor",
    "equity_factor",
    "forex_factor",
];

const INDICATOR_PERIOD_KEYS: [&str; 6] = [
    "supertrend_period",
    "rsi_period",
    "long_ma_period",
    "benchmark_ma_period",
    "weekly_average_weeks",
    "atr_period",
];

const INDICATOR_MULTIPLIER_KEYS: [&str; 2] = ["fast_multiplier", "slow_multiplier"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), VolshieldError> {
    validate_backtest_section(config)?;
    validate_universe_section(config)?;
    validate_sizing_section(config)?;
    validate_policy_section(config)?;
    validate_indicator_section(config)?;
    Ok(())
}

pub fn validate_backtest_section(config: &dyn ConfigPort) -> Result<(), VolshieldError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date > end_date {
        return Err(VolshieldError::invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    validate_number(config, "backtest", "initial_capital")?;
    validate_count(config, "backtest", "warmup_periods", 0)?;
    Ok(())
}

pub fn validate_universe_section(config: &dyn ConfigPort) -> Result<(), VolshieldError> {
    let any_codes = InstrumentClass::ALL.iter().any(|class| {
        config
            .get_string("universe", class.config_key())
            .is_some_and(|s| !s.trim().is_empty())
    });
    if !any_codes {
        return Err(VolshieldError::missing("universe", "crypto"));
    }
    match config.get_string("universe", "benchmark") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(VolshieldError::missing("universe", "benchmark")),
    }
}

pub fn validate_sizing_section(config: &dyn ConfigPort) -> Result<(), VolshieldError> {
    for key in SIZING_KEYS {
        validate_number(config, "sizing", key)?;
    }
    if let Some(raw) = config.get_string("sizing", "exposure_policy") {
        raw.parse::<ExposurePolicy>()
            .map_err(|reason| VolshieldError::invalid("sizing", "exposure_policy", reason))?;
    }
    Ok(())
}

pub fn validate_policy_section(config: &dyn ConfigPort) -> Result<(), VolshieldError> {
    for key in POLICY_KEYS {
        validate_number(config, "policy", key)?;
    }
    Ok(())
}

pub fn validate_indicator_section(config: &dyn ConfigPort) -> Result<(), VolshieldError> {
    for key in INDICATOR_PERIOD_KEYS {
        validate_count(config, "indicators", key, 1)?;
    }
    for key in INDICATOR_MULTIPLIER_KEYS {
        validate_number(config, "indicators", key)?;
    }
    Ok(())
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, VolshieldError> {
    let raw = config
        .get_string("backtest", key)
        .ok_or_else(|| VolshieldError::missing("backtest", key))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        VolshieldError::invalid(
            "backtest",
            key,
            format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}

/// Present values must parse as a finite number. Absent keys use defaults.
fn validate_number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), VolshieldError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(()),
        _ => Err(VolshieldError::invalid(
            section,
            key,
            format!("'{}' is not a number", raw),
        )),
    }
}

fn validate_count(config: &dyn ConfigPort, section: &str, key: &str, min: i64) -> Result<(), VolshieldError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= min => Ok(()),
        Ok(_) => Err(VolshieldError::invalid(
            section,
            key,
            format!("{} must be at least {}", key, min),
        )),
        Err(_) => Err(VolshieldError::invalid(
            section,
            key,
            format!("'{}' is not a whole number", raw),
        )),
    }
}
