//! Core domain types and logic.

pub mod backtest;
pub mod code_data;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod exposure;
pub mod indicator;
pub mod ohlcv;
pub mod policy;
pub mod portfolio;
pub mod position;
pub mod regime;
pub mod sizing;
pub mod snapshot;
pub mod universe;
