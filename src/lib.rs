//! volshield: per-instrument trend-following decision engine with
//! volatility-normalized sizing and a portfolio-wide exposure ceiling.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
