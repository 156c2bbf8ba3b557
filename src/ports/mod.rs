//! Port traits between the decision core and its collaborators.

pub mod config_port;
pub mod data_port;
pub mod execution_port;
pub mod indicator_port;
pub mod market_data_port;
pub mod portfolio_port;
