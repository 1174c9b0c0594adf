//! Core domain types and logic: the trade-simulation and accounting engine.

pub mod error;
pub mod config;
pub mod config_validation;
pub mod signal;
pub mod execution;
pub mod position;
pub mod position_manager;
pub mod ledger;
pub mod metrics;
pub mod backtest;
