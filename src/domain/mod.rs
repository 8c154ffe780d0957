//! Engine domain logic: components, configuration and errors.

pub mod config;
pub mod config_validation;
pub mod drawdown;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod instrument;
pub mod mapper;
pub mod ohlcv;
pub mod readiness;
pub mod regime;
pub mod safe_haven;
pub mod trend_filter;
pub mod volatility;
