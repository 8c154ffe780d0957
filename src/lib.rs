//! regimetrader: adaptive regime detection and exposure mapping.
//!
//! Hexagonal architecture: decision logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`], and a thin command
//! line front end in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
