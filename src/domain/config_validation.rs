//! Configuration validation.
//!
//! Each component validates its own config at construction; the engine adds
//! the cross-component checks. Every failure is a
//! [`RegimeError::ConfigInvalid`] naming the offending INI section and key.

use crate::domain::config::EngineConfig;
use crate::domain::drawdown::DrawdownConfig;
use crate::domain::error::RegimeError;
use crate::domain::instrument::Instrument;
use crate::domain::mapper::ExposureBounds;
use crate::domain::regime::{RegimeCell, TrendConfig};
use crate::domain::safe_haven::SafeHavenConfig;
use crate::domain::trend_filter::TrendFilterConfig;
use crate::domain::volatility::VolatilityConfig;
use chrono::NaiveDate;

/// Largest absolute net exposure accepted for either bound.
pub const MAX_ABS_EXPOSURE: f64 = 3.0;

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), RegimeError> {
    validate_trend_filter(&config.trend_filter)?;
    validate_trend(&config.trend)?;
    validate_volatility(&config.volatility)?;
    validate_drawdown(&config.drawdown)?;
    validate_safe_haven(&config.safe_haven)?;
    validate_exposure(&config.exposure)?;
    validate_instruments(config)?;
    validate_cells(config)?;
    validate_data_range(config.start_date, config.end_date)?;
    Ok(())
}

fn positive(section: &str, key: &str, value: f64) -> Result<(), RegimeError> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(RegimeError::invalid(
            section,
            key,
            format!("{} must be positive", key),
        ));
    }
    Ok(())
}

fn nonzero(section: &str, key: &str, value: usize) -> Result<(), RegimeError> {
    if value == 0 {
        return Err(RegimeError::invalid(
            section,
            key,
            format!("{} must be at least 1", key),
        ));
    }
    Ok(())
}

fn unit_interval(section: &str, key: &str, value: f64) -> Result<(), RegimeError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(RegimeError::invalid(
            section,
            key,
            format!("{} must be between 0 and 1", key),
        ));
    }
    Ok(())
}

pub fn validate_trend_filter(config: &TrendFilterConfig) -> Result<(), RegimeError> {
    positive("trend_filter", "process_noise", config.process_noise)?;
    positive("trend_filter", "measurement_noise", config.measurement_noise)?;
    positive("trend_filter", "initial_covariance", config.initial_covariance)?;
    if config.sigma_lookback < 2 {
        return Err(RegimeError::invalid(
            "trend_filter",
            "sigma_lookback",
            "sigma_lookback must be at least 2",
        ));
    }
    nonzero("trend_filter", "trend_lookback", config.trend_lookback)?;
    Ok(())
}

pub fn validate_trend(config: &TrendConfig) -> Result<(), RegimeError> {
    nonzero("trend", "fast_ma", config.fast_ma)?;
    nonzero("trend", "slow_ma", config.slow_ma)?;
    if config.fast_ma >= config.slow_ma {
        return Err(RegimeError::invalid(
            "trend",
            "fast_ma",
            "fast_ma must be shorter than slow_ma",
        ));
    }
    for (key, value) in [
        ("entry_threshold", config.entry_threshold),
        ("exit_threshold", config.exit_threshold),
    ] {
        if !(value > 0.0 && value <= 100.0) {
            return Err(RegimeError::invalid(
                "trend",
                key,
                format!("{} must be in (0, 100]", key),
            ));
        }
    }
    if config.exit_threshold > config.entry_threshold {
        return Err(RegimeError::invalid(
            "trend",
            "exit_threshold",
            "exit_threshold must not exceed entry_threshold",
        ));
    }
    Ok(())
}

pub fn validate_volatility(config: &VolatilityConfig) -> Result<(), RegimeError> {
    if config.realized_window < 2 {
        return Err(RegimeError::invalid(
            "volatility",
            "realized_window",
            "realized_window must be at least 2",
        ));
    }
    if config.baseline_window < 2 {
        return Err(RegimeError::invalid(
            "volatility",
            "baseline_window",
            "baseline_window must be at least 2",
        ));
    }
    if !config.upper_threshold.is_finite() || !config.lower_threshold.is_finite() {
        return Err(RegimeError::invalid(
            "volatility",
            "upper_threshold",
            "thresholds must be finite",
        ));
    }
    if config.lower_threshold >= config.upper_threshold {
        return Err(RegimeError::invalid(
            "volatility",
            "lower_threshold",
            "lower_threshold must be below upper_threshold",
        ));
    }
    Ok(())
}

pub fn validate_drawdown(config: &DrawdownConfig) -> Result<(), RegimeError> {
    unit_interval("drawdown", "soft_threshold", config.soft_threshold)?;
    unit_interval("drawdown", "hard_threshold", config.hard_threshold)?;
    if config.soft_threshold >= config.hard_threshold {
        return Err(RegimeError::invalid(
            "drawdown",
            "soft_threshold",
            "soft_threshold must be below hard_threshold",
        ));
    }
    Ok(())
}

pub fn validate_safe_haven(config: &SafeHavenConfig) -> Result<(), RegimeError> {
    nonzero("safe_haven", "fast_window", config.fast_window)?;
    nonzero("safe_haven", "slow_window", config.slow_window)?;
    if config.fast_window >= config.slow_window {
        return Err(RegimeError::invalid(
            "safe_haven",
            "fast_window",
            "fast_window must be shorter than slow_window",
        ));
    }
    unit_interval("safe_haven", "bond_multiplier", config.bond_multiplier)?;
    unit_interval("safe_haven", "max_bond_weight", config.max_bond_weight)?;
    Ok(())
}

pub fn validate_exposure(bounds: &ExposureBounds) -> Result<(), RegimeError> {
    for (key, value) in [("min", bounds.min), ("max", bounds.max)] {
        if !(-MAX_ABS_EXPOSURE..=MAX_ABS_EXPOSURE).contains(&value) {
            return Err(RegimeError::invalid(
                "exposure",
                key,
                format!("{} must be between -3 and 3", key),
            ));
        }
    }
    if bounds.min > bounds.max {
        return Err(RegimeError::invalid(
            "exposure",
            "min",
            "min must not exceed max",
        ));
    }
    Ok(())
}

/// Exposure ranges that need an instrument must have one configured.
fn validate_instruments(config: &EngineConfig) -> Result<(), RegimeError> {
    if config.instruments.core.trim().is_empty() {
        return Err(RegimeError::ConfigMissing {
            section: "instruments".to_string(),
            key: "core".to_string(),
        });
    }
    if config.exposure.min < 0.0 && !config.instruments.has(Instrument::LeveragedShort) {
        return Err(RegimeError::invalid(
            "exposure",
            "min",
            "negative exposure requires [instruments] leveraged_short",
        ));
    }
    if config.exposure.max > 1.0 && !config.instruments.has(Instrument::LeveragedLong) {
        return Err(RegimeError::invalid(
            "exposure",
            "max",
            "exposure above 1 requires [instruments] leveraged_long",
        ));
    }
    Ok(())
}

fn validate_cells(config: &EngineConfig) -> Result<(), RegimeError> {
    for cell in RegimeCell::ALL {
        let value = config.cells.exposure(cell);
        if !(config.exposure.min..=config.exposure.max).contains(&value) {
            return Err(RegimeError::invalid(
                "cells",
                cell.key(),
                format!(
                    "{} exposure {} is outside [{}, {}]",
                    cell.key(),
                    value,
                    config.exposure.min,
                    config.exposure.max
                ),
            ));
        }
    }
    Ok(())
}

fn validate_data_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), RegimeError> {
    match (start, end) {
        (Some(start), Some(end)) if start >= end => Err(RegimeError::invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        )),
        _ => Ok(()),
    }
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, RegimeError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        RegimeError::invalid(
            section,
            key,
            format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}
