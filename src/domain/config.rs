//! Engine configuration assembled from a [`ConfigPort`].
//!
//! Every key has a default; absent keys fall back silently. Keys no reader
//! consumes are logged, since a misspelt key would otherwise go unnoticed.
//! A numeric key whose value does not parse is a `ConfigInvalid` error.
//! The assembled config is validated as a whole before it is returned.

use crate::domain::config_validation::{parse_date, validate_engine_config};
use crate::domain::drawdown::DrawdownConfig;
use crate::domain::error::RegimeError;
use crate::domain::instrument::InstrumentSet;
use crate::domain::mapper::ExposureBounds;
use crate::domain::regime::{CellTable, RegimeCell, TrendConfig};
use crate::domain::safe_haven::SafeHavenConfig;
use crate::domain::trend_filter::{NoiseMode, TrendFilterConfig};
use crate::domain::volatility::VolatilityConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const KNOWN_KEYS: &[(&str, &[&str])] = &[
    (
        "instruments",
        &["core", "leveraged_long", "leveraged_short", "bull_bond", "bear_bond", "bond_trend"],
    ),
    (
        "trend_filter",
        &[
            "process_noise",
            "measurement_noise",
            "initial_covariance",
            "sigma_lookback",
            "trend_lookback",
            "noise_mode",
        ],
    ),
    ("trend", &["fast_ma", "slow_ma", "entry_threshold", "exit_threshold"]),
    (
        "volatility",
        &["realized_window", "baseline_window", "upper_threshold", "lower_threshold", "min_dwell_bars"],
    ),
    ("drawdown", &["soft_threshold", "hard_threshold"]),
    ("safe_haven", &["fast_window", "slow_window", "bond_multiplier", "max_bond_weight"]),
    ("exposure", &["min", "max"]),
    ("data", &["dir", "symbol", "start_date", "end_date"]),
];

fn is_known(section: &str, key: &str) -> bool {
    if section == "cells" {
        return RegimeCell::ALL.iter().any(|cell| cell.key() == key);
    }
    KNOWN_KEYS
        .iter()
        .any(|(s, keys)| *s == section && keys.contains(&key))
}

const INTEGER_KEYS: &[&str] = &[
    "sigma_lookback",
    "trend_lookback",
    "fast_ma",
    "slow_ma",
    "realized_window",
    "baseline_window",
    "min_dwell_bars",
    "fast_window",
    "slow_window",
];

fn is_numeric(section: &str, key: &str) -> bool {
    !matches!(section, "instruments" | "data") && key != "noise_mode" && is_known(section, key)
}

/// A numeric key whose value does not parse is rejected rather than left to
/// fall back to its default.
fn check_numeric(config: &dyn ConfigPort) -> Result<(), RegimeError> {
    for (section, key) in config.entries() {
        if !is_numeric(&section, &key) {
            continue;
        }
        let Some(raw) = non_empty(config.get_string(&section, &key)) else {
            continue;
        };
        let integer = INTEGER_KEYS.contains(&key.as_str());
        let parses = if integer {
            raw.parse::<i64>().is_ok()
        } else {
            raw.parse::<f64>().is_ok()
        };
        if !parses {
            let expected = if integer { "a whole number" } else { "a number" };
            return Err(RegimeError::invalid(
                &section,
                &key,
                format!("'{}' is not {}", raw, expected),
            ));
        }
    }
    Ok(())
}

/// `section.key` for every entry that no reader consumes.
pub fn unknown_keys(config: &dyn ConfigPort) -> Vec<String> {
    config
        .entries()
        .into_iter()
        .filter(|(section, key)| !is_known(section, key))
        .map(|(section, key)| format!("{}.{}", section, key))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub instruments: InstrumentSet,
    pub trend_filter: TrendFilterConfig,
    pub trend: TrendConfig,
    pub volatility: VolatilityConfig,
    pub drawdown: DrawdownConfig,
    pub safe_haven: SafeHavenConfig,
    pub exposure: ExposureBounds,
    pub cells: CellTable,
    pub data_dir: String,
    /// Symbol the engine runs on; the core instrument when unset.
    pub symbol: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instruments: InstrumentSet::default(),
            trend_filter: TrendFilterConfig::default(),
            trend: TrendConfig::default(),
            volatility: VolatilityConfig::default(),
            drawdown: DrawdownConfig::default(),
            safe_haven: SafeHavenConfig::default(),
            exposure: ExposureBounds::default(),
            cells: CellTable::default(),
            data_dir: ".".to_string(),
            symbol: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RegimeError> {
        for key in unknown_keys(config) {
            tracing::warn!(%key, "unrecognised config key ignored");
        }
        check_numeric(config)?;
        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            instruments: read_instruments(config, &defaults.instruments),
            trend_filter: read_trend_filter(config, &defaults.trend_filter)?,
            trend: TrendConfig {
                fast_ma: get_window(config, "trend", "fast_ma", defaults.trend.fast_ma)?,
                slow_ma: get_window(config, "trend", "slow_ma", defaults.trend.slow_ma)?,
                entry_threshold: config.get_double(
                    "trend",
                    "entry_threshold",
                    defaults.trend.entry_threshold,
                ),
                exit_threshold: config.get_double(
                    "trend",
                    "exit_threshold",
                    defaults.trend.exit_threshold,
                ),
            },
            volatility: read_volatility(config, &defaults.volatility)?,
            drawdown: DrawdownConfig {
                soft_threshold: config.get_double(
                    "drawdown",
                    "soft_threshold",
                    defaults.drawdown.soft_threshold,
                ),
                hard_threshold: config.get_double(
                    "drawdown",
                    "hard_threshold",
                    defaults.drawdown.hard_threshold,
                ),
            },
            safe_haven: read_safe_haven(config, &defaults.safe_haven)?,
            exposure: ExposureBounds {
                min: config.get_double("exposure", "min", defaults.exposure.min),
                max: config.get_double("exposure", "max", defaults.exposure.max),
            },
            cells: read_cells(config, &defaults.cells),
            data_dir: non_empty(config.get_string("data", "dir")).unwrap_or(defaults.data_dir),
            symbol: non_empty(config.get_string("data", "symbol")),
            start_date: read_date(config, "data", "start_date")?,
            end_date: read_date(config, "data", "end_date")?,
        };
        validate_engine_config(&engine)?;
        Ok(engine)
    }

    /// Symbol the engine runs on.
    pub fn symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.instruments.core)
    }

    /// Bars needed before the first target allocation.
    pub fn min_history(&self) -> usize {
        self.volatility.min_history().max(self.trend.slow_ma)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_window(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, RegimeError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| {
        RegimeError::invalid(section, key, format!("{} must be non-negative", key))
    })
}

fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, RegimeError> {
    non_empty(config.get_string(section, key))
        .map(|s| parse_date(&s, section, key))
        .transpose()
}

/// Present but empty disables an optional slot; absent keeps the default.
fn optional_instrument(
    config: &dyn ConfigPort,
    key: &str,
    default: &Option<String>,
) -> Option<String> {
    match config.get_string("instruments", key) {
        Some(value) => non_empty(Some(value)),
        None => default.clone(),
    }
}

fn read_instruments(config: &dyn ConfigPort, defaults: &InstrumentSet) -> InstrumentSet {
    let optional = |key: &str, default: &Option<String>| optional_instrument(config, key, default);
    InstrumentSet {
        core: non_empty(config.get_string("instruments", "core"))
            .unwrap_or_else(|| defaults.core.clone()),
        leveraged_long: optional("leveraged_long", &defaults.leveraged_long),
        leveraged_short: optional("leveraged_short", &defaults.leveraged_short),
        bull_bond: optional("bull_bond", &defaults.bull_bond),
        bear_bond: optional("bear_bond", &defaults.bear_bond),
        bond_trend: optional("bond_trend", &defaults.bond_trend),
    }
}

fn read_trend_filter(
    config: &dyn ConfigPort,
    defaults: &TrendFilterConfig,
) -> Result<TrendFilterConfig, RegimeError> {
    let noise_mode = match config.get_string("trend_filter", "noise_mode") {
        Some(raw) => NoiseMode::parse(&raw).ok_or_else(|| {
            RegimeError::invalid(
                "trend_filter",
                "noise_mode",
                format!("unknown noise_mode '{}', expected standard, volume or range", raw),
            )
        })?,
        None => defaults.noise_mode,
    };
    Ok(TrendFilterConfig {
        process_noise: config.get_double("trend_filter", "process_noise", defaults.process_noise),
        measurement_noise: config.get_double(
            "trend_filter",
            "measurement_noise",
            defaults.measurement_noise,
        ),
        initial_covariance: config.get_double(
            "trend_filter",
            "initial_covariance",
            defaults.initial_covariance,
        ),
        sigma_lookback: get_window(
            config,
            "trend_filter",
            "sigma_lookback",
            defaults.sigma_lookback,
        )?,
        trend_lookback: get_window(
            config,
            "trend_filter",
            "trend_lookback",
            defaults.trend_lookback,
        )?,
        noise_mode,
    })
}

fn read_volatility(
    config: &dyn ConfigPort,
    defaults: &VolatilityConfig,
) -> Result<VolatilityConfig, RegimeError> {
    Ok(VolatilityConfig {
        realized_window: get_window(
            config,
            "volatility",
            "realized_window",
            defaults.realized_window,
        )?,
        baseline_window: get_window(
            config,
            "volatility",
            "baseline_window",
            defaults.baseline_window,
        )?,
        upper_threshold: config.get_double(
            "volatility",
            "upper_threshold",
            defaults.upper_threshold,
        ),
        lower_threshold: config.get_double(
            "volatility",
            "lower_threshold",
            defaults.lower_threshold,
        ),
        min_dwell_bars: get_window(
            config,
            "volatility",
            "min_dwell_bars",
            defaults.min_dwell_bars,
        )?,
    })
}

fn read_safe_haven(
    config: &dyn ConfigPort,
    defaults: &SafeHavenConfig,
) -> Result<SafeHavenConfig, RegimeError> {
    Ok(SafeHavenConfig {
        fast_window: get_window(config, "safe_haven", "fast_window", defaults.fast_window)?,
        slow_window: get_window(config, "safe_haven", "slow_window", defaults.slow_window)?,
        bond_multiplier: config.get_double(
            "safe_haven",
            "bond_multiplier",
            defaults.bond_multiplier,
        ),
        max_bond_weight: config.get_double(
            "safe_haven",
            "max_bond_weight",
            defaults.max_bond_weight,
        ),
    })
}

fn read_cells(config: &dyn ConfigPort, defaults: &CellTable) -> CellTable {
    let mut cells = defaults.clone();
    for cell in RegimeCell::ALL {
        let value = config.get_double("cells", cell.key(), defaults.exposure(cell));
        cells.set_exposure(cell, value);
    }
    cells
}
