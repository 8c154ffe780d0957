#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use regimetrader::domain::config::EngineConfig;
use regimetrader::domain::error::RegimeError;
pub use regimetrader::domain::ohlcv::OhlcvBar;
use regimetrader::domain::regime::TrendConfig;
use regimetrader::domain::safe_haven::SafeHavenConfig;
use regimetrader::domain::trend_filter::TrendFilterConfig;
use regimetrader::domain::volatility::VolatilityConfig;
use regimetrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RegimeError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RegimeError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).ok_or_else(|| RegimeError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RegimeError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bar `day` days after 2020-01-01 with a one-point high/low band.
pub fn make_bar(symbol: &str, day: usize, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: symbol.to_string(),
        date: date(2020, 1, 1) + Days::new(day as u64),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000_000,
    }
}

pub fn generate_bars(symbol: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(symbol, i, c))
        .collect()
}

/// Deterministic closes whose daily log return alternates +r/-r, modulated to
/// create calm and turbulent stretches.
pub fn oscillating_closes(n: usize, base: f64, drift: f64) -> Vec<f64> {
    let mut closes = Vec::with_capacity(n);
    let mut price = base;
    for i in 0..n {
        let amplitude = if (i / 40) % 2 == 0 { 0.004 } else { 0.03 };
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        price *= (drift + sign * amplitude).exp();
        closes.push(price);
    }
    closes
}

pub fn linear_closes(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Short windows so scenarios warm up in tens of bars.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        trend_filter: TrendFilterConfig {
            sigma_lookback: 10,
            trend_lookback: 5,
            ..TrendFilterConfig::default()
        },
        trend: TrendConfig {
            fast_ma: 5,
            slow_ma: 20,
            ..TrendConfig::default()
        },
        volatility: VolatilityConfig {
            realized_window: 5,
            baseline_window: 15,
            ..VolatilityConfig::default()
        },
        safe_haven: SafeHavenConfig {
            fast_window: 3,
            slow_window: 8,
            ..SafeHavenConfig::default()
        },
        ..EngineConfig::default()
    }
}
