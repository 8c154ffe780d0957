//! Volatility regime classifier with hysteresis.
//!
//! Realised volatility is the sample stddev of daily log returns over
//! `realized_window`, annualised by sqrt(252). The latest value is standardised
//! against the mean and sample stddev of the last `baseline_window` realised
//! values. The resulting z-score drives a two-state machine ([`Hysteresis`]):
//! Low flips to High only above `upper_threshold`, High flips to Low only below
//! `lower_threshold`, and anything in between carries the previous state.

use crate::domain::config_validation::validate_volatility;
use crate::domain::error::RegimeError;
use crate::domain::indicator::RollingWindow;
use crate::domain::indicator::returns::{annualized_volatility, log_return, log_returns};
use crate::domain::indicator::stddev::{mean, sample_stddev};
use crate::domain::readiness::Readiness;

#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityConfig {
    pub realized_window: usize,
    pub baseline_window: usize,
    pub upper_threshold: f64,
    pub lower_threshold: f64,
    /// Bars that must pass after a flip before the next one may fire.
    pub min_dwell_bars: usize,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            realized_window: 21,
            baseline_window: 126,
            upper_threshold: 1.0,
            lower_threshold: 0.0,
            min_dwell_bars: 0,
        }
    }
}

impl VolatilityConfig {
    /// Closes needed before the first z-score exists.
    pub fn min_history(&self) -> usize {
        self.realized_window + self.baseline_window
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolState {
    Low,
    High,
}

impl std::fmt::Display for VolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolState::Low => write!(f, "low"),
            VolState::High => write!(f, "high"),
        }
    }
}

/// Guarded transition table. `None` means stay.
pub fn transition(state: VolState, z: f64, upper: f64, lower: f64) -> Option<VolState> {
    match state {
        VolState::Low if z > upper => Some(VolState::High),
        VolState::High if z < lower => Some(VolState::Low),
        _ => None,
    }
}

/// Two-state machine over z-scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Hysteresis {
    upper: f64,
    lower: f64,
    min_dwell: usize,
    state: Option<VolState>,
    bars_since_flip: usize,
}

impl Hysteresis {
    pub fn new(upper: f64, lower: f64, min_dwell: usize) -> Self {
        Self {
            upper,
            lower,
            min_dwell,
            state: None,
            bars_since_flip: 0,
        }
    }

    pub fn state(&self) -> Option<VolState> {
        self.state
    }

    pub fn bars_since_flip(&self) -> usize {
        self.bars_since_flip
    }

    /// The first z-score seeds the state: High only when it already exceeds
    /// the upper threshold.
    pub fn step(&mut self, z: f64) -> VolState {
        let Some(current) = self.state else {
            let seeded = if z > self.upper {
                VolState::High
            } else {
                VolState::Low
            };
            self.state = Some(seeded);
            self.bars_since_flip = 0;
            return seeded;
        };

        self.bars_since_flip += 1;
        if self.bars_since_flip < self.min_dwell {
            return current;
        }
        match transition(current, z, self.upper, self.lower) {
            Some(next) => {
                tracing::info!(from = %current, to = %next, z, "volatility state flip");
                self.state = Some(next);
                self.bars_since_flip = 0;
                next
            }
            None => current,
        }
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.bars_since_flip = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolReading {
    pub realized_vol: f64,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub z_score: f64,
    pub state: VolState,
}

/// Rolling buffers plus the committed discrete state.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityBaselineState {
    pub prev_close: Option<f64>,
    pub returns: RollingWindow,
    pub realized: RollingWindow,
    pub hysteresis: Hysteresis,
    pub closes_seen: usize,
}

#[derive(Debug, Clone)]
pub struct VolatilityClassifier {
    config: VolatilityConfig,
    state: VolatilityBaselineState,
}

impl VolatilityClassifier {
    pub fn new(config: VolatilityConfig) -> Result<Self, RegimeError> {
        validate_volatility(&config)?;
        let state = fresh_state(&config);
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &VolatilityConfig {
        &self.config
    }

    pub fn state(&self) -> &VolatilityBaselineState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = fresh_state(&self.config);
    }

    /// Consumes the next close.
    pub fn update(&mut self, close: f64) -> Readiness<VolReading> {
        let cfg = &self.config;
        let st = &mut self.state;
        st.closes_seen += 1;

        if let Some(prev) = st.prev_close {
            st.returns.push(log_return(prev, close));
        }
        st.prev_close = Some(close);

        if st.returns.is_full() {
            let returns = st.returns.to_vec();
            if let Some(vol) = annualized_volatility(&returns) {
                st.realized.push(vol);
            }
        }

        if !st.realized.is_full() {
            return Readiness::InsufficientData {
                bars: st.closes_seen,
                minimum: cfg.min_history(),
            };
        }

        let baseline = st.realized.to_vec();
        let realized_vol = st.realized.latest().unwrap_or(0.0);
        let baseline_mean = mean(&baseline).unwrap_or(0.0);
        let baseline_std = sample_stddev(&baseline).unwrap_or(0.0);
        let z = z_score(realized_vol, baseline_mean, baseline_std);
        let state = st.hysteresis.step(z);

        Readiness::Ready(VolReading {
            realized_vol,
            baseline_mean,
            baseline_std,
            z_score: z,
            state,
        })
    }

    /// Classifies a full close history from scratch, replaying the hysteresis
    /// over every bar so the answer does not depend on `self`'s live state.
    pub fn classify(&self, prices: &[f64]) -> Readiness<VolReading> {
        let mut replay = Self {
            config: self.config.clone(),
            state: fresh_state(&self.config),
        };
        let mut last = Readiness::InsufficientData {
            bars: 0,
            minimum: self.config.min_history(),
        };
        for &p in prices {
            last = replay.update(p);
        }
        last
    }
}

fn fresh_state(config: &VolatilityConfig) -> VolatilityBaselineState {
    VolatilityBaselineState {
        prev_close: None,
        returns: RollingWindow::new(config.realized_window),
        realized: RollingWindow::new(config.baseline_window),
        hysteresis: Hysteresis::new(
            config.upper_threshold,
            config.lower_threshold,
            config.min_dwell_bars,
        ),
        closes_seen: 0,
    }
}

/// (x - mean) / std, defined as 0 when std is zero.
pub fn z_score(x: f64, mean: f64, std: f64) -> f64 {
    if std > 0.0 && std.is_finite() {
        (x - mean) / std
    } else {
        0.0
    }
}

/// Rolling annualised realised volatility for every full `window` of returns.
pub fn realized_volatility(prices: &[f64], window: usize) -> Vec<f64> {
    let returns = log_returns(prices);
    if window < 2 || returns.len() < window {
        return Vec::new();
    }
    returns
        .windows(window)
        .filter_map(annualized_volatility)
        .collect()
}
