//! Adaptive Kalman trend filter.
//!
//! Constant-velocity model with state `[position, velocity]`:
//!
//! ```text
//! F = | 1 1 |     H = | 1 0 |     Q = q * I
//!     | 0 1 |
//! ```
//!
//! Each bar runs predict, adapts the measurement noise R according to
//! [`NoiseMode`], then updates with the observed close. The velocity is turned
//! into an oscillator by dividing by the largest absolute innovation in the last
//! `sigma_lookback` bars (scaled to ±100), and the oscillator is smoothed with a
//! linearly weighted average over the last `trend_lookback` values.
//!
//! One filter per symbol. Bars must arrive in timestamp order.

use crate::domain::config_validation::validate_trend_filter;
use crate::domain::error::RegimeError;
use crate::domain::indicator::RollingWindow;
use crate::domain::indicator::wma::wma;

/// How the measurement noise reacts to the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseMode {
    /// R is fixed at the configured base value.
    Standard,
    /// R shrinks by prev_volume / volume when volume rises.
    VolumeAdjusted,
    /// R scales by true_range / prev_true_range.
    RangeAdjusted,
}

impl NoiseMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "fixed" => Some(NoiseMode::Standard),
            "volume" | "volume_adjusted" => Some(NoiseMode::VolumeAdjusted),
            "range" | "range_adjusted" => Some(NoiseMode::RangeAdjusted),
            _ => None,
        }
    }
}

impl std::fmt::Display for NoiseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoiseMode::Standard => write!(f, "standard"),
            NoiseMode::VolumeAdjusted => write!(f, "volume"),
            NoiseMode::RangeAdjusted => write!(f, "range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendFilterConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub initial_covariance: f64,
    pub sigma_lookback: usize,
    pub trend_lookback: usize,
    pub noise_mode: NoiseMode,
}

impl Default for TrendFilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.01,
            measurement_noise: 1.0,
            initial_covariance: 1.0,
            sigma_lookback: 50,
            trend_lookback: 10,
            noise_mode: NoiseMode::Standard,
        }
    }
}

/// One bar of filter input. `high`, `low` and `volume` are only read by the
/// noise modes that need them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterInput {
    pub close: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
}

impl FilterInput {
    pub fn close(close: f64) -> Self {
        Self {
            close,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReading {
    pub filtered_price: f64,
    /// Signed, in [-100, 100].
    pub trend_strength: f64,
}

/// Mutable estimator state, owned by exactly one [`TrendFilter`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub x: [f64; 2],
    /// Row-major 2x2 error covariance.
    pub p: [[f64; 2]; 2],
    pub innovations: RollingWindow,
    pub oscillator: RollingWindow,
    pub prev_volume: Option<f64>,
    pub prev_close: f64,
    pub prev_range: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TrendFilter {
    config: TrendFilterConfig,
    state: Option<FilterState>,
    bars: usize,
}

impl TrendFilter {
    pub fn new(config: TrendFilterConfig) -> Result<Self, RegimeError> {
        validate_trend_filter(&config)?;
        Ok(Self {
            config,
            state: None,
            bars: 0,
        })
    }

    pub fn config(&self) -> &TrendFilterConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&FilterState> {
        self.state.as_ref()
    }

    /// Bars consumed since construction or the last [`reset`](Self::reset).
    pub fn bars(&self) -> usize {
        self.bars
    }

    /// Drops all state; the next bar re-initialises the filter.
    pub fn reset(&mut self) {
        self.state = None;
        self.bars = 0;
    }

    /// Feeds one bar. The first call only seeds the state and always reports
    /// zero trend strength.
    pub fn update(&mut self, input: FilterInput) -> TrendReading {
        self.bars += 1;
        let cfg = &self.config;

        let state = match &mut self.state {
            Some(state) => state,
            empty => {
                let range = bar_range(&input, None);
                *empty = Some(FilterState {
                    x: [input.close, 0.0],
                    p: [[cfg.initial_covariance, 0.0], [0.0, cfg.initial_covariance]],
                    innovations: RollingWindow::new(cfg.sigma_lookback),
                    oscillator: RollingWindow::new(cfg.trend_lookback),
                    prev_volume: input.volume,
                    prev_close: input.close,
                    prev_range: range,
                });
                return TrendReading {
                    filtered_price: input.close,
                    trend_strength: 0.0,
                };
            }
        };

        // Predict: x = F x, P = F P F' + Q
        let q = cfg.process_noise;
        let x_pred = [state.x[0] + state.x[1], state.x[1]];
        let p = state.p;
        let p00 = p[0][0] + p[0][1] + p[1][0] + p[1][1] + q;
        let p01 = p[0][1] + p[1][1];
        let p10 = p[1][0] + p[1][1];
        let p11 = p[1][1] + q;
        let p_pred = [[p00, p01], [p10, p11]];

        let range = bar_range(&input, Some(state.prev_close));
        let r = adjusted_noise(cfg, &input, state.prev_volume, state.prev_range, range);

        // Update with H = [1, 0]
        let innovation = input.close - x_pred[0];
        let s = p_pred[0][0] + r;
        if s > 0.0 && s.is_finite() && innovation.is_finite() {
            let k = [p_pred[0][0] / s, p_pred[1][0] / s];
            state.x = [x_pred[0] + k[0] * innovation, x_pred[1] + k[1] * innovation];
            state.p = joseph_update(p_pred, k, r);
        } else {
            tracing::warn!(s, innovation, "degenerate innovation variance, skipping update");
            state.x = x_pred;
            state.p = p_pred;
        }

        state.innovations.push(innovation.abs());
        let raw = oscillator(state.x[1], &state.innovations);
        state.oscillator.push(raw);

        state.prev_volume = input.volume.or(state.prev_volume);
        state.prev_close = input.close;
        if range.is_some() {
            state.prev_range = range;
        }

        TrendReading {
            filtered_price: state.x[0],
            trend_strength: wma(state.oscillator.iter()).clamp(-100.0, 100.0),
        }
    }
}

fn bar_range(input: &FilterInput, prev_close: Option<f64>) -> Option<f64> {
    let (high, low) = (input.high?, input.low?);
    let hl = high - low;
    let tr = match prev_close {
        Some(pc) => hl.max((high - pc).abs()).max((low - pc).abs()),
        None => hl,
    };
    Some(tr)
}

/// Measurement noise for this bar. Anything degenerate falls back to the base value.
fn adjusted_noise(
    cfg: &TrendFilterConfig,
    input: &FilterInput,
    prev_volume: Option<f64>,
    prev_range: Option<f64>,
    range: Option<f64>,
) -> f64 {
    let base = cfg.measurement_noise;
    let adjusted = match cfg.noise_mode {
        NoiseMode::Standard => base,
        NoiseMode::VolumeAdjusted => match (prev_volume, input.volume) {
            (Some(prev), Some(curr)) if prev > 0.0 && curr > prev => base * (prev / curr),
            _ => base,
        },
        NoiseMode::RangeAdjusted => match (prev_range, range) {
            (Some(prev), Some(curr)) if prev > 0.0 && curr > 0.0 => base * (curr / prev),
            _ => base,
        },
    };
    if adjusted.is_finite() && adjusted > 0.0 {
        adjusted
    } else {
        base
    }
}

/// P = (I - K H) P (I - K H)' + K R K', symmetric and PSD by construction.
fn joseph_update(p: [[f64; 2]; 2], k: [f64; 2], r: f64) -> [[f64; 2]; 2] {
    let a = [[1.0 - k[0], 0.0], [-k[1], 1.0]];
    let mut ap = [[0.0; 2]; 2];
    for i in 0..2 {
        for j in 0..2 {
            ap[i][j] = a[i][0] * p[0][j] + a[i][1] * p[1][j];
        }
    }
    let mut out = [[0.0; 2]; 2];
    for i in 0..2 {
        for j in 0..2 {
            out[i][j] = ap[i][0] * a[j][0] + ap[i][1] * a[j][1] + k[i] * r * k[j];
        }
    }
    let off = 0.5 * (out[0][1] + out[1][0]);
    out[0][1] = off;
    out[1][0] = off;
    out
}

fn oscillator(velocity: f64, innovations: &RollingWindow) -> f64 {
    if innovations.len() < 2 {
        return 0.0;
    }
    let sigma = innovations.max_abs();
    if sigma <= 0.0 || !sigma.is_finite() {
        return 0.0;
    }
    (velocity / sigma * 100.0).clamp(-100.0, 100.0)
}
