//! Drawdown governor.
//!
//! `P_DD = clamp((hard - dd) / (hard - soft), 0, 1)` and
//! `adjusted = raw * P_DD + 1.0 * (1 - P_DD)`: below the soft threshold raw
//! exposure passes through, beyond the hard threshold it is pinned at the
//! neutral 1.0, and in between it is pulled linearly toward neutral from
//! whichever side it sits on.

use crate::domain::config_validation::validate_drawdown;
use crate::domain::error::RegimeError;

pub const NEUTRAL_EXPOSURE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownConfig {
    pub soft_threshold: f64,
    pub hard_threshold: f64,
}

impl Default for DrawdownConfig {
    fn default() -> Self {
        Self {
            soft_threshold: 0.10,
            hard_threshold: 0.20,
        }
    }
}

/// Equity and high-water mark as reported by the portfolio side. The governor
/// only reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownState {
    pub high_water_mark: f64,
    pub equity: f64,
}

impl DrawdownState {
    pub fn new(high_water_mark: f64, equity: f64) -> Self {
        Self {
            high_water_mark,
            equity,
        }
    }

    /// Fresh book: equity at its own peak.
    pub fn flat(equity: f64) -> Self {
        Self::new(equity, equity)
    }

    /// State whose drawdown fraction is `fraction`, on a unit HWM.
    pub fn from_fraction(fraction: f64) -> Self {
        Self::new(1.0, 1.0 - fraction)
    }

    /// Records a new equity value, raising the HWM when exceeded.
    pub fn observe(&mut self, equity: f64) {
        self.equity = equity;
        if equity > self.high_water_mark {
            self.high_water_mark = equity;
        }
    }

    /// (HWM - equity) / HWM, 0 when HWM is not positive or equity is at a new high.
    pub fn fraction(&self) -> f64 {
        if self.high_water_mark <= 0.0 || !self.high_water_mark.is_finite() {
            return 0.0;
        }
        ((self.high_water_mark - self.equity) / self.high_water_mark).max(0.0)
    }
}

/// Which side of neutral the raw exposure was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorPath {
    LeverageCompression,
    DefensivePreservation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernedExposure {
    pub raw: f64,
    pub adjusted: f64,
    pub drawdown: f64,
    /// 1.0 leaves `raw` untouched, 0.0 pins at neutral.
    pub preservation: f64,
    pub path: GovernorPath,
}

#[derive(Debug, Clone)]
pub struct DrawdownGovernor {
    config: DrawdownConfig,
}

impl DrawdownGovernor {
    pub fn new(config: DrawdownConfig) -> Result<Self, RegimeError> {
        validate_drawdown(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DrawdownConfig {
        &self.config
    }

    /// Interpolation factor P_DD for a drawdown fraction.
    pub fn preservation(&self, drawdown: f64) -> f64 {
        let DrawdownConfig {
            soft_threshold: soft,
            hard_threshold: hard,
        } = self.config;
        ((hard - drawdown) / (hard - soft)).clamp(0.0, 1.0)
    }

    pub fn govern(&self, raw_exposure: f64, drawdown: f64) -> f64 {
        self.govern_detailed(raw_exposure, drawdown).adjusted
    }

    pub fn govern_detailed(&self, raw_exposure: f64, drawdown: f64) -> GovernedExposure {
        let drawdown = if drawdown.is_finite() {
            drawdown.max(0.0)
        } else {
            0.0
        };
        let path = if raw_exposure > NEUTRAL_EXPOSURE {
            GovernorPath::LeverageCompression
        } else {
            GovernorPath::DefensivePreservation
        };
        let p = self.preservation(drawdown);
        let adjusted = if p >= 1.0 {
            raw_exposure
        } else if p <= 0.0 {
            NEUTRAL_EXPOSURE
        } else {
            raw_exposure * p + NEUTRAL_EXPOSURE * (1.0 - p)
        };
        if p < 1.0 {
            tracing::debug!(raw_exposure, adjusted, drawdown, ?path, "drawdown governor engaged");
        }
        GovernedExposure {
            raw: raw_exposure,
            adjusted,
            drawdown,
            preservation: p,
            path,
        }
    }
}
