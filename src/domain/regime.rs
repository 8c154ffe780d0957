//! Trend state gating and regime cell resolution.
//!
//! The fast trend strength from the Kalman filter only counts as Bull/Bear when
//! a slower moving-average relationship on the same closes points the same way.
//! Trend state has its own threshold band: entered beyond ±`entry_threshold`,
//! kept while beyond ±`exit_threshold`, carried forward in between.

use crate::domain::config_validation::validate_trend;
use crate::domain::error::RegimeError;
use crate::domain::indicator::RollingWindow;
use crate::domain::indicator::sma::sma;
use crate::domain::readiness::Readiness;
use crate::domain::volatility::VolState;

#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    pub fast_ma: usize,
    pub slow_ma: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            fast_ma: 50,
            slow_ma: 200,
            entry_threshold: 30.0,
            exit_threshold: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendState {
    BullStrong,
    BearStrong,
    Sideways,
}

impl std::fmt::Display for TrendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendState::BullStrong => write!(f, "bull"),
            TrendState::BearStrong => write!(f, "bear"),
            TrendState::Sideways => write!(f, "sideways"),
        }
    }
}

/// Direction of the slow moving-average pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Up,
    Down,
    Flat,
}

pub fn confirmation(closes: &[f64], fast: usize, slow: usize) -> Option<Confirmation> {
    let f = sma(closes, fast)?;
    let s = sma(closes, slow)?;
    Some(if f > s {
        Confirmation::Up
    } else if f < s {
        Confirmation::Down
    } else {
        Confirmation::Flat
    })
}

/// One step of the gated trend state machine.
pub fn next_trend_state(
    prev: TrendState,
    strength: f64,
    confirm: Confirmation,
    entry: f64,
    exit: f64,
) -> TrendState {
    match confirm {
        Confirmation::Up if strength > entry => TrendState::BullStrong,
        Confirmation::Down if strength < -entry => TrendState::BearStrong,
        Confirmation::Up if prev == TrendState::BullStrong && strength > exit => {
            TrendState::BullStrong
        }
        Confirmation::Down if prev == TrendState::BearStrong && strength < -exit => {
            TrendState::BearStrong
        }
        _ => TrendState::Sideways,
    }
}

#[derive(Debug, Clone)]
pub struct TrendClassifier {
    config: TrendConfig,
    closes: RollingWindow,
    state: TrendState,
}

impl TrendClassifier {
    pub fn new(config: TrendConfig) -> Result<Self, RegimeError> {
        validate_trend(&config)?;
        let closes = RollingWindow::new(config.slow_ma);
        Ok(Self {
            config,
            closes,
            state: TrendState::Sideways,
        })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    pub fn state(&self) -> TrendState {
        self.state
    }

    pub fn reset(&mut self) {
        self.closes.clear();
        self.state = TrendState::Sideways;
    }

    pub fn update(&mut self, close: f64, trend_strength: f64) -> Readiness<TrendState> {
        self.closes.push(close);
        if !self.closes.is_full() {
            return Readiness::InsufficientData {
                bars: self.closes.len(),
                minimum: self.config.slow_ma,
            };
        }
        let closes = self.closes.to_vec();
        let confirm = confirmation(&closes, self.config.fast_ma, self.config.slow_ma)
            .unwrap_or(Confirmation::Flat);
        let next = next_trend_state(
            self.state,
            trend_strength,
            confirm,
            self.config.entry_threshold,
            self.config.exit_threshold,
        );
        if next != self.state {
            tracing::info!(from = %self.state, to = %next, trend_strength, "trend state change");
        }
        self.state = next;
        Readiness::Ready(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    /// Fully invested, possibly leveraged.
    Aggressive,
    /// Holds cash, bonds or the inverse instrument.
    Defensive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegimeCell {
    BullQuiet,
    BullVolatile,
    SidewaysQuiet,
    SidewaysVolatile,
    BearQuiet,
    BearVolatile,
}

impl RegimeCell {
    pub const ALL: [RegimeCell; 6] = [
        RegimeCell::BullQuiet,
        RegimeCell::BullVolatile,
        RegimeCell::SidewaysQuiet,
        RegimeCell::SidewaysVolatile,
        RegimeCell::BearQuiet,
        RegimeCell::BearVolatile,
    ];

    pub fn resolve(trend: TrendState, vol: VolState) -> Self {
        match (trend, vol) {
            (TrendState::BullStrong, VolState::Low) => RegimeCell::BullQuiet,
            (TrendState::BullStrong, VolState::High) => RegimeCell::BullVolatile,
            (TrendState::Sideways, VolState::Low) => RegimeCell::SidewaysQuiet,
            (TrendState::Sideways, VolState::High) => RegimeCell::SidewaysVolatile,
            (TrendState::BearStrong, VolState::Low) => RegimeCell::BearQuiet,
            (TrendState::BearStrong, VolState::High) => RegimeCell::BearVolatile,
        }
    }

    pub fn posture(self) -> Posture {
        match self {
            RegimeCell::BullQuiet | RegimeCell::BullVolatile => Posture::Aggressive,
            _ => Posture::Defensive,
        }
    }

    /// Config key under `[cells]`.
    pub fn key(self) -> &'static str {
        match self {
            RegimeCell::BullQuiet => "bull_quiet",
            RegimeCell::BullVolatile => "bull_volatile",
            RegimeCell::SidewaysQuiet => "sideways_quiet",
            RegimeCell::SidewaysVolatile => "sideways_volatile",
            RegimeCell::BearQuiet => "bear_quiet",
            RegimeCell::BearVolatile => "bear_volatile",
        }
    }
}

impl std::fmt::Display for RegimeCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Baseline rule for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRule {
    pub exposure: f64,
    pub posture: Posture,
}

/// Baseline exposure per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellTable {
    pub bull_quiet: f64,
    pub bull_volatile: f64,
    pub sideways_quiet: f64,
    pub sideways_volatile: f64,
    pub bear_quiet: f64,
    pub bear_volatile: f64,
}

impl Default for CellTable {
    fn default() -> Self {
        Self {
            bull_quiet: 2.0,
            bull_volatile: 1.0,
            sideways_quiet: 0.6,
            sideways_volatile: 0.3,
            bear_quiet: 0.0,
            bear_volatile: -0.5,
        }
    }
}

impl CellTable {
    pub fn exposure(&self, cell: RegimeCell) -> f64 {
        match cell {
            RegimeCell::BullQuiet => self.bull_quiet,
            RegimeCell::BullVolatile => self.bull_volatile,
            RegimeCell::SidewaysQuiet => self.sideways_quiet,
            RegimeCell::SidewaysVolatile => self.sideways_volatile,
            RegimeCell::BearQuiet => self.bear_quiet,
            RegimeCell::BearVolatile => self.bear_volatile,
        }
    }

    pub fn set_exposure(&mut self, cell: RegimeCell, exposure: f64) {
        let slot = match cell {
            RegimeCell::BullQuiet => &mut self.bull_quiet,
            RegimeCell::BullVolatile => &mut self.bull_volatile,
            RegimeCell::SidewaysQuiet => &mut self.sideways_quiet,
            RegimeCell::SidewaysVolatile => &mut self.sideways_volatile,
            RegimeCell::BearQuiet => &mut self.bear_quiet,
            RegimeCell::BearVolatile => &mut self.bear_volatile,
        };
        *slot = exposure;
    }

    pub fn rule(&self, cell: RegimeCell) -> CellRule {
        CellRule {
            exposure: self.exposure(cell),
            posture: cell.posture(),
        }
    }
}
