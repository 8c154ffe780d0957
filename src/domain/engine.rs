//! Per-symbol regime engine.
//!
//! Owns one of each stateful component and turns one bar at a time into a
//! target allocation:
//!
//! ```text
//! bar -> trend filter ---------\
//!     -> trend classifier ------> regime cell -> drawdown governor -> mapper
//!     -> volatility classifier -/                                     |
//! bond close -> bond window ----------------------------> overlay (defensive cells)
//! ```
//!
//! Bars must arrive in date order. Until every classifier has its minimum
//! history the engine answers [`Decision::NotReady`].

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::config::EngineConfig;
use crate::domain::config_validation::validate_engine_config;
use crate::domain::drawdown::{DrawdownGovernor, DrawdownState, GovernedExposure};
use crate::domain::error::RegimeError;
use crate::domain::indicator::RollingWindow;
use crate::domain::instrument::{Instrument, InstrumentSet, WeightVector};
use crate::domain::mapper::{ExposureMapper, ExposureRegion};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::readiness::Readiness;
use crate::domain::regime::{CellTable, Posture, RegimeCell, TrendClassifier, TrendState};
use crate::domain::safe_haven::{BondTrend, SafeHavenOverlay};
use crate::domain::trend_filter::{FilterInput, TrendFilter};
use crate::domain::volatility::{VolState, VolatilityClassifier};

/// Everything the engine decided on one actionable bar.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAllocation {
    pub date: NaiveDate,
    pub filtered_price: f64,
    pub trend_strength: f64,
    pub realized_vol: f64,
    pub z_score: f64,
    pub trend_state: TrendState,
    pub vol_state: VolState,
    pub cell: RegimeCell,
    pub posture: Posture,
    pub governed: GovernedExposure,
    pub region: ExposureRegion,
    pub bond_trend: Option<BondTrend>,
    pub weights: WeightVector,
}

impl TargetAllocation {
    pub fn raw_exposure(&self) -> f64 {
        self.governed.raw
    }

    pub fn adjusted_exposure(&self) -> f64 {
        self.governed.adjusted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Not enough history; the bar is not actionable.
    NotReady { bars: usize, minimum: usize },
    Target(TargetAllocation),
}

impl Decision {
    pub fn target(&self) -> Option<&TargetAllocation> {
        match self {
            Decision::Target(t) => Some(t),
            Decision::NotReady { .. } => None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, Decision::Target(_))
    }
}

pub struct RegimeEngine {
    instruments: InstrumentSet,
    cells: CellTable,
    filter: TrendFilter,
    trend: TrendClassifier,
    volatility: VolatilityClassifier,
    governor: DrawdownGovernor,
    overlay: SafeHavenOverlay,
    mapper: ExposureMapper,
    bond_closes: RollingWindow,
    last_cell: Option<RegimeCell>,
    bars: usize,
    min_history: usize,
}

impl RegimeEngine {
    pub fn new(config: EngineConfig) -> Result<Self, RegimeError> {
        validate_engine_config(&config)?;
        let min_history = config.min_history();
        let bond_closes = RollingWindow::new(config.safe_haven.slow_window);
        Ok(Self {
            filter: TrendFilter::new(config.trend_filter)?,
            trend: TrendClassifier::new(config.trend)?,
            volatility: VolatilityClassifier::new(config.volatility)?,
            governor: DrawdownGovernor::new(config.drawdown)?,
            overlay: SafeHavenOverlay::new(config.safe_haven)?,
            mapper: ExposureMapper::new(config.exposure)?,
            instruments: config.instruments,
            cells: config.cells,
            bond_closes,
            last_cell: None,
            bars: 0,
            min_history,
        })
    }

    pub fn instruments(&self) -> &InstrumentSet {
        &self.instruments
    }

    pub fn bars(&self) -> usize {
        self.bars
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Clears every component for a new run.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.trend.reset();
        self.volatility.reset();
        self.bond_closes.clear();
        self.last_cell = None;
        self.bars = 0;
    }

    /// Consumes the next bar of the traded symbol. `bond_close` is the same
    /// day's close of the bond-trend instrument, if one is available.
    /// `drawdown` is read, never modified.
    pub fn on_bar(
        &mut self,
        bar: &OhlcvBar,
        bond_close: Option<f64>,
        drawdown: &DrawdownState,
    ) -> Decision {
        self.bars += 1;

        if let Some(close) = bond_close.filter(|c| c.is_finite() && *c > 0.0) {
            self.bond_closes.push(close);
        }

        let reading = self.filter.update(FilterInput {
            close: bar.close,
            high: Some(bar.high),
            low: Some(bar.low),
            volume: Some(bar.volume as f64),
        });
        let vol = self.volatility.update(bar.close);
        let trend = self.trend.update(bar.close, reading.trend_strength);

        let (vol, trend_state) = match (vol, trend) {
            (Readiness::Ready(vol), Readiness::Ready(trend)) => (vol, trend),
            _ => {
                return Decision::NotReady {
                    bars: self.bars,
                    minimum: self.min_history,
                };
            }
        };

        let cell = RegimeCell::resolve(trend_state, vol.state);
        if self.last_cell != Some(cell) {
            tracing::info!(date = %bar.date, from = ?self.last_cell, to = %cell, "regime cell change");
            self.last_cell = Some(cell);
        }
        let rule = self.cells.rule(cell);

        let governed = self
            .governor
            .govern_detailed(rule.exposure, drawdown.fraction());
        let (region, mut weights) = self.mapper.map_detailed(governed.adjusted);

        let mut bond_trend = None;
        if rule.posture == Posture::Defensive && self.instruments.has_bonds() {
            let defensive_weight = weights.weight(Instrument::Cash);
            if defensive_weight > 0.0 {
                let bond_prices = self.bond_closes.to_vec();
                bond_trend = self.overlay.bond_trend(&bond_prices);
                let allocation: BTreeMap<Instrument, f64> =
                    self.overlay.allocate(&bond_prices, defensive_weight);
                weights = weights.redistribute_cash(&allocation);
            }
        }

        tracing::debug!(
            date = %bar.date,
            trend_strength = reading.trend_strength,
            z_score = vol.z_score,
            %cell,
            raw = governed.raw,
            adjusted = governed.adjusted,
            %weights,
            "target allocation"
        );

        Decision::Target(TargetAllocation {
            date: bar.date,
            filtered_price: reading.filtered_price,
            trend_strength: reading.trend_strength,
            realized_vol: vol.realized_vol,
            z_score: vol.z_score,
            trend_state,
            vol_state: vol.state,
            cell,
            posture: rule.posture,
            governed,
            region,
            bond_trend,
            weights,
        })
    }
}
