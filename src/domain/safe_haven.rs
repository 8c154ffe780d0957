//! Safe-haven overlay: decides which leveraged bond fund, if any, takes part of
//! a defensive allocation.
//!
//! Fast SMA above slow SMA of the bond-trend instrument routes
//! `min(defensive_weight * bond_multiplier, max_bond_weight)` to the bull bond
//! fund; otherwise the same amount goes to the bear bond fund. The rest stays
//! in cash. Without enough bond history the whole defensive weight is cash.

use std::collections::BTreeMap;

use crate::domain::config_validation::validate_safe_haven;
use crate::domain::error::RegimeError;
use crate::domain::indicator::sma::sma;
use crate::domain::instrument::Instrument;

pub type Allocation = BTreeMap<Instrument, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct SafeHavenConfig {
    pub fast_window: usize,
    pub slow_window: usize,
    pub bond_multiplier: f64,
    pub max_bond_weight: f64,
}

impl Default for SafeHavenConfig {
    fn default() -> Self {
        Self {
            fast_window: 20,
            slow_window: 60,
            bond_multiplier: 0.4,
            max_bond_weight: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondTrend {
    Bull,
    Bear,
}

#[derive(Debug, Clone)]
pub struct SafeHavenOverlay {
    config: SafeHavenConfig,
}

impl SafeHavenOverlay {
    pub fn new(config: SafeHavenConfig) -> Result<Self, RegimeError> {
        validate_safe_haven(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SafeHavenConfig {
        &self.config
    }

    /// `None` when either average cannot be computed yet.
    pub fn bond_trend(&self, bond_prices: &[f64]) -> Option<BondTrend> {
        let fast = sma(bond_prices, self.config.fast_window)?;
        let slow = sma(bond_prices, self.config.slow_window)?;
        if !fast.is_finite() || !slow.is_finite() {
            return None;
        }
        Some(if fast > slow {
            BondTrend::Bull
        } else {
            BondTrend::Bear
        })
    }

    pub fn allocate(&self, bond_prices: &[f64], defensive_weight: f64) -> Allocation {
        let defensive_weight = if defensive_weight.is_finite() {
            defensive_weight.max(0.0)
        } else {
            0.0
        };
        let mut allocation = Allocation::new();
        let Some(trend) = self.bond_trend(bond_prices) else {
            allocation.insert(Instrument::Cash, defensive_weight);
            return allocation;
        };

        let bond_weight =
            (defensive_weight * self.config.bond_multiplier).min(self.config.max_bond_weight);
        let bond = match trend {
            BondTrend::Bull => Instrument::BullBond,
            BondTrend::Bear => Instrument::BearBond,
        };
        allocation.insert(bond, bond_weight);
        allocation.insert(Instrument::Cash, defensive_weight - bond_weight);
        allocation
    }
}
