//! Exposure-to-weight mapping.
//!
//! Four regions of net exposure `E`, each a pure function of `E`:
//!
//! | region          | range        | weights                                         |
//! |-----------------|--------------|-------------------------------------------------|
//! | LeveragedShort  | E <= -1      | inverse = (1 - E) / 4, core = 1 - inverse       |
//! | Short           | -1 < E < 0   | inverse = -E / 3, cash = 1 - inverse            |
//! | Long            | 0 <= E <= 1  | core = E, cash = 1 - E                          |
//! | LeveragedLong   | E > 1        | leveraged = (E - 1) / 2, core = 1 - leveraged   |
//!
//! With betas core 1, leveraged long 3 and inverse -3 every vector
//! reconstructs `E` exactly (up to fixed-point rounding).

use crate::domain::config_validation::validate_exposure;
use crate::domain::error::RegimeError;
use crate::domain::instrument::{Instrument, WeightVector};

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ExposureBounds {
    fn default() -> Self {
        Self {
            min: -1.0,
            max: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureRegion {
    LeveragedShort,
    Short,
    Long,
    LeveragedLong,
}

impl ExposureRegion {
    pub fn of(exposure: f64) -> Self {
        if exposure <= -1.0 {
            ExposureRegion::LeveragedShort
        } else if exposure < 0.0 {
            ExposureRegion::Short
        } else if exposure <= 1.0 {
            ExposureRegion::Long
        } else {
            ExposureRegion::LeveragedLong
        }
    }

    /// Unquantised weights for `exposure`, which must lie in this region.
    pub fn fractions(self, exposure: f64) -> (Vec<(Instrument, f64)>, Instrument) {
        match self {
            ExposureRegion::LeveragedShort => (
                vec![(Instrument::LeveragedShort, (1.0 - exposure) / 4.0)],
                Instrument::Core,
            ),
            ExposureRegion::Short => (
                vec![(Instrument::LeveragedShort, -exposure / 3.0)],
                Instrument::Cash,
            ),
            ExposureRegion::Long => (vec![(Instrument::Core, exposure)], Instrument::Cash),
            ExposureRegion::LeveragedLong => (
                vec![(Instrument::LeveragedLong, (exposure - 1.0) / 2.0)],
                Instrument::Core,
            ),
        }
    }
}

impl std::fmt::Display for ExposureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExposureRegion::LeveragedShort => write!(f, "leveraged_short"),
            ExposureRegion::Short => write!(f, "short"),
            ExposureRegion::Long => write!(f, "long"),
            ExposureRegion::LeveragedLong => write!(f, "leveraged_long"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExposureMapper {
    bounds: ExposureBounds,
}

impl ExposureMapper {
    pub fn new(bounds: ExposureBounds) -> Result<Self, RegimeError> {
        validate_exposure(&bounds)?;
        Ok(Self { bounds })
    }

    pub fn bounds(&self) -> &ExposureBounds {
        &self.bounds
    }

    pub fn clamp(&self, exposure: f64) -> f64 {
        exposure.clamp(self.bounds.min, self.bounds.max)
    }

    /// Clamps `exposure` to the configured bounds and maps it to weights.
    /// A non-finite exposure maps to all cash.
    pub fn map(&self, exposure: f64) -> WeightVector {
        self.map_detailed(exposure).1
    }

    pub fn map_detailed(&self, exposure: f64) -> (ExposureRegion, WeightVector) {
        if !exposure.is_finite() {
            tracing::warn!(exposure, "non-finite exposure, allocating to cash");
            return (ExposureRegion::Long, WeightVector::all_cash());
        }
        let e = self.clamp(exposure);
        let region = ExposureRegion::of(e);
        let (fractions, residual) = region.fractions(e);
        (region, WeightVector::from_fractions(&fractions, residual))
    }
}
