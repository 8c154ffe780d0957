//! Tradable instrument slots and fixed-point weight vectors.

use std::collections::BTreeMap;
use std::fmt;

/// Weight resolution: parts per trillion.
pub const WEIGHT_SCALE: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    Core,
    LeveragedLong,
    LeveragedShort,
    BullBond,
    BearBond,
    Cash,
}

impl Instrument {
    pub const ALL: [Instrument; 6] = [
        Instrument::Core,
        Instrument::LeveragedLong,
        Instrument::LeveragedShort,
        Instrument::BullBond,
        Instrument::BearBond,
        Instrument::Cash,
    ];

    /// Net market beta used to reconstruct exposure from weights.
    pub fn beta(self) -> f64 {
        match self {
            Instrument::Core => 1.0,
            Instrument::LeveragedLong => 3.0,
            Instrument::LeveragedShort => -3.0,
            Instrument::BullBond | Instrument::BearBond | Instrument::Cash => 0.0,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Instrument::Core => "core",
            Instrument::LeveragedLong => "leveraged_long",
            Instrument::LeveragedShort => "leveraged_short",
            Instrument::BullBond => "bull_bond",
            Instrument::BearBond => "bear_bond",
            Instrument::Cash => "cash",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Ticker per instrument slot. Optional slots left empty are never allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSet {
    pub core: String,
    pub leveraged_long: Option<String>,
    pub leveraged_short: Option<String>,
    pub bull_bond: Option<String>,
    pub bear_bond: Option<String>,
    /// Symbol whose closes drive the safe-haven trend.
    pub bond_trend: Option<String>,
}

impl Default for InstrumentSet {
    fn default() -> Self {
        Self {
            core: "QQQ".into(),
            leveraged_long: Some("TQQQ".into()),
            leveraged_short: Some("SQQQ".into()),
            bull_bond: Some("TMF".into()),
            bear_bond: Some("TMV".into()),
            bond_trend: Some("TLT".into()),
        }
    }
}

impl InstrumentSet {
    pub fn symbol(&self, instrument: Instrument) -> Option<&str> {
        match instrument {
            Instrument::Core => Some(self.core.as_str()),
            Instrument::LeveragedLong => self.leveraged_long.as_deref(),
            Instrument::LeveragedShort => self.leveraged_short.as_deref(),
            Instrument::BullBond => self.bull_bond.as_deref(),
            Instrument::BearBond => self.bear_bond.as_deref(),
            Instrument::Cash => Some("CASH"),
        }
    }

    pub fn has(&self, instrument: Instrument) -> bool {
        self.symbol(instrument).is_some()
    }

    pub fn has_bonds(&self) -> bool {
        self.bull_bond.is_some() && self.bear_bond.is_some() && self.bond_trend.is_some()
    }
}

/// Long-only weights in fixed point, always summing to exactly [`WEIGHT_SCALE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightVector {
    parts: BTreeMap<Instrument, i64>,
}

/// Rounds a fraction to the nearest weight unit.
pub fn to_parts(fraction: f64) -> i64 {
    (fraction * WEIGHT_SCALE as f64).round() as i64
}

impl WeightVector {
    pub fn all_cash() -> Self {
        let mut parts = BTreeMap::new();
        parts.insert(Instrument::Cash, WEIGHT_SCALE);
        Self { parts }
    }

    /// Quantises `fractions` and hands the rounding residual to `residual`.
    /// Non-finite or negative fractions are treated as zero; if the rest
    /// already exceeds one, the vector degrades to all cash.
    pub fn from_fractions(fractions: &[(Instrument, f64)], residual: Instrument) -> Self {
        let mut parts: BTreeMap<Instrument, i64> = BTreeMap::new();
        for &(instrument, fraction) in fractions {
            if instrument == residual {
                continue;
            }
            let p = if fraction.is_finite() {
                to_parts(fraction).max(0)
            } else {
                0
            };
            if p > 0 {
                *parts.entry(instrument).or_insert(0) += p;
            }
        }
        let used: i64 = parts.values().sum();
        if used > WEIGHT_SCALE {
            tracing::warn!(used, "weights exceed one, falling back to cash");
            return Self::all_cash();
        }
        let rest = WEIGHT_SCALE - used;
        if rest > 0 {
            parts.insert(residual, rest);
        }
        Self { parts }
    }

    pub fn parts(&self, instrument: Instrument) -> i64 {
        self.parts.get(&instrument).copied().unwrap_or(0)
    }

    pub fn weight(&self, instrument: Instrument) -> f64 {
        self.parts(instrument) as f64 / WEIGHT_SCALE as f64
    }

    pub fn contains(&self, instrument: Instrument) -> bool {
        self.parts.contains_key(&instrument)
    }

    /// Instruments with a non-zero weight, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Instrument, f64)> + '_ {
        self.parts
            .iter()
            .map(|(&i, &p)| (i, p as f64 / WEIGHT_SCALE as f64))
    }

    pub fn total(&self) -> f64 {
        self.parts.values().sum::<i64>() as f64 / WEIGHT_SCALE as f64
    }

    /// Σ weight × beta.
    pub fn net_exposure(&self) -> f64 {
        self.iter().map(|(i, w)| w * i.beta()).sum()
    }

    /// Replaces the cash leg with `allocation`, whose weights must sum to the
    /// current cash weight. Cash absorbs the rounding residual.
    pub fn redistribute_cash(&self, allocation: &BTreeMap<Instrument, f64>) -> Self {
        let mut fractions: Vec<(Instrument, f64)> = self
            .iter()
            .filter(|(i, _)| *i != Instrument::Cash)
            .collect();
        fractions.extend(
            allocation
                .iter()
                .filter(|(i, _)| **i != Instrument::Cash)
                .map(|(&i, &w)| (i, w)),
        );
        Self::from_fractions(&fractions, Instrument::Cash)
    }
}

impl fmt::Display for WeightVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (instrument, w) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={:.4}", instrument, w)?;
            first = false;
        }
        Ok(())
    }
}
