//! Daily price bar consumed by the engine.

use crate::domain::error::RegimeError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// Rejects bars the filter cannot use: an inverted high/low band, a close
    /// outside it, or negative volume.
    pub fn check(&self) -> Result<(), RegimeError> {
        let reason = if self.high < self.low {
            Some(format!("high {} below low {}", self.high, self.low))
        } else if self.close > self.high || self.close < self.low {
            Some(format!(
                "close {} outside [{}, {}]",
                self.close, self.low, self.high
            ))
        } else if self.volume < 0 {
            Some(format!("negative volume {}", self.volume))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(RegimeError::Data {
                reason: format!("{} {}: {}", self.code, self.date, reason),
            }),
            None => Ok(()),
        }
    }
}
