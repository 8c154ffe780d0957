//! Bar retrieval port.
//!
//! Data acquisition lives outside the engine; this trait is the seam a store
//! plugs into. Implementations return bars sorted by date, one per day.

use crate::domain::error::RegimeError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` within the inclusive date range. `None` leaves that
    /// side of the range open.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RegimeError>;

    fn list_symbols(&self) -> Result<Vec<String>, RegimeError>;
}
