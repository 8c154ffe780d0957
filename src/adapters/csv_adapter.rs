//! CSV file data adapter.
//!
//! One file per symbol, `<SYMBOL>.csv`, with a header row and columns
//! `date,open,high,low,close,volume`; dates are `YYYY-MM-DD`.

use crate::domain::error::RegimeError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn column<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<&'a str, RegimeError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| RegimeError::Data {
            reason: format!("line {}: missing {} column", line, name),
        })
}

fn price(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<f64, RegimeError> {
    let raw = column(record, index, name, line)?;
    let value: f64 = raw.parse().map_err(|e| RegimeError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(RegimeError::Data {
            reason: format!("line {}: {} must be positive, got {}", line, name, value),
        });
    }
    Ok(value)
}

/// Accepts integer or float volume columns; some exports write `1234.0`.
fn volume(record: &csv::StringRecord, line: u64) -> Result<i64, RegimeError> {
    let raw = column(record, 5, "volume", line)?;
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.round() as i64))
        .map_err(|e| RegimeError::Data {
            reason: format!("line {}: invalid volume value '{}': {}", line, raw, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RegimeError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(RegimeError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| RegimeError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let date_str = column(&record, 0, "date", line)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                RegimeError::Data {
                    reason: format!("line {}: invalid date '{}': {}", line, date_str, e),
                }
            })?;

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            let bar = OhlcvBar {
                code: symbol.to_string(),
                date,
                open: price(&record, 1, "open", line)?,
                high: price(&record, 2, "high", line)?,
                low: price(&record, 3, "low", line)?,
                close: price(&record, 4, "close", line)?,
                volume: volume(&record, line)?,
            };
            bar.check()?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RegimeError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RegimeError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
