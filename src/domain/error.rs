//! Domain error types.
//!
//! Only construction and I/O fail with an error. Per-bar computations absorb
//! degenerate inputs into safe defaults and report missing history through
//! [`crate::domain::readiness::Readiness`] instead.

/// Top-level error type for regimetrader.
#[derive(Debug, thiserror::Error)]
pub enum RegimeError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RegimeError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RegimeError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&RegimeError> for std::process::ExitCode {
    fn from(err: &RegimeError) -> Self {
        let code: u8 = match err {
            RegimeError::Io(_) => 1,
            RegimeError::ConfigParse { .. }
            | RegimeError::ConfigMissing { .. }
            | RegimeError::ConfigInvalid { .. } => 2,
            RegimeError::Data { .. } => 3,
            RegimeError::NoData { .. } | RegimeError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
