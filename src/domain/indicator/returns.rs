//! Log returns and realised volatility.

use super::stddev::sample_stddev;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// ln(p[i] / p[i-1]) for each consecutive pair. Non-positive prices give 0.0.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| log_return(w[0], w[1])).collect()
}

pub fn log_return(prev: f64, curr: f64) -> f64 {
    if prev > 0.0 && curr > 0.0 {
        (curr / prev).ln()
    } else {
        0.0
    }
}

/// Sample stddev of `returns` scaled by sqrt(252).
pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    sample_stddev(returns).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
}
