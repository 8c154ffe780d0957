//! Simple moving average over the trailing `period` values.

/// Mean of the last `period` values. `None` when there are fewer than
/// `period` values or `period` is zero.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}
