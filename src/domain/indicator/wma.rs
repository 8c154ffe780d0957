//! Linearly weighted moving average.
//!
//! WMA = (1*v[0] + 2*v[1] + ... + n*v[n-1]) / (n*(n+1)/2), oldest first,
//! so the most recent entry carries the largest weight.

/// Weighted average of `values` (oldest first). Empty input yields 0.0.
pub fn wma<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut weighted_sum = 0.0;
    let mut n = 0usize;
    for (i, v) in values.into_iter().enumerate() {
        weighted_sum += (i + 1) as f64 * v;
        n = i + 1;
    }
    if n == 0 {
        return 0.0;
    }
    let divisor = (n * (n + 1)) as f64 / 2.0;
    weighted_sum / divisor
}
