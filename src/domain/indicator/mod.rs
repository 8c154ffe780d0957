//! Numeric kernels shared by the regime components.
//!
//! - `RollingWindow`: bounded FIFO buffer, oldest entry evicted on overflow
//! - `sma`: simple moving average of the trailing window
//! - `wma`: linearly weighted average, newest entry heaviest
//! - `stddev`: mean and sample standard deviation
//! - `returns`: log returns and annualised realised volatility

pub mod returns;
pub mod sma;
pub mod stddev;
pub mod wma;

use std::collections::VecDeque;

/// Fixed-capacity ring buffer of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends `value`, returning the evicted oldest entry when full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.capacity == 0 {
            return Some(value);
        }
        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = f64> + ExactSizeIterator + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Largest absolute value, 0.0 when empty.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
