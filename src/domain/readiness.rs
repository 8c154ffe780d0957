//! Explicit "not enough history yet" signal.

/// Output of a component that needs a minimum lookback before it can classify.
///
/// `InsufficientData` is not an error: the caller treats the bar as
/// non-actionable and keeps feeding history.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Readiness<T> {
    Ready(T),
    InsufficientData { bars: usize, minimum: usize },
}

impl<T> Readiness<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Readiness::Ready(v) => Some(v),
            Readiness::InsufficientData { .. } => None,
        }
    }
}
