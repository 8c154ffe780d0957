//! Standard deviation and mean.
//!
//! `sample_stddev` divides by (n - 1) and is what the volatility classifier uses
//! for both the realised-volatility window and the baseline window.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation. `None` for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_known_values() {
        assert_eq!(mean(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(5.0));
    }

    #[test]
    fn sample_known_values() {
        // sum of squares 32 over 7 degrees of freedom
        let v = sample_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((v - (32.0_f64 / 7.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn constant_values_have_zero_spread() {
        let v = sample_stddev(&[100.0; 5]).unwrap();
        assert!((v - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn too_short() {
        assert_eq!(sample_stddev(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }
}
