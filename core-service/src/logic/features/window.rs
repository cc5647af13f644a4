//! Window statistics
//!
//! Plain functions over `&[f64]`, oldest value first.

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n-1); 0 for fewer than two values
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let Some(m) = mean(values) else {
        return 0.0;
    };
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    ss / (values.len() - 1) as f64
}

/// Least-squares slope against the sample index
pub fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Z-score of the last value against the values before it
///
/// 0 when fewer than two preceding values or their std is 0.
pub fn trailing_zscore(values: &[f64]) -> f64 {
    let Some((last, preceding)) = values.split_last() else {
        return 0.0;
    };
    if preceding.len() < 2 {
        return 0.0;
    }

    let std = sample_variance(preceding).sqrt();
    match mean(preceding) {
        Some(m) if std > f64::EPSILON => (last - m) / std,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(sample_variance(&[5.0]), 0.0);
        assert!((sample_variance(&[1.0, 2.0, 3.0, 4.0]) - 1.666_666_7).abs() < 1e-6);
    }

    #[test]
    fn test_slope() {
        assert_eq!(slope(&[3.0]), 0.0);
        assert!((slope(&[1.0, 3.0, 5.0, 7.0]) - 2.0).abs() < 1e-12);
        assert!((slope(&[4.0, 4.0, 4.0])).abs() < 1e-12);
        assert!(slope(&[10.0, 8.0, 6.0]) < 0.0);
    }

    #[test]
    fn test_trailing_zscore() {
        assert_eq!(trailing_zscore(&[1.0, 1.0, 1.0, 9.0]), 0.0);
        assert_eq!(trailing_zscore(&[1.0, 9.0]), 0.0);

        // preceding mean 2, std 1
        let z = trailing_zscore(&[1.0, 2.0, 3.0, 5.0]);
        assert!((z - 3.0).abs() < 1e-12);
    }
}
