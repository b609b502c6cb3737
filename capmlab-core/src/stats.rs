//! Sample statistics over plain `f64` slices.
//!
//! All functions return `None` when the statistic is undefined (too few
//! points) instead of producing NaN.

/// Standard deviations below this are treated as zero.
pub const ZERO_STD: f64 = 1e-15;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (N-1 denominator).
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    sample_covariance(values, values)
}

/// Sample standard deviation (N-1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Sample covariance (N-1 denominator). Slices must have equal length.
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum();
    Some(sum / (xs.len() - 1) as f64)
}
