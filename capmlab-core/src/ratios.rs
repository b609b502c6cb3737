//! Sharpe and Treynor ratios over aligned daily returns.
//!
//! Both share the numerator `mean(r_firm) - mean(r_rf)` and are per-period
//! (daily), not annualized.

use crate::error::MetricsError;
use crate::stats::{mean, sample_std, ZERO_STD};

/// Mean firm return in excess of the mean risk-free rate.
pub fn mean_excess_return(r_firm: &[f64], r_rf: &[f64]) -> Result<f64, MetricsError> {
    if r_firm.len() < 2 || r_firm.len() != r_rf.len() {
        return Err(MetricsError::InsufficientData {
            observations: r_firm.len().min(r_rf.len()),
        });
    }
    match (mean(r_firm), mean(r_rf)) {
        (Some(f), Some(rf)) => Ok(f - rf),
        _ => Err(MetricsError::InsufficientData { observations: 0 }),
    }
}

/// `(mean(r_firm) - mean(r_rf)) / sample_std(r_firm)`
pub fn sharpe_ratio(r_firm: &[f64], r_rf: &[f64]) -> Result<f64, MetricsError> {
    let excess = mean_excess_return(r_firm, r_rf)?;
    let std = sample_std(r_firm).unwrap_or(0.0);
    if std.is_nan() || std < ZERO_STD {
        return Err(MetricsError::DegenerateRatio { ratio: "sharpe" });
    }
    Ok(excess / std)
}

/// `(mean(r_firm) - mean(r_rf)) / beta`
pub fn treynor_ratio(r_firm: &[f64], r_rf: &[f64], beta: f64) -> Result<f64, MetricsError> {
    let excess = mean_excess_return(r_firm, r_rf)?;
    if beta.is_nan() || beta.abs() < ZERO_STD {
        return Err(MetricsError::DegenerateRatio { ratio: "treynor" });
    }
    Ok(excess / beta)
}
