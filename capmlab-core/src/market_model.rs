//! Market model fit: `r_firm - r_rf = alpha + beta * (r_market - r_rf)`.
//!
//! Closed-form ordinary least squares on the excess returns:
//! `beta = cov(x, y) / var(x)`, `alpha = mean(y) - beta * mean(x)`.

use crate::align::AlignedObservation;
use crate::error::MetricsError;
use crate::stats::{mean, sample_covariance, sample_variance, ZERO_STD};
use serde::{Deserialize, Serialize};

/// Fitted intercept and slope of the market model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketModelFit {
    pub alpha: f64,
    pub beta: f64,
    /// Coefficient of determination; 0 when the firm excess return is constant.
    pub r_squared: f64,
    pub observations: usize,
}

impl MarketModelFit {
    /// Fit over aligned observations.
    pub fn fit(observations: &[AlignedObservation]) -> Result<Self, MetricsError> {
        let x: Vec<f64> = observations.iter().map(|o| o.excess_market()).collect();
        let y: Vec<f64> = observations.iter().map(|o| o.excess_firm()).collect();
        Self::fit_xy(&x, &y)
    }

    /// Fit `y = alpha + beta * x` directly.
    pub fn fit_xy(x: &[f64], y: &[f64]) -> Result<Self, MetricsError> {
        let var_x = sample_variance(x).ok_or(MetricsError::DegenerateRegression)?;
        if var_x.is_nan() || var_x.sqrt() < ZERO_STD {
            return Err(MetricsError::DegenerateRegression);
        }
        let cov_xy = sample_covariance(x, y).ok_or(MetricsError::DegenerateRegression)?;
        let mean_x = mean(x).ok_or(MetricsError::DegenerateRegression)?;
        let mean_y = mean(y).ok_or(MetricsError::DegenerateRegression)?;

        let beta = cov_xy / var_x;
        let alpha = mean_y - beta * mean_x;

        let r_squared = match sample_variance(y) {
            Some(var_y) if var_y.sqrt() >= ZERO_STD => (cov_xy * cov_xy) / (var_x * var_y),
            _ => 0.0,
        };

        if !alpha.is_finite() || !beta.is_finite() {
            return Err(MetricsError::DegenerateRegression);
        }

        Ok(Self {
            alpha,
            beta,
            r_squared,
            observations: x.len(),
        })
    }

    /// Fitted excess firm return at excess market return `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.alpha + self.beta * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn synthetic_x(n: usize) -> Vec<f64> {
        // deterministic, non-constant market excess returns
        (0..n)
            .map(|i| 0.01 * ((i as f64) * 0.7).sin() + 0.002 * (i % 5) as f64)
            .collect()
    }

    #[test]
    fn recovers_known_coefficients_without_noise() {
        let x = synthetic_x(250);
        let y: Vec<f64> = x.iter().map(|x| 0.001 + 1.2 * x).collect();
        let fit = MarketModelFit::fit_xy(&x, &y).unwrap();
        assert!((fit.alpha - 0.001).abs() < 1e-6, "alpha = {}", fit.alpha);
        assert!((fit.beta - 1.2).abs() < 1e-6, "beta = {}", fit.beta);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(fit.observations, 250);
    }

    #[test]
    fn recovers_coefficients_under_small_gaussian_noise() {
        let mut rng = StdRng::seed_from_u64(42);
        let x = synthetic_x(2000);
        let y: Vec<f64> = x
            .iter()
            .map(|x| {
                // Box-Muller
                let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
                let u2: f64 = rng.gen();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                0.001 + 1.2 * x + 1e-4 * z
            })
            .collect();
        let fit = MarketModelFit::fit_xy(&x, &y).unwrap();
        assert!((fit.alpha - 0.001).abs() < 1e-4);
        assert!((fit.beta - 1.2).abs() < 1e-2);
        assert!(fit.r_squared > 0.9);
    }

    #[test]
    fn constant_market_is_degenerate() {
        let x = vec![0.0; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64 * 0.01).collect();
        assert_eq!(
            MarketModelFit::fit_xy(&x, &y).unwrap_err(),
            MetricsError::DegenerateRegression
        );
    }

    #[test]
    fn fewer_than_two_points_is_degenerate() {
        assert_eq!(
            MarketModelFit::fit_xy(&[0.01], &[0.02]).unwrap_err(),
            MetricsError::DegenerateRegression
        );
        assert_eq!(
            MarketModelFit::fit_xy(&[], &[]).unwrap_err(),
            MetricsError::DegenerateRegression
        );
    }

    #[test]
    fn predict_follows_fitted_line() {
        let fit = MarketModelFit {
            alpha: 0.5,
            beta: 2.0,
            r_squared: 1.0,
            observations: 2,
        };
        assert_eq!(fit.predict(1.0), 2.5);
    }
}
