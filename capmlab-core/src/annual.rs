//! Compounded annualized return over the observed calendar span.

use crate::align::AlignedSeries;
use crate::error::MetricsError;
use chrono::NaiveDate;

/// Calendar days per year used for annualizing.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// `(last / first)^(365 / days) - 1` between two dated price levels.
pub fn annualized_return(
    first_date: NaiveDate,
    first_level: f64,
    last_date: NaiveDate,
    last_level: f64,
) -> Result<f64, MetricsError> {
    let days = (last_date - first_date).num_days();
    if days == 0 {
        return Err(MetricsError::ZeroElapsedPeriod { date: first_date });
    }
    if first_level.is_nan() || first_level <= 0.0 || !last_level.is_finite() {
        return Err(MetricsError::DegenerateRatio {
            ratio: "annual_return",
        });
    }
    let total = last_level / first_level - 1.0;
    let annual = (1.0 + total).powf(DAYS_PER_YEAR / days as f64) - 1.0;
    if !annual.is_finite() {
        return Err(MetricsError::DegenerateRatio {
            ratio: "annual_return",
        });
    }
    Ok(annual)
}

/// Annualized firm return between the first and last aligned observations.
pub fn annual_return(aligned: &AlignedSeries) -> Result<f64, MetricsError> {
    let first = aligned.first();
    let last = aligned.last();
    annualized_return(first.date, first.firm_level, last.date, last.firm_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn exactly_one_year_is_the_total_return() {
        // 2023 is not a leap year: 365 days
        let r = annualized_return(d(2023, 1, 1), 100.0, d(2024, 1, 1), 110.0).unwrap();
        assert!((r - 0.10).abs() < 1e-12);
    }

    #[test]
    fn short_period_compounds_up() {
        let start = d(2023, 1, 1);
        let end = start + chrono::Duration::days(365 / 5);
        let r = annualized_return(start, 100.0, end, 101.0).unwrap();
        let expected = 1.01_f64.powf(365.0 / 73.0) - 1.0;
        assert!((r - expected).abs() < 1e-12);
        assert!(r > 0.01);
    }

    #[test]
    fn same_day_is_zero_elapsed() {
        let err = annualized_return(d(2024, 5, 1), 100.0, d(2024, 5, 1), 120.0).unwrap_err();
        assert_eq!(
            err,
            MetricsError::ZeroElapsedPeriod {
                date: d(2024, 5, 1)
            }
        );
    }

    #[test]
    fn non_positive_start_is_degenerate() {
        let err = annualized_return(d(2024, 1, 1), 0.0, d(2024, 6, 1), 10.0).unwrap_err();
        assert_eq!(err.kind(), "DegenerateRatio");
    }

    #[test]
    fn overflowing_compounding_is_degenerate() {
        // 101^(365 / 2) overflows f64
        let err = annualized_return(d(2023, 1, 2), 1.0, d(2023, 1, 4), 101.0).unwrap_err();
        assert_eq!(
            err,
            MetricsError::DegenerateRatio {
                ratio: "annual_return"
            }
        );
    }

    #[test]
    fn uses_price_ratio_not_difference() {
        // (last - first) - 1 would give 9.0 here
        let r = annualized_return(d(2023, 1, 1), 10.0, d(2024, 1, 1), 20.0).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }
}
