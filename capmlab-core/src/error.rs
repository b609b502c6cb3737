//! Per-firm metric failures.
//!
//! Every variant aborts one firm's computation only; the runner records it
//! and moves on to the next configuration row.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("no usable price data for '{ticker}'")]
    DataUnavailable { ticker: String },

    #[error("insufficient data: {observations} aligned observation(s), need at least 2")]
    InsufficientData { observations: usize },

    #[error("degenerate regression: market excess return has zero variance")]
    DegenerateRegression,

    #[error("degenerate ratio: {ratio} has a zero denominator")]
    DegenerateRatio { ratio: &'static str },

    #[error("zero elapsed period: first and last observation both on {date}")]
    ZeroElapsedPeriod { date: NaiveDate },
}

impl MetricsError {
    /// Short stable name of the failure kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricsError::DataUnavailable { .. } => "DataUnavailable",
            MetricsError::InsufficientData { .. } => "InsufficientData",
            MetricsError::DegenerateRegression => "DegenerateRegression",
            MetricsError::DegenerateRatio { .. } => "DegenerateRatio",
            MetricsError::ZeroElapsedPeriod { .. } => "ZeroElapsedPeriod",
        }
    }
}
