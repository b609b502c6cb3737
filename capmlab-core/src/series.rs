//! Price series building and return transforms.
//!
//! A provider response becomes a clean date-indexed level series (sorted,
//! deduplicated, missing prices dropped), then a return column is derived
//! according to the instrument's role:
//! - firm and market are price-quoted: simple period-over-period change
//! - the risk-free instrument is quoted as an annualized percent yield and is
//!   converted, row by row, to a daily compounding rate

use crate::data::RawPricePoint;
use crate::error::MetricsError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which leg of the market model a series feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Firm,
    Market,
    RiskFree,
}

impl Role {
    /// Short name used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Role::Firm => "firm",
            Role::Market => "market",
            Role::RiskFree => "rf",
        }
    }
}

/// How a level column turns into a return column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTransform {
    /// `level[t] / level[t-1] - 1`; undefined on the first row.
    PriceReturn,
    /// Percent annual yield → decimal yield → `(1 + y)^(1/365) - 1`.
    YieldReturn,
}

impl ReturnTransform {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Firm | Role::Market => ReturnTransform::PriceReturn,
            Role::RiskFree => ReturnTransform::YieldReturn,
        }
    }

    /// Apply to a sorted level series. Returns one record per input row.
    pub fn apply(self, levels: &[(NaiveDate, f64)]) -> Vec<ReturnRecord> {
        match self {
            ReturnTransform::PriceReturn => {
                let mut out = Vec::with_capacity(levels.len());
                let mut prev: Option<f64> = None;
                for &(date, level) in levels {
                    let ret = prev.filter(|p| *p != 0.0).map(|p| level / p - 1.0);
                    out.push(ReturnRecord { date, level, ret });
                    prev = Some(level);
                }
                out
            }
            ReturnTransform::YieldReturn => levels
                .iter()
                .map(|&(date, pct)| {
                    let level = pct / 100.0;
                    ReturnRecord {
                        date,
                        level,
                        ret: Some(daily_rate(level)),
                    }
                })
                .collect(),
        }
    }
}

/// Daily compounding rate equivalent to a decimal annual yield.
pub fn daily_rate(annual_decimal: f64) -> f64 {
    (1.0 + annual_decimal).powf(1.0 / 365.0) - 1.0
}

/// One row of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub date: NaiveDate,
    /// Price, or decimal yield for the risk-free leg.
    pub level: f64,
    /// `None` where no prior period exists.
    pub ret: Option<f64>,
}

/// Role-tagged return series with strictly increasing dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub role: Role,
    pub ticker: String,
    records: Vec<ReturnRecord>,
}

impl ReturnSeries {
    /// Build levels from raw points, then derive returns for `role`.
    pub fn from_points(
        role: Role,
        ticker: &str,
        points: &[RawPricePoint],
    ) -> Result<Self, MetricsError> {
        let levels = build_levels(ticker, points)?;
        Ok(Self {
            role,
            ticker: ticker.to_string(),
            records: ReturnTransform::for_role(role).apply(&levels),
        })
    }

    pub fn records(&self) -> &[ReturnRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Sort by date, drop non-finite prices, keep the last value per date.
///
/// Fails with `DataUnavailable` when nothing usable remains.
pub fn build_levels(
    ticker: &str,
    points: &[RawPricePoint],
) -> Result<Vec<(NaiveDate, f64)>, MetricsError> {
    let mut rows: Vec<(NaiveDate, f64)> = points
        .iter()
        .filter(|p| p.adjusted_close.is_finite())
        .map(|p| (p.date, p.adjusted_close))
        .collect();

    // Stable sort keeps provider order within a date, so `last` wins below.
    rows.sort_by_key(|(date, _)| *date);

    let mut levels: Vec<(NaiveDate, f64)> = Vec::with_capacity(rows.len());
    for row in rows {
        match levels.last_mut() {
            Some(last) if last.0 == row.0 => *last = row,
            _ => levels.push(row),
        }
    }

    if levels.is_empty() {
        return Err(MetricsError::DataUnavailable {
            ticker: ticker.to_string(),
        });
    }
    Ok(levels)
}
