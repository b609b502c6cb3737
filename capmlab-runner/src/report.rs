//! Per-run aggregation of firm results.
//!
//! A [`ReportAggregator`] is created for each batch and consumed by
//! [`ReportAggregator::finish`]. Records may arrive in any order (parallel
//! runs); each carries its configuration row index and the finished report is
//! sorted by it, so output order always matches input order.

use serde::{Deserialize, Serialize};

use capmlab_core::metrics::ChartPoint;
use capmlab_core::FirmMetrics;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// A configuration row that produced no metrics, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFirm {
    pub row: usize,
    pub firm_name: String,
    pub ticker: String,
    /// Stable failure kind, e.g. `DegenerateRegression`.
    pub kind: String,
    pub reason: String,
}

/// Chart-sink input for one firm.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmChart {
    pub firm_name: String,
    pub ticker: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub points: Vec<ChartPoint>,
}

/// Final ordered result of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub market_ticker: String,
    pub risk_free_ticker: String,
    pub firms: Vec<FirmMetrics>,
    pub skipped: Vec<SkippedFirm>,
    #[serde(skip)]
    pub charts: Vec<FirmChart>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BatchReport {
    /// Rows processed, successful or not.
    pub fn total(&self) -> usize {
        self.firms.len() + self.skipped.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Append-only collector for one batch.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    market_ticker: String,
    risk_free_ticker: String,
    successes: Vec<(usize, FirmMetrics, FirmChart)>,
    skipped: Vec<SkippedFirm>,
}

impl ReportAggregator {
    pub fn new(market_ticker: &str, risk_free_ticker: &str) -> Self {
        Self {
            market_ticker: market_ticker.to_string(),
            risk_free_ticker: risk_free_ticker.to_string(),
            ..Default::default()
        }
    }

    pub fn record_success(
        &mut self,
        row: usize,
        metrics: FirmMetrics,
        chart_points: Vec<ChartPoint>,
    ) {
        let chart = FirmChart {
            firm_name: metrics.firm_name.clone(),
            ticker: metrics.ticker.clone(),
            start_date: metrics.start_date,
            end_date: metrics.end_date,
            points: chart_points,
        };
        self.successes.push((row, metrics, chart));
    }

    pub fn record_skip(&mut self, skipped: SkippedFirm) {
        self.skipped.push(skipped);
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort by input row and emit the report.
    pub fn finish(mut self) -> BatchReport {
        self.successes.sort_by_key(|(row, _, _)| *row);
        self.skipped.sort_by_key(|s| s.row);

        let (firms, charts): (Vec<_>, Vec<_>) = self
            .successes
            .into_iter()
            .map(|(_, metrics, chart)| (metrics, chart))
            .unzip();

        BatchReport {
            schema_version: SCHEMA_VERSION,
            market_ticker: self.market_ticker,
            risk_free_ticker: self.risk_free_ticker,
            firms,
            skipped: self.skipped,
            charts,
        }
    }
}
