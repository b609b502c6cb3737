//! Batch runner: wires the firm list, a price provider and the metric pipeline.
//!
//! Two entry points:
//! - `run_firm()`: fetches the three legs for one configuration row and
//!   computes its metrics.
//! - `run_batch()`: runs every row (sequentially or on a rayon pool) into a
//!   fresh [`ReportAggregator`]. A failing row is logged and recorded as
//!   skipped; it never stops the batch.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use capmlab_core::data::{DataError, DataProvider, RawPricePoint};
use capmlab_core::metrics::ChartPoint;
use capmlab_core::{analyze, FirmMetrics, MetricsError, PriceInputs, Role};

use crate::config::{FirmConfig, FirmTable, RunConfig};
use crate::report::{BatchReport, ReportAggregator, SkippedFirm};

/// Why one firm produced no metrics.
#[derive(Debug, Error)]
pub enum FirmError {
    #[error("invalid configuration row: {0}")]
    InvalidConfig(String),

    #[error("fetch failed for '{ticker}': {source}")]
    Fetch {
        ticker: String,
        #[source]
        source: DataError,
    },

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl FirmError {
    /// Stable failure kind for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FirmError::InvalidConfig(_) => "InvalidConfig",
            FirmError::Fetch { source, .. } => match source {
                DataError::SymbolNotFound { .. } | DataError::NoRecords { .. } => {
                    "DataUnavailable"
                }
                _ => "FetchFailed",
            },
            FirmError::Metrics(e) => e.kind(),
        }
    }
}

fn fetch_points(
    provider: &dyn DataProvider,
    role: Role,
    ticker: &str,
    firm: &FirmConfig,
) -> Result<Vec<RawPricePoint>, FirmError> {
    let result = provider
        .fetch(ticker, firm.start_date, firm.end_date)
        .map_err(|source| FirmError::Fetch {
            ticker: ticker.to_string(),
            source,
        })?;
    debug!(
        ticker,
        role = role.label(),
        provider = provider.name(),
        points = result.points.len(),
        "fetched series"
    );
    Ok(result.points)
}

/// Fetch firm, market and risk-free series over the firm's range and
/// compute its metrics.
pub fn run_firm(
    firm: &FirmConfig,
    provider: &dyn DataProvider,
    config: &RunConfig,
) -> Result<(FirmMetrics, Vec<ChartPoint>), FirmError> {
    let firm_points = fetch_points(provider, Role::Firm, &firm.ticker, firm)?;
    let market_points = fetch_points(provider, Role::Market, &config.market_ticker, firm)?;
    let rf_points = fetch_points(provider, Role::RiskFree, &config.risk_free_ticker, firm)?;

    let analysis = analyze(&PriceInputs {
        firm_ticker: &firm.ticker,
        firm: &firm_points,
        market_ticker: &config.market_ticker,
        market: &market_points,
        risk_free_ticker: &config.risk_free_ticker,
        risk_free: &rf_points,
    })?;

    let metrics = FirmMetrics::new(
        &firm.firm_name,
        &firm.ticker,
        firm.start_date,
        firm.end_date,
        &analysis.metrics,
    );
    Ok((metrics, analysis.chart_points()))
}

type RowOutcome = (usize, Result<(FirmMetrics, Vec<ChartPoint>), FirmError>);

fn run_row(firm: &FirmConfig, provider: &dyn DataProvider, config: &RunConfig) -> RowOutcome {
    info!(row = firm.row, firm = %firm.firm_name, ticker = %firm.ticker, "processing firm");
    (firm.row, run_firm(firm, provider, config))
}

/// Run every row of `table` and collect the ordered report.
///
/// Rows rejected while parsing the firm list are carried into the report as
/// `InvalidConfig` skips. Parallel and sequential runs give the same report.
pub fn run_batch(
    table: &FirmTable,
    provider: &dyn DataProvider,
    config: &RunConfig,
) -> BatchReport {
    let mut aggregator = ReportAggregator::new(&config.market_ticker, &config.risk_free_ticker);

    for rejected in &table.rejected {
        let error = FirmError::InvalidConfig(rejected.reason.clone());
        warn!(row = rejected.row, firm = %rejected.firm_name, "skipping firm: {error}");
        aggregator.record_skip(SkippedFirm {
            row: rejected.row,
            firm_name: rejected.firm_name.clone(),
            ticker: rejected.ticker.clone(),
            kind: error.kind().to_string(),
            reason: error.to_string(),
        });
    }

    let outcomes = if config.parallel {
        run_parallel(&table.firms, provider, config)
    } else {
        table
            .firms
            .iter()
            .map(|firm| run_row(firm, provider, config))
            .collect()
    };

    for (firm, (row, outcome)) in table.firms.iter().zip(outcomes) {
        match outcome {
            Ok((metrics, chart)) => {
                info!(
                    row,
                    firm = %firm.firm_name,
                    alpha = metrics.alpha,
                    beta = metrics.beta,
                    observations = metrics.observations,
                    "firm complete"
                );
                aggregator.record_success(row, metrics, chart);
            }
            Err(error) => {
                warn!(
                    row,
                    firm = %firm.firm_name,
                    ticker = %firm.ticker,
                    kind = error.kind(),
                    "skipping firm: {error}"
                );
                aggregator.record_skip(SkippedFirm {
                    row,
                    firm_name: firm.firm_name.clone(),
                    ticker: firm.ticker.clone(),
                    kind: error.kind().to_string(),
                    reason: error.to_string(),
                });
            }
        }
    }

    let report = aggregator.finish();
    info!(
        succeeded = report.firms.len(),
        skipped = report.skipped.len(),
        "batch complete"
    );
    report
}

fn run_parallel(
    firms: &[FirmConfig],
    provider: &dyn DataProvider,
    config: &RunConfig,
) -> Vec<RowOutcome> {
    let run = || {
        firms
            .par_iter()
            .map(|firm| run_row(firm, provider, config))
            .collect::<Vec<_>>()
    };

    if config.threads == 0 {
        return run();
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            warn!("failed to build a {}-thread pool, using the global pool: {e}", config.threads);
            run()
        }
    }
}
