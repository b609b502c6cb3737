//! Per-firm metric pipeline over already-fetched price data.
//!
//! raw points → return series (per role) → aligned observations →
//! market model fit + Sharpe/Treynor + annualized return.
//!
//! Everything here is pure: the same inputs always give the same
//! [`FirmAnalysis`], regardless of what was computed before.

use crate::align::{align, AlignedSeries};
use crate::annual::annual_return;
use crate::data::RawPricePoint;
use crate::error::MetricsError;
use crate::market_model::MarketModelFit;
use crate::ratios::{sharpe_ratio, treynor_ratio};
use crate::series::{ReturnSeries, Role};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw series for the three legs of one firm's computation.
#[derive(Debug, Clone, Copy)]
pub struct PriceInputs<'a> {
    pub firm_ticker: &'a str,
    pub firm: &'a [RawPricePoint],
    pub market_ticker: &'a str,
    pub market: &'a [RawPricePoint],
    pub risk_free_ticker: &'a str,
    pub risk_free: &'a [RawPricePoint],
}

/// Summary statistics for one aligned series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub alpha: f64,
    pub beta: f64,
    pub r_squared: f64,
    pub sharpe: f64,
    pub treynor: f64,
    pub annual_return: f64,
    pub observations: usize,
    pub dataset_hash: String,
}

impl MetricSet {
    /// Fit the market model and compute the ratios and annual return.
    pub fn compute(aligned: &AlignedSeries) -> Result<(MarketModelFit, Self), MetricsError> {
        let fit = MarketModelFit::fit(aligned.observations())?;
        let r_firm = aligned.r_firm();
        let r_rf = aligned.r_rf();
        let sharpe = sharpe_ratio(&r_firm, &r_rf)?;
        let treynor = treynor_ratio(&r_firm, &r_rf, fit.beta)?;
        let annual_return = annual_return(aligned)?;

        let set = Self {
            alpha: fit.alpha,
            beta: fit.beta,
            r_squared: fit.r_squared,
            sharpe,
            treynor,
            annual_return,
            observations: aligned.len(),
            dataset_hash: aligned.dataset_hash(),
        };
        Ok((fit, set))
    }
}

/// Everything derived for one firm: the aligned frame, the fit, the metrics.
#[derive(Debug, Clone)]
pub struct FirmAnalysis {
    pub aligned: AlignedSeries,
    pub fit: MarketModelFit,
    pub metrics: MetricSet,
}

impl FirmAnalysis {
    /// Rows consumed by the chart sink: price, return, and the excess-return
    /// scatter with the fitted line.
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.aligned
            .observations()
            .iter()
            .map(|o| ChartPoint {
                date: o.date,
                firm: o.firm_level,
                r_firm: o.r_firm,
                excess_market: o.excess_market(),
                excess_firm: o.excess_firm(),
                fitted: self.fit.predict(o.excess_market()),
            })
            .collect()
    }
}

/// One row of per-firm chart data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub firm: f64,
    pub r_firm: f64,
    pub excess_market: f64,
    pub excess_firm: f64,
    pub fitted: f64,
}

/// Run the full pipeline for one firm.
pub fn analyze(inputs: &PriceInputs<'_>) -> Result<FirmAnalysis, MetricsError> {
    let firm = ReturnSeries::from_points(Role::Firm, inputs.firm_ticker, inputs.firm)?;
    let market = ReturnSeries::from_points(Role::Market, inputs.market_ticker, inputs.market)?;
    let rf = ReturnSeries::from_points(Role::RiskFree, inputs.risk_free_ticker, inputs.risk_free)?;

    let aligned = align(&firm, &market, &rf)?;
    let (fit, metrics) = MetricSet::compute(&aligned)?;
    Ok(FirmAnalysis {
        aligned,
        fit,
        metrics,
    })
}

/// Final per-firm record handed to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmMetrics {
    pub firm_name: String,
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub alpha: f64,
    pub beta: f64,
    pub sharpe: f64,
    pub treynor: f64,
    pub annual_return: f64,
    pub r_squared: f64,
    pub observations: usize,
    pub dataset_hash: String,
}

impl FirmMetrics {
    pub fn new(
        firm_name: &str,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: &MetricSet,
    ) -> Self {
        Self {
            firm_name: firm_name.to_string(),
            ticker: ticker.to_string(),
            start_date,
            end_date,
            alpha: metrics.alpha,
            beta: metrics.beta,
            sharpe: metrics.sharpe,
            treynor: metrics.treynor,
            annual_return: metrics.annual_return,
            r_squared: metrics.r_squared,
            observations: metrics.observations,
            dataset_hash: metrics.dataset_hash.clone(),
        }
    }
}
