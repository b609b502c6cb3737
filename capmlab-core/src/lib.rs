//! CapmLab Core: price series, return transforms, alignment and CAPM metrics.
//!
//! This crate contains the metrics pipeline and the price providers it reads from:
//! - Price providers (Yahoo Finance, CSV directory, in-memory fixtures)
//! - Date-indexed level series and role-specific return transforms
//! - Three-way inner-join alignment of firm, market and risk-free legs
//! - Closed-form OLS market model (alpha, beta)
//! - Sharpe, Treynor and compounded annualized return

pub mod align;
pub mod annual;
pub mod data;
pub mod error;
pub mod market_model;
pub mod metrics;
pub mod ratios;
pub mod series;
pub mod stats;

pub use align::{align, AlignedObservation, AlignedSeries};
pub use error::MetricsError;
pub use market_model::MarketModelFit;
pub use metrics::{analyze, ChartPoint, FirmAnalysis, FirmMetrics, MetricSet, PriceInputs};
pub use series::{ReturnRecord, ReturnSeries, ReturnTransform, Role};
