//! Price data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (Yahoo Finance, a
//! directory of CSV files) so the runner can swap implementations and tests
//! can supply fixed series without touching the network.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One instrument-date observation from a provider.
///
/// `adjusted_close` is dividend/split-adjusted. Providers emit `NaN` for
/// dates where the row exists but the price is missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPricePoint {
    pub date: NaiveDate,
    pub adjusted_close: f64,
}

impl RawPricePoint {
    pub fn new(date: NaiveDate, adjusted_close: f64) -> Self {
        Self {
            date,
            adjusted_close,
        }
    }
}

/// Structured error types for fetch operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no price records for '{symbol}' between {start} and {end}")]
    NoRecords {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("price file error for '{symbol}': {reason}")]
    PriceFile { symbol: String, reason: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Whether another attempt at the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_) | DataError::RateLimited { .. }
        )
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub points: Vec<RawPricePoint>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Fixture,
}

/// Trait for price providers.
///
/// `fetch` returns daily records within `[start, end]` inclusive. Records may
/// have gaps (non-trading days, missing data); callers tolerate them.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily adjusted-close records for a symbol over a date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError>;
}
