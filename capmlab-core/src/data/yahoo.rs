//! Yahoo Finance price provider.
//!
//! Fetches daily adjusted closes from Yahoo's v8 chart API. Transient
//! failures (connect errors, timeouts, HTTP 429 and 5xx) are retried a bounded
//! number of times with exponential backoff; everything else fails the fetch
//! immediately.
//!
//! The same endpoint serves the risk-free instrument (`^IRX`), whose "price"
//! is an annualized yield in percent. Index tickers sometimes omit the
//! adjusted-close block, in which case the raw close is used.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawPricePoint};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

/// Exchange metadata. Timestamps are bar opens in UTC; adding `gmtoffset`
/// gives the exchange-local trading date.
#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Retry and transport settings for [`YahooProvider`].
#[derive(Debug, Clone)]
pub struct YahooOptions {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further attempt.
    pub base_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for YahooOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Yahoo Finance price provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    options: YahooOptions,
}

impl YahooProvider {
    pub fn new(options: YahooOptions) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.request_timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    /// Build the chart API URL for a symbol and inclusive date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive on Yahoo's side, so run it to the end of `end`.
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let encoded = symbol.replace('^', "%5E");
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{encoded}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    /// One request with no retry. Statuses worth retrying map to transient
    /// [`DataError`]s.
    fn fetch_once(&self, symbol: &str, url: &str) -> Result<Vec<RawPricePoint>, DataError> {
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                DataError::NetworkUnreachable(e.to_string())
            } else {
                DataError::Other(format!("request for {symbol} failed: {e}"))
            }
        })?;
        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status.is_server_error() {
            return Err(DataError::NetworkUnreachable(format!(
                "HTTP {status} for {symbol}"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let body = resp.text().map_err(|e| {
            DataError::NetworkUnreachable(format!("failed to read response for {symbol}: {e}"))
        })?;
        let points = parse_chart_json(symbol, &body)?;
        debug!(symbol, rows = points.len(), "fetched price series");
        Ok(points)
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_delay(options: &YahooOptions, attempt: u32) -> Duration {
    options.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Run `op` until it succeeds or fails with a non-transient error.
///
/// At most `max_retries + 1` attempts are made; when they are all spent the
/// last transient error is returned.
pub(crate) fn with_retry<T>(
    options: &YahooOptions,
    symbol: &str,
    mut op: impl FnMut() -> Result<T, DataError>,
) -> Result<T, DataError> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < options.max_retries => {
                attempt += 1;
                let delay = backoff_delay(options, attempt);
                warn!(
                    symbol,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying price fetch"
                );
                std::thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Parse a chart API response body into price points.
///
/// Rows with no close at all (holidays the API still lists) are skipped; rows
/// with a close but no adjusted close keep a `NaN` level so the series builder
/// can drop them.
pub fn parse_chart_json(symbol: &str, body: &str) -> Result<Vec<RawPricePoint>, DataError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
    })?;

    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => {
            DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
        }
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    // A valid symbol with no trading days in range comes back without timestamps.
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };

    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let gmtoffset = data.meta.map(|m| m.gmtoffset).unwrap_or(0);

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts.saturating_add(gmtoffset), 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let close = closes.get(i).copied().flatten();
        let level = match &adj_closes {
            Some(adj) => adj.get(i).copied().flatten(),
            None => close,
        };

        if close.is_none() && level.is_none() {
            continue;
        }

        points.push(RawPricePoint::new(date, level.unwrap_or(f64::NAN)));
    }

    Ok(points)
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let url = Self::chart_url(symbol, start, end);
        let points = with_retry(&self.options, symbol, || self.fetch_once(symbol, &url))?;
        if points.is_empty() {
            return Err(DataError::NoRecords {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            points,
            source: DataSource::YahooFinance,
        })
    }
}
