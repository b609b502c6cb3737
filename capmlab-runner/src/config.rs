//! Run configuration (TOML) and the firm list (CSV).
//!
//! The firm list is a delimited file with a header row and the columns
//! `firm, ticker, start_date, end_date`. Blank rows are skipped. A row that
//! cannot be used (bad date, reversed range, missing field) is rejected on
//! its own and reported; only an unreadable file is fatal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use capmlab_core::data::YahooOptions;

/// Fatal configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse firm list: {0}")]
    Csv(#[from] csv::Error),

    #[error("firm list has no header row")]
    MissingHeader,

    #[error("failed to parse run config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Batch-wide settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Benchmark ticker standing in for the market.
    pub market_ticker: String,
    /// Ticker quoting the annualized risk-free yield in percent.
    pub risk_free_ticker: String,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Process firms on a rayon pool instead of one by one.
    pub parallel: bool,
    /// Worker threads for parallel runs; 0 lets rayon decide.
    pub threads: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            market_ticker: "SPY".into(),
            risk_free_ticker: "^IRX".into(),
            max_retries: 3,
            base_delay_ms: 500,
            request_timeout_secs: 30,
            parallel: false,
            threads: 0,
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> String {
        // A struct of plain scalars always serializes.
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn yahoo_options(&self) -> YahooOptions {
        YahooOptions {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// One usable row of the firm list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmConfig {
    /// Position among the non-blank data rows; fixes report order.
    pub row: usize,
    pub firm_name: String,
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A row that could not be turned into a [`FirmConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub row: usize,
    pub firm_name: String,
    pub ticker: String,
    pub reason: String,
}

/// Parsed firm list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmTable {
    pub firms: Vec<FirmConfig>,
    pub rejected: Vec<RejectedRow>,
}

impl FirmTable {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        if rdr.headers()?.iter().all(str::is_empty) {
            return Err(ConfigError::MissingHeader);
        }

        let mut table = FirmTable::default();
        let mut row = 0;
        for record in rdr.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }

            let field = |i: usize| record.get(i).unwrap_or("").to_string();
            let firm_name = field(0);
            let ticker = field(1);

            match parse_range(&record) {
                Ok((start_date, end_date)) if !ticker.is_empty() => {
                    table.firms.push(FirmConfig {
                        row,
                        firm_name,
                        ticker,
                        start_date,
                        end_date,
                    });
                }
                Ok(_) => table.rejected.push(RejectedRow {
                    row,
                    firm_name,
                    ticker,
                    reason: "missing ticker".into(),
                }),
                Err(reason) => table.rejected.push(RejectedRow {
                    row,
                    firm_name,
                    ticker,
                    reason,
                }),
            }
            row += 1;
        }

        Ok(table)
    }

    /// Number of non-blank data rows.
    pub fn row_count(&self) -> usize {
        self.firms.len() + self.rejected.len()
    }
}

fn parse_range(record: &csv::StringRecord) -> Result<(NaiveDate, NaiveDate), String> {
    let date = |i: usize, name: &str| -> Result<NaiveDate, String> {
        let raw = record.get(i).unwrap_or("");
        if raw.is_empty() {
            return Err(format!("missing {name}"));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| format!("invalid {name} '{raw}': {e}"))
    };
    let start = date(2, "start_date")?;
    let end = date(3, "end_date")?;
    if end < start {
        return Err(format!("end_date {end} is before start_date {start}"));
    }
    Ok((start, end))
}
