//! In-memory price provider.
//!
//! Serves fixed series keyed by symbol, filtered to the requested range the
//! way a real provider would. Used by tests, benches and dry runs.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawPricePoint};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct FixtureProvider {
    series: HashMap<String, Vec<RawPricePoint>>,
    calls: AtomicUsize,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the series served for `symbol`.
    pub fn with_series(mut self, symbol: &str, points: Vec<RawPricePoint>) -> Self {
        self.series.insert(symbol.to_string(), points);
        self
    }

    /// Number of `fetch` calls served so far, successful or not.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let points = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();

        Ok(FetchResult {
            symbol: symbol.to_string(),
            points,
            source: DataSource::Fixture,
        })
    }
}
