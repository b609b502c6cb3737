//! Local CSV price provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` files with a `date,adjusted_close` header. This
//! is the offline path: `capmlab download` writes these files, and
//! `capmlab run --prices-dir` reads them back instead of calling Yahoo.
//! An empty `adjusted_close` cell is a missing price and becomes `NaN`.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawPricePoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    adjusted_close: Option<f64>,
}

/// Price provider backed by a directory of per-symbol CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `symbol`.
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        price_file_path(&self.dir, symbol)
    }
}

/// `<dir>/<SYMBOL>.csv`
pub fn price_file_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{symbol}.csv"))
}

/// Read every row of a price CSV.
pub fn read_points<R: Read>(symbol: &str, reader: R) -> Result<Vec<RawPricePoint>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut points = Vec::new();
    for row in rdr.deserialize::<PriceRow>() {
        let row = row.map_err(|e| DataError::PriceFile {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;
        points.push(RawPricePoint::new(
            row.date,
            row.adjusted_close.unwrap_or(f64::NAN),
        ));
    }
    Ok(points)
}

/// Write price points in the format [`read_points`] accepts.
pub fn write_points<W: Write>(
    symbol: &str,
    points: &[RawPricePoint],
    writer: W,
) -> Result<(), DataError> {
    let to_err = |e: csv::Error| DataError::PriceFile {
        symbol: symbol.to_string(),
        reason: e.to_string(),
    };
    let mut wtr = csv::Writer::from_writer(writer);
    for p in points {
        let row = PriceRow {
            date: p.date,
            adjusted_close: p.adjusted_close.is_finite().then_some(p.adjusted_close),
        };
        wtr.serialize(row).map_err(to_err)?;
    }
    wtr.flush().map_err(|e| DataError::PriceFile {
        symbol: symbol.to_string(),
        reason: e.to_string(),
    })
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol);
        let file = std::fs::File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            _ => DataError::PriceFile {
                symbol: symbol.to_string(),
                reason: format!("{}: {e}", path.display()),
            },
        })?;

        let points: Vec<RawPricePoint> = read_points(symbol, file)?
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();
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
            source: DataSource::CsvImport,
        })
    }
}
