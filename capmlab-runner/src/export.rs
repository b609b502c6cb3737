//! Result sinks: CSV, JSON and chart-data artifacts.
//!
//! - **Results CSV**: one row per successful firm, in input order
//! - **Skipped CSV**: one row per firm that produced no metrics
//! - **JSON**: full `BatchReport` round-trip with schema versioning
//! - **Chart CSVs**: one file per firm with the series the plots consume
//! - **Price CSVs**: provider data in the format the CSV provider reads back
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use capmlab_core::data::csv_import::{price_file_path, write_points};
use capmlab_core::data::RawPricePoint;
use capmlab_core::FirmMetrics;

use crate::report::{BatchReport, FirmChart, SkippedFirm, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BatchReport` to pretty JSON.
pub fn export_json(report: &BatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BatchReport to JSON")
}

/// Deserialize a `BatchReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BatchReport> {
    let report: BatchReport =
        serde_json::from_str(json).context("failed to deserialize BatchReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: firm, start_date, end_date, alpha, beta, sharpe, treynor, annual_return
pub fn export_results_csv(firms: &[FirmMetrics]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "firm",
        "start_date",
        "end_date",
        "alpha",
        "beta",
        "sharpe",
        "treynor",
        "annual_return",
    ])?;

    for m in firms {
        wtr.write_record([
            &m.firm_name,
            &m.start_date.to_string(),
            &m.end_date.to_string(),
            &m.alpha.to_string(),
            &m.beta.to_string(),
            &m.sharpe.to_string(),
            &m.treynor.to_string(),
            &m.annual_return.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: row, firm, ticker, kind, reason
pub fn export_skipped_csv(skipped: &[SkippedFirm]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["row", "firm", "ticker", "kind", "reason"])?;
    for s in skipped {
        wtr.write_record([
            &s.row.to_string(),
            &s.firm_name,
            &s.ticker,
            &s.kind,
            &s.reason,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: date, firm, r_firm, excess_market, excess_firm, fitted
pub fn export_chart_csv(chart: &FirmChart) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "firm",
        "r_firm",
        "excess_market",
        "excess_firm",
        "fitted",
    ])?;
    for p in &chart.points {
        wtr.write_record([
            &p.date.to_string(),
            &p.firm.to_string(),
            &p.r_firm.to_string(),
            &p.excess_market.to_string(),
            &p.excess_firm.to_string(),
            &p.fitted.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── File sinks ─────────────────────────────────────────────────────

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

pub fn save_results_csv(firms: &[FirmMetrics], path: &Path) -> Result<()> {
    write_file(path, &export_results_csv(firms)?)
}

pub fn save_skipped_csv(skipped: &[SkippedFirm], path: &Path) -> Result<()> {
    write_file(path, &export_skipped_csv(skipped)?)
}

pub fn save_json(report: &BatchReport, path: &Path) -> Result<()> {
    write_file(path, &export_json(report)?)
}

/// Load a `BatchReport` written by [`save_json`].
pub fn load_json(path: &Path) -> Result<BatchReport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// File name of a firm's chart data: `<ticker>_<start>_<end>.csv`.
pub fn chart_file_name(chart: &FirmChart) -> String {
    format!(
        "{}_{}_{}.csv",
        chart.ticker.replace(['/', '\\'], "_"),
        chart.start_date,
        chart.end_date
    )
}

/// Write one chart CSV per firm under `dir`. Returns the written paths.
pub fn write_chart_csvs(charts: &[FirmChart], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create chart dir: {}", dir.display()))?;
    charts
        .iter()
        .map(|chart| {
            let path = dir.join(chart_file_name(chart));
            write_file(&path, &export_chart_csv(chart)?)?;
            Ok(path)
        })
        .collect()
}

/// Write `<dir>/<SYMBOL>.csv` in the CSV provider's format.
pub fn save_price_csv(symbol: &str, points: &[RawPricePoint], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create price dir: {}", dir.display()))?;
    let path = price_file_path(dir, symbol);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_points(symbol, points, file)
        .with_context(|| format!("failed to write prices for {symbol}"))?;
    Ok(path)
}
