//! Integration tests for the batch pipeline.
//!
//! Price files and firm lists are written to temp dirs, then read back
//! through `CsvProvider` exactly as an offline `capmlab run` would.

use chrono::{Datelike, NaiveDate, Weekday};
use proptest::prelude::*;
use std::path::Path;

use capmlab_core::data::{CsvProvider, RawPricePoint};
use capmlab_runner::export::{
    export_results_csv, load_json, save_json, save_price_csv, write_chart_csvs,
};
use capmlab_runner::{run_batch, FirmTable, RunConfig};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn business_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(n)
        .collect()
}

/// Deterministic price walk driven by a sine of the given frequency.
fn walk(dates: &[NaiveDate], start: f64, amp: f64, freq: f64) -> Vec<RawPricePoint> {
    let mut level = start;
    dates
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            level *= 1.0 + amp * (i as f64 * freq).sin() + 0.0003;
            RawPricePoint::new(date, level)
        })
        .collect()
}

/// SPY, ^IRX and three firms over ~1.5 years of business days.
fn write_prices(dir: &Path) {
    let dates = business_days(d("2020-01-01"), 400);
    save_price_csv("SPY", &walk(&dates, 320.0, 0.010, 1.3), dir).unwrap();
    save_price_csv("ACME", &walk(&dates, 50.0, 0.016, 1.3), dir).unwrap();
    save_price_csv("INIT", &walk(&dates, 12.0, 0.007, 0.9), dir).unwrap();

    // Yield series misses every 7th day; those dates drop out of the join.
    let rf: Vec<RawPricePoint> = dates
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 7 != 3)
        .map(|(i, &date)| RawPricePoint::new(date, 1.5 + 0.01 * (i % 10) as f64))
        .collect();
    save_price_csv("^IRX", &rf, dir).unwrap();

    // Constant price: zero return variance.
    let flat: Vec<RawPricePoint> = dates
        .iter()
        .map(|&date| RawPricePoint::new(date, 20.0))
        .collect();
    save_price_csv("FLAT", &flat, dir).unwrap();
}

const FIRMS: &str = "\
firm,ticker,start_date,end_date
Acme Corp,ACME,2020-01-01,2020-12-31
Flatline Ltd,FLAT,2020-01-01,2020-12-31

Ghost Inc,GHOST,2020-01-01,2020-12-31
Initech,INIT,2020-03-01,2021-03-01
Acme Corp,ACME,2020-01-01,2020-12-31
Backwards,ACME,2021-01-01,2020-01-01
";

fn setup() -> (tempfile::TempDir, CsvProvider, FirmTable) {
    let dir = tempfile::tempdir().unwrap();
    write_prices(dir.path());
    let provider = CsvProvider::new(dir.path());
    let table = FirmTable::from_reader(FIRMS.as_bytes()).unwrap();
    (dir, provider, table)
}

#[test]
fn batch_reports_successes_in_input_order() {
    let (_dir, provider, table) = setup();
    let report = run_batch(&table, &provider, &RunConfig::default());

    let names: Vec<&str> = report.firms.iter().map(|m| m.firm_name.as_str()).collect();
    assert_eq!(names, vec!["Acme Corp", "Initech", "Acme Corp"]);
    assert_eq!(report.total(), 6);

    let acme = &report.firms[0];
    assert!((acme.beta - 1.6).abs() < 0.2, "beta = {}", acme.beta);
    for v in [acme.alpha, acme.beta, acme.sharpe, acme.treynor, acme.annual_return] {
        assert!(v.is_finite());
    }
    // 2020 has 262 business days; first return row and rf gaps drop out
    assert!(acme.observations < 262);
    assert!(acme.observations > 200);
}

#[test]
fn failing_rows_are_skipped_with_kinds() {
    let (_dir, provider, table) = setup();
    let report = run_batch(&table, &provider, &RunConfig::default());

    let skipped: Vec<(usize, &str)> = report
        .skipped
        .iter()
        .map(|s| (s.row, s.kind.as_str()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            (1, "DegenerateRatio"),
            (2, "DataUnavailable"),
            (5, "InvalidConfig"),
        ]
    );
    assert!(!report.all_succeeded());
}

#[test]
fn range_without_prices_is_data_unavailable() {
    let (_dir, provider, _) = setup();
    let firms = "firm,ticker,start_date,end_date\nEarly Bird,ACME,2010-01-01,2010-12-31\n";
    let table = FirmTable::from_reader(firms.as_bytes()).unwrap();
    let report = run_batch(&table, &provider, &RunConfig::default());

    assert!(report.firms.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].kind, "DataUnavailable");
    assert!(report.skipped[0].reason.contains("no price records for 'ACME'"));
}

#[test]
fn identical_rows_give_identical_metrics() {
    let (_dir, provider, table) = setup();
    let report = run_batch(&table, &provider, &RunConfig::default());
    assert_eq!(report.firms[0], report.firms[2]);
    assert_eq!(report.firms[0].dataset_hash, report.firms[2].dataset_hash);
    assert_ne!(report.firms[0].dataset_hash, report.firms[1].dataset_hash);
}

#[test]
fn repeated_runs_do_not_accumulate() {
    let (_dir, provider, table) = setup();
    let config = RunConfig::default();
    let first = run_batch(&table, &provider, &config);
    let second = run_batch(&table, &provider, &config);
    assert_eq!(first.firms.len(), second.firms.len());
    assert_eq!(first, second);
}

#[test]
fn parallel_matches_sequential() {
    let (_dir, provider, table) = setup();
    let sequential = run_batch(&table, &provider, &RunConfig::default());
    let parallel = run_batch(
        &table,
        &provider,
        &RunConfig {
            parallel: true,
            threads: 3,
            ..Default::default()
        },
    );
    assert_eq!(sequential, parallel);
    assert_eq!(
        export_results_csv(&sequential.firms).unwrap(),
        export_results_csv(&parallel.firms).unwrap()
    );
}

#[test]
fn report_artifacts_round_trip() {
    let (dir, provider, table) = setup();
    let report = run_batch(&table, &provider, &RunConfig::default());

    let json_path = dir.path().join("out/report.json");
    save_json(&report, &json_path).unwrap();
    let loaded = load_json(&json_path).unwrap();
    assert_eq!(loaded.firms, report.firms);
    assert_eq!(loaded.skipped, report.skipped);
    assert!(loaded.charts.is_empty());

    let paths = write_chart_csvs(&report.charts, &dir.path().join("charts")).unwrap();
    assert_eq!(paths.len(), 3);
    let first = std::fs::read_to_string(&paths[0]).unwrap();
    assert!(first.starts_with("date,firm,r_firm,excess_market,excess_firm,fitted"));
    assert_eq!(first.lines().count(), report.firms[0].observations + 1);
}

#[test]
fn results_csv_matches_report() {
    let (_dir, provider, table) = setup();
    let report = run_batch(&table, &provider, &RunConfig::default());
    let out = export_results_csv(&report.firms).unwrap();
    let mut rdr = csv::Reader::from_reader(out.as_bytes());
    let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[1][0], "Initech");
    assert_eq!(&rows[1][1], "2020-03-01");
    let beta: f64 = rows[0][4].parse().unwrap();
    assert_eq!(beta, report.firms[0].beta);
}

#[test]
fn other_benchmark_tickers_are_configurable() {
    let (_dir, provider, table) = setup();
    let config = RunConfig {
        market_ticker: "MISSING".into(),
        ..Default::default()
    };
    let report = run_batch(&table, &provider, &config);
    assert!(report.firms.is_empty());
    assert!(report
        .skipped
        .iter()
        .filter(|s| s.kind != "InvalidConfig" && s.ticker != "GHOST")
        .all(|s| s.reason.contains("MISSING")));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn any_row_order_is_preserved(
        order in Just(vec!["ACME", "INIT", "FLAT", "GHOST"]).prop_shuffle()
    ) {
        let (_dir, provider, _) = setup();
        let mut firms = String::from("firm,ticker,start_date,end_date\n");
        for ticker in &order {
            firms.push_str(&format!("{ticker} co,{ticker},2020-01-01,2020-12-31\n"));
        }
        let table = FirmTable::from_reader(firms.as_bytes()).unwrap();
        let config = RunConfig {
            parallel: true,
            ..Default::default()
        };
        let report = run_batch(&table, &provider, &config);

        let expected: Vec<&str> = order
            .iter()
            .copied()
            .filter(|t| matches!(*t, "ACME" | "INIT"))
            .collect();
        let got: Vec<&str> = report.firms.iter().map(|m| m.ticker.as_str()).collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(report.skipped.len(), 2);
    }
}
