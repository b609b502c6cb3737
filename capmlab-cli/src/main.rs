//! CapmLab CLI: batch metrics, price download and config scaffolding.
//!
//! Commands:
//! - `run`: compute alpha, beta, Sharpe, Treynor and annual return per firm
//! - `download`: fetch firm, market and risk-free prices into CSV files
//! - `init-config`: print the default run configuration as TOML

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use capmlab_core::data::{CsvProvider, DataProvider, YahooProvider};
use capmlab_runner::export::{
    save_json, save_price_csv, save_results_csv, save_skipped_csv, write_chart_csvs,
};
use capmlab_runner::{init_logging, run_batch, BatchReport, FirmTable, LogConfig, RunConfig};

#[derive(Parser)]
#[command(
    name = "capmlab",
    about = "CapmLab CLI: CAPM alpha/beta, Sharpe and Treynor ratios per firm"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics for every firm in a firm list.
    Run {
        /// Firm list CSV: firm, ticker, start_date, end_date.
        #[arg(long)]
        firms: PathBuf,

        /// Run configuration TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Results CSV path.
        #[arg(long, default_value = "results.csv")]
        output: PathBuf,

        /// Also write the full report as JSON.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write skipped firms and their reasons as CSV.
        #[arg(long)]
        skipped: Option<PathBuf>,

        /// Write per-firm chart data CSVs into this directory.
        #[arg(long)]
        charts_dir: Option<PathBuf>,

        /// Read prices from <dir>/<TICKER>.csv instead of Yahoo Finance.
        #[arg(long)]
        prices_dir: Option<PathBuf>,

        /// Market benchmark ticker (overrides config).
        #[arg(long)]
        market: Option<String>,

        /// Risk-free yield ticker (overrides config).
        #[arg(long)]
        risk_free: Option<String>,

        /// Process firms in parallel.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Worker threads for --parallel (0 = one per core).
        #[arg(long)]
        threads: Option<usize>,

        /// Exit non-zero if any firm was skipped.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Download firm, market and risk-free prices as CSV files.
    Download {
        /// Firm list CSV: firm, ticker, start_date, end_date.
        #[arg(long)]
        firms: PathBuf,

        /// Output directory for <TICKER>.csv files.
        #[arg(long, default_value = "prices")]
        out_dir: PathBuf,

        /// Run configuration TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default run configuration as TOML.
    InitConfig,
}

fn main() -> Result<()> {
    init_logging(LogConfig::from_env()).map_err(|e| anyhow::anyhow!(e))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            firms,
            config,
            output,
            json,
            skipped,
            charts_dir,
            prices_dir,
            market,
            risk_free,
            parallel,
            threads,
            strict,
        } => {
            let mut run_config = load_config(config.as_deref())?;
            if let Some(market) = market {
                run_config.market_ticker = market;
            }
            if let Some(risk_free) = risk_free {
                run_config.risk_free_ticker = risk_free;
            }
            if parallel {
                run_config.parallel = true;
            }
            if let Some(threads) = threads {
                run_config.threads = threads;
            }
            let sinks = Sinks {
                output,
                json,
                skipped,
                charts_dir,
            };
            run_cmd(&firms, &run_config, prices_dir, &sinks, strict)
        }
        Commands::Download {
            firms,
            out_dir,
            config,
        } => {
            let run_config = load_config(config.as_deref())?;
            run_download(&firms, &out_dir, &run_config)
        }
        Commands::InitConfig => {
            print!("{}", RunConfig::default().to_toml());
            Ok(())
        }
    }
}

struct Sinks {
    output: PathBuf,
    json: Option<PathBuf>,
    skipped: Option<PathBuf>,
    charts_dir: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn load_firms(path: &Path) -> Result<FirmTable> {
    FirmTable::from_file(path)
        .with_context(|| format!("failed to load firm list {}", path.display()))
}

fn make_provider(config: &RunConfig, prices_dir: Option<PathBuf>) -> Result<Box<dyn DataProvider>> {
    let provider: Box<dyn DataProvider> = match prices_dir {
        Some(dir) => Box::new(CsvProvider::new(dir)),
        None => Box::new(YahooProvider::new(config.yahoo_options())?),
    };
    Ok(provider)
}

fn run_cmd(
    firms_path: &Path,
    config: &RunConfig,
    prices_dir: Option<PathBuf>,
    sinks: &Sinks,
    strict: bool,
) -> Result<()> {
    let table = load_firms(firms_path)?;
    let provider = make_provider(config, prices_dir)?;
    info!(
        rows = table.row_count(),
        provider = provider.name(),
        market = %config.market_ticker,
        risk_free = %config.risk_free_ticker,
        "starting batch"
    );

    let report = run_batch(&table, provider.as_ref(), config);

    save_results_csv(&report.firms, &sinks.output)?;
    if let Some(path) = &sinks.json {
        save_json(&report, path)?;
    }
    if let Some(path) = &sinks.skipped {
        save_skipped_csv(&report.skipped, path)?;
    }
    if let Some(dir) = &sinks.charts_dir {
        let written = write_chart_csvs(&report.charts, dir)?;
        info!(files = written.len(), dir = %dir.display(), "chart data written");
    }

    print_summary(&report);
    println!("Results saved to: {}", sinks.output.display());

    if strict && !report.all_succeeded() {
        eprintln!("{} firm(s) skipped (--strict)", report.skipped.len());
        std::process::exit(1);
    }
    Ok(())
}

/// Fetch each distinct ticker once, over the union of the ranges that need it.
fn run_download(firms_path: &Path, out_dir: &Path, config: &RunConfig) -> Result<()> {
    let table = load_firms(firms_path)?;
    let provider = YahooProvider::new(config.yahoo_options())?;

    let mut ranges: BTreeMap<&str, (NaiveDate, NaiveDate)> = BTreeMap::new();
    for firm in &table.firms {
        for ticker in [
            firm.ticker.as_str(),
            config.market_ticker.as_str(),
            config.risk_free_ticker.as_str(),
        ] {
            let range = ranges
                .entry(ticker)
                .or_insert((firm.start_date, firm.end_date));
            range.0 = range.0.min(firm.start_date);
            range.1 = range.1.max(firm.end_date);
        }
    }
    for rejected in &table.rejected {
        warn!(row = rejected.row, firm = %rejected.firm_name, "skipping row: {}", rejected.reason);
    }

    let mut errors = Vec::new();
    for (ticker, (start, end)) in &ranges {
        match provider.fetch(ticker, *start, *end) {
            Ok(result) => {
                let path = save_price_csv(ticker, &result.points, out_dir)?;
                println!("{ticker}: {} rows -> {}", result.points.len(), path.display());
            }
            Err(e) => {
                warn!(ticker, "download failed: {e}");
                errors.push((ticker.to_string(), e));
            }
        }
    }

    if !errors.is_empty() {
        for (ticker, err) in &errors {
            eprintln!("Error for {ticker}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!();
    println!("=== CAPM Metrics ===");
    println!(
        "Market: {}   Risk-free: {}   Firms: {} ok / {} skipped",
        report.market_ticker,
        report.risk_free_ticker,
        report.firms.len(),
        report.skipped.len()
    );
    println!();
    println!(
        "{:<24} {:<10} {:>10} {:>8} {:>9} {:>10} {:>9} {:>5}",
        "Firm", "Ticker", "Alpha", "Beta", "Sharpe", "Treynor", "Annual", "Obs"
    );
    for m in &report.firms {
        println!(
            "{:<24} {:<10} {:>10.6} {:>8.3} {:>9.4} {:>10.6} {:>8.2}% {:>5}",
            truncate(&m.firm_name, 24),
            truncate(&m.ticker, 10),
            m.alpha,
            m.beta,
            m.sharpe,
            m.treynor,
            m.annual_return * 100.0,
            m.observations
        );
    }
    if !report.skipped.is_empty() {
        println!();
        println!("--- Skipped ---");
        for s in &report.skipped {
            println!(
                "row {:<4} {:<24} {:<20} {}",
                s.row,
                truncate(&s.firm_name, 24),
                s.kind,
                s.reason
            );
        }
    }
    println!();
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
