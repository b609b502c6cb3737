//! CapmLab Runner: batch orchestration over `capmlab-core`.
//!
//! This crate provides:
//! - Firm list (CSV) and run configuration (TOML) loading
//! - Per-firm fetch → metrics, sequential or on a rayon pool
//! - Ordered, per-run report aggregation with skipped-firm tracking
//! - Result, skipped, JSON, chart and price CSV sinks
//! - `tracing` subscriber setup

pub mod config;
pub mod export;
pub mod logging;
pub mod report;
pub mod runner;

pub use config::{ConfigError, FirmConfig, FirmTable, RejectedRow, RunConfig};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use report::{BatchReport, FirmChart, ReportAggregator, SkippedFirm, SCHEMA_VERSION};
pub use runner::{run_batch, run_firm, FirmError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<FirmConfig>();
        assert_sync::<FirmConfig>();
        assert_send::<FirmTable>();
        assert_sync::<FirmTable>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<BatchReport>();
        assert_sync::<BatchReport>();
        assert_send::<SkippedFirm>();
        assert_sync::<SkippedFirm>();
    }

    #[test]
    fn firm_error_is_send_sync() {
        assert_send::<FirmError>();
        assert_sync::<FirmError>();
    }
}
