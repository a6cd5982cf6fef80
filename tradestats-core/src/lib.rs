//! TradeStats Core: descriptive performance statistics for a trade journal.
//!
//! This crate turns a table of historical trades into a fixed set of
//! statistics:
//! - Value cleaning (percent strings, mixed numeric types, blanks)
//! - Schema validation before any column is read
//! - Metrics: win rate, averages, best/worst, compounding drawdown,
//!   expectancy, winning-trade durations, loss streaks
//! - Report assembly into one ordered statistics mapping
//! - CSV ingestion and chart datasets for the presentation layer

pub mod charts;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod report;
pub mod schema;
pub mod table;

pub use charts::ChartData;
pub use cleaning::{
    clean_series, clean_text, clean_value, CleanOptions, CleanedSeries, InvalidMarker,
    PercentPolicy,
};
pub use config::{ConfigError, StatsConfig};
pub use error::StatsError;
pub use ingest::{load_table, read_csv, LoadError};
pub use metrics::{MetricsError, OutcomeCounts, ReturnsCurve};
pub use report::{StatKey, StatValue, StatsReport};
pub use schema::{check_table, SchemaError, DEFAULT_COLUMNS};
pub use table::{Outcome, TradeTable, ValidatedTrades};
