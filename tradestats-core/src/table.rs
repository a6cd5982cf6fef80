//! Trade table: an ordered snapshot of journal rows backed by a polars frame.
//!
//! Row order is chronological order and is never changed here. Every accessor
//! hands back a private copy of the column it reads; the wrapped frame is
//! never mutated, so metrics can share one table freely.

use chrono::{Duration, NaiveDate, NaiveTime};
use polars::prelude::{AnyValue, DataFrame, Series};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cleaning::{clean_value, parse_value, CleanOptions, CleanedSeries};
use crate::schema::{check_table, SchemaError};

/// Trade outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "WIN")]
    Win,
    #[serde(rename = "LOSS")]
    Loss,
    #[serde(rename = "BE")]
    Breakeven,
}

impl Outcome {
    /// Parse a journal label. Only `WIN`, `LOSS` and `BE` are defined.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "WIN" => Some(Outcome::Win),
            "LOSS" => Some(Outcome::Loss),
            "BE" => Some(Outcome::Breakeven),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::Breakeven => "BE",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse a time-of-day cell: `HH:MM:SS`, falling back to `HH:MM`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Date formats accepted for the `date` column, ISO first, then day-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y"];

/// Parse a trade date, ISO or day-first.
pub fn parse_trade_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

const NULL_TAG: u8 = 0x00;
const VALUE_TAG: u8 = 0x01;

/// An ordered table of trades.
#[derive(Debug, Clone)]
pub struct TradeTable {
    frame: DataFrame,
}

impl TradeTable {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Check `required` columns (empty = full schema) and hand out a view
    /// that table-level metrics accept.
    pub fn validate(&self, required: &[&str]) -> Result<ValidatedTrades<'_>, SchemaError> {
        check_table(Some(self), required)?;
        Ok(ValidatedTrades { table: self })
    }

    /// BLAKE3 hash over the header and every cell, in row order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for column in self.frame.get_columns() {
            hasher.update(column.name().as_bytes());
            hasher.update(&[0x1e]);
            let series = column.as_materialized_series();
            for i in 0..series.len() {
                match series.get(i).unwrap_or(AnyValue::Null) {
                    AnyValue::Null => hasher.update(&[NULL_TAG]),
                    cell => hasher.update(&[VALUE_TAG]).update(cell.to_string().as_bytes()),
                };
                hasher.update(&[0x1f]);
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    fn series(&self, name: &str) -> Option<&Series> {
        self.frame
            .column(name)
            .ok()
            .map(|column| column.as_materialized_series())
    }
}

/// A trade table that passed schema validation.
///
/// Only [`TradeTable::validate`] builds one. Reading a column the caller did
/// not ask to validate yields an all-missing column of table height.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedTrades<'a> {
    table: &'a TradeTable,
}

impl<'a> ValidatedTrades<'a> {
    pub fn len(&self) -> usize {
        self.table.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clean a numeric column.
    pub fn cleaned(&self, column: &str, opts: CleanOptions) -> CleanedSeries {
        let Some(series) = self.table.series(column) else {
            tracing::debug!(column, "column absent; cleaning as all-invalid");
            return (0..self.len()).map(|_| clean_value(&AnyValue::Null, opts)).collect();
        };

        let mut rejected = 0usize;
        let cleaned: CleanedSeries = (0..series.len())
            .map(|i| {
                let cell = series.get(i).unwrap_or(AnyValue::Null);
                if !matches!(cell, AnyValue::Null)
                    && parse_value(&cell, opts.percent_policy).is_none()
                {
                    rejected += 1;
                }
                clean_value(&cell, opts)
            })
            .collect();
        if rejected > 0 {
            tracing::debug!(column, rejected, "cells failed numeric cleaning");
        }
        cleaned
    }

    /// Raw text of a column; non-text cells are rendered with their display form.
    pub fn texts(&self, column: &str) -> Vec<Option<String>> {
        let Some(series) = self.table.series(column) else {
            return vec![None; self.len()];
        };
        (0..series.len())
            .map(|i| match series.get(i).unwrap_or(AnyValue::Null) {
                AnyValue::Null => None,
                AnyValue::String(s) => Some(s.to_string()),
                AnyValue::StringOwned(s) => Some(s.to_string()),
                other => Some(other.to_string()),
            })
            .collect()
    }

    pub fn outcomes(&self) -> Vec<Option<Outcome>> {
        self.texts("outcome")
            .into_iter()
            .map(|cell| cell.as_deref().and_then(Outcome::from_label))
            .collect()
    }

    pub fn times(&self, column: &str) -> Vec<Option<NaiveTime>> {
        self.texts(column)
            .into_iter()
            .map(|cell| cell.as_deref().and_then(parse_time_of_day))
            .collect()
    }

    pub fn dates(&self) -> Vec<Option<NaiveDate>> {
        let Some(series) = self.table.series("date") else {
            return vec![None; self.len()];
        };
        (0..series.len())
            .map(|i| match series.get(i).unwrap_or(AnyValue::Null) {
                AnyValue::Null => None,
                AnyValue::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
                    .map(|epoch| epoch + Duration::days(i64::from(days))),
                AnyValue::String(s) => parse_trade_date(s),
                AnyValue::StringOwned(s) => parse_trade_date(s.as_str()),
                _ => None,
            })
            .collect()
    }
}
