//! CSV ingestion for trade journals (local file, reader, or published URL).
//!
//! Parsing and column typing are left to the polars CSV reader, with the
//! schema inferred from every row: numeric columns come back as numbers,
//! anything mixed stays text. Empty cells become nulls. No cleaning happens
//! here.

use polars::prelude::*;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

use crate::table::TradeTable;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download failed for {url}: {reason}")]
    Http { url: String, reason: String },

    #[error("CSV parse error: {0}")]
    Frame(#[from] PolarsError),
}

/// Read a CSV with a header row from any reader.
pub fn read_csv<R: Read>(mut reader: R) -> Result<TradeTable, LoadError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| LoadError::Io {
            path: "<reader>".to_string(),
            source,
        })?;
    finish_frame(bytes)
}

/// Read a CSV file from disk.
pub fn read_csv_path(path: &Path) -> Result<TradeTable, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    finish_frame(bytes)
}

/// Download a published CSV (e.g. a shared spreadsheet export) and read it.
pub fn fetch_csv(url: &str) -> Result<TradeTable, LoadError> {
    let http_err = |e: reqwest::Error| LoadError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    };
    tracing::info!(url, "downloading trade table");
    let body = reqwest::blocking::get(url)
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.bytes())
        .map_err(http_err)?;
    finish_frame(body.to_vec())
}

/// Load from a path or an `http(s)://` URL.
pub fn load_table(source: &str) -> Result<TradeTable, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_csv(source)
    } else {
        read_csv_path(Path::new(source))
    }
}

fn finish_frame(bytes: Vec<u8>) -> Result<TradeTable, LoadError> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_missing_is_null(true))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    tracing::debug!(rows = frame.height(), columns = frame.width(), "trade table loaded");
    Ok(TradeTable::new(frame))
}
