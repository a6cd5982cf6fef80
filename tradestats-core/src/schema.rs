//! Trade table schema contract.
//!
//! Metrics read columns by name. Every computation declares the columns it
//! needs and the table is checked before anything is read, so a missing column
//! fails loudly instead of flowing into the arithmetic as an empty series.

use thiserror::Error;

use crate::table::TradeTable;

/// The full trade-journal schema, used when a caller supplies no column list.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "date",
    "symbol",
    "entry_time",
    "exit_time",
    "outcome",
    "risk_by_percentage",
    "pl_by_rr",
    "pl_by_percentage",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("trade table is missing or empty")]
    EmptyTable,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl SchemaError {
    /// Names of the missing columns (empty for [`SchemaError::EmptyTable`]).
    pub fn missing_columns(&self) -> &[String] {
        match self {
            SchemaError::MissingColumns(cols) => cols,
            SchemaError::EmptyTable => &[],
        }
    }
}

/// Fail fast unless `table` is present, non-empty, and carries every column in
/// `required`. An empty `required` list means [`DEFAULT_COLUMNS`].
pub fn check_table(table: Option<&TradeTable>, required: &[&str]) -> Result<(), SchemaError> {
    let table = match table {
        Some(t) if t.height() > 0 => t,
        _ => return Err(SchemaError::EmptyTable),
    };

    let missing = missing_columns(table, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing))
    }
}

/// Required columns absent from `table`, in the order they were requested.
pub fn missing_columns(table: &TradeTable, required: &[&str]) -> Vec<String> {
    let columns = if required.is_empty() {
        DEFAULT_COLUMNS
    } else {
        required
    };
    let mut missing: Vec<String> = Vec::new();
    for name in columns {
        if !table.has_column(name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn full_table() -> TradeTable {
        let df = df!(
            "date" => &["2024-01-02"],
            "symbol" => &["EURUSD"],
            "entry_time" => &["09:30:00"],
            "exit_time" => &["10:15:00"],
            "outcome" => &["WIN"],
            "risk_by_percentage" => &["1%"],
            "pl_by_rr" => &[2.0],
            "pl_by_percentage" => &["2%"],
        )
        .unwrap();
        TradeTable::new(df)
    }

    #[test]
    fn full_schema_passes() {
        assert!(check_table(Some(&full_table()), &[]).is_ok());
    }

    #[test]
    fn absent_table_fails() {
        assert_eq!(check_table(None, &["outcome"]), Err(SchemaError::EmptyTable));
    }

    #[test]
    fn zero_row_table_fails() {
        let df = df!("outcome" => Vec::<&str>::new()).unwrap();
        let table = TradeTable::new(df);
        assert_eq!(
            check_table(Some(&table), &["outcome"]),
            Err(SchemaError::EmptyTable)
        );
    }

    #[test]
    fn missing_outcome_is_named_exactly() {
        let df = df!(
            "date" => &["2024-01-02"],
            "pl_by_percentage" => &["2%"],
        )
        .unwrap();
        let table = TradeTable::new(df);
        let err = check_table(Some(&table), &["date", "outcome"]).unwrap_err();
        assert_eq!(err.missing_columns(), ["outcome".to_string()]);
    }

    #[test]
    fn every_missing_column_is_reported() {
        let df = df!("outcome" => &["WIN"]).unwrap();
        let table = TradeTable::new(df);
        let err = check_table(Some(&table), &[]).unwrap_err();
        assert_eq!(err.missing_columns().len(), DEFAULT_COLUMNS.len() - 1);
        let msg = err.to_string();
        assert!(msg.contains("entry_time"));
        assert!(msg.contains("pl_by_rr"));
        assert!(!msg.contains("outcome"));
    }

    #[test]
    fn default_schema_has_eight_columns() {
        assert_eq!(DEFAULT_COLUMNS.len(), 8);
    }
}
