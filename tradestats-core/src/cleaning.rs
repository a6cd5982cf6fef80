//! Value cleaning: raw trade-sheet cells in, decimal fractions out.
//!
//! Journal exports mix `"1.5%"`, `"0.015"`, `0.015` and blank cells in the same
//! column. Every function here maps one raw cell to one cleaned value, so a
//! cleaned column always has the same length and row order as its source.

use polars::prelude::{AnyValue, NamedFrom, Series};
use serde::{Deserialize, Serialize};

/// What an unparseable or missing cell becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidMarker {
    /// Invalid cells become `0.0` and take part in sums and means.
    #[default]
    Zero,
    /// Invalid cells become missing and are skipped by every metric.
    Null,
}

/// How already-numeric values (and bare numeric text) are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentPolicy {
    /// Any finite number is taken as-is.
    #[default]
    Lenient,
    /// Only magnitudes <= 1.0 are taken as pre-divided fractions; larger
    /// magnitudes are invalid. Text ending in `%` is always accepted.
    Strict,
}

/// Caller-selected cleaning behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    pub invalid: InvalidMarker,
    pub percent_policy: PercentPolicy,
}

impl CleanOptions {
    pub fn new(invalid: InvalidMarker, percent_policy: PercentPolicy) -> Self {
        Self {
            invalid,
            percent_policy,
        }
    }

    /// Same invalid marker, lenient numeric policy. Used for plain ratios
    /// such as `pl_by_rr`, which are never percentages.
    pub fn as_lenient(self) -> Self {
        Self {
            percent_policy: PercentPolicy::Lenient,
            ..self
        }
    }

    fn invalid_value(&self) -> Option<f64> {
        match self.invalid {
            InvalidMarker::Zero => Some(0.0),
            InvalidMarker::Null => None,
        }
    }
}

/// Clean one cell. `None` is only ever returned under [`InvalidMarker::Null`].
pub fn clean_value(value: &AnyValue<'_>, opts: CleanOptions) -> Option<f64> {
    parse_value(value, opts.percent_policy).or_else(|| opts.invalid_value())
}

/// Clean one piece of text, e.g. `" 1.5% "` -> `0.015`.
pub fn clean_text(raw: &str, opts: CleanOptions) -> Option<f64> {
    parse_text(raw, opts.percent_policy).or_else(|| opts.invalid_value())
}

/// Parse a cell without substituting the invalid marker.
pub(crate) fn parse_value(value: &AnyValue<'_>, policy: PercentPolicy) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => parse_text(s, policy),
        AnyValue::StringOwned(s) => parse_text(s.as_str(), policy),
        AnyValue::Float64(v) => accept_number(*v, policy),
        AnyValue::Float32(v) => accept_number(f64::from(*v), policy),
        AnyValue::Int64(v) => accept_number(*v as f64, policy),
        AnyValue::Int32(v) => accept_number(f64::from(*v), policy),
        AnyValue::UInt64(v) => accept_number(*v as f64, policy),
        AnyValue::UInt32(v) => accept_number(f64::from(*v), policy),
        _ => None,
    }
}

fn parse_text(raw: &str, policy: PercentPolicy) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.ends_with('%') {
        let number = trimmed.trim_end_matches('%').trim();
        return number
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v / 100.0);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(|v| accept_number(v, policy))
}

fn accept_number(value: f64, policy: PercentPolicy) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    match policy {
        PercentPolicy::Lenient => Some(value),
        PercentPolicy::Strict => (value.abs() <= 1.0).then_some(value),
    }
}

/// A cleaned column: one entry per source row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanedSeries {
    values: Vec<Option<f64>>,
}

impl CleanedSeries {
    pub fn from_values(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn as_slice(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Present values only, in row order.
    pub fn valid(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    /// Back to a `Float64` polars series (missing entries become nulls).
    pub fn to_series(&self, name: &str) -> Series {
        Series::new(name.into(), self.values.clone())
    }
}

impl FromIterator<Option<f64>> for CleanedSeries {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Clean a whole column element-wise.
pub fn clean_series(series: &Series, opts: CleanOptions) -> CleanedSeries {
    (0..series.len())
        .map(|i| {
            let cell = series.get(i).unwrap_or(AnyValue::Null);
            clean_value(&cell, opts)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: CleanOptions = CleanOptions {
        invalid: InvalidMarker::Zero,
        percent_policy: PercentPolicy::Lenient,
    };
    const NULL: CleanOptions = CleanOptions {
        invalid: InvalidMarker::Null,
        percent_policy: PercentPolicy::Lenient,
    };
    const STRICT: CleanOptions = CleanOptions {
        invalid: InvalidMarker::Zero,
        percent_policy: PercentPolicy::Strict,
    };

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-12).unwrap_or(false)
    }

    #[test]
    fn percent_text_is_divided_by_hundred() {
        assert!(approx(clean_text("1.5%", ZERO), 0.015));
        assert!(approx(clean_text("  -2%  ", ZERO), -0.02));
        assert!(approx(clean_text("0.5 %", ZERO), 0.005));
    }

    #[test]
    fn bare_text_is_parsed_directly() {
        assert!(approx(clean_text("0.3", ZERO), 0.3));
        assert!(approx(clean_text(" -2 ", ZERO), -2.0));
    }

    #[test]
    fn garbage_becomes_marker() {
        assert_eq!(clean_text("abc", ZERO), Some(0.0));
        assert_eq!(clean_text("abc%", ZERO), Some(0.0));
        assert_eq!(clean_text("", NULL), None);
        assert_eq!(clean_text("abc", NULL), None);
    }

    #[test]
    fn non_finite_text_is_invalid() {
        assert_eq!(clean_text("nan", NULL), None);
        assert_eq!(clean_text("inf%", NULL), None);
        assert_eq!(clean_text("-infinity", ZERO), Some(0.0));
    }

    #[test]
    fn null_cell_becomes_marker() {
        assert_eq!(clean_value(&AnyValue::Null, ZERO), Some(0.0));
        assert_eq!(clean_value(&AnyValue::Null, NULL), None);
    }

    #[test]
    fn numeric_cells_lenient() {
        assert_eq!(clean_value(&AnyValue::Float64(0.02), ZERO), Some(0.02));
        assert_eq!(clean_value(&AnyValue::Float64(2.5), ZERO), Some(2.5));
        assert_eq!(clean_value(&AnyValue::Int64(3), ZERO), Some(3.0));
        assert_eq!(clean_value(&AnyValue::Float64(f64::NAN), NULL), None);
    }

    #[test]
    fn numeric_cells_strict_rejects_large_magnitudes() {
        assert_eq!(clean_value(&AnyValue::Float64(0.02), STRICT), Some(0.02));
        assert_eq!(clean_value(&AnyValue::Float64(-1.0), STRICT), Some(-1.0));
        assert_eq!(clean_value(&AnyValue::Float64(1.3), STRICT), Some(0.0));
        assert_eq!(clean_value(&AnyValue::Int64(1), STRICT), Some(1.0));
        assert_eq!(clean_text("1.3", STRICT), Some(0.0));
        // Percent text is always accepted, even above 100%.
        assert!(approx(clean_text("150%", STRICT), 1.5));
    }

    #[test]
    fn booleans_are_invalid() {
        assert_eq!(clean_value(&AnyValue::Boolean(true), NULL), None);
    }

    #[test]
    fn series_cleaning_preserves_length_and_order() {
        let raw = Series::new("pl".into(), &[Some("1%"), None, Some("x"), Some("0.2")]);
        let cleaned = clean_series(&raw, NULL);
        assert_eq!(cleaned.len(), 4);
        assert!(approx(cleaned.get(0), 0.01));
        assert_eq!(cleaned.get(1), None);
        assert_eq!(cleaned.get(2), None);
        assert!(approx(cleaned.get(3), 0.2));
        assert_eq!(cleaned.valid().len(), 2);
    }

    #[test]
    fn cleaning_twice_is_cleaning_once() {
        let raw = Series::new("pl".into(), &[Some("1%"), None, Some("-0.4"), Some("bad")]);
        for opts in [ZERO, NULL, STRICT] {
            let once = clean_series(&raw, opts);
            let twice = clean_series(&once.to_series("pl"), opts);
            assert_eq!(once, twice);
        }
    }
}
