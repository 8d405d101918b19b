//! Declarative missing-value sentinels.

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};
use crate::tidy::CellRef;

/// Markers read as missing by common CSV tooling, independent of dataset.
pub const COMMON_NULL_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Raw strings that mean "not reported" for one source.
///
/// Text matching is exact: `"0.0"` is a sentinel, `" 0.0"` is not. With
/// numeric matching enabled, a parsed value equal to any numeric sentinel
/// is missing too, so `"0.00"` matches a declared `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelSet {
    values: Vec<String>,
    /// Also treat [`COMMON_NULL_MARKERS`] as missing.
    #[serde(default = "default_true")]
    common_nulls: bool,
    /// Compare parsed values against the numeric sentinels.
    #[serde(default)]
    numeric: bool,
}

fn default_true() -> bool {
    true
}

impl SentinelSet {
    /// Sentinel set with the common null markers included.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            common_nulls: true,
            numeric: false,
        }
    }

    /// Drop the common null markers and match only the declared values.
    pub fn without_common_nulls(mut self) -> Self {
        self.common_nulls = false;
        self
    }

    /// Also match parsed values equal to a numeric sentinel.
    pub fn with_numeric_match(mut self) -> Self {
        self.numeric = true;
        self
    }

    /// Declared sentinel strings.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether the raw cell text is a sentinel.
    pub fn is_missing(&self, raw: &str) -> bool {
        self.values.iter().any(|v| v == raw)
            || (self.common_nulls && COMMON_NULL_MARKERS.contains(&raw))
    }

    /// `None` for a sentinel, the raw text otherwise.
    pub fn resolve<'a>(&self, raw: &'a str) -> Option<&'a str> {
        (!self.is_missing(raw)).then_some(raw)
    }

    /// Whether a parsed value equals a numeric sentinel. Always false
    /// unless numeric matching is enabled.
    pub fn is_missing_value(&self, value: f64) -> bool {
        self.numeric
            && self
                .values
                .iter()
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .any(|sentinel| sentinel == value)
    }
}

/// Parse a cell that is already free of formatting.
pub(crate) fn parse_number(raw: &str, cell: CellRef<'_>) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| HarvestError::InvalidNumber {
            column: cell.column.to_string(),
            row: cell.row,
            value: raw.to_string(),
        })
}
