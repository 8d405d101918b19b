//! Pivoted tidy table keyed by (entity, year).

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::year::{Year, YearWindow};
use crate::error::{HarvestError, Result};

/// Name of the time column in stored and displayed tables.
pub const YEAR_COLUMN: &str = "Year";

/// Row key of a tidy table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub entity: String,
    pub year: Year,
}

impl RowKey {
    pub fn new(entity: impl Into<String>, year: Year) -> Self {
        Self {
            entity: entity.into(),
            year,
        }
    }
}

/// One row per `(entity, year)`, one nullable float column per metric.
///
/// Columns are stored column-major; every column holds exactly one value
/// per key.
#[derive(Debug, Clone, PartialEq)]
pub struct TidyTable {
    entity_label: String,
    keys: Vec<RowKey>,
    columns: IndexMap<String, Vec<Option<f64>>>,
}

impl TidyTable {
    /// Create an empty table whose entity column is called `entity_label`.
    pub fn new(entity_label: impl Into<String>) -> Self {
        Self {
            entity_label: entity_label.into(),
            keys: Vec::new(),
            columns: IndexMap::new(),
        }
    }

    /// Assemble a table, checking key uniqueness and column lengths.
    pub fn from_parts(
        entity_label: impl Into<String>,
        keys: Vec<RowKey>,
        columns: IndexMap<String, Vec<Option<f64>>>,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert((key.entity.as_str(), key.year)) {
                return Err(HarvestError::DuplicateKey {
                    entity: key.entity.clone(),
                    year: key.year.value(),
                });
            }
        }

        for (name, values) in &columns {
            if values.len() != keys.len() {
                return Err(HarvestError::ShapeMismatch {
                    column: name.clone(),
                    expected: keys.len(),
                    found: values.len(),
                });
            }
        }

        Ok(Self {
            entity_label: entity_label.into(),
            keys,
            columns,
        })
    }

    /// Name of the entity column (`Country`, `Location`, ...).
    pub fn entity_label(&self) -> &str {
        &self.entity_label
    }

    pub fn set_entity_label(&mut self, label: impl Into<String>) {
        self.entity_label = label.into();
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Row keys in row order.
    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    /// Metric column names in column order.
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Metric columns in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Values of a metric column.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut [Option<f64>]> {
        self.columns.get_mut(name).map(|v| v.as_mut_slice())
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut Vec<Option<f64>>> {
        self.columns.values_mut()
    }

    /// Position of the row with this key.
    pub fn row_index(&self, entity: &str, year: Year) -> Option<usize> {
        self.keys
            .iter()
            .position(|k| k.entity == entity && k.year == year)
    }

    /// Look up one cell. `None` when the row, the column or the value is missing.
    pub fn value(&self, entity: &str, year: Year, metric: &str) -> Option<f64> {
        let row = self.row_index(entity, year)?;
        self.columns.get(metric)?.get(row).copied().flatten()
    }

    /// All metric values of one row, in column order.
    pub fn row_values(&self, row: usize) -> Vec<Option<f64>> {
        self.columns
            .values()
            .map(|values| values.get(row).copied().flatten())
            .collect()
    }

    /// Append a metric column.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) || name == self.entity_label || name == YEAR_COLUMN {
            return Err(HarvestError::DuplicateColumn(name));
        }
        if values.len() != self.keys.len() {
            return Err(HarvestError::ShapeMismatch {
                column: name,
                expected: self.keys.len(),
                found: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Keep the rows whose key matches the predicate.
    pub fn retain_rows(&mut self, predicate: impl Fn(&RowKey) -> bool) {
        let keep: Vec<bool> = self.keys.iter().map(&predicate).collect();
        if keep.iter().all(|&k| k) {
            return;
        }

        let mut mask = keep.iter();
        self.keys.retain(|_| *mask.next().unwrap_or(&false));
        for values in self.columns.values_mut() {
            let mut mask = keep.iter();
            values.retain(|_| *mask.next().unwrap_or(&false));
        }
    }

    /// Keep the rows whose year falls in the window.
    pub fn retain_years(&mut self, window: &YearWindow) {
        self.retain_rows(|key| window.contains(key.year));
    }

    /// Distinct entities in first-seen order.
    pub fn entities(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.keys
            .iter()
            .map(|k| k.entity.as_str())
            .filter(|e| seen.insert(*e))
            .collect()
    }

    /// Row count, entities, year span and non-null counts per metric.
    pub fn summary(&self) -> TableSummary {
        let years = self.keys.iter().map(|k| k.year);
        TableSummary {
            entity_label: self.entity_label.clone(),
            rows: self.keys.len(),
            entities: self.entities().into_iter().map(String::from).collect(),
            first_year: years.clone().min().map(Year::value),
            last_year: years.max().map(Year::value),
            non_null: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), values.iter().flatten().count()))
                .collect(),
        }
    }
}

/// Shape of a tidy table, for reports and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub entity_label: String,
    pub rows: usize,
    pub entities: Vec<String>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    /// Non-null value count per metric column.
    pub non_null: IndexMap<String, usize>,
}
