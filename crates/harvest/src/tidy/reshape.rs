//! Wide-to-long melt and long-to-wide pivot.
//!
//! Reshaping is done in two explicit stages: [`melt`] turns every year column
//! of a [`RawTable`] into [`TidyRecord`]s, and [`pivot`] groups those records
//! by `(entity, year)` and spreads the metric names into columns. The unique
//! key invariant is enforced by [`pivot`].

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::table::{RowKey, TidyTable};
use super::year::Year;
use crate::error::{HarvestError, Result};
use crate::input::RawTable;

/// One long-form observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub entity: String,
    pub time: Year,
    pub metric_name: String,
    pub value: Option<f64>,
}

/// Location of a raw cell, handed to value parsers for error context.
#[derive(Debug, Clone, Copy)]
pub struct CellRef<'a> {
    /// Header of the year column.
    pub column: &'a str,
    /// Row index in the table being melted.
    pub row: usize,
}

/// Melt every column other than `entity_column` and `metric_column` into records.
///
/// Each remaining header must be a calendar year. `parse_value` turns the raw
/// cell text into a value; sentinel handling and numeric cleaning live there.
pub fn melt<F>(
    raw: RawTable,
    entity_column: &str,
    metric_column: &str,
    mut parse_value: F,
) -> Result<Vec<TidyRecord>>
where
    F: FnMut(&str, CellRef<'_>) -> Result<Option<f64>>,
{
    let entity_idx = raw
        .column_index(entity_column)
        .ok_or_else(|| missing(entity_column))?;
    let metric_idx = raw
        .column_index(metric_column)
        .ok_or_else(|| missing(metric_column))?;

    let year_columns: Vec<(usize, Year)> = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != entity_idx && *idx != metric_idx)
        .map(|(idx, header)| {
            Year::parse_header(header)
                .map(|year| (idx, year))
                .ok_or_else(|| HarvestError::InvalidYear {
                    column: header.clone(),
                })
        })
        .collect::<Result<_>>()?;

    let mut records = Vec::with_capacity(raw.rows.len() * year_columns.len());

    // Year-major order, matching a column-by-column melt
    for &(col_idx, year) in &year_columns {
        for (row_idx, row) in raw.rows.iter().enumerate() {
            let cell = CellRef {
                column: &raw.headers[col_idx],
                row: row_idx,
            };
            let field = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");
            let value = parse_value(field(col_idx), cell)?;

            records.push(TidyRecord {
                entity: field(entity_idx).to_string(),
                time: year,
                metric_name: field(metric_idx).to_string(),
                value,
            });
        }
    }

    Ok(records)
}

/// Spread metric names into columns keyed by `(entity, year)`.
///
/// Rows come out sorted by entity then year, metric columns sorted by name.
/// A second value for the same `(entity, year, metric)` is a
/// [`HarvestError::DuplicateEntry`].
pub fn pivot(records: Vec<TidyRecord>, entity_label: &str) -> Result<TidyTable> {
    let mut metrics = BTreeSet::new();
    let mut grouped: BTreeMap<RowKey, BTreeMap<String, Option<f64>>> = BTreeMap::new();

    for record in records {
        let key = RowKey::new(record.entity, record.time);
        metrics.insert(record.metric_name.clone());

        let row = grouped.entry(key.clone()).or_default();
        match row.entry(record.metric_name) {
            Entry::Occupied(occupied) => {
                return Err(HarvestError::DuplicateEntry {
                    entity: key.entity,
                    year: key.year.value(),
                    metric: occupied.key().clone(),
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record.value);
            }
        }
    }

    let mut columns: IndexMap<String, Vec<Option<f64>>> = metrics
        .into_iter()
        .map(|m| (m, Vec::with_capacity(grouped.len())))
        .collect();

    let mut keys = Vec::with_capacity(grouped.len());
    for (key, row) in grouped {
        for (metric, values) in columns.iter_mut() {
            values.push(row.get(metric).copied().flatten());
        }
        keys.push(key);
    }

    TidyTable::from_parts(entity_label, keys, columns)
}

fn missing(column: &str) -> HarvestError {
    HarvestError::Schema {
        table: "melt".to_string(),
        column: column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            b',',
        )
    }

    fn parse(cell: &str, _: CellRef<'_>) -> Result<Option<f64>> {
        Ok(cell.parse().ok())
    }

    fn year(y: i32) -> Year {
        Year::new(y).unwrap()
    }

    #[test]
    fn test_melt_produces_one_record_per_cell() {
        let table = raw(
            &["Country", "Gas", "2000", "2001"],
            &[&["World", "CH4", "50", "60"], &["World", "N2O", "5", ""]],
        );
        let records = melt(table, "Country", "Gas", parse).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].time, year(2000));
        assert_eq!(records[0].metric_name, "CH4");
        assert_eq!(records[0].value, Some(50.0));
        assert_eq!(records[3].metric_name, "N2O");
        assert_eq!(records[3].value, None);
    }

    #[test]
    fn test_melt_rejects_non_year_header() {
        let table = raw(&["Country", "Gas", "Unit", "2000"], &[&["World", "CH4", "Mt", "1"]]);
        let err = melt(table, "Country", "Gas", parse).unwrap_err();
        assert!(matches!(err, HarvestError::InvalidYear { column } if column == "Unit"));
    }

    #[test]
    fn test_melt_passes_cell_location() {
        let table = raw(&["Country", "Gas", "2000"], &[&["World", "CH4", "x"]]);
        let err = melt(table, "Country", "Gas", |cell, at| {
            Err(HarvestError::InvalidNumber {
                column: at.column.to_string(),
                row: at.row,
                value: cell.to_string(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, HarvestError::InvalidNumber { row: 0, .. }));
    }

    #[test]
    fn test_melt_reads_short_rows_as_empty() {
        let mut table = raw(&["Country", "Gas", "2000", "2001"], &[&["World", "CH4", "1", "2"]]);
        table.rows.push(vec!["China".to_string(), "CH4".to_string()]);

        let records = melt(table, "Country", "Gas", parse).unwrap();

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.entity != "China" || r.value.is_none()));
    }

    #[test]
    fn test_pivot_sorts_rows_and_columns() {
        let table = raw(
            &["Country", "Gas", "2001", "2000"],
            &[&["World", "N2O", "6", "5"], &["China", "CH4", "2", "1"]],
        );
        let pivoted = pivot(melt(table, "Country", "Gas", parse).unwrap(), "Country").unwrap();

        let keys: Vec<_> = pivoted
            .keys()
            .iter()
            .map(|k| (k.entity.as_str(), k.year.value()))
            .collect();
        assert_eq!(
            keys,
            vec![("China", 2000), ("China", 2001), ("World", 2000), ("World", 2001)]
        );
        assert_eq!(pivoted.metric_names().collect::<Vec<_>>(), vec!["CH4", "N2O"]);
        assert_eq!(pivoted.column("CH4").unwrap(), &[Some(1.0), Some(2.0), None, None]);
        assert_eq!(pivoted.column("N2O").unwrap(), &[None, None, Some(5.0), Some(6.0)]);
    }

    #[test]
    fn test_pivot_rejects_duplicate_entries() {
        let table = raw(
            &["Country", "Gas", "2000"],
            &[&["World", "CH4", "1"], &["World", "CH4", "2"]],
        );
        let err = pivot(melt(table, "Country", "Gas", parse).unwrap(), "Country").unwrap_err();
        assert!(matches!(
            err,
            HarvestError::DuplicateEntry { entity, year: 2000, metric } if entity == "World" && metric == "CH4"
        ));
    }
}
