//! Raw table representation and source metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about a loaded source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Name the source was loaded under (usually a file name).
    pub name: String,
    /// SHA-256 hash of the raw bytes.
    pub hash: String,
    /// Size of the raw bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Encoding that decoded the source.
    pub encoding: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the source was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a source that has been parsed.
    pub fn new(name: impl Into<String>, hash: String, size_bytes: u64, table: &RawTable) -> Self {
        let format = match table.delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        Self {
            name: name.into(),
            hash,
            size_bytes,
            format,
            encoding: table.encoding.clone(),
            row_count: table.row_count(),
            column_count: table.column_count(),
            loaded_at: Utc::now(),
        }
    }
}

/// Parsed tabular data with string cells, in source order.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order).
    pub rows: Vec<Vec<String>>,
    /// The delimiter used.
    pub delimiter: u8,
    /// Name of the encoding that decoded the source.
    pub encoding: String,
}

impl RawTable {
    /// Create a new raw table, padding short rows with empty cells.
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<String>>, delimiter: u8) -> Self {
        for row in &mut rows {
            if row.len() < headers.len() {
                row.resize(headers.len(), String::new());
            }
        }
        Self {
            headers,
            rows,
            delimiter,
            encoding: "UTF-8".to_string(),
        }
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col).map(|s| s.as_str()))
    }

    /// Keep only rows whose value in `column` equals `value`.
    pub fn retain_rows_where(&mut self, column: usize, value: &str) {
        self.rows
            .retain(|row| row.get(column).map(|s| s.as_str()) == Some(value));
    }

    /// Remove the named columns. Names that are not present are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        self.drop_columns_where(|header| names.contains(&header));
    }

    /// Remove every column whose header matches the predicate.
    pub fn drop_columns_where(&mut self, predicate: impl Fn(&str) -> bool) {
        let keep: Vec<bool> = self.headers.iter().map(|h| !predicate(h)).collect();
        if keep.iter().all(|&k| k) {
            return;
        }

        self.headers = retain_by_mask(std::mem::take(&mut self.headers), &keep);
        for row in &mut self.rows {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
    }

    /// Check whether a header is one of the unnamed filler columns
    /// (blank, or `Unnamed: N` as written by spreadsheet exports).
    pub fn is_unnamed_header(header: &str) -> bool {
        let trimmed = header.trim();
        trimmed.is_empty() || trimmed.starts_with("Unnamed:")
    }
}

fn retain_by_mask(values: Vec<String>, keep: &[bool]) -> Vec<String> {
    values
        .into_iter()
        .zip(keep)
        .filter_map(|(v, &k)| k.then_some(v))
        .collect()
}
