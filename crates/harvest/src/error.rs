//! Error types for the harvest library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for harvest operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the candidate encodings decoded the source.
    #[error("Could not decode '{source_name}' with any of: {}", .attempted.join(", "))]
    Decoding {
        source_name: String,
        attempted: Vec<String>,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data rows.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// An expected column is absent.
    #[error("Schema error in {table} table: missing column '{column}'")]
    Schema { table: String, column: String },

    /// A wide column header that should name a year does not.
    #[error("Column '{column}' is not a calendar year")]
    InvalidYear { column: String },

    /// A cell that should hold a number does not.
    #[error("Invalid number '{value}' in column '{column}' at row {row}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    /// Two values for the same (entity, year, metric).
    #[error("Duplicate entry for {entity} {year} in '{metric}'")]
    DuplicateEntry {
        entity: String,
        year: i32,
        metric: String,
    },

    /// Two rows share the same (entity, year) key.
    #[error("Duplicate key {entity} {year}")]
    DuplicateKey { entity: String, year: i32 },

    /// A column does not have one value per row.
    #[error("Column '{column}' has {found} values, expected {expected}")]
    ShapeMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A metric column exists on both sides of a join.
    #[error("Column '{0}' present in both tables")]
    DuplicateColumn(String),

    /// A join left no overlapping rows.
    #[error("Join produced no rows: {0}")]
    JoinEmpty(String),

    /// Store unreachable or write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Requested table is not in the store.
    #[error("Table '{name}' not found at '{location}'")]
    NotFound { location: String, name: String },

    /// Dataset download or extraction failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;
