//! Harvest: an ETL pipeline joining agricultural greenhouse-gas emissions
//! with worldwide crop production.
//!
//! Two wide CSV sources (one column per year) are decoded, reshaped into
//! tidy tables keyed by `(entity, year)`, joined, enriched with a total crop
//! production column, gap-filled along the time axis and stored in SQLite.
//!
//! # Pipeline
//!
//! - **Load**: [`Loader`] probes candidate encodings in order and parses CSV
//! - **Transform**: [`EmissionsTransformer`] and [`CropTransformer`] melt the
//!   year columns and pivot the metric column
//! - **Merge**: [`Merger`] joins, filters, totals and interpolates
//! - **Store**: [`TableStore`] implementations replace tables by name
//!
//! # Example
//!
//! ```no_run
//! use harvest::{LocalDirectory, Pipeline, SqliteStore};
//!
//! let pipeline = Pipeline::new();
//! let report = pipeline
//!     .run(&LocalDirectory::new("datasets"), &SqliteStore::new())
//!     .unwrap();
//!
//! if let Some(merged) = &report.merged {
//!     println!("Merged rows: {}", merged.rows);
//! }
//! ```

pub mod error;
pub mod fetch;
pub mod input;
pub mod merge;
pub mod store;
pub mod tidy;
pub mod transform;

mod pipeline;

pub use crate::pipeline::{LoadedSource, Pipeline, PipelineConfig, RunReport, StoreTarget};
pub use error::{HarvestError, Result};
pub use fetch::{DatasetRef, DatasetSource, KaggleCredentials, KaggleSource, LocalDirectory};
pub use input::{Loader, LoaderConfig, RawTable, SourceMetadata};
pub use merge::{MergedTable, Merger, MergerConfig};
pub use store::{MemoryStore, SqliteStore, TableStore};
pub use tidy::{RowKey, TableSummary, TidyTable, Year, YearWindow};
pub use transform::{
    CropConfig, CropTransformer, EmissionsConfig, EmissionsTransformer, SentinelSet, TidyTransform,
};
