//! Source-specific transforms from raw wide tables to tidy tables.

mod crop;
mod emissions;
mod sentinel;

pub use crop::{CropConfig, CropTransformer};
pub use emissions::{EmissionsConfig, EmissionsTransformer};
pub use sentinel::{COMMON_NULL_MARKERS, SentinelSet};

use crate::error::{HarvestError, Result};
use crate::input::RawTable;
use crate::tidy::{TidyTable, Year, YearWindow};

/// Turns one raw source table into a tidy table.
pub trait TidyTransform {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Consume the raw table and produce the tidy table.
    fn transform(&self, raw: RawTable) -> Result<TidyTable>;
}

/// Resolve every required column, failing on the first absent one.
fn require_columns(raw: &RawTable, table: &str, columns: &[&str]) -> Result<Vec<usize>> {
    columns
        .iter()
        .map(|column| {
            raw.column_index(column).ok_or_else(|| HarvestError::Schema {
                table: table.to_string(),
                column: column.to_string(),
            })
        })
        .collect()
}

/// Drop year columns outside the window so their cells are never parsed.
fn drop_years_outside(raw: &mut RawTable, window: &YearWindow) {
    raw.drop_columns_where(|header| {
        Year::parse_header(header).is_some_and(|year| !window.contains(year))
    });
}
