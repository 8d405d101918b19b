//! Tidy (long and pivoted) table representations.

mod reshape;
mod table;
mod year;

pub use reshape::{CellRef, TidyRecord, melt, pivot};
pub use table::{RowKey, TableSummary, TidyTable, YEAR_COLUMN};
pub use year::{Year, YearWindow};
