//! Persistence of tidy tables.
//!
//! A store holds named tables at a location. Writing a table always replaces
//! what was stored under that name, so repeating a write is harmless.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::tidy::TidyTable;

/// Named table storage.
pub trait TableStore {
    /// Store `table` as `name` at `location`, replacing any existing table.
    fn put(&self, table: &TidyTable, location: &str, name: &str) -> Result<()>;

    /// Read back a stored table. Fails with `NotFound` when absent.
    fn get(&self, location: &str, name: &str) -> Result<TidyTable>;
}
