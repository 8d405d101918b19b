use std::collections::HashMap;
use std::sync::Mutex;

use super::TableStore;
use crate::error::{HarvestError, Result};
use crate::tidy::TidyTable;

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<(String, String), TidyTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tables across all locations.
    pub fn len(&self) -> usize {
        self.tables.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TableStore for MemoryStore {
    fn put(&self, table: &TidyTable, location: &str, name: &str) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| HarvestError::Persistence(format!("memory store poisoned: {}", e)))?;
        tables.insert((location.to_string(), name.to_string()), table.clone());
        Ok(())
    }

    fn get(&self, location: &str, name: &str) -> Result<TidyTable> {
        let tables = self
            .tables
            .lock()
            .map_err(|e| HarvestError::Persistence(format!("memory store poisoned: {}", e)))?;
        tables
            .get(&(location.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| HarvestError::NotFound {
                location: location.to_string(),
                name: name.to_string(),
            })
    }
}
