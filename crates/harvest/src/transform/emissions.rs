//! Agricultural greenhouse-gas emissions transform.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sentinel::{SentinelSet, parse_number};
use super::{TidyTransform, drop_years_outside, require_columns};
use crate::error::Result;
use crate::input::RawTable;
use crate::tidy::{TidyTable, YearWindow, melt, pivot};

/// Column names and filters for the emissions source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionsConfig {
    /// Entity column; also the entity label of the output.
    pub entity_column: String,
    pub sector_column: String,
    /// Sector kept by the filter.
    pub sector: String,
    /// Column whose values become metric columns.
    pub gas_column: String,
    /// Metadata columns dropped before melting.
    pub dropped_columns: Vec<String>,
    pub sentinels: SentinelSet,
    pub years: YearWindow,
}

impl Default for EmissionsConfig {
    fn default() -> Self {
        Self {
            entity_column: "Country".to_string(),
            sector_column: "Sector".to_string(),
            sector: "Agriculture".to_string(),
            gas_column: "Gas".to_string(),
            dropped_columns: vec!["Unit".into(), "Data source".into(), "ISO".into()],
            sentinels: SentinelSet::new(["0.0", "", "0,000", "0"]).with_numeric_match(),
            years: YearWindow::between(1990, 2020),
        }
    }
}

/// Reshapes the wide emissions table into one row per (country, year)
/// with one column per gas.
#[derive(Debug, Clone, Default)]
pub struct EmissionsTransformer {
    config: EmissionsConfig,
}

impl EmissionsTransformer {
    /// Transformer with the default emissions configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transformer with a custom configuration.
    pub fn with_config(config: EmissionsConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &EmissionsConfig {
        &self.config
    }
}

impl TidyTransform for EmissionsTransformer {
    fn name(&self) -> &'static str {
        "emissions"
    }

    fn transform(&self, mut raw: RawTable) -> Result<TidyTable> {
        let config = &self.config;

        let mut required = vec![
            config.entity_column.as_str(),
            config.sector_column.as_str(),
            config.gas_column.as_str(),
        ];
        required.extend(config.dropped_columns.iter().map(String::as_str));
        let indices = require_columns(&raw, self.name(), &required)?;

        let total_rows = raw.row_count();
        raw.retain_rows_where(indices[1], &config.sector);
        debug!(
            kept = raw.row_count(),
            total = total_rows,
            sector = %config.sector,
            "filtered emissions by sector"
        );
        if raw.is_empty() {
            warn!(sector = %config.sector, "no emissions rows for sector");
        }

        let mut dropped = vec![config.sector_column.as_str()];
        dropped.extend(config.dropped_columns.iter().map(String::as_str));
        raw.drop_columns(&dropped);
        drop_years_outside(&mut raw, &config.years);

        let sentinels = &config.sentinels;
        let records = melt(raw, &config.entity_column, &config.gas_column, |cell, at| {
            let Some(text) = sentinels.resolve(cell) else {
                return Ok(None);
            };
            let value = parse_number(text, at)?;
            Ok((!sentinels.is_missing_value(value)).then_some(value))
        })?;

        let mut table = pivot(records, &config.entity_column)?;
        table.retain_years(&config.years);

        debug!(
            rows = table.row_count(),
            gases = table.metric_names().count(),
            "emissions reshaped"
        );
        Ok(table)
    }
}
