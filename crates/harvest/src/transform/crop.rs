//! Worldwide crop production transform.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sentinel::{SentinelSet, parse_number};
use super::{TidyTransform, drop_years_outside, require_columns};
use crate::error::Result;
use crate::input::RawTable;
use crate::tidy::{CellRef, TidyTable, YearWindow, melt, pivot};

/// Column names, filters and cleaning rules for the crop source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Entity column; also the entity label of the output.
    pub entity_column: String,
    /// Column whose values become metric columns.
    pub crop_column: String,
    pub unit_column: String,
    /// Reporting unit kept by the filter.
    pub unit: String,
    pub sentinels: SentinelSet,
    pub years: YearWindow,
    /// Characters stripped from values before parsing.
    pub strip_chars: Vec<char>,
    /// Crops whose exact zero means "not reported".
    pub zero_as_missing: Vec<String>,
    /// Entity names replaced before pivoting.
    pub entity_renames: IndexMap<String, String>,
}

impl Default for CropConfig {
    fn default() -> Self {
        let mut entity_renames = IndexMap::new();
        entity_renames.insert("China (People's Republic of)".to_string(), "China".to_string());

        Self {
            entity_column: "Location".to_string(),
            crop_column: "Crop".to_string(),
            unit_column: "Unit".to_string(),
            unit: "Thousand tonnes".to_string(),
            sentinels: SentinelSet::new(["", "0,000", "0.00", "0.0"]),
            years: YearWindow::up_to(2020),
            strip_chars: vec![',', '\u{a0}', ' '],
            zero_as_missing: vec!["Wheat".to_string()],
            entity_renames,
        }
    }
}

/// Reshapes the wide crop table into one row per (location, year) with one
/// column per crop, cleaning the numeric formatting on the way.
#[derive(Debug, Clone, Default)]
pub struct CropTransformer {
    config: CropConfig,
}

impl CropTransformer {
    /// Transformer with the default crop configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CropConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// Strip thousands separators and spaces, then parse.
    fn clean_value(&self, text: &str, at: CellRef<'_>) -> Result<f64> {
        let cleaned: String = text
            .chars()
            .filter(|c| !self.config.strip_chars.contains(c))
            .collect();
        parse_number(&cleaned, at)
    }

    fn rename_entities(&self, raw: &mut RawTable, entity_idx: usize) -> usize {
        let mut renamed = 0;
        for row in &mut raw.rows {
            let Some(cell) = row.get_mut(entity_idx) else {
                continue;
            };
            if let Some(canonical) = self.config.entity_renames.get(cell.as_str()) {
                *cell = canonical.clone();
                renamed += 1;
            }
        }
        renamed
    }

    fn null_zero_sentinels(&self, table: &mut TidyTable) {
        for crop in &self.config.zero_as_missing {
            let Some(values) = table.column_mut(crop) else {
                continue;
            };
            let mut nulled = 0;
            for value in values.iter_mut() {
                if *value == Some(0.0) {
                    *value = None;
                    nulled += 1;
                }
            }
            debug!(crop = %crop, nulled, "zero production treated as missing");
        }
    }
}

impl TidyTransform for CropTransformer {
    fn name(&self) -> &'static str {
        "crop"
    }

    fn transform(&self, mut raw: RawTable) -> Result<TidyTable> {
        let config = &self.config;

        // The unit column is checked first; it is the one that tends to go missing
        let indices = require_columns(
            &raw,
            self.name(),
            &[
                config.unit_column.as_str(),
                config.entity_column.as_str(),
                config.crop_column.as_str(),
            ],
        )?;

        let total_rows = raw.row_count();
        raw.retain_rows_where(indices[0], &config.unit);
        debug!(
            kept = raw.row_count(),
            total = total_rows,
            unit = %config.unit,
            "filtered crops by unit"
        );

        let renamed = self.rename_entities(&mut raw, indices[1]);
        if renamed > 0 {
            debug!(renamed, "normalized entity names");
        }

        raw.drop_columns(&[config.unit_column.as_str()]);
        raw.drop_columns_where(RawTable::is_unnamed_header);
        drop_years_outside(&mut raw, &config.years);

        let sentinels = &config.sentinels;
        let records = melt(raw, &config.entity_column, &config.crop_column, |cell, at| {
            sentinels
                .resolve(cell)
                .map(|text| self.clean_value(text, at))
                .transpose()
        })?;

        let mut table = pivot(records, &config.entity_column)?;
        table.retain_years(&config.years);
        self.null_zero_sentinels(&mut table);

        debug!(
            rows = table.row_count(),
            crops = table.metric_names().count(),
            "crops reshaped"
        );
        Ok(table)
    }
}
