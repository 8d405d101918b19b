//! Joining emissions and crop production into one enriched table.
//!
//! The merger inner-joins the two tidy tables on `(entity, year)`, restricts
//! the result to an allow-list of entities, derives the total crop
//! production and fills gaps along the time axis of each entity.

mod interpolate;

pub use interpolate::{fill_series, interpolate_by_entity};

use std::collections::{HashMap, HashSet};
use std::ops::Deref;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{HarvestError, Result};
use crate::tidy::{RowKey, TidyTable, YEAR_COLUMN, Year};

/// Configuration for [`Merger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergerConfig {
    /// Entities kept after the join. Empty keeps every entity.
    pub countries: Vec<String>,
    /// Crop columns summed into the total. Missing ones are added as nulls.
    pub tracked_crops: Vec<String>,
    /// Name of the derived total column.
    pub total_column: String,
    /// Fill gaps along the time axis of each entity.
    pub interpolate: bool,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            countries: ["World", "China", "India", "United States"]
                .into_iter()
                .map(String::from)
                .collect(),
            tracked_crops: ["Maize", "Rice", "Soybean", "Wheat"]
                .into_iter()
                .map(String::from)
                .collect(),
            total_column: "TotalCropProduction".to_string(),
            interpolate: true,
        }
    }
}

/// Output of a successful merge: emission and crop metrics side by side,
/// keyed by the emissions entity label.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable(TidyTable);

impl MergedTable {
    pub fn into_inner(self) -> TidyTable {
        self.0
    }

    pub fn as_table(&self) -> &TidyTable {
        &self.0
    }
}

impl Deref for MergedTable {
    type Target = TidyTable;

    fn deref(&self) -> &TidyTable {
        &self.0
    }
}

/// Joins and enriches the two tidy tables.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    config: MergerConfig,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MergerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergerConfig {
        &self.config
    }

    /// Merge the emissions and crop tables.
    ///
    /// The whole merge succeeds or fails as one unit. Fails with
    /// [`HarvestError::JoinEmpty`] when the tables share no `(entity, year)`
    /// pair or when none of the shared rows is on the allow-list, and with
    /// [`HarvestError::DuplicateColumn`] when a metric exists on both sides.
    pub fn merge(&self, emissions: &TidyTable, crop: &TidyTable) -> Result<MergedTable> {
        self.check_columns(emissions, crop)?;

        let pairs = join_rows(emissions, crop);
        if pairs.is_empty() {
            return Err(HarvestError::JoinEmpty(format!(
                "no (entity, year) pair shared by '{}' and '{}' rows",
                emissions.entity_label(),
                crop.entity_label()
            )));
        }
        debug!(joined = pairs.len(), "joined emissions and crop rows");

        let pairs = self.restrict_entities(emissions, pairs);
        if pairs.is_empty() {
            return Err(HarvestError::JoinEmpty(format!(
                "no joined rows for any of: {}",
                self.config.countries.join(", ")
            )));
        }

        let mut table = assemble(emissions, crop, &pairs)?;
        self.add_total(&mut table)?;

        if self.config.interpolate {
            interpolate_by_entity(&mut table);
        }

        info!(
            rows = table.row_count(),
            entities = table.entities().len(),
            columns = table.metric_names().count(),
            "merged emissions and crop production"
        );
        Ok(MergedTable(table))
    }

    fn check_columns(&self, emissions: &TidyTable, crop: &TidyTable) -> Result<()> {
        let reserved = [
            emissions.entity_label(),
            YEAR_COLUMN,
            self.config.total_column.as_str(),
        ];
        for name in crop.metric_names() {
            if emissions.has_column(name) || reserved.contains(&name) {
                return Err(HarvestError::DuplicateColumn(name.to_string()));
            }
        }
        if emissions.has_column(&self.config.total_column) {
            return Err(HarvestError::DuplicateColumn(self.config.total_column.clone()));
        }
        Ok(())
    }

    fn restrict_entities(
        &self,
        emissions: &TidyTable,
        pairs: Vec<(usize, usize)>,
    ) -> Vec<(usize, usize)> {
        if self.config.countries.is_empty() {
            return pairs;
        }
        let allowed: HashSet<&str> = self.config.countries.iter().map(String::as_str).collect();
        let before = pairs.len();
        let kept: Vec<_> = pairs
            .into_iter()
            .filter(|&(row, _)| allowed.contains(emissions.keys()[row].entity.as_str()))
            .collect();
        debug!(kept = kept.len(), dropped = before - kept.len(), "applied entity allow-list");
        kept
    }

    /// Add any missing tracked crop as nulls, then the total column.
    fn add_total(&self, table: &mut TidyTable) -> Result<()> {
        let rows = table.row_count();
        for crop in &self.config.tracked_crops {
            if !table.has_column(crop) {
                debug!(crop = %crop, "tracked crop absent, adding empty column");
                table.add_column(crop.clone(), vec![None; rows])?;
            }
        }

        let mut total: Vec<Option<f64>> = vec![None; rows];
        for crop in &self.config.tracked_crops {
            let Some(values) = table.column(crop) else {
                continue;
            };
            for (sum, value) in total.iter_mut().zip(values) {
                if let Some(v) = value {
                    *sum = Some(sum.unwrap_or(0.0) + v);
                }
            }
        }
        table.add_column(self.config.total_column.clone(), total)
    }
}

/// Matching `(emissions row, crop row)` pairs in emissions row order.
fn join_rows(emissions: &TidyTable, crop: &TidyTable) -> Vec<(usize, usize)> {
    let index: HashMap<(&str, Year), usize> = crop
        .keys()
        .iter()
        .enumerate()
        .map(|(row, key)| ((key.entity.as_str(), key.year), row))
        .collect();

    emissions
        .keys()
        .iter()
        .enumerate()
        .filter_map(|(row, key)| {
            index
                .get(&(key.entity.as_str(), key.year))
                .map(|&other| (row, other))
        })
        .collect()
}

fn assemble(emissions: &TidyTable, crop: &TidyTable, pairs: &[(usize, usize)]) -> Result<TidyTable> {
    let keys: Vec<RowKey> = pairs
        .iter()
        .map(|&(row, _)| emissions.keys()[row].clone())
        .collect();

    let mut columns = IndexMap::new();
    for (name, values) in emissions.columns() {
        columns.insert(name.to_string(), pairs.iter().map(|&(row, _)| values[row]).collect());
    }
    for (name, values) in crop.columns() {
        columns.insert(name.to_string(), pairs.iter().map(|&(_, row)| values[row]).collect());
    }

    TidyTable::from_parts(emissions.entity_label(), keys, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Loader, LoaderConfig};
    use crate::transform::{CropTransformer, EmissionsTransformer, TidyTransform};

    fn year(y: i32) -> Year {
        Year::new(y).unwrap()
    }

    fn table(label: &str, rows: &[(&str, i32)], columns: &[(&str, Vec<Option<f64>>)]) -> TidyTable {
        let keys = rows.iter().map(|&(e, y)| RowKey::new(e, year(y))).collect();
        let columns = columns
            .iter()
            .map(|(name, values)| (name.to_string(), values.clone()))
            .collect();
        TidyTable::from_parts(label, keys, columns).unwrap()
    }

    #[test]
    fn test_merge_end_to_end_scenario() {
        let emissions = Loader::new()
            .parse_text(
                "Country,ISO,Data source,Sector,Gas,Unit,2000,2001\n\
                 World,WORLD,CAIT,Agriculture,CH4,MtCO2e,50,60",
            )
            .unwrap();
        let crop = Loader::with_config(LoaderConfig::with_delimiter(b';'))
            .parse_text(
                "Location;Crop;Unit;2000;2001\n\
                 World;Maize;Thousand tonnes;100;110\n\
                 World;Wheat;Thousand tonnes;0.00;",
            )
            .unwrap();

        let emissions = EmissionsTransformer::new().transform(emissions).unwrap();
        let crop = CropTransformer::new().transform(crop).unwrap();
        let merged = Merger::new().merge(&emissions, &crop).unwrap();

        assert_eq!(merged.entity_label(), "Country");
        assert_eq!(merged.value("World", year(2000), "CH4"), Some(50.0));
        assert_eq!(merged.value("World", year(2000), "Maize"), Some(100.0));
        assert_eq!(merged.value("World", year(2000), "Wheat"), None);
        assert_eq!(merged.value("World", year(2000), "TotalCropProduction"), Some(100.0));
        assert_eq!(merged.value("World", year(2001), "TotalCropProduction"), Some(110.0));
    }

    #[test]
    fn test_merge_inner_join_and_allow_list() {
        let emissions = table(
            "Country",
            &[("Brazil", 2000), ("India", 2000), ("India", 2001), ("World", 2005)],
            &[("CH4", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)])],
        );
        let crop = table(
            "Location",
            &[("Brazil", 2000), ("India", 2001), ("India", 2000)],
            &[("Rice", vec![Some(10.0), Some(30.0), Some(20.0)])],
        );

        let merged = Merger::new().merge(&emissions, &crop).unwrap();

        assert_eq!(merged.entities(), vec!["India"]);
        let years: Vec<i32> = merged.keys().iter().map(|k| k.year.value()).collect();
        assert_eq!(years, vec![2000, 2001]);
        assert_eq!(merged.column("Rice").unwrap(), &[Some(20.0), Some(30.0)]);
    }

    #[test]
    fn test_merge_adds_missing_tracked_crops() {
        let emissions = table("Country", &[("China", 2000)], &[("CH4", vec![Some(1.0)])]);
        let crop = table("Location", &[("China", 2000)], &[("Rice", vec![Some(5.0)])]);

        let merged = Merger::new().merge(&emissions, &crop).unwrap();

        assert_eq!(
            merged.metric_names().collect::<Vec<_>>(),
            vec!["CH4", "Rice", "Maize", "Soybean", "Wheat", "TotalCropProduction"]
        );
        assert_eq!(merged.column("Maize").unwrap(), &[None]);
        assert_eq!(merged.value("China", year(2000), "TotalCropProduction"), Some(5.0));
    }

    #[test]
    fn test_total_is_null_when_every_crop_is_null() {
        let emissions = table("Country", &[("World", 2000)], &[("CH4", vec![Some(1.0)])]);
        let crop = table(
            "Location",
            &[("World", 2000)],
            &[("Maize", vec![None]), ("Wheat", vec![None])],
        );

        let merged = Merger::new().merge(&emissions, &crop).unwrap();
        assert_eq!(merged.column("TotalCropProduction").unwrap(), &[None]);
    }

    #[test]
    fn test_total_sums_all_four_crops() {
        let emissions = table("Country", &[("World", 2000)], &[("CH4", vec![Some(1.0)])]);
        let crop = table(
            "Location",
            &[("World", 2000)],
            &[
                ("Maize", vec![Some(1.0)]),
                ("Rice", vec![Some(2.0)]),
                ("Soybean", vec![Some(3.0)]),
                ("Wheat", vec![Some(4.0)]),
            ],
        );

        let merged = Merger::new().merge(&emissions, &crop).unwrap();
        assert_eq!(merged.value("World", year(2000), "TotalCropProduction"), Some(10.0));
    }

    #[test]
    fn test_merge_interpolates_per_entity() {
        let emissions = table(
            "Country",
            &[("China", 2000), ("China", 2001), ("China", 2002), ("World", 2000)],
            &[("CH4", vec![Some(10.0), None, Some(10.0), None])],
        );
        let crop = table(
            "Location",
            &[("China", 2000), ("China", 2001), ("China", 2002), ("World", 2000)],
            &[("Maize", vec![None, Some(4.0), None, Some(9.0)])],
        );

        let merged = Merger::new().merge(&emissions, &crop).unwrap();

        assert_eq!(merged.value("China", year(2001), "CH4"), Some(10.0));
        assert_eq!(merged.column("Maize").unwrap(), &[Some(4.0), Some(4.0), Some(4.0), Some(9.0)]);
        // World has no CH4 at all
        assert_eq!(merged.value("World", year(2000), "CH4"), None);
    }

    #[test]
    fn test_merge_without_overlap_fails() {
        let emissions = table("Country", &[("World", 1990)], &[("CH4", vec![Some(1.0)])]);
        let crop = table("Location", &[("World", 2020)], &[("Rice", vec![Some(1.0)])]);

        let err = Merger::new().merge(&emissions, &crop).unwrap_err();
        assert!(matches!(err, HarvestError::JoinEmpty(_)));
    }

    #[test]
    fn test_merge_outside_allow_list_fails() {
        let emissions = table("Country", &[("Brazil", 2000)], &[("CH4", vec![Some(1.0)])]);
        let crop = table("Location", &[("Brazil", 2000)], &[("Rice", vec![Some(1.0)])]);

        let err = Merger::new().merge(&emissions, &crop).unwrap_err();
        assert!(matches!(err, HarvestError::JoinEmpty(msg) if msg.contains("United States")));
    }

    #[test]
    fn test_merge_rejects_shared_metric() {
        let emissions = table("Country", &[("World", 2000)], &[("Rice", vec![Some(1.0)])]);
        let crop = table("Location", &[("World", 2000)], &[("Rice", vec![Some(1.0)])]);

        let err = Merger::new().merge(&emissions, &crop).unwrap_err();
        assert!(matches!(err, HarvestError::DuplicateColumn(name) if name == "Rice"));
    }

    #[test]
    fn test_merge_without_interpolation_keeps_gaps() {
        let emissions = table(
            "Country",
            &[("World", 2000), ("World", 2001)],
            &[("CH4", vec![Some(1.0), None])],
        );
        let crop = table(
            "Location",
            &[("World", 2000), ("World", 2001)],
            &[("Rice", vec![Some(1.0), Some(2.0)])],
        );
        let merger = Merger::with_config(MergerConfig {
            interpolate: false,
            ..MergerConfig::default()
        });

        let merged = merger.merge(&emissions, &crop).unwrap();
        assert_eq!(merged.value("World", year(2001), "CH4"), None);
    }
}
