//! End-to-end pipeline: fetch, load, transform, merge, store.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{HarvestError, Result};
use crate::fetch::{DatasetRef, DatasetSource};
use crate::input::{DEFAULT_ENCODINGS, Loader, LoaderConfig, SourceMetadata};
use crate::merge::{MergedTable, Merger, MergerConfig};
use crate::store::TableStore;
use crate::tidy::{TableSummary, TidyTable};
use crate::transform::{
    CropConfig, CropTransformer, EmissionsConfig, EmissionsTransformer, TidyTransform,
};

/// Where a table is stored: a store location and a table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTarget {
    pub location: String,
    pub name: String,
}

impl StoreTarget {
    pub fn new(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
        }
    }
}

/// Pipeline configuration. Every field has a default, so a JSON file only
/// needs the fields it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub emissions_dataset: DatasetRef,
    pub crop_dataset: DatasetRef,
    /// Encodings tried in order for both sources.
    pub encodings: Vec<String>,
    pub emissions_loader: LoaderConfig,
    pub crop_loader: LoaderConfig,
    pub emissions: EmissionsConfig,
    pub crop: CropConfig,
    pub merger: MergerConfig,
    /// Destination of the merged table.
    pub output: StoreTarget,
    /// Also store the two tidy tables before merging.
    pub keep_intermediate: bool,
    pub emissions_output: StoreTarget,
    pub crop_output: StoreTarget,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            emissions_dataset: DatasetRef::from_parts("farzanghalami", "historical-emissions"),
            crop_dataset: DatasetRef::from_parts("farzanghalami", "worldwide-crop-production"),
            encodings: DEFAULT_ENCODINGS.iter().map(|e| e.to_string()).collect(),
            emissions_loader: LoaderConfig::with_delimiter(b','),
            crop_loader: LoaderConfig::with_delimiter(b';'),
            emissions: EmissionsConfig::default(),
            crop: CropConfig::default(),
            merger: MergerConfig::default(),
            output: StoreTarget::new("data/merged.sqlite", "merged_crop_emission"),
            keep_intermediate: false,
            emissions_output: StoreTarget::new("data/historical_emissions.sqlite", "ghg_emissions"),
            crop_output: StoreTarget::new("data/worldwide_crop_production.sqlite", "crop_production"),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| HarvestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| {
            HarvestError::Config(format!("Invalid configuration '{}': {}", path.display(), e))
        })
    }
}

/// A transformed source with the metadata of the bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub metadata: SourceMetadata,
    pub table: TidyTable,
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Description of the dataset source.
    pub source: String,
    pub emissions_source: SourceMetadata,
    pub crop_source: SourceMetadata,
    pub emissions: TableSummary,
    pub crop: TableSummary,
    /// Summary of the merged table; `None` when the merge was skipped.
    pub merged: Option<TableSummary>,
    /// Tables written by this run, in write order.
    pub stored: Vec<StoreTarget>,
}

impl RunReport {
    pub fn merged_ok(&self) -> bool {
        self.merged.is_some()
    }
}

/// Runs both transforms and the merge with one configuration.
pub struct Pipeline {
    config: PipelineConfig,
    emissions: EmissionsTransformer,
    crop: CropTransformer,
    merger: Merger,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let emissions = EmissionsTransformer::with_config(config.emissions.clone());
        let crop = CropTransformer::with_config(config.crop.clone());
        let merger = Merger::with_config(config.merger.clone());

        Self {
            config,
            emissions,
            crop,
            merger,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch, decode and transform the emissions dataset.
    pub fn load_emissions(&self, source: &dyn DatasetSource) -> Result<LoadedSource> {
        self.load_dataset(
            source,
            &self.config.emissions_dataset,
            &self.config.emissions_loader,
            &self.emissions,
        )
    }

    /// Fetch, decode and transform the crop dataset.
    pub fn load_crop(&self, source: &dyn DatasetSource) -> Result<LoadedSource> {
        self.load_dataset(
            source,
            &self.config.crop_dataset,
            &self.config.crop_loader,
            &self.crop,
        )
    }

    /// Load both datasets and merge them.
    ///
    /// Any failure along the way is logged and reported as `None`; no partial
    /// table is returned.
    pub fn merge_sources(&self, source: &dyn DatasetSource) -> Option<MergedTable> {
        let merged = self.load_emissions(source).and_then(|emissions| {
            let crop = self.load_crop(source)?;
            self.merger.merge(&emissions.table, &crop.table)
        });

        match merged {
            Ok(table) => Some(table),
            Err(e) => {
                error!(error = %e, "error loading or merging data");
                None
            }
        }
    }

    /// Merge two already transformed tables, logging a failure instead of
    /// returning it.
    pub fn merge_tables(&self, emissions: &TidyTable, crop: &TidyTable) -> Option<MergedTable> {
        match self.merger.merge(emissions, crop) {
            Ok(table) => Some(table),
            Err(e) => {
                error!(error = %e, "merge skipped");
                None
            }
        }
    }

    /// Run the whole pipeline once.
    ///
    /// Fetch, decode, transform and store failures abort the run. A failed
    /// merge does not: it is logged and the report carries `merged: None`.
    pub fn run(&self, source: &dyn DatasetSource, store: &dyn TableStore) -> Result<RunReport> {
        info!(source = %source.describe(), "pipeline started");

        let emissions = self.load_emissions(source)?;
        let crop = self.load_crop(source)?;
        let mut stored = Vec::new();

        if self.config.keep_intermediate {
            for (table, target) in [
                (&emissions.table, &self.config.emissions_output),
                (&crop.table, &self.config.crop_output),
            ] {
                store.put(table, &target.location, &target.name)?;
                stored.push(target.clone());
            }
        }

        let merged = self.merge_tables(&emissions.table, &crop.table);
        if let Some(table) = &merged {
            let target = &self.config.output;
            store.put(table, &target.location, &target.name)?;
            stored.push(target.clone());
        }

        info!(
            merged = merged.is_some(),
            tables = stored.len(),
            "pipeline finished"
        );

        Ok(RunReport {
            source: source.describe(),
            emissions_source: emissions.metadata,
            crop_source: crop.metadata,
            emissions: emissions.table.summary(),
            crop: crop.table.summary(),
            merged: merged.map(|table| table.summary()),
            stored,
        })
    }

    fn load_dataset(
        &self,
        source: &dyn DatasetSource,
        dataset: &DatasetRef,
        loader: &LoaderConfig,
        transform: &dyn TidyTransform,
    ) -> Result<LoadedSource> {
        let bytes = source.fetch(dataset)?;
        let (raw, metadata) = Loader::with_config(loader.clone()).load(
            &dataset.csv_file_name(),
            &bytes,
            &self.config.encodings,
        )?;
        info!(
            dataset = %dataset,
            encoding = %metadata.encoding,
            rows = metadata.row_count,
            columns = metadata.column_count,
            "loaded source"
        );

        let table = transform.transform(raw)?;
        info!(
            transform = transform.name(),
            rows = table.row_count(),
            entities = table.entities().len(),
            "transformed source"
        );

        Ok(LoadedSource { metadata, table })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::store::MemoryStore;

    const EMISSIONS: &str = "Country,ISO,Data source,Sector,Gas,Unit,2000,2001\n\
        World,WORLD,CAIT,Agriculture,CH4,MtCO2e,50,60\n\
        World,WORLD,CAIT,Agriculture,N2O,MtCO2e,5,6\n";

    const CROP: &str = "Location;Crop;Unit;2000;2001;\n\
        World;Maize;Thousand tonnes;100;110;\n\
        World;Wheat;Thousand tonnes;0.00;;\n";

    /// Serves fixed bytes per dataset slug.
    struct FixedSource(HashMap<String, Vec<u8>>);

    impl FixedSource {
        fn new(emissions: &str, crop: &str) -> Self {
            let config = PipelineConfig::default();
            let mut files = HashMap::new();
            files.insert(config.emissions_dataset.slug().to_string(), emissions.as_bytes().to_vec());
            files.insert(config.crop_dataset.slug().to_string(), crop.as_bytes().to_vec());
            Self(files)
        }
    }

    impl DatasetSource for FixedSource {
        fn fetch(&self, dataset: &DatasetRef) -> Result<Vec<u8>> {
            self.0
                .get(dataset.slug())
                .cloned()
                .ok_or_else(|| HarvestError::Fetch(format!("unknown dataset {}", dataset)))
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    #[test]
    fn test_run_stores_merged_table() {
        let pipeline = Pipeline::new();
        let store = MemoryStore::new();

        let report = pipeline.run(&FixedSource::new(EMISSIONS, CROP), &store).unwrap();

        assert!(report.merged_ok());
        assert_eq!(report.stored, vec![pipeline.config().output.clone()]);
        let merged = store.get("data/merged.sqlite", "merged_crop_emission").unwrap();
        assert_eq!(merged.row_count(), 2);
        assert_eq!(report.emissions_source.encoding, "UTF-8");
    }

    #[test]
    fn test_run_keeps_intermediate_tables() {
        let pipeline = Pipeline::with_config(PipelineConfig {
            keep_intermediate: true,
            ..PipelineConfig::default()
        });
        let store = MemoryStore::new();

        let report = pipeline.run(&FixedSource::new(EMISSIONS, CROP), &store).unwrap();

        assert_eq!(report.stored.len(), 3);
        assert_eq!(store.len(), 3);
        let crop = store
            .get("data/worldwide_crop_production.sqlite", "crop_production")
            .unwrap();
        assert_eq!(crop.entity_label(), "Location");
    }

    #[test]
    fn test_run_reports_skipped_merge() {
        let crop = "Location;Crop;Unit;1995\nWorld;Maize;Thousand tonnes;1\n";
        let store = MemoryStore::new();

        let report = Pipeline::new().run(&FixedSource::new(EMISSIONS, crop), &store).unwrap();

        assert!(report.merged.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_run_propagates_schema_errors() {
        let crop = "Location;Crop;2000\nWorld;Maize;1\n";
        let err = Pipeline::new()
            .run(&FixedSource::new(EMISSIONS, crop), &MemoryStore::new())
            .unwrap_err();
        assert!(matches!(err, HarvestError::Schema { column, .. } if column == "Unit"));
    }

    #[test]
    fn test_merge_sources_swallows_failures() {
        let pipeline = Pipeline::new();
        assert!(pipeline.merge_sources(&FixedSource::new(EMISSIONS, CROP)).is_some());
        assert!(pipeline.merge_sources(&FixedSource::new(EMISSIONS, "")).is_none());
    }

    #[test]
    fn test_config_from_partial_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("harvest.json");
        fs::write(
            &path,
            r#"{"output": {"location": "out.sqlite", "name": "merged"}, "merger": {"countries": ["World"]}}"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.output, StoreTarget::new("out.sqlite", "merged"));
        assert_eq!(config.merger.countries, vec!["World"]);
        assert_eq!(config.merger.total_column, "TotalCropProduction");
        assert_eq!(config.crop_dataset.slug(), "worldwide-crop-production");
    }
}
