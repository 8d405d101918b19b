//! Dataset acquisition.
//!
//! A [`DatasetSource`] turns a dataset reference into the raw bytes of its
//! CSV file. [`LocalDirectory`] reads files that are already on disk;
//! [`KaggleSource`] downloads and unpacks the dataset archive first.

mod archive;
mod kaggle;

pub use archive::{extract_archive, select_csv};
pub use kaggle::{KaggleCredentials, KaggleSource};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HarvestError, Result};

static DATASET_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_.-]*)/([A-Za-z0-9][A-Za-z0-9_.-]*)$").unwrap());

/// A published dataset, written `owner/slug`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetRef {
    owner: String,
    slug: String,
}

impl DatasetRef {
    /// Build a reference from parts known to be well formed.
    pub(crate) fn from_parts(owner: &str, slug: &str) -> Self {
        Self {
            owner: owner.to_string(),
            slug: slug.to_string(),
        }
    }

    /// Parse `owner/slug`.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = DATASET_REF.captures(text.trim()).ok_or_else(|| {
            HarvestError::Config(format!(
                "Invalid dataset reference '{}': expected owner/slug",
                text
            ))
        })?;
        Ok(Self {
            owner: caps[1].to_string(),
            slug: caps[2].to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// File name of the downloaded archive, `<slug>.zip`.
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.slug)
    }

    /// File name of the dataset's CSV, the slug with `-` replaced by `_`.
    pub fn csv_file_name(&self) -> String {
        format!("{}.csv", self.slug.replace('-', "_"))
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

impl FromStr for DatasetRef {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DatasetRef {
    type Error = HarvestError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DatasetRef> for String {
    fn from(value: DatasetRef) -> Self {
        value.to_string()
    }
}

/// Provides the CSV bytes of a dataset.
pub trait DatasetSource {
    fn fetch(&self, dataset: &DatasetRef) -> Result<Vec<u8>>;

    /// Display name for logs and reports.
    fn describe(&self) -> String;
}

/// Reads `<root>/<csv file name>` for each dataset.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the dataset's CSV is expected at.
    pub fn path_for(&self, dataset: &DatasetRef) -> PathBuf {
        self.root.join(dataset.csv_file_name())
    }
}

impl DatasetSource for LocalDirectory {
    fn fetch(&self, dataset: &DatasetRef) -> Result<Vec<u8>> {
        let path = self.path_for(dataset);
        debug!(dataset = %dataset, path = %path.display(), "reading local dataset");
        fs::read(&path).map_err(|source| HarvestError::Io { path, source })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}
