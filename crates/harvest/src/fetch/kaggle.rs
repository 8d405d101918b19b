//! Kaggle dataset downloads.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use super::archive::{extract_archive, select_csv};
use super::{DatasetRef, DatasetSource};
use crate::error::{HarvestError, Result};

/// Kaggle public API root.
const API_BASE: &str = "https://www.kaggle.com/api/v1";

/// Kaggle API token.
#[derive(Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl KaggleCredentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }

    /// Load a token file.
    ///
    /// Accepts a `kaggle.json` style file, or any text file where one line
    /// starting with `{` holds the token object.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| HarvestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| {
            HarvestError::Config(format!("No Kaggle token in '{}': {}", path.display(), e))
        })
    }

    fn parse(text: &str) -> Result<Self> {
        if let Ok(credentials) = serde_json::from_str(text) {
            return Ok(credentials);
        }
        let line = text
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with('{'))
            .ok_or_else(|| HarvestError::Config("no JSON token line".to_string()))?;
        Ok(serde_json::from_str(line)?)
    }
}

impl fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Downloads dataset archives from Kaggle and unpacks them into a cache
/// directory, one subdirectory per dataset.
pub struct KaggleSource {
    client: Client,
    credentials: KaggleCredentials,
    cache_dir: PathBuf,
    api_base: String,
}

impl KaggleSource {
    pub fn new(credentials: KaggleCredentials, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| HarvestError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            cache_dir: cache_dir.into(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Point at a different API root (mirrors, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// URL of the dataset archive.
    pub fn download_url(&self, dataset: &DatasetRef) -> String {
        format!(
            "{}/datasets/download/{}/{}",
            self.api_base,
            dataset.owner(),
            dataset.slug()
        )
    }

    /// Download the archive and unpack it. Returns the extracted files.
    pub fn download(&self, dataset: &DatasetRef) -> Result<Vec<PathBuf>> {
        let url = self.download_url(dataset);
        info!(dataset = %dataset, "downloading {}", dataset.archive_name());

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.key))
            .send()
            .map_err(|e| HarvestError::Fetch(format!("Request for '{}' failed: {}", dataset, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(HarvestError::Fetch(format!(
                "Download of '{}' failed ({}): {}",
                dataset, status, error_text
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| HarvestError::Fetch(format!("Failed to read '{}': {}", dataset, e)))?;
        info!(dataset = %dataset, bytes = bytes.len(), "download complete");

        extract_archive(&bytes, &self.cache_dir.join(dataset.slug()))
    }
}

impl DatasetSource for KaggleSource {
    fn fetch(&self, dataset: &DatasetRef) -> Result<Vec<u8>> {
        let files = self.download(dataset)?;
        let csv = select_csv(&files, &dataset.csv_file_name()).ok_or_else(|| {
            HarvestError::Fetch(format!(
                "Archive of '{}' has no unambiguous CSV (wanted {})",
                dataset,
                dataset.csv_file_name()
            ))
        })?;

        fs::read(csv).map_err(|source| HarvestError::Io {
            path: csv.to_path_buf(),
            source,
        })
    }

    fn describe(&self) -> String {
        format!("kaggle ({})", self.credentials.username)
    }
}
