//! CSV loader with encoding probing and delimiter detection.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::source::{RawTable, SourceMetadata};
use crate::error::{HarvestError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Encodings tried when the caller does not name any.
pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8", "latin1", "cp1252"];

/// Loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether the source has a header row.
    pub has_header: bool,
    /// Quote character.
    pub quote: u8,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            quote: b'"',
        }
    }
}

impl LoaderConfig {
    /// Configuration with a fixed delimiter.
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
            ..Self::default()
        }
    }
}

/// Loads raw CSV bytes into a [`RawTable`].
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Create a loader with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with custom configuration.
    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Read a file and load it, trying `encodings` in order.
    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        encodings: &[impl AsRef<str>],
    ) -> Result<(RawTable, SourceMetadata)> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| HarvestError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.load(&name, &bytes, encodings)
    }

    /// Decode `bytes` with the first encoding that accepts them and parse the text.
    ///
    /// Every attempt is logged. A source no candidate can decode fails with
    /// [`HarvestError::Decoding`]; a garbled decode is never returned.
    pub fn load(
        &self,
        source_name: &str,
        bytes: &[u8],
        encodings: &[impl AsRef<str>],
    ) -> Result<(RawTable, SourceMetadata)> {
        let mut attempted = Vec::with_capacity(encodings.len());

        for label in encodings {
            let label = label.as_ref();
            attempted.push(label.to_string());

            let Some((text, encoding)) = decode_strict(bytes, label) else {
                warn!(source = source_name, encoding = label, "decode attempt failed");
                continue;
            };
            debug!(source = source_name, encoding = label, "decode attempt succeeded");

            let mut table = self.parse_text(&text)?;
            table.encoding = encoding.name().to_string();

            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let hash = format!("sha256:{:x}", hasher.finalize());
            let metadata = SourceMetadata::new(source_name, hash, bytes.len() as u64, &table);

            return Ok((table, metadata));
        }

        Err(HarvestError::Decoding {
            source_name: source_name.to_string(),
            attempted,
        })
    }

    /// Parse already-decoded text.
    pub fn parse_text(&self, text: &str) -> Result<RawTable> {
        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(text.as_bytes())?,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header_row: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };

        let mut rows: Vec<Vec<String>> = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        let headers = if self.config.has_header {
            header_row
        } else {
            // Generate column names from the first record
            match rows.first() {
                Some(first) => (0..first.len()).map(|i| format!("column_{}", i + 1)).collect(),
                None => return Err(HarvestError::EmptyData("No data rows found".to_string())),
            }
        };

        if headers.is_empty() {
            return Err(HarvestError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        for row in &mut rows {
            // Pad short rows, truncate long ones
            row.resize(expected_cols, String::new());
        }

        if rows.is_empty() {
            return Err(HarvestError::EmptyData("No data rows found".to_string()));
        }

        Ok(RawTable::new(headers, rows, delimiter))
    }
}

/// Decode with malformed sequences treated as fatal.
fn decode_strict(bytes: &[u8], label: &str) -> Option<(String, &'static Encoding)> {
    let encoding = Encoding::for_label(label.trim().as_bytes())?;

    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };

    let text = encoding.decode_without_bom_handling_and_without_replacement(body)?;
    Some((text.into_owned(), encoding))
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(HarvestError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64
        } else {
            0.0
        };

        // Higher count with lower variance wins
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
