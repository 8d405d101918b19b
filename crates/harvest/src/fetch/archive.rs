use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{HarvestError, Result};

/// Unpack a zip archive held in memory into `dest`.
///
/// Returns the paths of the extracted files in archive order. Entries whose
/// names would escape `dest` are skipped.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| HarvestError::Fetch(format!("Failed to open archive: {}", e)))?;

    fs::create_dir_all(dest).map_err(|source| HarvestError::Io {
        path: dest.to_path_buf(),
        source,
    })?;

    let mut extracted = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive
            .by_index(idx)
            .map_err(|e| HarvestError::Fetch(format!("Failed to read archive entry {}: {}", idx, e)))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|source| HarvestError::Io {
                path: target.clone(),
                source,
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| HarvestError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut out = File::create(&target).map_err(|source| HarvestError::Io {
            path: target.clone(),
            source,
        })?;
        let written = io::copy(&mut entry, &mut out).map_err(|source| HarvestError::Io {
            path: target.clone(),
            source,
        })?;

        debug!(bytes = written, "extracted {}", target.display());
        extracted.push(target);
    }

    info!(files = extracted.len(), dest = %dest.display(), "extracted archive");
    Ok(extracted)
}

/// Pick the CSV to load: the file named `preferred`, otherwise the only CSV.
pub fn select_csv<'a>(files: &'a [PathBuf], preferred: &str) -> Option<&'a Path> {
    let is_csv = |p: &&PathBuf| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
    };

    if let Some(named) = files
        .iter()
        .filter(is_csv)
        .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(preferred))
    {
        return Some(named);
    }

    let mut csvs = files.iter().filter(is_csv);
    match (csvs.next(), csvs.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            for (name, content) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_extract_archive_writes_files() {
        let dir = TempDir::new().unwrap();
        let bytes = archive(&[("data/a.csv", "x\n1\n"), ("README.md", "hi")]);

        let files = extract_archive(&bytes, dir.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("data/a.csv")).unwrap(), "x\n1\n");
    }

    #[test]
    fn test_extract_archive_skips_escaping_entries() {
        let dir = TempDir::new().unwrap();
        let bytes = archive(&[("../evil.csv", "x"), ("ok.csv", "y")]);

        let files = extract_archive(&bytes, dir.path()).unwrap();

        assert_eq!(files, vec![dir.path().join("ok.csv")]);
    }

    #[test]
    fn test_extract_archive_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let err = extract_archive(b"not a zip", dir.path()).unwrap_err();
        assert!(matches!(err, HarvestError::Fetch(_)));
    }

    #[test]
    fn test_select_csv() {
        let files = vec![
            PathBuf::from("x/readme.txt"),
            PathBuf::from("x/other.csv"),
            PathBuf::from("x/historical_emissions.csv"),
        ];
        assert_eq!(
            select_csv(&files, "historical_emissions.csv"),
            Some(Path::new("x/historical_emissions.csv"))
        );
        // two candidates and no name match
        assert_eq!(select_csv(&files, "missing.csv"), None);
        assert_eq!(
            select_csv(&files[..2], "missing.csv"),
            Some(Path::new("x/other.csv"))
        );
    }
}
