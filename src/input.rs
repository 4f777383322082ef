//! Reading import files from disk.
//!
//! Checks that a path looks like an importable text list before its
//! contents reach the parser.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::normalize::strip_bom;

/// Largest import file accepted.
pub const MAX_IMPORT_BYTES: u64 = 5 * 1024 * 1024;

/// Extensions accepted for import files.
pub const IMPORT_EXTENSIONS: [&str; 3] = ["txt", "csv", "tsv"];

/// Contents of an import file plus a playlist name derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    pub text: String,
    pub suggested_name: String, // File stem
}

/// Validates that `path` is an import file we are willing to read.
///
/// Checks:
/// - Extension is one of `txt`, `csv`, `tsv` (case-insensitive)
/// - Size does not exceed [`MAX_IMPORT_BYTES`]
pub fn validate_import_path(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !IMPORT_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "Unsupported import file '{}': expected one of {}",
            path.display(),
            IMPORT_EXTENSIONS.join(", ")
        );
    }

    let meta = fs::metadata(path).with_context(|| format!("Cannot read {}", path.display()))?;
    if !meta.is_file() {
        bail!("'{}' is not a file", path.display());
    }
    if meta.len() > MAX_IMPORT_BYTES {
        bail!(
            "Import file '{}' is {} bytes; the limit is {} bytes",
            path.display(),
            meta.len(),
            MAX_IMPORT_BYTES
        );
    }
    Ok(())
}

/// Read and decode an import file.
pub fn read_import_file(path: &Path) -> Result<ImportSource> {
    validate_import_path(path)?;
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("Import file '{}' is not valid UTF-8", path.display()))?;

    let suggested_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Ok(ImportSource {
        text: strip_bom(&text).to_string(),
        suggested_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Road Trip.csv");
        fs::write(&path, "\u{feff}Artist,Title\nM83,Midnight City\n").unwrap();

        let source = read_import_file(&path).unwrap();
        assert_eq!(source.suggested_name, "Road Trip");
        assert!(source.text.starts_with("Artist,Title"));
    }

    #[test]
    fn test_extension_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mix.TXT");
        fs::write(&path, "M83 - Wait").unwrap();
        assert_eq!(read_import_file(&path).unwrap().text, "M83 - Wait");
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.sqlite3");
        fs::write(&path, "x").unwrap();
        let err = read_import_file(&path).unwrap_err().to_string();
        assert!(err.contains("Unsupported import file"));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.txt");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_IMPORT_BYTES + 1).unwrap();
        let err = read_import_file(&path).unwrap_err().to_string();
        assert!(err.contains("limit"));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [0x42, 0x65, 0x79, 0x6f, 0x6e, 0x63, 0xe9]).unwrap();
        assert!(read_import_file(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_import_file(&dir.path().join("nope.csv")).is_err());
    }
}
