//! Path utilities for test data and on-disk catalogs.

use mosaic_common::GridCoord;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// This is determined by walking up from the current crate's manifest directory.
pub fn workspace_root() -> PathBuf {
    // Start from the test-utils crate manifest dir
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns the path to the service testdata directory.
///
/// The path is `services/{service_name}/testdata/`.
pub fn service_testdata_dir(service_name: &str) -> PathBuf {
    workspace_root()
        .join("services")
        .join(service_name)
        .join("testdata")
}

/// Creates a temporary directory for a test catalog.
///
/// The directory is deleted when the returned `TempDir` is dropped.
pub fn temp_catalog_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("mosaic-catalog-")
        .tempdir()
        .expect("Failed to create temp directory")
}

/// Write cell records in the directory-source layout
/// `<root>/<sensor>/<col>_<row>.txt`.
pub fn write_catalog(root: &Path, sensor: &str, records: &[(GridCoord, String)]) {
    let dir = root.join(sensor);
    fs::create_dir_all(&dir).expect("Failed to create sensor directory");
    for (coord, text) in records {
        fs::write(dir.join(format!("{}_{}.txt", coord.col, coord.row)), text)
            .expect("Failed to write cell record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn test_write_catalog_layout() {
        let dir = temp_catalog_dir();
        write_catalog(dir.path(), "s", &[(GridCoord::new(1, 2), "x".to_string())]);
        assert!(dir.path().join("s").join("1_2.txt").exists());
    }
}
