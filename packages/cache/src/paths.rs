#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for data and report artifacts.
//!
//! Relative paths in a run configuration are resolved against the project
//! root so the tools behave the same from any working directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// current directory if the manifest is not nested as expected.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `reports/` directory for rendered maps.
#[must_use]
pub fn reports_dir() -> PathBuf {
    project_root().join("reports")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Writes `contents` to `path` through a sibling `.tmp` file and a rename,
/// so an interrupted write never replaces a previously valid file.
///
/// # Errors
///
/// Returns an I/O error if the parent directory, temp file, or rename
/// fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, contents)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_tmp() {
        let dir = std::env::temp_dir().join("incident_map_paths_test_atomic");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("out.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.join("nested").join("out.txt.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reports_dir_is_under_root() {
        assert!(reports_dir().starts_with(project_root()));
        assert!(data_dir().starts_with(project_root()));
    }
}
