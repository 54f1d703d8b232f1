//! File utility functions.

use crate::error::{Result, WraeclastError};
use std::path::Path;
use walkdir::WalkDir;

/// Recursively find files with given extension in a directory, in
/// stable path order.
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<std::path::PathBuf>> {
    if !dir.exists() {
        return Err(WraeclastError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory not found: {}", dir.display()),
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            if let Some(ext) = entry.path().extension() {
                if ext == extension {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_only_matching_extension_recursively() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x").unwrap();
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.csv"), "x").unwrap();

        let found = find_files_with_extension(dir.path(), "csv").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().unwrap() == "csv"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(find_files_with_extension(&missing, "csv").is_err());
    }
}
