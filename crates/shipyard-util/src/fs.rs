//! Filesystem utilities for Shipyard.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// List the regular files directly inside `dir`, sorted by path.
///
/// Subdirectories are not descended into; artifact directories are flat.
///
/// # Errors
/// Returns an error if `dir` cannot be read.
pub fn list_regular_files(dir: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| UtilError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// List the directories directly inside `dir`, sorted by path.
///
/// Returns an empty list when `dir` itself does not exist.
///
/// # Errors
/// Returns an error if `dir` exists but cannot be read.
pub fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(UtilError::Io {
                path: dir.display().to_string(),
                source,
            })
        }
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Delete every file inside `dir` matching the glob `pattern` (relative to
/// `dir`). Returns the number of files removed.
///
/// # Errors
/// Returns an error if the pattern is invalid or a matched file cannot be
/// removed.
pub fn remove_matching(dir: &Path, pattern: &str) -> Result<usize, UtilError> {
    let full_pattern = dir.join(pattern).display().to_string();
    let matches = glob::glob(&full_pattern).map_err(|e| UtilError::GlobPattern {
        pattern: full_pattern.clone(),
        message: e.to_string(),
    })?;

    let mut removed = 0usize;
    for path in matches.filter_map(Result::ok) {
        if path.is_file() {
            std::fs::remove_file(&path).map_err(|source| UtilError::Io {
                path: path.display().to_string(),
                source,
            })?;
            removed = removed.saturating_add(1);
        }
    }
    Ok(removed)
}
