//! Filesystem path helpers used by the pipeline and sync layers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use globset::{GlobBuilder, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::LoomError;

/// Recursively walk `source_folder` and return the path of every file whose
/// basename matches any of the shell-style glob patterns in `accept`
/// (case-insensitive).
///
/// A missing or non-directory `source_folder` yields an empty list, matching
/// the "no files available" interpretation used by the stage no-op checks.
/// Results come back in directory-walk order; callers must not rely on any
/// particular ordering.
pub fn scan(source_folder: &Path, accept: &[&str]) -> Result<Vec<PathBuf>, LoomError> {
    if !source_folder.is_dir() {
        return Ok(Vec::new());
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in accept {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| LoomError::Pattern {
                pattern: (*pattern).to_string(),
                source,
            })?;
        builder.add(glob);
    }
    let accept_set = builder.build().map_err(|source| LoomError::Pattern {
        pattern: accept.join(", "),
        source,
    })?;

    let mut subpaths = Vec::new();
    for entry in WalkDir::new(source_folder) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if accept_set.is_match(Path::new(entry.file_name())) {
            subpaths.push(entry.into_path());
        }
    }
    Ok(subpaths)
}

/// Split `path_str` at the first path segment exactly equal to `marker`.
///
/// Returns the prefix (inclusive of the marker segment) and the remainder,
/// both joined with the platform separator. Errors if no segment equals
/// `marker`.
pub fn split_after(path_str: &str, marker: &str) -> Result<(String, String), LoomError> {
    let sep = MAIN_SEPARATOR.to_string();
    let segments: Vec<&str> = path_str.split(MAIN_SEPARATOR).collect();
    let idx = segments
        .iter()
        .position(|segment| *segment == marker)
        .ok_or_else(|| LoomError::MarkerNotFound {
            marker: marker.to_string(),
            path: path_str.to_string(),
        })?;
    let before = segments[..=idx].join(&sep);
    let after = segments[idx + 1..].join(&sep);
    Ok((before, after))
}

/// Create every missing parent directory of `path`. Idempotent; the file
/// itself is never created or touched.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
