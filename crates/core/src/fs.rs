//! Filesystem helpers.

use crate::{Error, Result};
use std::path::Path;
use walkdir::WalkDir;

/// Total size in bytes of the regular files under `dir`.
///
/// Symlinks are not followed. A directory that does not exist measures 0.
///
/// # Errors
///
/// Returns an I/O error if part of the tree cannot be read.
pub fn directory_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(e.into(), path, "measure")
        })?;
        if entry.file_type().is_file() {
            let metadata = entry
                .metadata()
                .map_err(|e| Error::io(e.into(), entry.path(), "measure"))?;
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(total)
}
