//! Artifact extraction.
//!
//! CI artifacts are zip files wrapping a single tar named after the
//! artifact. The zip preserves nothing but the tar, and the tar preserves
//! file modes and layout of the install tree. Extraction is therefore exactly
//! two stages: unzip `<name>.zip` into the extraction directory, then untar
//! `<extract_dir>/<name>.tar` into the install directory and delete it.
//! Deeper nesting is not supported.

use crate::reporter::Reporter;
use crate::{Error, Result};
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Unpack an artifact payload into `install_dir`.
///
/// `extract_dir` keeps every other entry of the outer zip; only the inner
/// tar is removed. On failure `install_dir` may hold a partial tree and must
/// not be trusted.
///
/// # Errors
///
/// Returns `Extraction` if the zip is corrupt, the inner tar is missing or
/// unreadable, or any filesystem operation fails.
pub fn extract(
    zip_bytes: &[u8],
    artifact_name: &str,
    extract_dir: &Path,
    install_dir: &Path,
    reporter: &dyn Reporter,
) -> Result<()> {
    let result = unzip_outer(zip_bytes, extract_dir, reporter).and_then(|()| {
        let tar_path = extract_dir.join(format!("{artifact_name}.tar"));
        untar_inner(&tar_path, install_dir, reporter)?;
        fs::remove_file(&tar_path)
            .map_err(|e| Error::extraction_io("failed to remove inner archive", &tar_path, e))
    });

    if let Err(e) = &result {
        reporter.error(&e.to_string());
    }
    result
}

fn unzip_outer(zip_bytes: &[u8], extract_dir: &Path, reporter: &dyn Reporter) -> Result<()> {
    fs::create_dir_all(extract_dir)
        .map_err(|e| Error::extraction_io("failed to create extraction directory", extract_dir, e))?;

    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))
        .map_err(|e| Error::extraction(format!("failed to open artifact zip: {e}"), None))?;

    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| Error::extraction(format!("failed to read zip entry: {e}"), None))?;
        let action = if entry.is_dir() { "creating" } else { "inflating" };
        reporter.info(&format!(
            "  {action}: {}/{}",
            extract_dir.display(),
            entry.name()
        ));
    }

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::extraction(format!("failed to read zip entry: {e}"), None))?;

        let Some(relative) = entry.enclosed_name() else {
            debug!(name = entry.name(), "Skipping zip entry outside extraction directory");
            continue;
        };
        let outpath = extract_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)
                .map_err(|e| Error::extraction_io("failed to create directory", &outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::extraction_io("failed to create directory", parent, e))?;
        }
        let mut out = create_overwriting(&outpath)
            .map_err(|e| Error::extraction_io("failed to create file", &outpath, e))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| Error::extraction_io("failed to inflate file", &outpath, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                    .map_err(|e| Error::extraction_io("failed to set permissions", &outpath, e))?;
            }
        }
    }

    reporter.info(&format!(
        "==> Extracted artifact ZIP archive to {}",
        extract_dir.display()
    ));
    Ok(())
}

/// Create `path` for writing, replacing an existing file even when an
/// earlier extraction left it read-only.
fn create_overwriting(path: &Path) -> io::Result<fs::File> {
    match fs::File::create(path) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied && path.is_file() => {
            debug!(path = %path.display(), "Replacing read-only file");
            fs::remove_file(path)?;
            fs::File::create(path)
        }
        result => result,
    }
}

fn untar_inner(tar_path: &Path, install_dir: &Path, reporter: &dyn Reporter) -> Result<()> {
    if !tar_path.is_file() {
        return Err(Error::extraction(
            "inner archive not found in artifact",
            Some(tar_path),
        ));
    }

    fs::create_dir_all(install_dir)
        .map_err(|e| Error::extraction_io("failed to create install directory", install_dir, e))?;

    let file = fs::File::open(tar_path)
        .map_err(|e| Error::extraction_io("failed to open inner archive", tar_path, e))?;
    tar::Archive::new(file)
        .unpack(install_dir)
        .map_err(|e| Error::extraction_io("Error extracting artifact TAR", tar_path, e))?;

    reporter.info(&format!(
        "==> Extracted artifact TAR to {}",
        install_dir.display()
    ));
    Ok(())
}
