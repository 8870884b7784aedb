//! One `tar.zst` bundle per key under a root directory.

use crate::{Error, Result};
use async_trait::async_trait;
use ciartifact_core::{CacheId, CacheStore};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const BUNDLE_EXTENSION: &str = "tar.zst";

/// Filesystem-backed [`CacheStore`].
///
/// Each saved path is stored under its position in the `paths` list, so an
/// entry must be restored with the same number of paths it was saved with.
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    root: PathBuf,
}

impl LocalCacheStore {
    /// Store rooted at `root`. The directory is created on first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform cache directory for ciartifact, if one can be determined.
    #[must_use]
    pub fn default_root() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("ciartifact"))
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bundle file for `key`.
    #[must_use]
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{BUNDLE_EXTENSION}", sanitize_key(key)))
    }

    /// Unpack the bundle for `key` onto `paths`.
    ///
    /// Returns the key on a hit and `None` when no bundle exists.
    pub fn restore_blocking(&self, paths: &[PathBuf], key: &str) -> Result<Option<String>> {
        let src = self.entry_path(key);
        let file = match fs::File::open(&src) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key, "Cache miss");
                return Ok(None);
            }
            Err(e) => return Err(Error::io(e, &src, "open")),
        };

        let decoder = zstd::Decoder::new(file).map_err(|e| Error::io(e, &src, "decompress"))?;
        let mut archive = tar::Archive::new(decoder);
        let entries = archive.entries().map_err(|e| Error::io(e, &src, "read"))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| Error::io(e, &src, "read"))?;
            let entry_path = entry
                .path()
                .map_err(|e| Error::io(e, &src, "read"))?
                .into_owned();
            let (index, relative) = split_entry_path(&entry_path)
                .ok_or_else(|| Error::corrupt(key, format!("unexpected entry {}", entry_path.display())))?;
            let target_root = paths.get(index).ok_or_else(|| {
                Error::corrupt(
                    key,
                    format!("entry for path #{index} but only {} paths given", paths.len()),
                )
            })?;
            let dest = target_root.join(relative);

            if entry.header().entry_type().is_dir() {
                fs::create_dir_all(&dest).map_err(|e| Error::io(e, &dest, "create"))?;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create"))?;
            }
            entry
                .unpack(&dest)
                .map_err(|e| Error::io(e, &dest, "write"))?;
        }

        debug!(key, "Cache hit");
        Ok(Some(key.to_string()))
    }

    /// Archive `paths` as the bundle for `key`, replacing any existing one.
    pub fn save_blocking(&self, paths: &[PathBuf], key: &str) -> Result<CacheId> {
        fs::create_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "create"))?;

        let dst = self.entry_path(key);
        let tmp = dst.with_extension(format!("tmp-{}", std::process::id()));

        if let Err(e) = write_bundle(paths, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &dst).map_err(|e| Error::io(e, &dst, "rename"))?;

        let id = cache_id(key);
        debug!(key, id, bundle = %dst.display(), "Saved cache bundle");
        Ok(id)
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &str,
    ) -> ciartifact_core::Result<Option<String>> {
        let store = self.clone();
        let paths = paths.to_vec();
        let key = key.to_string();
        let matched = tokio::task::spawn_blocking(move || store.restore_blocking(&paths, &key))
            .await
            .map_err(|e| Error::Task {
                message: e.to_string(),
            })??;
        Ok(matched)
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> ciartifact_core::Result<CacheId> {
        let store = self.clone();
        let paths = paths.to_vec();
        let key = key.to_string();
        let id = tokio::task::spawn_blocking(move || store.save_blocking(&paths, &key))
            .await
            .map_err(|e| Error::Task {
                message: e.to_string(),
            })??;
        Ok(id)
    }
}

fn write_bundle(paths: &[PathBuf], dst: &Path) -> Result<()> {
    let file = fs::File::create(dst).map_err(|e| Error::io(e, dst, "create"))?;
    let encoder = zstd::Encoder::new(file, 3).map_err(|e| Error::io(e, dst, "compress"))?;
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    for (index, path) in paths.iter().enumerate() {
        builder
            .append_dir_all(index.to_string(), path)
            .map_err(|e| Error::io(e, path, "archive"))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::io(e, dst, "write"))?;
    encoder.finish().map_err(|e| Error::io(e, dst, "write"))?;
    Ok(())
}

/// Split `<index>/<relative>` into its parts, rejecting anything that could
/// escape the target directory.
fn split_entry_path(path: &Path) -> Option<(usize, PathBuf)> {
    let mut components = path.components().filter(|c| *c != Component::CurDir);
    let index = match components.next()? {
        Component::Normal(first) => first.to_str()?.parse().ok()?,
        _ => return None,
    };

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => return None,
        }
    }
    Some((index, relative))
}

/// Keys become file names; anything outside `[A-Za-z0-9._-]` is replaced.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn cache_id(key: &str) -> CacheId {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    CacheId::from_be_bytes(bytes)
}
