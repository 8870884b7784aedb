//! The cache store seam.

use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Identifier a store assigns to a saved entry.
pub type CacheId = u64;

/// Key-addressed storage for installed directory trees.
///
/// Keys are opaque; the store never inspects the content to address it.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Restore the entry for `key` onto `paths`, returning the matched key
    /// or `None` on a miss.
    async fn restore(&self, paths: &[PathBuf], key: &str) -> Result<Option<String>>;

    /// Save `paths` under `key`.
    async fn save(&self, paths: &[PathBuf], key: &str) -> Result<CacheId>;
}
