//! Cache restore/save with failures degraded to misses.

use crate::Error;
use crate::fs::directory_size;
use crate::key::CacheKey;
use crate::reporter::Reporter;
use crate::repository::RepositoryRef;
use crate::store::CacheStore;
use std::path::Path;

/// Wraps a [`CacheStore`] so that store failures never abort a build.
///
/// A failed restore reads as a miss and a failed save as "not saved"; both
/// are reported, neither is returned as an error.
pub struct CacheGateway<'a> {
    store: &'a dyn CacheStore,
    reporter: &'a dyn Reporter,
}

impl<'a> CacheGateway<'a> {
    /// Create a gateway over `store`.
    #[must_use]
    pub fn new(store: &'a dyn CacheStore, reporter: &'a dyn Reporter) -> Self {
        Self { store, reporter }
    }

    /// Restore `install_dir` from the entry for `key`. Returns whether it hit.
    pub async fn restore(&self, repo: &RepositoryRef, install_dir: &Path, key: &CacheKey) -> bool {
        self.reporter.start_group(&format!("Restore {repo} Cache"));

        let hit = match self
            .store
            .restore(&[install_dir.to_path_buf()], &key.to_string())
            .await
        {
            Ok(matched) => matched.is_some(),
            Err(e) => {
                self.reporter
                    .error(&format!("Error restoring cache for {repo}: {e}"));
                false
            }
        };

        self.reporter.info(&format!("==> cacheHit: {hit}"));
        self.reporter.end_group();
        hit
    }

    /// Save `target_dir` under `key`. Returns whether the store accepted it.
    ///
    /// An empty directory is never offered to the store.
    pub async fn save(&self, repo: &RepositoryRef, target_dir: &Path, key: &CacheKey) -> bool {
        self.reporter.start_group(&format!("Save {repo} Cache"));
        let saved = self.try_save(repo, target_dir, key).await;
        self.reporter.end_group();
        saved
    }

    async fn try_save(&self, repo: &RepositoryRef, target_dir: &Path, key: &CacheKey) -> bool {
        let bytes = match directory_size(target_dir) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.reporter
                    .error(&format!("Error measuring {}: {e}", target_dir.display()));
                return false;
            }
        };

        if bytes == 0 {
            self.reporter.error(&format!(
                "{} for {repo}",
                Error::empty_content(target_dir)
            ));
            return false;
        }

        match self
            .store
            .save(&[target_dir.to_path_buf()], &key.to_string())
            .await
        {
            Ok(cache_id) => {
                tracing::debug!(cache_id, key = %key, "Saved cache entry");
                self.reporter.info("==> isSaved: true");
                true
            }
            Err(e) => {
                self.reporter
                    .error(&format!("Error saving cache for {repo}: {e}"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyInputs, derive_key};
    use crate::reporter::{NullReporter, RecordingReporter};
    use crate::testing::MemoryCacheStore;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn key() -> CacheKey {
        let deps = IndexMap::new();
        derive_key(
            &KeyInputs {
                schema_version: "1",
                tool_version: "3.25.1",
                primary_repo_name: "y",
                primary_sha: "abc123",
                dependencies: &deps,
                os: "linux",
                compiler: "gcc",
            },
            &NullReporter,
        )
    }

    fn repo() -> RepositoryRef {
        "x/y".parse().unwrap()
    }

    #[tokio::test]
    async fn restore_hit_and_miss() {
        let tmp = TempDir::new().unwrap();
        let key = key();

        let store = MemoryCacheStore::new().with_entry(key.to_string());
        let reporter = RecordingReporter::new();
        assert!(CacheGateway::new(&store, &reporter).restore(&repo(), tmp.path(), &key).await);
        assert!(reporter.info_lines().contains(&"==> cacheHit: true".to_string()));

        let empty = MemoryCacheStore::new();
        assert!(!CacheGateway::new(&empty, &NullReporter).restore(&repo(), tmp.path(), &key).await);
    }

    #[tokio::test]
    async fn restore_failure_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryCacheStore::failing();
        let reporter = RecordingReporter::new();

        let hit = CacheGateway::new(&store, &reporter)
            .restore(&repo(), tmp.path(), &key())
            .await;

        assert!(!hit);
        assert_eq!(reporter.error_lines().len(), 1);
        assert!(reporter.error_lines()[0].starts_with("Error restoring cache for x/y"));
    }

    #[tokio::test]
    async fn save_skips_empty_directory_without_calling_store() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("empty/sub")).unwrap();
        let store = MemoryCacheStore::new();
        let reporter = RecordingReporter::new();

        let saved = CacheGateway::new(&store, &reporter)
            .save(&repo(), &tmp.path().join("empty"), &key())
            .await;

        assert!(!saved);
        assert_eq!(store.save_calls(), 0);
        assert!(reporter.error_lines()[0].contains("Empty target dir"));
    }

    #[tokio::test]
    async fn save_stores_non_empty_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lib.a"), b"data").unwrap();
        let store = MemoryCacheStore::new();
        let key = key();

        let saved = CacheGateway::new(&store, &NullReporter)
            .save(&repo(), tmp.path(), &key)
            .await;

        assert!(saved);
        assert_eq!(store.save_calls(), 1);
        assert!(store.contains(&key.to_string()));
    }

    #[tokio::test]
    async fn save_failure_is_not_saved() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lib.a"), b"data").unwrap();
        let store = MemoryCacheStore::failing();
        let reporter = RecordingReporter::new();

        let saved = CacheGateway::new(&store, &reporter)
            .save(&repo(), tmp.path(), &key())
            .await;

        assert!(!saved);
        assert_eq!(store.save_calls(), 1);
        assert!(reporter.error_lines()[0].starts_with("Error saving cache for x/y"));
    }
}
