//! In-memory collaborators and archive builders for tests.
//!
//! Downstream crates use these to exercise resolution without a network or a
//! real cache backend.

use crate::repository::RepositoryRef;
use crate::service::{Artifact, CiService, WorkflowRun};
use crate::store::{CacheId, CacheStore};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Scripted [`CiService`].
///
/// A `None` answer makes the corresponding call fail with a remote error.
#[derive(Debug, Default)]
pub struct FakeCiService {
    head_sha: Option<String>,
    runs: Option<Vec<WorkflowRun>>,
    artifacts: Option<Vec<Artifact>>,
    payloads: HashMap<u64, Bytes>,
    calls: Mutex<Vec<String>>,
}

impl FakeCiService {
    /// Service that fails every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer ref lookups with `sha`.
    #[must_use]
    pub fn with_head_sha(mut self, sha: impl Into<String>) -> Self {
        self.head_sha = Some(sha.into());
        self
    }

    /// Answer run listings with `runs`.
    #[must_use]
    pub fn with_runs(mut self, runs: Vec<WorkflowRun>) -> Self {
        self.runs = Some(runs);
        self
    }

    /// Answer artifact listings with `artifacts`.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Serve `payload` for `artifact_id`.
    #[must_use]
    pub fn with_payload(mut self, artifact_id: u64, payload: impl Into<Bytes>) -> Self {
        self.payloads.insert(artifact_id, payload.into());
        self
    }

    /// Calls received so far, formatted as `method(args)`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl CiService for FakeCiService {
    async fn get_ref(&self, repo: &RepositoryRef, reference: &str) -> Result<String> {
        self.record(format!("get_ref({repo}, {reference})"));
        self.head_sha
            .clone()
            .ok_or_else(|| Error::remote("fetch repository HEAD", repo.to_string(), Some(404), "Not Found"))
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepositoryRef,
        workflow: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>> {
        self.record(format!("list_workflow_runs({repo}, {workflow}, {branch})"));
        self.runs.clone().ok_or_else(|| {
            Error::remote("fetch workflow runs", repo.to_string(), Some(500), "Server Error")
        })
    }

    async fn list_run_artifacts(&self, repo: &RepositoryRef, run_id: u64) -> Result<Vec<Artifact>> {
        self.record(format!("list_run_artifacts({repo}, {run_id})"));
        self.artifacts.clone().ok_or_else(|| {
            Error::remote(
                "fetch workflow run artifacts",
                repo.to_string(),
                Some(500),
                "Server Error",
            )
        })
    }

    async fn download_artifact(
        &self,
        repo: &RepositoryRef,
        artifact_id: u64,
        format: &str,
    ) -> Result<Bytes> {
        self.record(format!("download_artifact({repo}, {artifact_id}, {format})"));
        self.payloads.get(&artifact_id).cloned().ok_or_else(|| {
            Error::remote(
                "download workflow run artifact",
                repo.to_string(),
                Some(410),
                "Gone",
            )
        })
    }
}

/// [`CacheStore`] backed by a map of keys, recording every call.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Vec<PathBuf>>>,
    failing: bool,
    saves: Mutex<usize>,
}

impl MemoryCacheStore {
    /// Empty, working store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Pre-populate `key`.
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Vec::new());
        self
    }

    /// Whether `key` has been stored.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of `save` calls received, failed ones included.
    #[must_use]
    pub fn save_calls(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn restore(&self, _paths: &[PathBuf], key: &str) -> Result<Option<String>> {
        if self.failing {
            return Err(Error::cache_store("cache service unavailable"));
        }
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.contains_key(key).then(|| key.to_string()))
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> Result<CacheId> {
        let id = {
            let mut saves = self.saves.lock().unwrap_or_else(PoisonError::into_inner);
            *saves += 1;
            *saves
        };
        if self.failing {
            return Err(Error::cache_store("cache service unavailable"));
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), paths.to_vec());
        Ok(id as CacheId)
    }
}

/// Build an uncompressed tar holding `files` (`path`, `contents`).
///
/// # Errors
///
/// Fails only if writing into the in-memory buffer fails.
pub fn build_tar(files: &[(&str, &[u8])]) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents)?;
    }
    builder.into_inner()
}

/// Build a zip shaped like a CI artifact: an optional directory entry plus
/// `<artifact_name>.tar` holding `tar_bytes`.
///
/// # Errors
///
/// Fails only if writing into the in-memory buffer fails.
pub fn build_artifact_zip(
    artifact_name: &str,
    tar_bytes: &[u8],
    directory: Option<&str>,
) -> std::io::Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    if let Some(dir) = directory {
        writer
            .add_directory(dir, options)
            .map_err(std::io::Error::other)?;
    }
    writer
        .start_file(format!("{artifact_name}.tar"), options)
        .map_err(std::io::Error::other)?;
    writer.write_all(tar_bytes)?;

    let cursor = writer.finish().map_err(std::io::Error::other)?;
    Ok(cursor.into_inner())
}
