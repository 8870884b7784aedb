//! End-to-end artifact resolution.
//!
//! [`ArtifactResolver`] strings the individual steps together:
//!
//! 1. derive the cache key and try the cache,
//! 2. on a miss, find the run that built the current head, pick its
//!    artifact, download and extract it,
//! 3. optionally offer the installed tree back to the cache.
//!
//! Every step is awaited before the next begins. Each call owns the
//! download and install directories it is given; concurrent resolutions
//! must use disjoint directories.

use crate::artifact::{fetch_artifact, select_artifact};
use crate::environment::Environment;
use crate::extract::extract;
use crate::gateway::CacheGateway;
use crate::head::{normalize_branch, resolve_head_sha};
use crate::key::{CacheKey, KeyInputs, derive_key};
use crate::reporter::Reporter;
use crate::repository::RepositoryRef;
use crate::run::select_run;
use crate::service::{CI_WORKFLOW, CiService};
use crate::store::CacheStore;
use crate::Result;
use std::path::Path;

/// Runner platform an artifact is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system label, e.g. `ubuntu-22.04`
    pub os: String,
    /// Compiler family label, e.g. `gnu-12`
    pub compiler: String,
}

impl Platform {
    /// Create a platform description.
    #[must_use]
    pub fn new(os: impl Into<String>, compiler: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            compiler: compiler.into(),
        }
    }
}

/// Outcome of [`ArtifactResolver::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The cache already held the package
    CacheHit,
    /// The package was downloaded from CI
    Downloaded {
        /// Whether the installed tree was saved to the cache afterwards
        saved: bool,
    },
}

/// Resolves prebuilt packages from the cache or from CI artifacts.
pub struct ArtifactResolver<'a> {
    service: &'a dyn CiService,
    store: &'a dyn CacheStore,
    reporter: &'a dyn Reporter,
    platform: Platform,
    schema_version: String,
    workflow: String,
}

impl<'a> ArtifactResolver<'a> {
    /// Create a resolver using the default workflow and this crate's version
    /// as the key schema version.
    #[must_use]
    pub fn new(
        service: &'a dyn CiService,
        store: &'a dyn CacheStore,
        reporter: &'a dyn Reporter,
        platform: Platform,
    ) -> Self {
        Self {
            service,
            store,
            reporter,
            platform,
            schema_version: env!("CARGO_PKG_VERSION").to_string(),
            workflow: CI_WORKFLOW.to_string(),
        }
    }

    /// Override the schema version mixed into every key.
    #[must_use]
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    /// Override the workflow whose runs publish artifacts.
    #[must_use]
    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = workflow.into();
        self
    }

    /// Derive the cache key for `repo` at the head of `branch`.
    ///
    /// # Errors
    ///
    /// Fails if the head commit cannot be resolved.
    pub async fn cache_key(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        env: &Environment,
    ) -> Result<CacheKey> {
        self.reporter.start_group(&format!("Cache Key for {repo}"));
        let key = self.cache_key_inner(repo, branch, env).await;
        self.reporter.end_group();
        key
    }

    async fn cache_key_inner(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        env: &Environment,
    ) -> Result<CacheKey> {
        self.reporter.info(&format!("==> Repository: {repo}"));
        self.reporter.info(&format!("==> Branch: {branch}"));

        let sha = resolve_head_sha(self.service, repo, branch, self.reporter).await?;
        self.reporter.info(&format!("==> sha: {sha}"));

        Ok(derive_key(
            &KeyInputs {
                schema_version: &self.schema_version,
                tool_version: &env.cmake_version,
                primary_repo_name: repo.name(),
                primary_sha: &sha,
                dependencies: &env.dependencies,
                os: &self.platform.os,
                compiler: &self.platform.compiler,
            },
            self.reporter,
        ))
    }

    /// Restore `repo` into `install_dir` from the cache.
    ///
    /// On a hit the install path is recorded in `env`. Cache store failures
    /// count as a miss.
    ///
    /// # Errors
    ///
    /// Fails only if the cache key cannot be derived.
    pub async fn restore_cache(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        install_dir: &Path,
        env: &mut Environment,
    ) -> Result<bool> {
        let key = self.cache_key(repo, branch, env).await?;
        let hit = CacheGateway::new(self.store, self.reporter)
            .restore(repo, install_dir, &key)
            .await;
        if hit {
            env.record_install_path(repo.name(), install_dir);
        }
        Ok(hit)
    }

    /// Save `target_dir` to the cache under the key for `repo`.
    ///
    /// Empty directories and cache store failures yield `false`.
    ///
    /// # Errors
    ///
    /// Fails only if the cache key cannot be derived.
    pub async fn save_cache(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        target_dir: &Path,
        env: &Environment,
    ) -> Result<bool> {
        let key = self.cache_key(repo, branch, env).await?;
        Ok(CacheGateway::new(self.store, self.reporter)
            .save(repo, target_dir, &key)
            .await)
    }

    /// Download the artifact built from the head of `branch` and install it.
    ///
    /// The outer zip is unpacked into `<download_dir>/<artifact name>`, the
    /// inner tar into `install_dir`. On success the install path is recorded
    /// in `env`.
    ///
    /// # Errors
    ///
    /// Fails if any step fails: head lookup, run or artifact selection,
    /// download, or extraction.
    pub async fn download_artifact(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        download_dir: &Path,
        install_dir: &Path,
        env: &mut Environment,
    ) -> Result<()> {
        self.reporter
            .start_group(&format!("Download {repo} Artifact"));
        let result = self
            .download_artifact_inner(repo, branch, download_dir, install_dir, env)
            .await;
        self.reporter.end_group();

        if result.is_ok() {
            env.record_install_path(repo.name(), install_dir);
        }
        result
    }

    async fn download_artifact_inner(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        download_dir: &Path,
        install_dir: &Path,
        env: &Environment,
    ) -> Result<()> {
        let branch = normalize_branch(branch);
        self.reporter.info(&format!("==> Workflow: {}", self.workflow));
        self.reporter.info(&format!("==> Repository: {repo}"));
        self.reporter.info(&format!("==> Branch: {branch}"));

        let head_sha = resolve_head_sha(self.service, repo, branch, self.reporter).await?;
        self.reporter.info(&format!("==> headSha: {head_sha}"));

        let run = select_run(
            self.service,
            repo,
            &self.workflow,
            branch,
            &head_sha,
            self.reporter,
        )
        .await?;

        let artifact = select_artifact(
            self.service,
            repo,
            run.id,
            &self.platform.os,
            &self.platform.compiler,
            &env.cmake_version,
            self.reporter,
        )
        .await?;

        let payload = fetch_artifact(self.service, repo, &artifact, self.reporter).await?;

        let extract_dir = download_dir.join(&artifact.name);
        extract(
            &payload,
            &artifact.name,
            &extract_dir,
            install_dir,
            self.reporter,
        )
    }

    /// Make `repo` available in `install_dir`, from the cache if possible.
    ///
    /// On a miss the artifact is downloaded, and when `save_after_download`
    /// is set the installed tree is offered back to the cache.
    ///
    /// # Errors
    ///
    /// Fails if the cache key cannot be derived or the download fails.
    /// Cache store failures never fail the resolution.
    pub async fn resolve(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        download_dir: &Path,
        install_dir: &Path,
        save_after_download: bool,
        env: &mut Environment,
    ) -> Result<Resolution> {
        if self.restore_cache(repo, branch, install_dir, env).await? {
            return Ok(Resolution::CacheHit);
        }

        self.download_artifact(repo, branch, download_dir, install_dir, env)
            .await?;

        let saved = if save_after_download {
            self.save_cache(repo, branch, install_dir, env).await?
        } else {
            false
        };

        Ok(Resolution::Downloaded { saved })
    }
}
