//! Prebuilt CI artifact resolution for ciartifact
//!
//! This crate decides which prebuilt package a downstream build should use
//! and installs it:
//! - Deterministic cache keys from the package's head commit and the commits
//!   of its dependencies
//! - Selection of the workflow run that built the current head and of the
//!   artifact matching the runner platform
//! - Two-stage (zip, then tar) extraction into an install directory
//! - A cache gateway that degrades cache failures to misses
//!
//! The CI host and the cache backend are reached through the [`CiService`]
//! and [`CacheStore`] traits; progress is narrated through a [`Reporter`].
//!
//! # Example
//!
//! ```no_run
//! # async fn demo(
//! #     service: &dyn ciartifact_core::CiService,
//! #     store: &dyn ciartifact_core::CacheStore,
//! # ) -> ciartifact_core::Result<()> {
//! use ciartifact_core::{ArtifactResolver, Environment, Platform, TracingReporter};
//! use std::path::Path;
//!
//! let reporter = TracingReporter::new();
//! let resolver = ArtifactResolver::new(service, store, &reporter, Platform::new("linux", "gcc"));
//! let mut env = Environment::new("3.25.1").with_dependency("ecmwf/ecbuild", "0123abcd");
//! let repo = "ecmwf/eckit".parse()?;
//! resolver
//!     .resolve(&repo, "develop", Path::new("download"), Path::new("install/eckit"), true, &mut env)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod error;

pub mod artifact;
pub mod environment;
pub mod extract;
pub mod fs;
pub mod gateway;
pub mod head;
pub mod key;
pub mod reporter;
pub mod repository;
pub mod resolver;
pub mod run;
pub mod service;
pub mod store;
pub mod testing;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use artifact::{EXEMPT_REPOSITORY, expected_artifact_name, fetch_artifact, select_artifact};
pub use environment::Environment;
pub use extract::extract;
pub use gateway::CacheGateway;
pub use head::{normalize_branch, resolve_head_sha};
pub use key::{CacheKey, KeyInputs, derive_key, key_material};
pub use reporter::{NullReporter, RecordingReporter, ReportEvent, Reporter, TracingReporter};
pub use repository::RepositoryRef;
pub use resolver::{ArtifactResolver, Platform, Resolution};
pub use run::select_run;
pub use service::{ARCHIVE_FORMAT, Artifact, CI_WORKFLOW, CiService, WorkflowRun};
pub use store::{CacheId, CacheStore};
