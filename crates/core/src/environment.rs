//! Build parameters shared between resolution steps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Named build parameters plus the resolved dependency commits.
///
/// `dependencies` maps `owner/name` to a commit sha. Its iteration order is
/// the insertion order and feeds directly into cache-key material, so it
/// must be built in a stable order by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    /// Version of the build tool (CMake) the artifacts were produced with
    #[serde(default)]
    pub cmake_version: String,

    /// Resolved dependency commits, keyed by `owner/name`
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,

    /// Install directories recorded after a successful restore or download.
    /// Only the resolver fills this in; it is never read from input.
    #[serde(skip_deserializing, skip_serializing_if = "IndexMap::is_empty")]
    pub install_paths: IndexMap<String, PathBuf>,
}

impl Environment {
    /// Environment with a tool version and no dependencies.
    #[must_use]
    pub fn new(cmake_version: impl Into<String>) -> Self {
        Self {
            cmake_version: cmake_version.into(),
            ..Self::default()
        }
    }

    /// Append a dependency commit, keeping insertion order.
    #[must_use]
    pub fn with_dependency(mut self, repository: impl Into<String>, sha: impl Into<String>) -> Self {
        self.dependencies.insert(repository.into(), sha.into());
        self
    }

    /// Record where a package was installed.
    pub fn record_install_path(&mut self, repo_name: &str, install_dir: &Path) {
        self.install_paths
            .insert(repo_name.to_string(), install_dir.to_path_buf());
    }
}
