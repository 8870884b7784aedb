//! `ciartifact.toml` configuration.
//!
//! ```toml
//! os = "ubuntu-22.04"
//! compiler = "gnu-12"
//!
//! [environment]
//! cmake_version = "3.25.1"
//!
//! [environment.dependencies]
//! "ecmwf/ecbuild" = "4f1c5a..."
//! "ecmwf/eckit" = "9b02e7..."
//!
//! [github]
//! api_url = "https://api.github.com"
//! workflow = "ci.yml"
//!
//! [cache]
//! dir = "/var/cache/ciartifact"
//! ```
//!
//! Dependencies keep their file order; it feeds the cache key.

use crate::cli::Cli;
use ciartifact_cache::LocalCacheStore;
use ciartifact_core::{CI_WORKFLOW, Environment, Error, Platform, Result};
use ciartifact_github::DEFAULT_API_URL;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub os: String,
    pub compiler: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_workflow")]
    pub workflow: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            workflow: default_workflow(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    pub dir: Option<PathBuf>,
}

fn default_schema_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_workflow() -> String {
    CI_WORKFLOW.to_string()
}

impl Config {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        Self::from_toml(&contents).map_err(|e| {
            Error::configuration(format!("Invalid configuration in {}: {e}", path.display()))
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply command-line overrides on top of file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(os) = &cli.os {
            self.os.clone_from(os);
        }
        if let Some(compiler) = &cli.compiler {
            self.compiler.clone_from(compiler);
        }
        if let Some(api_url) = &cli.api_url {
            self.github.api_url.clone_from(api_url);
        }
        if let Some(workflow) = &cli.workflow {
            self.github.workflow.clone_from(workflow);
        }
        if let Some(dir) = &cli.cache_dir {
            self.cache.dir = Some(dir.clone());
        }
    }

    /// Runner platform artifacts are selected for.
    pub fn platform(&self) -> Platform {
        Platform::new(&self.os, &self.compiler)
    }

    /// Cache root: the configured directory, else the platform cache dir.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        self.cache
            .dir
            .clone()
            .or_else(LocalCacheStore::default_root)
            .ok_or_else(|| {
                Error::configuration(
                    "No cache directory configured and no platform cache directory available",
                )
            })
    }

    /// Reject settings that would make every lookup fail.
    pub fn validate(&self) -> Result<()> {
        if self.os.trim().is_empty() {
            return Err(Error::configuration("`os` must not be empty"));
        }
        if self.compiler.trim().is_empty() {
            return Err(Error::configuration("`compiler` must not be empty"));
        }
        if self.environment.cmake_version.trim().is_empty() {
            return Err(Error::configuration(
                "`environment.cmake_version` must be set",
            ));
        }
        if self.github.workflow.trim().is_empty() {
            return Err(Error::configuration("`github.workflow` must not be empty"));
        }
        Ok(())
    }
}
