//! Cache key derivation.
//!
//! A key identifies one build of one package: the schema version of this
//! tool, the CMake version, the package's own head commit and the commits of
//! every dependency it was built against. The material string looks like
//!
//! ```text
//! v=<schema>::cmake=<tool>::<repo>=<sha>::<dep>=<sha>::...
//! ```
//!
//! Dependency terms are appended in the iteration order of the dependency
//! map, which is its insertion order. The material is hashed with SHA-1 and
//! the final key is `<os>-<compiler>-<repo>-<hex digest>`.

use crate::reporter::Reporter;
use crate::repository::short_name;
use indexmap::IndexMap;
use sha1::{Digest, Sha1};
use std::fmt;

/// Everything that goes into a cache key.
#[derive(Debug, Clone, Copy)]
pub struct KeyInputs<'a> {
    /// Version of this tool's cache layout
    pub schema_version: &'a str,
    /// Build tool (CMake) version
    pub tool_version: &'a str,
    /// Short name of the package being keyed
    pub primary_repo_name: &'a str,
    /// Head commit of the package
    pub primary_sha: &'a str,
    /// Dependency commits keyed by `owner/name`, in insertion order
    pub dependencies: &'a IndexMap<String, String>,
    /// Runner operating system
    pub os: &'a str,
    /// Compiler family
    pub compiler: &'a str,
}

/// A derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    os: String,
    compiler: String,
    repo_name: String,
    digest: String,
}

impl CacheKey {
    /// Hex digest of the key material.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Short name of the keyed repository.
    #[must_use]
    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.os, self.compiler, self.repo_name, self.digest
        )
    }
}

/// Build the key material string.
///
/// A dependency whose short name equals the primary repository is skipped so
/// the package never contributes its own commit twice.
#[must_use]
pub fn key_material(inputs: &KeyInputs<'_>) -> String {
    let mut material = format!(
        "v={}::cmake={}::{}={}",
        inputs.schema_version, inputs.tool_version, inputs.primary_repo_name, inputs.primary_sha
    );

    for (dependency, dependency_sha) in inputs.dependencies {
        let dependency_repo = short_name(dependency);
        if dependency_repo == inputs.primary_repo_name {
            continue;
        }
        material.push_str("::");
        material.push_str(dependency_repo);
        material.push('=');
        material.push_str(dependency_sha);
    }

    material
}

/// Lowercase hex SHA-1 of `material`.
#[must_use]
pub fn material_digest(material: &str) -> String {
    hex::encode(Sha1::digest(material.as_bytes()))
}

/// Derive the cache key for `inputs`, narrating each step to `reporter`.
pub fn derive_key(inputs: &KeyInputs<'_>, reporter: &dyn Reporter) -> CacheKey {
    let material = key_material(inputs);
    reporter.info(&format!("==> cacheKeyStr: {material}"));

    let digest = material_digest(&material);
    reporter.info(&format!("==> cacheKeySha: {digest}"));

    let key = CacheKey {
        os: inputs.os.to_string(),
        compiler: inputs.compiler.to_string(),
        repo_name: inputs.primary_repo_name.to_string(),
        digest,
    };
    reporter.info(&format!("==> cacheKey: {key}"));

    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{NullReporter, RecordingReporter};

    fn deps(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn inputs<'a>(dependencies: &'a IndexMap<String, String>) -> KeyInputs<'a> {
        KeyInputs {
            schema_version: "1.4.0",
            tool_version: "3.25.1",
            primary_repo_name: "eckit",
            primary_sha: "abc123",
            dependencies,
            os: "ubuntu-22.04",
            compiler: "gnu-12",
        }
    }

    #[test]
    fn material_without_dependencies() {
        let empty = IndexMap::new();
        assert_eq!(
            key_material(&inputs(&empty)),
            "v=1.4.0::cmake=3.25.1::eckit=abc123"
        );
    }

    #[test]
    fn material_appends_dependencies_in_insertion_order() {
        let dependencies = deps(&[("ecmwf/ecbuild", "e1"), ("ecmwf/atlas", "a1")]);
        assert_eq!(
            key_material(&inputs(&dependencies)),
            "v=1.4.0::cmake=3.25.1::eckit=abc123::ecbuild=e1::atlas=a1"
        );
    }

    #[test]
    fn material_skips_self_reference() {
        let dependencies = deps(&[
            ("ecmwf/ecbuild", "e1"),
            ("ecmwf/eckit", "should-not-appear"),
        ]);
        let material = key_material(&inputs(&dependencies));
        assert_eq!(material, "v=1.4.0::cmake=3.25.1::eckit=abc123::ecbuild=e1");
        assert_eq!(material.matches("eckit=").count(), 1);
    }

    #[test]
    fn digest_is_sha1_hex() {
        // sha1("abc")
        assert_eq!(
            material_digest("abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn key_format() {
        let empty = IndexMap::new();
        let key = derive_key(&inputs(&empty), &NullReporter);
        let expected_digest = material_digest("v=1.4.0::cmake=3.25.1::eckit=abc123");
        assert_eq!(
            key.to_string(),
            format!("ubuntu-22.04-gnu-12-eckit-{expected_digest}")
        );
        assert_eq!(key.digest().len(), 40);
        assert_eq!(key.repo_name(), "eckit");
    }

    #[test]
    fn derive_reports_material_digest_and_key() {
        let empty = IndexMap::new();
        let reporter = RecordingReporter::new();
        let key = derive_key(&inputs(&empty), &reporter);
        let lines = reporter.info_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("==> cacheKeyStr: v=1.4.0"));
        assert_eq!(lines[1], format!("==> cacheKeySha: {}", key.digest()));
        assert_eq!(lines[2], format!("==> cacheKey: {key}"));
    }

    #[test]
    fn dependency_order_is_part_of_the_key() {
        let forward = deps(&[("a/one", "1"), ("b/two", "2")]);
        let backward = deps(&[("b/two", "2"), ("a/one", "1")]);
        let k1 = derive_key(&inputs(&forward), &NullReporter);
        let k2 = derive_key(&inputs(&backward), &NullReporter);
        assert_ne!(k1, k2);
    }
}
