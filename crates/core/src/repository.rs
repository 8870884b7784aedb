//! Repository references in `owner/name` form.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A GitHub repository, parsed from `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Build a reference from its parts.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either part is empty or contains `/`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() || name.is_empty() || owner.contains('/') || name.contains('/') {
            return Err(Error::configuration(format!(
                "Invalid repository '{owner}/{name}': expected 'owner/name'"
            )));
        }
        Ok(Self { owner, name })
    }

    /// Repository owner (user or organisation).
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Short repository name, the part after the slash.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepositoryRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (owner, name) = s.split_once('/').ok_or_else(|| {
            Error::configuration(format!("Invalid repository '{s}': expected 'owner/name'"))
        })?;
        Self::new(owner, name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Short name of a repository given as `owner/name`.
///
/// Returns the substring after the last `/`, or the whole input when there is none.
#[must_use]
pub fn short_name(full_name: &str) -> &str {
    full_name
        .rsplit_once('/')
        .map_or(full_name, |(_, name)| name)
}
