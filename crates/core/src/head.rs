//! Head commit lookup.

use crate::reporter::Reporter;
use crate::repository::RepositoryRef;
use crate::service::CiService;
use crate::{Error, Result};

/// Strip a leading `refs/heads/` from a branch name.
#[must_use]
pub fn normalize_branch(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}

/// Commit `branch` currently points to.
///
/// Every call queries the service again; nothing is cached between calls.
///
/// # Errors
///
/// Propagates the service's `Remote` error, and returns `NotFound` when the
/// service answers with an empty sha.
pub async fn resolve_head_sha(
    service: &dyn CiService,
    repo: &RepositoryRef,
    branch: &str,
    reporter: &dyn Reporter,
) -> Result<String> {
    let branch = normalize_branch(branch);
    let reference = format!("heads/{branch}");

    let sha = match service.get_ref(repo, &reference).await {
        Ok(sha) => sha,
        Err(e) => {
            reporter.error(&format!(
                "Error getting repository HEAD for {}: {e}",
                repo.name()
            ));
            return Err(e);
        }
    };

    if sha.is_empty() {
        reporter.error(&format!("No HEAD commit for {repo}@{branch}"));
        return Err(Error::not_found("head ref", format!("{repo}@{reference}")));
    }

    Ok(sha)
}
