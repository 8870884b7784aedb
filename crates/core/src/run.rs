//! Workflow run selection.

use crate::reporter::Reporter;
use crate::repository::RepositoryRef;
use crate::service::{CiService, WorkflowRun};
use crate::{Error, Result};

/// Runs that completed successfully against `head_sha`, in listing order.
///
/// The sha comparison is exact and case-sensitive.
pub fn qualifying_runs<'a>(
    runs: &'a [WorkflowRun],
    head_sha: &'a str,
) -> impl Iterator<Item = &'a WorkflowRun> + 'a {
    runs.iter()
        .filter(move |run| run.is_successful() && run.head_sha == head_sha)
}

/// Pick the run whose artifacts belong to `head_sha`.
///
/// Lists the runs of `workflow` on `branch` and keeps the first one that
/// completed successfully against `head_sha`. The service lists runs most
/// recent first, so the first match is the latest build of that commit.
///
/// # Errors
///
/// Returns `NotFound` when the listing fails, is empty, or has no
/// qualifying run.
pub async fn select_run(
    service: &dyn CiService,
    repo: &RepositoryRef,
    workflow: &str,
    branch: &str,
    head_sha: &str,
    reporter: &dyn Reporter,
) -> Result<WorkflowRun> {
    let query = format!("{repo}@{branch} ({workflow})");

    let runs = match service.list_workflow_runs(repo, workflow, branch).await {
        Ok(runs) => runs,
        Err(e) => {
            reporter.error(&format!("Error fetching workflow runs: {e}"));
            return Err(Error::not_found_caused_by("workflow runs", query, e));
        }
    };

    if runs.is_empty() {
        reporter.error("No workflow runs found");
        return Err(Error::not_found("workflow runs", query));
    }

    reporter.info(&format!("==> workflowRuns: {}", runs.len()));

    let Some(run) = qualifying_runs(&runs, head_sha).next() else {
        reporter.error(&format!(
            "No completed successful workflow runs found for repository HEAD: {head_sha}"
        ));
        return Err(Error::not_found(
            "completed successful workflow run",
            format!("{query} for HEAD {head_sha}"),
        ));
    };

    reporter.info(&format!("==> RunID: {}", run.id));
    Ok(run.clone())
}
