//! The CI service seam.
//!
//! Resolution only needs four read operations from the source-control/CI
//! host. Implementations map any non-success response or transport failure
//! to [`Error::Remote`](crate::Error::Remote).

use crate::Result;
use crate::repository::RepositoryRef;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Default workflow file whose runs publish the artifacts.
pub const CI_WORKFLOW: &str = "ci.yml";

/// Archive format requested when downloading artifacts.
pub const ARCHIVE_FORMAT: &str = "zip";

/// One execution of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run identifier
    pub id: u64,
    /// Commit the run was executed against
    pub head_sha: String,
    /// Lifecycle status (`queued`, `in_progress`, `completed`, ...)
    pub status: String,
    /// Outcome once completed (`success`, `failure`, ...)
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl WorkflowRun {
    /// Whether the run finished successfully.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status == "completed" && self.conclusion.as_deref() == Some("success")
    }
}

/// A binary bundle published by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact identifier
    pub id: u64,
    /// Published name
    pub name: String,
    /// Compressed size
    pub size_in_bytes: u64,
}

/// Read access to the CI host.
#[async_trait]
pub trait CiService: Send + Sync {
    /// Commit sha a ref (e.g. `heads/main`) points to.
    async fn get_ref(&self, repo: &RepositoryRef, reference: &str) -> Result<String>;

    /// Runs of `workflow` on `branch`, most recent first.
    async fn list_workflow_runs(
        &self,
        repo: &RepositoryRef,
        workflow: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>>;

    /// Artifacts published by a run.
    async fn list_run_artifacts(&self, repo: &RepositoryRef, run_id: u64) -> Result<Vec<Artifact>>;

    /// Compressed payload of an artifact in `format`.
    async fn download_artifact(
        &self,
        repo: &RepositoryRef,
        artifact_id: u64,
        format: &str,
    ) -> Result<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(status: &str, conclusion: Option<&str>) -> WorkflowRun {
        WorkflowRun {
            id: 1,
            head_sha: "abc".into(),
            status: status.into(),
            conclusion: conclusion.map(Into::into),
        }
    }

    #[test]
    fn only_completed_success_is_successful() {
        assert!(run("completed", Some("success")).is_successful());
        assert!(!run("completed", Some("failure")).is_successful());
        assert!(!run("in_progress", None).is_successful());
        assert!(!run("queued", Some("success")).is_successful());
    }

    #[test]
    fn workflow_run_deserialises_null_conclusion() {
        let json = r#"{"id":7,"head_sha":"abc","status":"in_progress","conclusion":null}"#;
        let parsed: WorkflowRun = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.conclusion, None);
    }
}
