//! Artifact selection and download.

use crate::reporter::Reporter;
use crate::repository::RepositoryRef;
use crate::service::{ARCHIVE_FORMAT, Artifact, CiService};
use crate::{Error, Result};
use bytes::Bytes;
use indicatif::HumanBytes;

/// Repository that is not compiled and publishes per CMake version instead.
pub const EXEMPT_REPOSITORY: &str = "ecbuild";

/// Name a run publishes the artifact for `repo_name` under.
///
/// Compiled packages publish `<repo>-<os>-<compiler>`. [`EXEMPT_REPOSITORY`]
/// is not built by a compiler and publishes `<repo>-<os>-cmake-<tool_version>`.
#[must_use]
pub fn expected_artifact_name(
    repo_name: &str,
    os: &str,
    compiler: &str,
    tool_version: &str,
) -> String {
    if repo_name == EXEMPT_REPOSITORY {
        format!("{repo_name}-{os}-cmake-{tool_version}")
    } else {
        format!("{repo_name}-{os}-{compiler}")
    }
}

/// Pick the artifact of `run_id` published under the expected name.
///
/// # Errors
///
/// Propagates the service's `Remote` error from the listing, and returns
/// `NotFound` when no artifact carries the expected name.
pub async fn select_artifact(
    service: &dyn CiService,
    repo: &RepositoryRef,
    run_id: u64,
    os: &str,
    compiler: &str,
    tool_version: &str,
    reporter: &dyn Reporter,
) -> Result<Artifact> {
    let artifacts = match service.list_run_artifacts(repo, run_id).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            reporter.error(&format!("Error fetching workflow run artifacts: {e}"));
            return Err(e);
        }
    };

    reporter.info(&format!("==> Artifacts: {}", artifacts.len()));

    let artifact_name = expected_artifact_name(repo.name(), os, compiler, tool_version);

    let Some(artifact) = artifacts.into_iter().find(|a| a.name == artifact_name) else {
        reporter.error(&format!(
            "No suitable artifact found: {artifact_name} (run {run_id})"
        ));
        return Err(Error::not_found(
            "artifact",
            format!("{artifact_name} in run {run_id} of {repo}"),
        ));
    };

    reporter.info(&format!("==> artifactName: {artifact_name}"));
    reporter.info(&format!("==> artifactId: {}", artifact.id));

    Ok(artifact)
}

/// Download the zip payload of `artifact`.
///
/// The whole payload is buffered in memory.
///
/// # Errors
///
/// Propagates the service's `Remote` error.
pub async fn fetch_artifact(
    service: &dyn CiService,
    repo: &RepositoryRef,
    artifact: &Artifact,
    reporter: &dyn Reporter,
) -> Result<Bytes> {
    // TODO(streaming): cap or stream large payloads instead of buffering them whole.
    let payload = match service
        .download_artifact(repo, artifact.id, ARCHIVE_FORMAT)
        .await
    {
        Ok(payload) => payload,
        Err(e) => {
            reporter.error(&format!("Error downloading workflow run artifact: {e}"));
            return Err(e);
        }
    };

    reporter.info(&format!(
        "==> Downloaded: {}.{ARCHIVE_FORMAT} ({})",
        artifact.name,
        HumanBytes(artifact.size_in_bytes)
    ));

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingReporter;
    use crate::testing::FakeCiService;

    fn artifact(id: u64, name: &str) -> Artifact {
        Artifact {
            id,
            name: name.into(),
            size_in_bytes: 2048,
        }
    }

    fn repo(name: &str) -> RepositoryRef {
        RepositoryRef::new("ecmwf", name).unwrap()
    }

    #[test]
    fn compiled_packages_use_compiler_name() {
        assert_eq!(
            expected_artifact_name("eckit", "ubuntu-22.04", "gnu-12", "3.25.1"),
            "eckit-ubuntu-22.04-gnu-12"
        );
    }

    #[test]
    fn exempt_repository_uses_cmake_version() {
        assert_eq!(
            expected_artifact_name("ecbuild", "ubuntu-22.04", "gnu-12", "3.25.1"),
            "ecbuild-ubuntu-22.04-cmake-3.25.1"
        );
    }

    #[test]
    fn exemption_matches_short_name_exactly() {
        for name in ["ecbuild2", "my-ecbuild", "ECBUILD"] {
            assert_eq!(
                expected_artifact_name(name, "macos", "clang", "3.25.1"),
                format!("{name}-macos-clang")
            );
        }
    }

    #[tokio::test]
    async fn selects_first_matching_artifact() {
        let service = FakeCiService::new().with_artifacts(vec![
            artifact(1, "eckit-macos-clang"),
            artifact(2, "eckit-linux-gcc"),
            artifact(3, "eckit-linux-gcc"),
        ]);
        let reporter = RecordingReporter::new();

        let selected = select_artifact(&service, &repo("eckit"), 9, "linux", "gcc", "3.25.1", &reporter)
            .await
            .unwrap();

        assert_eq!(selected.id, 2);
        assert!(reporter.info_lines().contains(&"==> artifactId: 2".to_string()));
        assert_eq!(service.calls(), ["list_run_artifacts(ecmwf/eckit, 9)"]);
    }

    #[tokio::test]
    async fn selects_exempt_repository_by_cmake_version() {
        let service = FakeCiService::new().with_artifacts(vec![
            artifact(1, "ecbuild-linux-gcc"),
            artifact(2, "ecbuild-linux-cmake-3.25.1"),
        ]);

        let selected = select_artifact(
            &service,
            &repo("ecbuild"),
            9,
            "linux",
            "gcc",
            "3.25.1",
            &RecordingReporter::new(),
        )
        .await
        .unwrap();

        assert_eq!(selected.id, 2);
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let service = FakeCiService::new().with_artifacts(vec![artifact(1, "eckit-macos-clang")]);
        let reporter = RecordingReporter::new();

        let err = select_artifact(&service, &repo("eckit"), 9, "linux", "gcc", "3.25.1", &reporter)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("eckit-linux-gcc"));
        assert_eq!(reporter.error_lines().len(), 1);
    }

    #[tokio::test]
    async fn empty_artifact_list_is_not_found() {
        let service = FakeCiService::new().with_artifacts(Vec::new());
        let err = select_artifact(
            &service,
            &repo("eckit"),
            9,
            "linux",
            "gcc",
            "3.25.1",
            &RecordingReporter::new(),
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn listing_failure_is_remote() {
        let service = FakeCiService::new();
        let err = select_artifact(
            &service,
            &repo("eckit"),
            9,
            "linux",
            "gcc",
            "3.25.1",
            &RecordingReporter::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Remote { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn fetch_requests_zip_and_reports_size() {
        let service = FakeCiService::new().with_payload(4, b"PK".to_vec());
        let reporter = RecordingReporter::new();

        let payload = fetch_artifact(&service, &repo("eckit"), &artifact(4, "eckit-linux-gcc"), &reporter)
            .await
            .unwrap();

        assert_eq!(&payload[..], b"PK");
        assert_eq!(service.calls(), ["download_artifact(ecmwf/eckit, 4, zip)"]);
        let lines = reporter.info_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("==> Downloaded: eckit-linux-gcc.zip ("));
        assert!(lines[0].contains("KiB"));
    }

    #[tokio::test]
    async fn fetch_failure_is_remote() {
        let service = FakeCiService::new();
        let err = fetch_artifact(
            &service,
            &repo("eckit"),
            &artifact(4, "eckit-linux-gcc"),
            &RecordingReporter::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Remote { status: Some(410), .. }));
    }
}
