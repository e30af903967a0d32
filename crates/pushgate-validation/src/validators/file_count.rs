//! Per-change file count limit.

use std::sync::Arc;

use async_trait::async_trait;
use pushgate_core::domain::refs::{NEW_CHANGE, REFS_CHANGES};
use pushgate_core::{
    server_host, CommitReceivedEvent, CommitValidationError, CommitValidationInfo,
    ValidationResult,
};
use pushgate_state::{MetricsSink, UrlFormatter};
use tracing::warn;

use crate::listener::CommitValidationListener;

/// Changes above this size are logged and counted even when accepted.
pub const FILE_COUNT_WARNING_THRESHOLD: usize = 10_000;

/// Metric incremented for every accepted change above the warning threshold.
pub const FILE_COUNT_METRIC: &str = "validation/file_count";

/// Rejects review pushes that touch more than `max_files` files.
pub struct FileCountValidator {
    max_files: u64,
    url_formatter: Arc<dyn UrlFormatter>,
    metrics: Arc<dyn MetricsSink>,
}

impl FileCountValidator {
    pub fn new(
        max_files: u64,
        url_formatter: Arc<dyn UrlFormatter>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            max_files,
            url_formatter,
            metrics,
        }
    }
}

#[async_trait]
impl CommitValidationListener for FileCountValidator {
    fn name(&self) -> &str {
        "FileCountValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        let ref_name = event.ref_name();
        // Direct pushes bypass review and are not limited.
        if !ref_name.starts_with(NEW_CHANGE) && !ref_name.starts_with(REFS_CHANGES) {
            return Ok(CommitValidationInfo::no_messages());
        }

        let changed_files = match event.changed_file_count().await {
            Ok(n) => n,
            Err(e) => {
                // Expected for cherry-picks onto refs/changes/.
                if !ref_name.starts_with(REFS_CHANGES) {
                    warn!(
                        commit = %event.commit.id,
                        error = %e,
                        "failed to validate file count for commit"
                    );
                }
                return Ok(CommitValidationInfo::no_messages());
            }
        };

        if changed_files as u64 > self.max_files {
            return Err(CommitValidationError::new(format!(
                "Exceeding maximum number of files per change ({} > {})",
                changed_files, self.max_files
            )));
        }

        if changed_files > FILE_COUNT_WARNING_THRESHOLD {
            let host = server_host(self.url_formatter.web_url().as_deref());
            let project = event.project.as_str();
            warn!(
                files = changed_files,
                host = %host,
                project = %project,
                ref_name = %ref_name,
                "change with many files"
            );
            self.metrics.increment(
                FILE_COUNT_METRIC,
                &[
                    ("file_count", changed_files.to_string()),
                    ("host_repo", format!("{host}/{project}")),
                ],
            );
        }

        Ok(CommitValidationInfo::no_messages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit, oid, EventBuilder, COMMIT};
    use pushgate_state::fakes::{MemoryDiffOperations, MemoryMetrics, StaticUrlFormatter};

    fn setup(count: usize) -> (FileCountValidator, Arc<MemoryMetrics>, Arc<MemoryDiffOperations>) {
        let metrics = Arc::new(MemoryMetrics::new());
        let diff = Arc::new(MemoryDiffOperations::new());
        diff.insert_count(oid(COMMIT), count);
        let v = FileCountValidator::new(
            100_000,
            Arc::new(StaticUrlFormatter::new(Some("https://review.example.com"))),
            metrics.clone(),
        );
        (v, metrics, diff)
    }

    #[tokio::test]
    async fn over_limit_is_rejected_with_both_numbers() {
        let (v, metrics, diff) = setup(100_001);
        let ev = EventBuilder::new(commit("s\n")).diff(diff).build();
        let err = v.validate_commit(&ev).await.unwrap_err();
        assert_eq!(
            err.reason,
            "Exceeding maximum number of files per change (100001 > 100000)"
        );
        assert_eq!(metrics.count(FILE_COUNT_METRIC), 0);
    }

    #[tokio::test]
    async fn small_change_passes_without_metric() {
        let (v, metrics, diff) = setup(50);
        let ev = EventBuilder::new(commit("s\n")).diff(diff).build();
        assert!(v.validate_commit(&ev).await.is_ok());
        assert!(metrics.increments().is_empty());
    }

    #[tokio::test]
    async fn large_change_passes_and_is_counted_once() {
        let (v, metrics, diff) = setup(10_001);
        let ev = EventBuilder::new(commit("s\n")).diff(diff).build();
        assert!(v.validate_commit(&ev).await.is_ok());

        let increments = metrics.increments();
        assert_eq!(increments.len(), 1);
        assert_eq!(increments[0].metric, FILE_COUNT_METRIC);
        assert_eq!(
            increments[0].fields,
            vec![
                ("file_count".to_string(), "10001".to_string()),
                (
                    "host_repo".to_string(),
                    "review.example.com/project".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn direct_push_is_not_counted() {
        let (v, _metrics, diff) = setup(100_001);
        let ev = EventBuilder::new(commit("s\n"))
            .ref_name("refs/heads/main")
            .diff(diff.clone())
            .build();
        assert!(v.validate_commit(&ev).await.is_ok());
        assert_eq!(diff.calls(), 0);
    }

    #[tokio::test]
    async fn unavailable_diff_is_tolerated() {
        let (v, _metrics, _diff) = setup(0);
        let ev = EventBuilder::new(commit("s\n"))
            .ref_name("refs/changes/12/1234/1")
            .build();
        assert!(v.validate_commit(&ev).await.is_ok());
    }
}
