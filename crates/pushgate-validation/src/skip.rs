//! Honour the user's request to skip plugin validation.

use std::sync::Arc;

use async_trait::async_trait;
use pushgate_core::{no_metadata, CommitReceivedEvent, CommitValidationInfo, ValidationResult};
use tracing::debug;

use crate::listener::CommitValidationListener;

/// Wraps a plugin validator so that it is bypassed when `skip_validation` is
/// set, unless the plugin insists on validating every commit.
pub struct SkippablePluginValidator {
    inner: Arc<dyn CommitValidationListener>,
    skip_validation: bool,
}

impl SkippablePluginValidator {
    pub fn new(inner: Arc<dyn CommitValidationListener>, skip_validation: bool) -> Self {
        Self {
            inner,
            skip_validation,
        }
    }
}

#[async_trait]
impl CommitValidationListener for SkippablePluginValidator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        if self.skip_validation && !self.inner.should_validate_all_commits() {
            debug!(validator = %self.inner.name(), "skipped by user");
            return Ok(CommitValidationInfo::skipped_by_user(no_metadata()));
        }
        self.inner.validate_commit(event).await
    }
}
