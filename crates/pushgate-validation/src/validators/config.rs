//! Validation of pushes to the project configuration branch.

use std::sync::Arc;

use async_trait::async_trait;
use pushgate_core::domain::refs::REFS_CONFIG;
use pushgate_core::{
    BranchNameKey, CommitReceivedEvent, CommitValidationError, CommitValidationInfo,
    CommitValidationMessage, IdentifiedUser, ProjectName, ValidationResult,
};
use pushgate_state::ProjectConfigLoader;
use tracing::error;

use crate::listener::CommitValidationListener;

pub(crate) const INVALID_CONFIG_MSG: &str = "invalid project configuration";
pub(crate) const INVALID_CONFIG_HEADER: &str = "Invalid project configuration:";

/// Parses the pushed `project.config` and rejects it when invalid.
pub struct ConfigValidator {
    loader: Arc<dyn ProjectConfigLoader>,
    branch: BranchNameKey,
    user: IdentifiedUser,
    all_users: ProjectName,
    all_projects: ProjectName,
}

impl ConfigValidator {
    pub fn new(
        loader: Arc<dyn ProjectConfigLoader>,
        branch: BranchNameKey,
        user: IdentifiedUser,
        all_users: ProjectName,
        all_projects: ProjectName,
    ) -> Self {
        Self {
            loader,
            branch,
            user,
            all_users,
            all_projects,
        }
    }

    fn reject(details: impl IntoIterator<Item = String>) -> CommitValidationError {
        let messages = std::iter::once(INVALID_CONFIG_HEADER.to_string())
            .chain(details.into_iter().map(|d| format!("  {d}")))
            .map(CommitValidationMessage::error)
            .collect();
        CommitValidationError::with_messages(INVALID_CONFIG_MSG, messages)
    }
}

#[async_trait]
impl CommitValidationListener for ConfigValidator {
    fn name(&self) -> &str {
        "ConfigValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        if self.branch.branch != REFS_CONFIG {
            return Ok(CommitValidationInfo::no_messages());
        }

        let new_id = &event.command.new_id;
        let cfg = match self.loader.load(&event.project, new_id).await {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(
                    user = %self.user.loggable_name(),
                    revision = %new_id,
                    project = %event.project,
                    error = %e,
                    "user tried to push an invalid project configuration"
                );
                let messages = e
                    .user_message()
                    .map(CommitValidationMessage::error)
                    .into_iter()
                    .collect();
                return Err(CommitValidationError::with_messages(
                    INVALID_CONFIG_MSG,
                    messages,
                ));
            }
        };

        if !cfg.validation_errors.is_empty() {
            return Err(Self::reject(cfg.validation_errors.iter().cloned()));
        }

        if event.project == self.all_users
            && cfg.parent_or(&self.all_projects).as_ref() != Some(&self.all_projects)
        {
            return Err(Self::reject([format!(
                "{} must inherit from {}",
                self.all_users, self.all_projects
            )]));
        }

        Ok(CommitValidationInfo::no_messages())
    }
}
