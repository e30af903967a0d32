//! Label definition checks for pushes to the project configuration branch.

use std::sync::Arc;

use async_trait::async_trait;
use pushgate_core::domain::refs::REFS_CONFIG;
use pushgate_core::{
    CommitReceivedEvent, CommitValidationError, CommitValidationInfo, CommitValidationMessage,
    ProjectConfig, ValidationResult,
};
use pushgate_state::{ApprovalQueryBuilder, ProjectConfigLoader};
use tracing::debug;

use super::config::INVALID_CONFIG_MSG;
use crate::listener::CommitValidationListener;

/// Legacy copy flags superseded by `copyCondition`. They may stay where
/// already set but cannot be newly introduced.
pub const DEPRECATED_COPY_FLAGS: &[&str] = &[
    "copyAnyScore",
    "copyMinScore",
    "copyMaxScore",
    "copyAllScoresIfNoChange",
    "copyAllScoresIfNoCodeChange",
    "copyAllScoresOnMergeFirstParentUpdate",
    "copyAllScoresOnTrivialRebase",
    "copyValue",
];

/// Rejects unparsable copy conditions and newly set deprecated copy flags.
pub struct LabelConfigValidator {
    approval_query_builder: Arc<dyn ApprovalQueryBuilder>,
    loader: Arc<dyn ProjectConfigLoader>,
}

impl LabelConfigValidator {
    pub fn new(
        approval_query_builder: Arc<dyn ApprovalQueryBuilder>,
        loader: Arc<dyn ProjectConfigLoader>,
    ) -> Self {
        Self {
            approval_query_builder,
            loader,
        }
    }

    fn problems(&self, new: &ProjectConfig, old: Option<&ProjectConfig>) -> Vec<String> {
        let mut problems = Vec::new();
        for label in &new.labels {
            if let Some(condition) = &label.copy_condition {
                if let Err(e) = self.approval_query_builder.parse(condition) {
                    problems.push(format!(
                        "Cannot parse copy condition '{}' of label {}: {}",
                        condition, label.name, e
                    ));
                }
            }

            let old_label = old.and_then(|cfg| cfg.label(&label.name));
            for flag in &label.copy_flags {
                let deprecated = DEPRECATED_COPY_FLAGS.contains(&flag.as_str());
                let newly_set = old_label.map_or(true, |l| !l.copy_flags.contains(flag));
                if deprecated && newly_set {
                    problems.push(format!(
                        "Parameter 'label.{}.{}' is deprecated and cannot be set, use 'label.{}.copyCondition' instead.",
                        label.name, flag, label.name
                    ));
                }
            }
        }
        problems
    }
}

#[async_trait]
impl CommitValidationListener for LabelConfigValidator {
    fn name(&self) -> &str {
        "LabelConfigValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        if event.branch.branch != REFS_CONFIG {
            return Ok(CommitValidationInfo::no_messages());
        }

        // An unloadable config is reported by ConfigValidator.
        let Ok(new) = self.loader.load(&event.project, &event.command.new_id).await else {
            return Ok(CommitValidationInfo::no_messages());
        };
        let old = if event.command.old_id.is_zero() {
            None
        } else {
            match self.loader.load(&event.project, &event.command.old_id).await {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    debug!(error = %e, "previous project config not loadable");
                    None
                }
            }
        };

        let problems = self.problems(&new, old.as_ref());
        if problems.is_empty() {
            return Ok(CommitValidationInfo::no_messages());
        }
        Err(CommitValidationError::with_messages(
            INVALID_CONFIG_MSG,
            problems
                .into_iter()
                .map(CommitValidationMessage::error)
                .collect(),
        ))
    }
}
