//! Simple accept/reject gates.

use std::sync::Arc;

use async_trait::async_trait;
use pushgate_core::domain::refs::{is_group_ref, NEW_CHANGE};
use pushgate_core::{
    CommitReceivedEvent, CommitValidationError, CommitValidationInfo, ProjectName, ProjectState,
    ValidationResult,
};
use pushgate_state::BannedCommits;
use tracing::error;

use crate::listener::CommitValidationListener;

/// Rejects commits listed in the project's ban index.
pub struct BannedCommitsValidator {
    banned: Arc<dyn BannedCommits>,
}

impl BannedCommitsValidator {
    pub fn new(banned: Arc<dyn BannedCommits>) -> Self {
        Self { banned }
    }
}

#[async_trait]
impl CommitValidationListener for BannedCommitsValidator {
    fn name(&self) -> &str {
        "BannedCommitsValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        match self.banned.contains(&event.commit.id).await {
            Ok(false) => Ok(CommitValidationInfo::no_messages()),
            Ok(true) => Err(CommitValidationError::new(format!(
                "contains banned commit {}",
                event.commit.id
            ))),
            Err(e) => {
                error!(commit = %event.commit.id, error = %e, "cannot read banned commits");
                Err(CommitValidationError::internal(
                    "error checking banned commits",
                ))
            }
        }
    }
}

/// Rejects writes to projects that are not active.
pub struct ProjectStateValidationListener {
    project_state: ProjectState,
}

impl ProjectStateValidationListener {
    pub fn new(project_state: ProjectState) -> Self {
        Self { project_state }
    }
}

#[async_trait]
impl CommitValidationListener for ProjectStateValidationListener {
    fn name(&self) -> &str {
        "ProjectStateValidationListener"
    }

    async fn validate_commit(&self, _event: &CommitReceivedEvent) -> ValidationResult {
        if self.project_state.state_permits_write() {
            Ok(CommitValidationInfo::no_messages())
        } else {
            Err(CommitValidationError::new(
                "project state does not permit write",
            ))
        }
    }
}

/// Groups live in the All-Users project; their refs cannot be pushed to
/// directly.
pub struct GroupCommitValidator {
    all_users: ProjectName,
}

impl GroupCommitValidator {
    pub fn new(all_users: ProjectName) -> Self {
        Self { all_users }
    }
}

#[async_trait]
impl CommitValidationListener for GroupCommitValidator {
    fn name(&self) -> &str {
        "GroupCommitValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        if event.project != self.all_users {
            return Ok(CommitValidationInfo::no_messages());
        }
        // Reviews of group refs are checked on submit.
        if event.ref_name().starts_with(NEW_CHANGE) {
            return Ok(CommitValidationInfo::no_messages());
        }
        if is_group_ref(event.ref_name()) {
            return Err(CommitValidationError::new("group update not allowed"));
        }
        Ok(CommitValidationInfo::no_messages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit, oid, EventBuilder, COMMIT};
    use pushgate_core::{ProjectLifecycle, RejectionKind};
    use pushgate_state::fakes::MemoryBannedCommits;

    #[tokio::test]
    async fn banned_commit_is_rejected() {
        let banned = Arc::new(MemoryBannedCommits::new());
        let v = BannedCommitsValidator::new(banned.clone());
        let ev = EventBuilder::new(commit("s\n")).build();
        assert!(v.validate_commit(&ev).await.is_ok());

        banned.ban(oid(COMMIT));
        let err = v.validate_commit(&ev).await.unwrap_err();
        assert_eq!(err.reason, format!("contains banned commit {COMMIT}"));
    }

    #[tokio::test]
    async fn unreadable_ban_index_is_internal() {
        let v = BannedCommitsValidator::new(Arc::new(MemoryBannedCommits::failing()));
        let ev = EventBuilder::new(commit("s\n")).build();
        let err = v.validate_commit(&ev).await.unwrap_err();
        assert_eq!(err.reason, "error checking banned commits");
        assert_eq!(err.kind, RejectionKind::Internal);
    }

    #[tokio::test]
    async fn read_only_project_is_rejected() {
        let mut state = ProjectState::active(ProjectName::new("project"));
        let ev = EventBuilder::new(commit("s\n")).build();
        assert!(ProjectStateValidationListener::new(state.clone())
            .validate_commit(&ev)
            .await
            .is_ok());

        state.state = ProjectLifecycle::ReadOnly;
        let err = ProjectStateValidationListener::new(state)
            .validate_commit(&ev)
            .await
            .unwrap_err();
        assert_eq!(err.reason, "project state does not permit write");
    }

    #[tokio::test]
    async fn group_refs_in_all_users() {
        let v = GroupCommitValidator::new(ProjectName::new("All-Users"));
        let push = |project: &str, ref_name: &str| {
            EventBuilder::new(commit("s\n"))
                .project(project)
                .ref_name(ref_name)
                .build()
        };

        let err = v
            .validate_commit(&push("All-Users", "refs/groups/ab/abcd"))
            .await
            .unwrap_err();
        assert_eq!(err.reason, "group update not allowed");
        assert!(v
            .validate_commit(&push("All-Users", "refs/meta/group-names"))
            .await
            .is_err());
        assert!(v
            .validate_commit(&push("All-Users", "refs/for/refs/groups/ab/abcd"))
            .await
            .is_ok());
        assert!(v
            .validate_commit(&push("All-Users", "refs/users/01/1000"))
            .await
            .is_ok());
        assert!(v
            .validate_commit(&push("project", "refs/groups/ab/abcd"))
            .await
            .is_ok());
    }
}
