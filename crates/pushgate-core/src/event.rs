//! The validation context: one commit received by a push.

use std::sync::Arc;

use pushgate_state::{BranchNameKey, DiffNotAvailable, DiffOperations, ObjectId, ProjectName};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::domain::refs::is_magic_path;
use crate::domain::{Commit, IdentifiedUser};

/// A ref update requested by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveCommand {
    /// Ref as sent by the client (may be a magic `refs/for/...` ref).
    pub ref_name: String,
    pub old_id: ObjectId,
    pub new_id: ObjectId,
}

impl ReceiveCommand {
    pub fn new(ref_name: impl Into<String>, old_id: ObjectId, new_id: ObjectId) -> Self {
        Self {
            ref_name: ref_name.into(),
            old_id,
            new_id,
        }
    }

    /// Ref creation (old id is zero).
    pub fn create(ref_name: impl Into<String>, new_id: ObjectId) -> Self {
        Self::new(ref_name, ObjectId::zero(), new_id)
    }
}

/// Everything a validator may look at for one commit.
///
/// Shared by reference with every validator of a run and never mutated; the
/// changed-file count is computed on first request and cached.
pub struct CommitReceivedEvent {
    pub command: ReceiveCommand,
    pub project: ProjectName,
    /// Destination branch (for magic refs, the branch reviews target).
    pub branch: BranchNameKey,
    pub commit: Commit,
    pub user: IdentifiedUser,
    diff_operations: Arc<dyn DiffOperations>,
    changed_files: OnceCell<Result<usize, DiffNotAvailable>>,
}

impl CommitReceivedEvent {
    pub fn new(
        command: ReceiveCommand,
        branch: BranchNameKey,
        commit: Commit,
        user: IdentifiedUser,
        diff_operations: Arc<dyn DiffOperations>,
    ) -> Self {
        Self {
            command,
            project: branch.project.clone(),
            branch,
            commit,
            user,
            diff_operations,
            changed_files: OnceCell::new(),
        }
    }

    pub fn ref_name(&self) -> &str {
        &self.command.ref_name
    }

    /// Number of files changed by the commit, excluding magic paths.
    ///
    /// Merge commits are compared against their auto-merge base by the diff
    /// provider.
    pub async fn changed_file_count(&self) -> Result<usize, DiffNotAvailable> {
        self.changed_files
            .get_or_init(|| async {
                let files = self
                    .diff_operations
                    .modified_files(&self.project, &self.commit.id, 0)
                    .await?;
                Ok(files
                    .iter()
                    .filter(|f| !is_magic_path(f.new_path.as_deref().unwrap_or("")))
                    .count())
            })
            .await
            .clone()
    }
}

impl std::fmt::Debug for CommitReceivedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitReceivedEvent")
            .field("command", &self.command)
            .field("project", &self.project)
            .field("branch", &self.branch)
            .field("commit", &self.commit.id)
            .field("user", &self.user.account_id)
            .finish_non_exhaustive()
    }
}
