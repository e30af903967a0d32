//! Collaborator trait definitions for the validation pipeline
//!
//! These traits are the narrow seams through which validators reach the
//! rest of the server:
//! - `ProjectPermissions` / `RefPermissions`: permission backend
//! - `ProjectCache`: cached project policy
//! - `ProjectConfigLoader`: parsed project configuration at a revision
//! - `DiffOperations`: modified files of a commit
//! - `BannedCommits`: per-project ban index
//! - `MetricsSink`: counter export
//! - `UrlFormatter`: canonical web URLs
//! - `ApprovalQueryBuilder`: copy-condition query parsing
//!
//! All traits are backend-agnostic. In-memory fakes are provided for
//! testing via the `fakes` module.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{
    ConfigLoadError, DiffNotAvailable, PermissionBackendError, PermissionCheckError, StateError,
};
use crate::schema::{ModifiedFile, ObjectId, ProjectConfig, ProjectName, ProjectState, RefPermission};

// ---------------------------------------------------------------------------
// Permission backend
// ---------------------------------------------------------------------------

/// Permission view for one user on one project.
pub trait ProjectPermissions: Send + Sync {
    /// Narrow the view to a single ref.
    fn for_ref(&self, ref_name: &str) -> Arc<dyn RefPermissions>;
}

/// Permission view for one user on one ref.
#[async_trait]
pub trait RefPermissions: Send + Sync {
    /// Ref this view evaluates permissions on.
    fn ref_name(&self) -> &str;

    /// Non-throwing check: `Ok(false)` means denied.
    async fn test(&self, permission: RefPermission) -> Result<bool, PermissionBackendError>;

    /// Hard check: denial is an error.
    async fn check(&self, permission: RefPermission) -> Result<(), PermissionCheckError> {
        if self.test(permission).await? {
            Ok(())
        } else {
            Err(PermissionCheckError::Denied {
                permission: permission.describe().to_string(),
                ref_name: self.ref_name().to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Project data
// ---------------------------------------------------------------------------

/// Cached project states.
pub trait ProjectCache: Send + Sync {
    fn get(&self, project: &ProjectName) -> Option<ProjectState>;
}

/// Loads and parses `project.config` at a given revision.
#[async_trait]
pub trait ProjectConfigLoader: Send + Sync {
    async fn load(
        &self,
        project: &ProjectName,
        revision: &ObjectId,
    ) -> Result<ProjectConfig, ConfigLoadError>;
}

/// Diff computation for commits.
#[async_trait]
pub trait DiffOperations: Send + Sync {
    /// Files modified by `commit` relative to parent number `parent`.
    ///
    /// For merge commits the implementation compares against the auto-merge
    /// commit instead of the selected parent.
    async fn modified_files(
        &self,
        project: &ProjectName,
        commit: &ObjectId,
        parent: usize,
    ) -> Result<Vec<ModifiedFile>, DiffNotAvailable>;
}

/// Index of commits that must never enter the repository.
#[async_trait]
pub trait BannedCommits: Send + Sync {
    async fn contains(&self, commit: &ObjectId) -> Result<bool, StateError>;
}

// ---------------------------------------------------------------------------
// Side channels
// ---------------------------------------------------------------------------

/// Sink for counter metrics.
///
/// `fields` are the metric dimensions, in declaration order.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, metric: &str, fields: &[(&str, String)]);
}

/// Produces canonical URLs of the web UI.
pub trait UrlFormatter: Send + Sync {
    /// Canonical web URL, always ending in `/`.
    fn web_url(&self) -> Option<String>;

    /// URL of a settings page section (e.g. `EmailAddresses`).
    fn settings_url(&self, section: &str) -> Option<String> {
        self.web_url().map(|url| {
            if section.is_empty() {
                format!("{url}settings")
            } else {
                format!("{url}settings#{section}")
            }
        })
    }
}

/// Parses approval copy-condition queries.
pub trait ApprovalQueryBuilder: Send + Sync {
    /// `Err` carries the parser's explanation.
    fn parse(&self, query: &str) -> Result<(), String>;
}
