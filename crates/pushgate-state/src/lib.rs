//! pushgate-state: collaborator contracts for the commit validation pipeline
//!
//! This crate defines the records and traits through which validators reach
//! server facilities they do not own: permissions, project policy and
//! configuration, diffs, the banned-commit index, metrics and URLs.
//!
//! ## Layer 0 - Data/Contracts
//!
//! Focus: narrow, backend-agnostic interfaces and their in-memory fakes.
//!
//! ## Key Components
//!
//! - `storage_traits`: the collaborator traits
//! - `schema`: `ObjectId`, `ProjectState`, `ProjectConfig`, `RefPermission`, ...
//! - `fakes`: in-memory implementations for tests and dry runs

mod error;
pub mod fakes;
mod schema;
pub mod storage_traits;

pub use error::{
    ConfigLoadError, DiffNotAvailable, PermissionBackendError, PermissionCheckError, StateError,
};
pub use schema::{
    BranchNameKey, ChangeType, HostKey, LabelType, ModifiedFile, ObjectId, ProjectConfig,
    ProjectLifecycle, ProjectName, ProjectState, RefPermission, SshInfo,
};
pub use storage_traits::{
    ApprovalQueryBuilder, BannedCommits, DiffOperations, MetricsSink, ProjectCache,
    ProjectConfigLoader, ProjectPermissions, RefPermissions, UrlFormatter,
};

/// Result type for pushgate-state operations
pub type Result<T> = std::result::Result<T, StateError>;
