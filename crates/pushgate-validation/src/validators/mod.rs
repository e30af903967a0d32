//! Built-in validators.
//!
//! - `change_id`: Change-Id footer policy and hook installation hint
//! - `file_count`: per-change file limit
//! - `config` / `label_config`: pushes to `refs/meta/config`
//! - `permissions`: merge, author, committer, sign-off and server-merge checks
//! - `gates`: banned commits, project state, group refs

pub mod change_id;
pub mod config;
pub mod file_count;
pub mod gates;
pub mod label_config;
pub mod permissions;

pub use change_id::{commit_msg_hook_installation_hint, ChangeIdValidator, HintError};
pub use config::ConfigValidator;
pub use file_count::{FileCountValidator, FILE_COUNT_METRIC, FILE_COUNT_WARNING_THRESHOLD};
pub use gates::{BannedCommitsValidator, GroupCommitValidator, ProjectStateValidationListener};
pub use label_config::LabelConfigValidator;
pub use permissions::{
    invalid_email, AmendedGerritMergeCommitValidationListener, AuthorUploaderValidator,
    CommitterUploaderValidator, SignedOffByValidator, UploadMergesPermissionValidator,
};
