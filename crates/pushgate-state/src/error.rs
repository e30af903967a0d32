//! Error types for pushgate-state

use thiserror::Error;

/// Errors raised by state lookups (ban index, object parsing).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Underlying storage could not be read
    #[error("Storage read failed: {0}")]
    Read(String),

    /// Invalid object id format
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),
}

/// The permission backend could not evaluate a permission.
///
/// This is distinct from a denial: it means the answer is unknown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("permission backend failure: {0}")]
pub struct PermissionBackendError(pub String);

/// Result of a hard permission check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheckError {
    /// The permission is not granted
    #[error("not permitted: {permission} on {ref_name}")]
    Denied { permission: String, ref_name: String },

    /// The backend failed while checking
    #[error(transparent)]
    Backend(#[from] PermissionBackendError),
}

/// Errors produced while loading a project configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoadError {
    /// The stored configuration could not be parsed
    #[error("{0}")]
    Invalid(String),

    /// The configuration could not be read
    #[error("config I/O failed: {0}")]
    Io(String),
}

impl ConfigLoadError {
    /// Description suitable for showing to the pushing user, if any.
    ///
    /// Only parse failures carry user-facing detail; I/O failures stay internal.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            ConfigLoadError::Invalid(msg) if !msg.is_empty() => Some(msg),
            _ => None,
        }
    }
}

/// The diff for a commit cannot be computed (e.g. missing base for cherry-picks).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("diff not available: {0}")]
pub struct DiffNotAvailable(pub String);
