//! Validation outcomes.
//!
//! A validator returns `Result<CommitValidationInfo, CommitValidationError>`:
//! - `Ok(info)`: the commit passed (possibly skipped), with diagnostics
//! - `Err(error)`: the commit is rejected and the run stops
//!
//! The pipeline collects passed infos into [`ValidationInfos`], keyed by
//! validator name in execution order.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Free-form metadata attached to an info.
pub type Metadata = BTreeMap<String, String>;

/// Empty metadata.
pub fn no_metadata() -> Metadata {
    Metadata::new()
}

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationMessageType {
    Fatal,
    Error,
    Warning,
    Hint,
    Other,
}

/// A single diagnostic line (or block) shown to the pushing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitValidationMessage {
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: ValidationMessageType,
}

impl CommitValidationMessage {
    pub fn new(message: impl Into<String>, message_type: ValidationMessageType) -> Self {
        Self {
            message: message.into(),
            message_type,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ValidationMessageType::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, ValidationMessageType::Warning)
    }

    pub fn hint(message: impl Into<String>) -> Self {
        Self::new(message, ValidationMessageType::Hint)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.message_type,
            ValidationMessageType::Fatal | ValidationMessageType::Error
        )
    }
}

/// How a validator concluded without rejecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    SkippedByUser,
}

/// Successful outcome of one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitValidationInfo {
    pub status: ValidationStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<CommitValidationMessage>,
}

impl CommitValidationInfo {
    pub fn passed(metadata: Metadata, messages: Vec<CommitValidationMessage>) -> Self {
        Self {
            status: ValidationStatus::Passed,
            metadata,
            messages,
        }
    }

    /// Passed, nothing to report.
    pub fn no_messages() -> Self {
        Self::passed(no_metadata(), Vec::new())
    }

    /// The validator was not run because the user asked to skip validation.
    pub fn skipped_by_user(metadata: Metadata) -> Self {
        Self {
            status: ValidationStatus::SkippedByUser,
            metadata,
            messages: Vec::new(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == ValidationStatus::SkippedByUser
    }
}

/// Rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// A policy rule failed; the user can act on it.
    Policy,
    /// A collaborator failed; details are in the server log only.
    Internal,
}

/// A rejected commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason}")]
pub struct CommitValidationError {
    /// Primary reason, shown as the push rejection.
    pub reason: String,
    /// Ordered diagnostics accompanying the reason.
    pub messages: Vec<CommitValidationMessage>,
    pub kind: RejectionKind,
}

impl CommitValidationError {
    /// Policy rejection without extra messages.
    pub fn new(reason: impl Into<String>) -> Self {
        Self::with_messages(reason, Vec::new())
    }

    pub fn with_messages(reason: impl Into<String>, messages: Vec<CommitValidationMessage>) -> Self {
        Self {
            reason: reason.into(),
            messages,
            kind: RejectionKind::Policy,
        }
    }

    /// Rejection caused by a collaborator failure.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            messages: Vec::new(),
            kind: RejectionKind::Internal,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind == RejectionKind::Internal
    }

    /// Reason followed by each message on its own line.
    pub fn full_message(&self) -> String {
        let mut out = self.reason.clone();
        for m in &self.messages {
            out.push('\n');
            out.push_str(m.message.trim_end());
        }
        out
    }
}

/// Result of one validator.
pub type ValidationResult = Result<CommitValidationInfo, CommitValidationError>;

/// Insertion-ordered map from validator name to its info.
///
/// A name reported by more than one validator keeps every entry; `get`
/// returns the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationInfos {
    entries: Vec<(String, CommitValidationInfo)>,
}

impl ValidationInfos {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validator: impl Into<String>, info: CommitValidationInfo) {
        self.entries.push((validator.into(), info));
    }

    pub fn get(&self, validator: &str) -> Option<&CommitValidationInfo> {
        self.entries
            .iter()
            .find(|(name, _)| name == validator)
            .map(|(_, info)| info)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommitValidationInfo)> {
        self.entries.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All messages of all infos, in execution order.
    pub fn messages(&self) -> impl Iterator<Item = &CommitValidationMessage> {
        self.entries.iter().flat_map(|(_, info)| info.messages.iter())
    }
}

impl Serialize for ValidationInfos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, info) in &self.entries {
            map.serialize_entry(name, info)?;
        }
        map.end()
    }
}
