//! Records exchanged with the pipeline's collaborators.
//!
//! - `ObjectId`: a git object name (40 lowercase hex chars)
//! - `ProjectName` / `BranchNameKey`: push target identity
//! - `ProjectState` / `ProjectConfig`: cached project policy and parsed config
//! - `ModifiedFile`: one entry of a commit's diff
//! - `RefPermission`: fine-grained permissions checked per ref
//! - `SshInfo` / `HostKey`: advertised SSH endpoints

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Git object name (SHA-1, hex encoded).
///
/// The inner field is private so the string is always 40 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Length of a hex encoded object name.
    pub const HEX_LEN: usize = 40;

    /// Parse and normalise a hex object name.
    pub fn parse(s: &str) -> Result<Self, StateError> {
        let bytes = hex::decode(s).map_err(|_| StateError::InvalidObjectId(s.to_string()))?;
        if bytes.len() != Self::HEX_LEN / 2 {
            return Err(StateError::InvalidObjectId(s.to_string()));
        }
        Ok(ObjectId(hex::encode(bytes)))
    }

    /// The all-zero id used for ref creation/deletion.
    pub fn zero() -> Self {
        ObjectId("0".repeat(Self::HEX_LEN))
    }

    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Full hex name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Abbreviated form (first 7 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl TryFrom<String> for ObjectId {
    type Error = StateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ObjectId::parse(&s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a hosted project (repository).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(pub String);

impl ProjectName {
    pub fn new(name: impl Into<String>) -> Self {
        ProjectName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A branch of a project. `branch` is the full ref name (`refs/heads/main`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchNameKey {
    pub project: ProjectName,
    pub branch: String,
}

impl BranchNameKey {
    pub fn new(project: ProjectName, branch: impl Into<String>) -> Self {
        Self {
            project,
            branch: branch.into(),
        }
    }
}

/// Lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectLifecycle {
    #[default]
    Active,
    ReadOnly,
    Hidden,
}

/// Cached view of a project's policy flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub name: ProjectName,
    #[serde(default)]
    pub state: ProjectLifecycle,
    #[serde(default)]
    pub require_change_id: bool,
    #[serde(default)]
    pub use_signed_off_by: bool,
}

impl ProjectState {
    /// Active project with no optional policies enabled.
    pub fn active(name: ProjectName) -> Self {
        Self {
            name,
            state: ProjectLifecycle::Active,
            require_change_id: false,
            use_signed_off_by: false,
        }
    }

    pub fn state_permits_write(&self) -> bool {
        self.state == ProjectLifecycle::Active
    }
}

/// A label definition as found in a project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelType {
    pub name: String,
    /// Query deciding which approvals are copied to new patch sets.
    #[serde(default)]
    pub copy_condition: Option<String>,
    /// Legacy boolean copy flags that are set (e.g. `copyAnyScore`).
    #[serde(default)]
    pub copy_flags: BTreeSet<String>,
}

/// Parsed project configuration at one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectName,
    /// Explicitly configured parent, if any.
    #[serde(default)]
    pub parent: Option<ProjectName>,
    /// Structural or semantic problems found while parsing.
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub labels: Vec<LabelType>,
}

impl ProjectConfig {
    pub fn new(project: ProjectName) -> Self {
        Self {
            project,
            parent: None,
            validation_errors: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Effective parent: the configured one, otherwise the root project.
    ///
    /// The root project itself has no parent.
    pub fn parent_or(&self, all_projects: &ProjectName) -> Option<ProjectName> {
        match &self.parent {
            Some(parent) => Some(parent.clone()),
            None if &self.project == all_projects => None,
            None => Some(all_projects.clone()),
        }
    }

    pub fn label(&self, name: &str) -> Option<&LabelType> {
        self.labels.iter().find(|l| l.name == name)
    }
}

/// Kind of modification of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Rewrite,
}

/// One file of a commit's diff against its comparison base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedFile {
    pub change_type: ChangeType,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
}

impl ModifiedFile {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            change_type: ChangeType::Added,
            old_path: None,
            new_path: Some(path.into()),
        }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            change_type: ChangeType::Modified,
            old_path: Some(path.clone()),
            new_path: Some(path),
        }
    }
}

/// Permissions evaluated against a single ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefPermission {
    /// Upload merge commits.
    Merge,
    /// Push commits whose author is someone else.
    ForgeAuthor,
    /// Push commits whose committer is someone else.
    ForgeCommitter,
    /// Push commits authored by the server identity.
    ForgeServer,
}

impl RefPermission {
    /// Constant-style name, as shown in permission errors.
    pub fn name(&self) -> &'static str {
        match self {
            RefPermission::Merge => "MERGE",
            RefPermission::ForgeAuthor => "FORGE_AUTHOR",
            RefPermission::ForgeCommitter => "FORGE_COMMITTER",
            RefPermission::ForgeServer => "FORGE_SERVER",
        }
    }

    /// Human readable description.
    pub fn describe(&self) -> &'static str {
        match self {
            RefPermission::Merge => "merge",
            RefPermission::ForgeAuthor => "forge author",
            RefPermission::ForgeCommitter => "forge committer",
            RefPermission::ForgeServer => "forge server",
        }
    }
}

/// A host key advertised by the SSH daemon. `host` is `host`, `host:port` or `*:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostKey {
    pub host: String,
}

/// SSH endpoints known to the server; empty when SSH is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SshInfo {
    #[serde(default)]
    pub host_keys: Vec<HostKey>,
}

impl SshInfo {
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host_keys: vec![HostKey { host: host.into() }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_normalises_case() {
        let id = ObjectId::parse("ABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        assert_eq!(id.name(), "abcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(id.short(), "abcdef0");
    }

    #[test]
    fn object_id_rejects_bad_input() {
        assert!(ObjectId::parse("xyz").is_err());
        assert!(ObjectId::parse("abcd").is_err());
        assert!(ObjectId::parse(&"a".repeat(64)).is_err());
    }

    #[test]
    fn zero_id() {
        assert!(ObjectId::zero().is_zero());
        let id = ObjectId::parse(&"1".repeat(40)).unwrap();
        assert!(!id.is_zero());
    }

    #[test]
    fn object_id_serde_uses_hex_string() {
        let id = ObjectId::parse(&"ab".repeat(20)).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        let bad: Result<ObjectId, _> = serde_json::from_str("\"nothex\"");
        assert!(bad.is_err());
    }

    #[test]
    fn parent_defaults_to_root_project() {
        let all_projects = ProjectName::new("All-Projects");
        let cfg = ProjectConfig::new(ProjectName::new("All-Users"));
        assert_eq!(cfg.parent_or(&all_projects), Some(all_projects.clone()));

        let root = ProjectConfig::new(all_projects.clone());
        assert_eq!(root.parent_or(&all_projects), None);

        let mut child = ProjectConfig::new(ProjectName::new("All-Users"));
        child.parent = Some(ProjectName::new("Other"));
        assert_eq!(child.parent_or(&all_projects), Some(ProjectName::new("Other")));
    }

    #[test]
    fn only_active_projects_permit_write() {
        let mut state = ProjectState::active(ProjectName::new("p"));
        assert!(state.state_permits_write());
        state.state = ProjectLifecycle::ReadOnly;
        assert!(!state.state_permits_write());
        state.state = ProjectLifecycle::Hidden;
        assert!(!state.state_permits_write());
    }

    #[test]
    fn permission_names() {
        assert_eq!(RefPermission::ForgeServer.name(), "FORGE_SERVER");
        assert_eq!(RefPermission::ForgeAuthor.describe(), "forge author");
    }
}
