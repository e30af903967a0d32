//! Push descriptions for dry runs.
//!
//! A push description is a JSON document naming everything a validation run
//! needs; it is wired to the in-memory collaborators from
//! `pushgate_state::fakes`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use pushgate_core::{
    BranchNameKey, Change, Commit, CommitReceivedEvent, IdentifiedUser, ObjectId, PatchSetId,
    ProjectConfig, ProjectState, ReceiveCommand, RefPermission, SshInfo,
};
use pushgate_state::fakes::{
    MemoryBannedCommits, MemoryDiffOperations, MemoryPermissionBackend, MemoryProjectCache,
    MemoryProjectConfigLoader,
};
use pushgate_state::ModifiedFile;
use pushgate_validation::{GerritCommitsRequest, MergedCommitsRequest, ReceiveCommitsRequest};
use serde::Deserialize;

/// One push to validate.
#[derive(Debug, Clone, Deserialize)]
pub struct PushDescription {
    /// Ref as sent by the client, e.g. `refs/for/main`.
    pub ref_name: String,
    /// Destination branch; defaults to `ref_name` with any `refs/for/`
    /// prefix mapped to `refs/heads/`.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub old_id: Option<ObjectId>,
    pub project: ProjectState,
    pub commit: Commit,
    pub user: IdentifiedUser,
    #[serde(default)]
    pub granted: Vec<RefPermission>,
    #[serde(default)]
    pub banned: Vec<ObjectId>,
    /// Paths changed by the commit. Absent means the diff is not available.
    #[serde(default)]
    pub changed_paths: Option<Vec<String>>,
    #[serde(default)]
    pub change: Option<Change>,
    #[serde(default)]
    pub patch_set: Option<PatchSetId>,
    #[serde(default)]
    pub ssh_info: SshInfo,
    #[serde(default)]
    pub skip_validation: bool,
    /// Project configurations by revision, for `refs/meta/config` pushes.
    #[serde(default)]
    pub project_configs: BTreeMap<String, ProjectConfig>,
}

impl PushDescription {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read push description {:?}", path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse push description {:?}", path))
    }

    pub fn branch(&self) -> BranchNameKey {
        let branch = self.branch.clone().unwrap_or_else(|| {
            match self.ref_name.strip_prefix(pushgate_core::domain::refs::NEW_CHANGE) {
                Some(dest) if dest.starts_with("refs/") => dest.to_string(),
                Some(dest) => format!("{}{}", pushgate_core::domain::refs::R_HEADS, dest),
                None => self.ref_name.clone(),
            }
        });
        BranchNameKey::new(self.project.name.clone(), branch)
    }
}

/// In-memory collaborators populated from a push description.
pub struct DryRunWorld {
    pub project_cache: Arc<MemoryProjectCache>,
    pub config_loader: Arc<MemoryProjectConfigLoader>,
    pub permissions: Arc<MemoryPermissionBackend>,
    pub banned: Arc<MemoryBannedCommits>,
    pub diff: Arc<MemoryDiffOperations>,
}

impl DryRunWorld {
    pub fn from_push(push: &PushDescription) -> Result<Self> {
        let project_cache = Arc::new(MemoryProjectCache::new().with_project(push.project.clone()));

        let config_loader = Arc::new(MemoryProjectConfigLoader::new());
        for (revision, config) in &push.project_configs {
            let revision = ObjectId::parse(revision)
                .with_context(|| format!("Invalid project config revision {revision}"))?;
            config_loader.insert(revision, config.clone());
        }

        let permissions = Arc::new(MemoryPermissionBackend::granting(
            push.granted.iter().copied(),
        ));

        let banned = Arc::new(MemoryBannedCommits::new());
        for id in &push.banned {
            banned.ban(id.clone());
        }

        let diff = Arc::new(MemoryDiffOperations::new());
        if let Some(paths) = &push.changed_paths {
            let files = paths.iter().map(ModifiedFile::modified).collect();
            diff.insert(push.commit.id.clone(), files);
        }

        Ok(Self {
            project_cache,
            config_loader,
            permissions,
            banned,
            diff,
        })
    }

    pub fn event(&self, push: &PushDescription) -> CommitReceivedEvent {
        let command = ReceiveCommand::new(
            push.ref_name.clone(),
            push.old_id.clone().unwrap_or_else(ObjectId::zero),
            push.commit.id.clone(),
        );
        CommitReceivedEvent::new(
            command,
            push.branch(),
            push.commit.clone(),
            push.user.clone(),
            self.diff.clone(),
        )
    }

    pub fn receive_request(&self, push: &PushDescription) -> ReceiveCommitsRequest {
        ReceiveCommitsRequest {
            permissions: self.permissions.clone(),
            branch: push.branch(),
            user: push.user.clone(),
            ssh_info: push.ssh_info.clone(),
            banned_commits: self.banned.clone(),
            change: push.change.clone(),
            skip_validation: push.skip_validation,
        }
    }

    pub fn gerrit_request(&self, push: &PushDescription) -> GerritCommitsRequest {
        GerritCommitsRequest {
            permissions: self.permissions.clone(),
            branch: push.branch(),
            user: push.user.clone(),
            ssh_info: push.ssh_info.clone(),
            change: push.change.clone(),
        }
    }

    pub fn merged_request(&self, push: &PushDescription) -> MergedCommitsRequest {
        MergedCommitsRequest {
            permissions: self.permissions.clone(),
            branch: push.branch(),
            user: push.user.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample() -> serde_json::Value {
        json!({
            "ref_name": "refs/for/main",
            "project": { "name": "demo", "require_change_id": true },
            "commit": {
                "id": "1111111111111111111111111111111111111111",
                "parents": ["2222222222222222222222222222222222222222"],
                "author": { "name": "J. Doe", "email": "jdoe@example.com" },
                "committer": { "name": "J. Doe", "email": "jdoe@example.com" },
                "message": "Add feature\n\nChange-Id: I0123456789abcdef0123456789abcdef01234567\n"
            },
            "user": { "account_id": 1000, "user_name": "jdoe", "emails": ["jdoe@example.com"] },
            "changed_paths": ["src/lib.rs"]
        })
    }

    #[test]
    fn magic_ref_maps_to_destination_branch() {
        let push: PushDescription = serde_json::from_value(sample()).unwrap();
        assert_eq!(push.branch().branch, "refs/heads/main");
        assert_eq!(push.branch().project.as_str(), "demo");

        let mut direct = push.clone();
        direct.ref_name = "refs/heads/stable".to_string();
        assert_eq!(direct.branch().branch, "refs/heads/stable");
    }

    #[tokio::test]
    async fn world_serves_changed_paths() {
        let push: PushDescription = serde_json::from_value(sample()).unwrap();
        let world = DryRunWorld::from_push(&push).unwrap();
        let event = world.event(&push);
        assert_eq!(event.changed_file_count().await.unwrap(), 1);
        assert!(event.command.old_id.is_zero());
    }

    #[test]
    fn bad_config_revision_is_reported() {
        let mut value = sample();
        value["project_configs"] = json!({ "not-hex": { "project": "demo" } });
        let push: PushDescription = serde_json::from_value(value).unwrap();
        assert!(DryRunWorld::from_push(&push).is_err());
    }
}
